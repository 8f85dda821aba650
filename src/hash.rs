// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A convenience trait for digest bounds used throughout the library

use digest::{BlockInput, FixedOutput, Reset, Update};

/// Trait alias for the full set of digest bounds required by the key
/// schedule (HKDF and HMAC instantiation)
pub trait Hash: Update + BlockInput + FixedOutput + Reset + Default + Clone {}

impl<T: Update + BlockInput + FixedOutput + Reset + Default + Clone> Hash for T {}

#[cfg(test)]
mod tests {
    use super::Hash;
    use digest::Digest;
    use sha2::Sha512;

    // The Digest methods must resolve unambiguously for any D: Hash
    fn hash_through_bound<D: Hash>(input: &[u8]) -> Vec<u8> {
        D::new().chain(input).finalize().to_vec()
    }

    #[test]
    fn digest_methods_resolve_through_the_bound() {
        assert_eq!(
            hash_through_bound::<Sha512>(b"abc"),
            Sha512::digest(b"abc").to_vec()
        );
    }
}
