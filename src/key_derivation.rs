// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The HKDF-based key schedule shared by the envelope and the key exchange

use crate::{
    errors::{InternalPakeError, ProtocolError},
    hash::Hash,
    slow_hash::SlowHash,
};
use digest::Digest;
use generic_array::GenericArray;
use hkdf::Hkdf;

use crate::serialization::{i2osp, serialize};

pub(crate) static STR_HANDSHAKE_SECRET: &[u8] = b"HandshakeSecret";
pub(crate) static STR_SESSION_KEY: &[u8] = b"SessionKey";
pub(crate) static STR_SERVER_MAC: &[u8] = b"ServerMAC";
pub(crate) static STR_CLIENT_MAC: &[u8] = b"ClientMAC";
static STR_OPAQUE: &[u8] = b"OPAQUE-";

/// The label framing used for every key schedule expansion: the output
/// length, the "OPAQUE-"-prefixed label, and a context string, each
/// length-prefixed
fn build_label(length: usize, label: &[u8], context: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let opaque_label = [STR_OPAQUE, label].concat();
    Ok([
        &i2osp(length, 2)?[..],
        &serialize(&opaque_label, 1)?[..],
        &serialize(context, 1)?[..],
    ]
    .concat())
}

pub(crate) fn hkdf_expand_label<D: Hash>(
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    okm: &mut [u8],
) -> Result<(), ProtocolError> {
    let hkdf = Hkdf::<D>::from_prk(secret).map_err(|_| InternalPakeError::HkdfError)?;
    hkdf_expand_label_extracted(&hkdf, label, context, okm)
}

pub(crate) fn hkdf_expand_label_extracted<D: Hash>(
    hkdf: &Hkdf<D>,
    label: &[u8],
    context: &[u8],
    okm: &mut [u8],
) -> Result<(), ProtocolError> {
    let info = build_label(okm.len(), label, context)?;
    Ok(hkdf
        .expand(&info, okm)
        .map_err(|_| InternalPakeError::HkdfError)?)
}

/// Expands a secret under a label and a hashed transcript into one
/// digest-sized key
pub(crate) fn derive_secret<D: Hash>(
    hkdf: &Hkdf<D>,
    label: &[u8],
    hashed_transcript: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let mut okm = vec![0u8; <D as Digest>::output_size()];
    hkdf_expand_label_extracted(hkdf, label, hashed_transcript, &mut okm)?;
    Ok(okm)
}

/// Derives the randomized password from the OPRF output: the output is
/// stretched through the suite's slow hash, and both are extracted into an
/// HKDF instance the envelope keys are expanded from
pub(crate) fn derive_randomized_pwd<D: Hash, SH: SlowHash<D>>(
    oprf_output: GenericArray<u8, <D as Digest>::OutputSize>,
) -> Result<Hkdf<D>, InternalPakeError> {
    let hardened_output = SH::hash(oprf_output.clone())?;
    let ikm = [&oprf_output[..], &hardened_output[..]].concat();
    let (_, hkdf) = Hkdf::<D>::extract(None, &ikm);
    Ok(hkdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Sha512;

    #[test]
    fn test_expand_label_is_deterministic() -> Result<(), ProtocolError> {
        let secret = [1u8; 64];
        let mut okm1 = [0u8; 64];
        let mut okm2 = [0u8; 64];
        hkdf_expand_label::<Sha512>(&secret, STR_SESSION_KEY, b"ctx", &mut okm1)?;
        hkdf_expand_label::<Sha512>(&secret, STR_SESSION_KEY, b"ctx", &mut okm2)?;
        assert_eq!(okm1, okm2);
        Ok(())
    }

    #[test]
    fn test_label_framing() -> Result<(), ProtocolError> {
        let info = build_label(64, STR_SESSION_KEY, b"ctx")?;
        let mut expected = vec![0u8, 64];
        expected.extend_from_slice(&[17]);
        expected.extend_from_slice(b"OPAQUE-SessionKey");
        expected.extend_from_slice(&[3]);
        expected.extend_from_slice(b"ctx");
        assert_eq!(info, expected);
        Ok(())
    }

    #[test]
    fn test_expand_label_separates_labels() -> Result<(), ProtocolError> {
        let secret = [1u8; 64];
        let mut km2 = [0u8; 64];
        let mut km3 = [0u8; 64];
        hkdf_expand_label::<Sha512>(&secret, STR_SERVER_MAC, b"", &mut km2)?;
        hkdf_expand_label::<Sha512>(&secret, STR_CLIENT_MAC, b"", &mut km3)?;
        assert_ne!(km2, km3);
        Ok(())
    }
}
