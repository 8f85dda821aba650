// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Contains the keypair types that must be supplied for the OPAQUE API

use crate::errors::InternalPakeError;
use curve25519_dalek::montgomery::MontgomeryPoint;
use generic_array::{typenum::U32, ArrayLength, GenericArray};
use rand_core::{CryptoRng, RngCore};
use std::convert::TryInto;
use std::ops::Deref;
use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};
use zeroize::Zeroize;

/// A trait for sized key material
pub trait SizedBytes: Sized {
    /// The typed representation of the key length
    type Len: ArrayLength<u8> + 'static;

    /// Converts this sized key material to a `GenericArray` of the same
    /// size. One can convert this to a `&[u8]` with `GenericArray::as_slice()`
    /// but the size information is then lost from the type.
    fn to_arr(&self) -> GenericArray<u8, Self::Len>;

    /// How to parse such sized material from a correctly-sized byte slice.
    fn from_arr(key_bytes: &GenericArray<u8, Self::Len>) -> Result<Self, InternalPakeError>;
}

/// A Keypair trait with public-private verification
pub trait KeyPair: Sized {
    /// The single key representation must have a specified size,
    /// and this trait specifies it
    type Repr: SizedBytes + Clone + Zeroize;

    /// The public key component
    fn public(&self) -> &Self::Repr;

    /// The private key component
    fn private(&self) -> &Self::Repr;

    /// A constructor that receives public and private key independently as
    /// bytes
    fn new(public: Self::Repr, private: Self::Repr) -> Result<Self, InternalPakeError>;

    /// Generating a random key pair given a cryptographic rng
    fn generate_random<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, InternalPakeError>;

    /// Obtaining a public key from secret bytes. At all times, we should have
    /// &public_from_private(self.private()) == self.public()
    fn public_from_private(secret: &Self::Repr) -> Self::Repr;

    /// Check whether a public key is valid. This is meant to be applied on
    /// material provided through the network which fits the key
    /// representation (i.e. can be mapped to a curve point), but presents
    /// some risk - e.g. small subgroup check
    fn check_public_key(key: Self::Repr) -> Result<Self::Repr, InternalPakeError>;

    /// Computes the diffie hellman function on a public key and private key
    fn diffie_hellman(pk: &Self::Repr, sk: &Self::Repr) -> Result<Vec<u8>, InternalPakeError>;
}

/// A minimalist key type built around a \[u8; 32\]
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Key(Vec<u8>);

impl Deref for Key {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Zeroize for Key {
    fn zeroize(&mut self) {
        self.0.zeroize()
    }
}

impl SizedBytes for Key {
    type Len = U32;

    fn to_arr(&self) -> GenericArray<u8, Self::Len> {
        GenericArray::clone_from_slice(&self.0[..])
    }

    fn from_arr(key_bytes: &GenericArray<u8, Self::Len>) -> Result<Self, InternalPakeError> {
        Ok(Key(key_bytes.to_vec()))
    }
}

impl Key {
    /// Convert to bytes
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.clone()
    }

    fn as_fixed_bytes(&self) -> Result<[u8; 32], InternalPakeError> {
        self.0
            .as_slice()
            .try_into()
            .map_err(|_| InternalPakeError::SizeError {
                name: "key",
                len: 32,
                actual_len: self.0.len(),
            })
    }
}

/// An x25519 keypair, the private key bytes held in clamped form
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct X25519KeyPair {
    pk: Key,
    sk: Key,
}

// The clamping of RFC7748, applied at generation so that stored and wire
// representations of a private key agree
fn clamp_scalar_bytes(mut scalar_bytes: [u8; 32]) -> [u8; 32] {
    scalar_bytes[0] &= 248;
    scalar_bytes[31] &= 127;
    scalar_bytes[31] |= 64;
    scalar_bytes
}

impl KeyPair for X25519KeyPair {
    type Repr = Key;

    fn public(&self) -> &Self::Repr {
        &self.pk
    }

    fn private(&self) -> &Self::Repr {
        &self.sk
    }

    fn new(public: Self::Repr, private: Self::Repr) -> Result<Self, InternalPakeError> {
        Ok(X25519KeyPair {
            pk: public,
            sk: private,
        })
    }

    fn generate_random<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, InternalPakeError> {
        let mut scalar_bytes = [0u8; 32];
        rng.try_fill_bytes(&mut scalar_bytes)
            .map_err(|_| InternalPakeError::RandomnessError)?;
        let sk_bytes = clamp_scalar_bytes(scalar_bytes);
        let pk_bytes = x25519(sk_bytes, X25519_BASEPOINT_BYTES);
        Ok(X25519KeyPair {
            pk: Key(pk_bytes.to_vec()),
            sk: Key(sk_bytes.to_vec()),
        })
    }

    fn public_from_private(secret: &Self::Repr) -> Self::Repr {
        let mut sk_bytes = [0u8; 32];
        sk_bytes.copy_from_slice(&secret[..]);
        Key(x25519(sk_bytes, X25519_BASEPOINT_BYTES).to_vec())
    }

    fn check_public_key(key: Self::Repr) -> Result<Self::Repr, InternalPakeError> {
        let key_bytes = key.as_fixed_bytes()?;
        let point = MontgomeryPoint(key_bytes)
            .to_edwards(1)
            .ok_or(InternalPakeError::PointError)?;
        if !point.is_torsion_free() {
            Err(InternalPakeError::SubGroupError)
        } else {
            Ok(key)
        }
    }

    fn diffie_hellman(pk: &Self::Repr, sk: &Self::Repr) -> Result<Vec<u8>, InternalPakeError> {
        let pk_bytes = pk.as_fixed_bytes()?;
        let sk_bytes = sk.as_fixed_bytes()?;
        Ok(x25519(sk_bytes, pk_bytes).to_vec())
    }
}

impl Zeroize for X25519KeyPair {
    fn zeroize(&mut self) {
        self.sk.zeroize();
    }
}

impl Drop for X25519KeyPair {
    fn drop(&mut self) {
        self.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn test_public_from_private_matches_generation() -> anyhow::Result<()> {
        let mut rng = OsRng;
        let kp = X25519KeyPair::generate_random(&mut rng)?;
        assert_eq!(
            &X25519KeyPair::public_from_private(kp.private()),
            kp.public()
        );
        Ok(())
    }

    #[test]
    fn test_diffie_hellman_commutes() -> anyhow::Result<()> {
        let mut rng = OsRng;
        let kp1 = X25519KeyPair::generate_random(&mut rng)?;
        let kp2 = X25519KeyPair::generate_random(&mut rng)?;
        let dh1 = X25519KeyPair::diffie_hellman(kp1.public(), kp2.private())?;
        let dh2 = X25519KeyPair::diffie_hellman(kp2.public(), kp1.private())?;
        assert_eq!(dh1, dh2);
        Ok(())
    }

    #[test]
    fn test_generated_public_key_passes_check() -> anyhow::Result<()> {
        let mut rng = OsRng;
        let kp = X25519KeyPair::generate_random(&mut rng)?;
        assert!(X25519KeyPair::check_public_key(kp.public().clone()).is_ok());
        Ok(())
    }

    #[test]
    fn test_low_order_public_key_rejected() {
        // u = 0 is a small-order point on the Montgomery curve
        let key = Key::from_arr(&GenericArray::clone_from_slice(&[0u8; 32]))
            .expect("32 bytes make a key");
        assert!(X25519KeyPair::check_public_key(key).is_err());
    }
}
