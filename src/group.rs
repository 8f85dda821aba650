// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Defines the Group trait to specify the underlying prime order group used in
//! the OPRF, along with its implementation for ristretto255

use crate::errors::InternalPakeError;
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::Identity,
};
use generic_array::{
    typenum::{U32, U64},
    ArrayLength, GenericArray,
};
use rand_core::{CryptoRng, RngCore};
use std::ops::Mul;
use zeroize::Zeroize;

/// A prime-order subgroup of a base field (EC, prime-order field ...). This
/// subgroup is noted additively, with point addition and scalar
/// multiplication
pub trait Group: Copy + Sized + for<'a> Mul<&'a <Self as Group>::Scalar, Output = Self> {
    /// The type of group scalars
    type Scalar: Zeroize + Clone + PartialEq;
    /// The byte length necessary to represent scalars
    type ScalarLen: ArrayLength<u8>;
    /// Return a scalar from its fixed-length bytes representation
    fn from_scalar_slice(
        scalar_bits: &GenericArray<u8, Self::ScalarLen>,
    ) -> Result<Self::Scalar, InternalPakeError>;
    /// Sample a random scalar, rejecting zero. Failure of the underlying
    /// randomness source surfaces as an error rather than a panic
    fn random_nonzero_scalar<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<Self::Scalar, InternalPakeError>;
    /// Return the bytes representation of a scalar
    fn scalar_as_bytes(scalar: &Self::Scalar) -> &GenericArray<u8, Self::ScalarLen>;
    /// The multiplicative inverse of this scalar
    fn scalar_invert(scalar: &Self::Scalar) -> Self::Scalar;

    /// The byte length necessary to represent group elements
    type ElemLen: ArrayLength<u8>;
    /// Return an element from its fixed-length bytes representation
    fn from_element_slice(
        element_bits: &GenericArray<u8, Self::ElemLen>,
    ) -> Result<Self, InternalPakeError>;
    /// Return the bytes representation of this element
    fn to_arr(&self) -> GenericArray<u8, Self::ElemLen>;

    /// The byte length of uniformly random input consumed by hash_to_curve
    type UniformBytesLen: ArrayLength<u8>;
    /// Hash uniformly random bytes to a group element
    fn hash_to_curve(uniform_bytes: &GenericArray<u8, Self::UniformBytesLen>) -> Self;

    /// Whether this element is the identity of the group
    fn is_identity(&self) -> bool;
    /// The fixed generator of the group
    fn base_point() -> Self;
}

/// The implementation of such a subgroup for Ristretto
impl Group for RistrettoPoint {
    type Scalar = Scalar;
    type ScalarLen = U32;

    fn from_scalar_slice(
        scalar_bits: &GenericArray<u8, Self::ScalarLen>,
    ) -> Result<Self::Scalar, InternalPakeError> {
        let mut bits = [0u8; 32];
        bits.copy_from_slice(scalar_bits);
        Ok(Scalar::from_bytes_mod_order(bits))
    }

    fn random_nonzero_scalar<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<Self::Scalar, InternalPakeError> {
        loop {
            let mut scalar_bytes = [0u8; 64];
            rng.try_fill_bytes(&mut scalar_bytes)
                .map_err(|_| InternalPakeError::RandomnessError)?;
            let scalar = Scalar::from_bytes_mod_order_wide(&scalar_bytes);
            if scalar != Scalar::zero() {
                return Ok(scalar);
            }
        }
    }

    fn scalar_as_bytes(scalar: &Self::Scalar) -> &GenericArray<u8, Self::ScalarLen> {
        GenericArray::from_slice(scalar.as_bytes())
    }

    fn scalar_invert(scalar: &Self::Scalar) -> Self::Scalar {
        scalar.invert()
    }

    type ElemLen = U32;

    fn from_element_slice(
        element_bits: &GenericArray<u8, Self::ElemLen>,
    ) -> Result<Self, InternalPakeError> {
        CompressedRistretto::from_slice(element_bits)
            .decompress()
            .ok_or(InternalPakeError::PointError)
    }

    fn to_arr(&self) -> GenericArray<u8, Self::ElemLen> {
        let mut bits = GenericArray::default();
        bits.copy_from_slice(self.compress().as_bytes());
        bits
    }

    type UniformBytesLen = U64;

    fn hash_to_curve(uniform_bytes: &GenericArray<u8, Self::UniformBytesLen>) -> Self {
        let mut bits = [0u8; 64];
        bits.copy_from_slice(uniform_bytes);
        RistrettoPoint::from_uniform_bytes(&bits)
    }

    fn is_identity(&self) -> bool {
        self == &RistrettoPoint::identity()
    }

    fn base_point() -> Self {
        RISTRETTO_BASEPOINT_POINT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn test_scalar_invert_roundtrip() -> anyhow::Result<()> {
        let mut rng = OsRng;
        let s = RistrettoPoint::random_nonzero_scalar(&mut rng)?;
        let s_inv = RistrettoPoint::scalar_invert(&s);
        assert_eq!(s * s_inv, Scalar::one());
        Ok(())
    }

    #[test]
    fn test_element_roundtrip() -> anyhow::Result<()> {
        let mut rng = OsRng;
        let s = RistrettoPoint::random_nonzero_scalar(&mut rng)?;
        let p = RistrettoPoint::base_point() * &s;
        let bits = p.to_arr();
        assert_eq!(p, RistrettoPoint::from_element_slice(&bits)?);
        Ok(())
    }

    #[test]
    fn test_bad_encoding_rejected() {
        // all-ones is not a canonical ristretto encoding
        let bits = GenericArray::clone_from_slice(&[0xff; 32]);
        assert!(RistrettoPoint::from_element_slice(&bits).is_err());
    }
}
