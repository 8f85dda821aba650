// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! How a password is hashed into a group element for the OPRF

use crate::{errors::InternalPakeError, group::Group, hash::Hash};
use generic_array::GenericArray;
use hkdf::Hkdf;

static STR_MAP_TO_GROUP: &[u8] = b"MapToGroup";

/// A subtrait of Group specifying how to hash a password into a group element
pub trait GroupWithMapToCurve: Group {
    /// Transforms a password and domain-separation pepper into a curve point
    fn map_to_curve<H: Hash>(password: &[u8], pepper: &[u8]) -> Result<Self, InternalPakeError>;
}

impl<G: Group> GroupWithMapToCurve for G {
    fn map_to_curve<H: Hash>(password: &[u8], pepper: &[u8]) -> Result<Self, InternalPakeError> {
        let (_, hkdf) = Hkdf::<H>::extract(Some(pepper), password);
        let mut uniform_bytes = GenericArray::<u8, G::UniformBytesLen>::default();
        hkdf.expand(STR_MAP_TO_GROUP, &mut uniform_bytes)
            .map_err(|_| InternalPakeError::HashToCurveError)?;
        Ok(G::hash_to_curve(&uniform_bytes))
    }
}
