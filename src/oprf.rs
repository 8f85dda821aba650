// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::{
    errors::{InternalPakeError, ProtocolError},
    group::Group,
    hash::Hash,
    map_to_curve::GroupWithMapToCurve,
    serialization::serialize,
};
use digest::Digest;
use generic_array::GenericArray;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

static STR_PEPPER: &[u8] = b"OPRF-Ristretto255-SHA512";
static STR_FINALIZE: &[u8] = b"Finalize";

/// A struct to hold the blinded password and the blinding factor, so that the
/// client can unblind the server's evaluation when it arrives
pub(crate) struct Token<Grp: Group> {
    pub(crate) data: Vec<u8>,
    pub(crate) blind: Grp::Scalar,
}

impl<Grp: Group> Zeroize for Token<Grp> {
    fn zeroize(&mut self) {
        self.data.zeroize();
        self.blind.zeroize();
    }
}

impl<Grp: Group> Drop for Token<Grp> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Computes the first step for the multiplicative blinding version of DH-OPRF.
/// Returns, in order:
/// * Random blinding factor and the input, retained by the client
/// * The blinded password, sent to the server
pub(crate) fn blind<R: RngCore + CryptoRng, G: GroupWithMapToCurve, H: Hash>(
    input: &[u8],
    blinding_factor_rng: &mut R,
) -> Result<(Token<G>, G), ProtocolError> {
    let mapped_point = G::map_to_curve::<H>(input, STR_PEPPER)?;
    let blind = G::random_nonzero_scalar(blinding_factor_rng)?;
    let alpha = mapped_point * &blind;
    Ok((
        Token {
            data: input.to_vec(),
            blind,
        },
        alpha,
    ))
}

/// Computes the second step for the multiplicative blinding version of
/// DH-OPRF, run by the server. The identity element is rejected so a
/// degenerate blinded value cannot fix the output
pub(crate) fn evaluate<G: Group>(point: G, oprf_key: &G::Scalar) -> Result<G, InternalPakeError> {
    if point.is_identity() {
        return Err(InternalPakeError::SubGroupError);
    }
    Ok(point * oprf_key)
}

/// Computes the third step for the multiplicative blinding version of
/// DH-OPRF, in which the client unblinds the server's message and hashes it
/// down to the OPRF output
pub(crate) fn finalize<G: Group, H: Hash>(
    input: &[u8],
    blind: &G::Scalar,
    evaluated_element: G,
) -> Result<GenericArray<u8, <H as Digest>::OutputSize>, ProtocolError> {
    let unblinded_element = evaluated_element * &G::scalar_invert(blind);
    finalize_after_unblind::<G, H>(input, unblinded_element)
}

fn finalize_after_unblind<G: Group, H: Hash>(
    input: &[u8],
    unblinded_element: G,
) -> Result<GenericArray<u8, <H as Digest>::OutputSize>, ProtocolError> {
    Ok(H::new()
        .chain(&serialize(input, 2)?)
        .chain(&serialize(&unblinded_element.to_arr(), 2)?)
        .chain(&serialize(STR_FINALIZE, 2)?)
        .finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::ristretto::RistrettoPoint;
    use generic_array::GenericArray;
    use rand_core::OsRng;
    use sha2::Sha512;

    fn prf(input: &[u8], oprf_key: &[u8; 32]) -> GenericArray<u8, digest::consts::U64> {
        let point = RistrettoPoint::map_to_curve::<Sha512>(input, STR_PEPPER)
            .expect("mapping should not fail");
        let scalar =
            RistrettoPoint::from_scalar_slice(&GenericArray::clone_from_slice(&oprf_key[..]))
                .expect("scalar from bytes");
        let res = point * &scalar;
        finalize_after_unblind::<RistrettoPoint, Sha512>(input, res).expect("finalize")
    }

    #[test]
    fn oprf_retrieval() -> Result<(), ProtocolError> {
        let input = b"hunter2";
        let mut rng = OsRng;
        let (token, alpha) = blind::<_, RistrettoPoint, Sha512>(&input[..], &mut rng)?;
        let oprf_key_bytes = [
            2u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0,
        ];
        let oprf_key = RistrettoPoint::from_scalar_slice(&GenericArray::clone_from_slice(
            &oprf_key_bytes[..],
        ))?;
        let beta = evaluate(alpha, &oprf_key)?;
        let res = finalize::<RistrettoPoint, Sha512>(&token.data, &token.blind, beta)?;
        let res2 = prf(&input[..], &oprf_key_bytes);
        assert_eq!(res, res2);
        Ok(())
    }

    #[test]
    fn oprf_inversion_unsalted() -> Result<(), ProtocolError> {
        // Blinding then unblinding with no evaluation recovers the mapped point
        let input = b"hunter2";
        let mut rng = OsRng;
        let (token, alpha) = blind::<_, RistrettoPoint, Sha512>(&input[..], &mut rng)?;
        let res = finalize::<RistrettoPoint, Sha512>(&token.data, &token.blind, alpha)?;

        let point = RistrettoPoint::map_to_curve::<Sha512>(&input[..], STR_PEPPER)?;
        let res2 = finalize_after_unblind::<RistrettoPoint, Sha512>(&input[..], point)?;

        assert_eq!(res, res2);
        Ok(())
    }

    #[test]
    fn evaluate_rejects_identity() {
        let identity = RistrettoPoint::default();
        let mut rng = OsRng;
        let oprf_key =
            RistrettoPoint::random_nonzero_scalar(&mut rng).expect("scalar sampling works");
        assert_eq!(
            evaluate(identity, &oprf_key),
            Err(InternalPakeError::SubGroupError)
        );
    }
}
