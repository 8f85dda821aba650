// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A list of error types which are produced during an execution of the protocol

use thiserror::Error;

/// Represents an error in the manipulation of internal cryptographic data
#[derive(Clone, Debug, Eq, Hash, PartialEq, Error)]
pub enum InternalPakeError {
    /// Randomness error
    #[error("A problem occurred when sampling randomness")]
    RandomnessError,
    /// Deserializing a point from the wire failed
    #[error("Could not decompress point.")]
    PointError,
    /// Computing the hash-to-curve function failed
    #[error("Computing the hash-to-curve function failed.")]
    HashToCurveError,
    /// A scalar was unexpectedly zero, or a point lay in a small subgroup
    #[error("The protocol detected a degenerate group element.")]
    SubGroupError,
    /// Size of buffers does not match
    #[error("{name} is of incorrect size: expected {len}, got {actual_len}")]
    SizeError {
        /// name for the variable in question
        name: &'static str,
        /// expected size for this variable
        len: usize,
        /// actual size for this variable
        actual_len: usize,
    },
    /// Hmac verification of the envelope contents failed
    #[error("Sealing/opening of the envelope failed.")]
    SealOpenHmacError,
    /// HKDF could not be expanded to the requested length
    #[error("The hkdf output could not be computed.")]
    HkdfError,
    /// Keying an Hmac instance failed
    #[error("The hmac could not be keyed.")]
    HmacError,
    /// Running the memory-hardened function failed
    #[error("The slow hash function could not be evaluated.")]
    SlowHashError,
    /// The envelope bytes do not follow the expected layout
    #[error("The envelope is not well-formed.")]
    InvalidEnvelopeStructureError,
}

/// Represents an error in password checking
#[derive(Clone, Debug, Eq, Hash, PartialEq, Error)]
pub enum PakeError {
    /// Internal error encountered when computing on cryptographic data
    #[error(transparent)]
    CryptoError(#[from] InternalPakeError),
    /// Message could not be (de)serialized
    #[error("Message could not be serialized or deserialized.")]
    SerializationError,
    /// The provided credentials could not be authenticated
    #[error("User authentication failed.")]
    InvalidLoginError,
    /// A state blob was fed to an operation belonging to a different phase
    #[error("The state was used with the wrong protocol step.")]
    InvalidStateError,
}

/// Represents an error occurring during the protocol, tying together the
/// lower layers with the failures only observable at the protocol surface
#[derive(Clone, Debug, Eq, Hash, PartialEq, Error)]
pub enum ProtocolError {
    /// An error arising from the verification of keyed material
    #[error(transparent)]
    VerificationError(#[from] PakeError),
    /// The peer reflected our own blinded element back at us
    #[error("The OPRF evaluation mirrored the blinded input.")]
    ReflectedValueError,
}

// This is meant to express future(ly) non-trivial ways of converting the
// internal error into a ProtocolError
impl From<InternalPakeError> for ProtocolError {
    fn from(e: InternalPakeError) -> ProtocolError {
        ProtocolError::VerificationError(e.into())
    }
}

pub(crate) mod utils {
    use super::InternalPakeError;

    pub fn check_slice_size<'a>(
        slice: &'a [u8],
        expected_len: usize,
        arg_name: &'static str,
    ) -> Result<&'a [u8], InternalPakeError> {
        if slice.len() != expected_len {
            return Err(InternalPakeError::SizeError {
                name: arg_name,
                len: expected_len,
                actual_len: slice.len(),
            });
        }
        Ok(slice)
    }

    pub fn check_slice_size_atleast<'a>(
        slice: &'a [u8],
        expected_len: usize,
        arg_name: &'static str,
    ) -> Result<&'a [u8], InternalPakeError> {
        if slice.len() < expected_len {
            return Err(InternalPakeError::SizeError {
                name: arg_name,
                len: expected_len,
                actual_len: slice.len(),
            });
        }
        Ok(slice)
    }
}
