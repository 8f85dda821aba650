// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The trait a key exchange protocol must satisfy to be used in the login
//! flow

use crate::{errors::ProtocolError, hash::Hash, keypair::KeyPair};
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

/// A byte serialization for the messages and states of a key exchange
pub trait ToBytes {
    /// Convert to bytes
    fn to_bytes(&self) -> Vec<u8>;
}

/// A byte deserialization for the messages and states of a key exchange
pub trait FromBytes: Sized {
    /// Convert from bytes
    fn from_bytes(input: &[u8]) -> Result<Self, ProtocolError>;
}

/// The key exchange protocol to run during the login step of OPAQUE. The
/// `l2_component` arguments carry the non-key-exchange portion of the
/// server's second message (the evaluated OPRF element and the envelope), so
/// that the transcript authenticates the whole flow
pub trait KeyExchange<D: Hash, KF: KeyPair> {
    /// The state retained by the client between its first and last message
    type KE1State: FromBytes + ToBytes + Zeroize + Clone;
    /// The state retained by the server between its message and the client's
    /// confirmation
    type KE2State: FromBytes + ToBytes + Zeroize + Clone;
    /// The first message, from client to server
    type KE1Message: FromBytes + ToBytes + Clone;
    /// The second message, from server to client
    type KE2Message: FromBytes + ToBytes + Clone;
    /// The third message, from client to server
    type KE3Message: FromBytes + ToBytes + Clone;

    /// Generate the client's ephemeral contribution
    fn generate_ke1<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<(Self::KE1State, Self::KE1Message), ProtocolError>;

    /// Generate the server's contribution and confirmation MAC
    #[allow(clippy::too_many_arguments)]
    fn generate_ke2<R: RngCore + CryptoRng>(
        rng: &mut R,
        serialized_credential_request: &[u8],
        l2_component: &[u8],
        ke1_message: Self::KE1Message,
        client_s_pk: KF::Repr,
        server_s_sk: KF::Repr,
        id_u: &[u8],
        id_s: &[u8],
        context: &[u8],
    ) -> Result<(Self::KE2State, Self::KE2Message), ProtocolError>;

    /// Verify the server's MAC and produce the session key along with the
    /// client's confirmation MAC
    #[allow(clippy::too_many_arguments)]
    fn generate_ke3(
        l2_component: &[u8],
        ke2_message: Self::KE2Message,
        ke1_state: &Self::KE1State,
        serialized_credential_request: &[u8],
        server_s_pk: KF::Repr,
        client_s_sk: KF::Repr,
        id_u: &[u8],
        id_s: &[u8],
        context: &[u8],
    ) -> Result<(Vec<u8>, Self::KE3Message), ProtocolError>;

    /// Verify the client's confirmation MAC and produce the session key
    fn finish_ke(
        ke3_message: Self::KE3Message,
        ke2_state: &Self::KE2State,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// The serialized size of KE1State
    fn ke1_state_size() -> usize;

    /// The serialized size of KE2Message
    fn ke2_message_size() -> usize;
}
