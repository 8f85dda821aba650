// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Contains the messages used for OPAQUE

use crate::{
    ciphersuite::CipherSuite,
    envelope::Envelope,
    errors::{
        utils::{check_slice_size, check_slice_size_atleast},
        ProtocolError,
    },
    group::Group,
    key_exchange::traits::{FromBytes, KeyExchange, ToBytes},
    keypair::{KeyPair, SizedBytes},
};
use generic_array::{typenum::Unsigned, GenericArray};
use std::convert::TryFrom;

type Ke1Message<CS> = <<CS as CipherSuite>::KeyExchange as KeyExchange<
    <CS as CipherSuite>::Hash,
    <CS as CipherSuite>::KeyFormat,
>>::KE1Message;
type Ke2Message<CS> = <<CS as CipherSuite>::KeyExchange as KeyExchange<
    <CS as CipherSuite>::Hash,
    <CS as CipherSuite>::KeyFormat,
>>::KE2Message;
type Ke3Message<CS> = <<CS as CipherSuite>::KeyExchange as KeyExchange<
    <CS as CipherSuite>::Hash,
    <CS as CipherSuite>::KeyFormat,
>>::KE3Message;

fn elem_len<CS: CipherSuite>() -> usize {
    <CS::Group as Group>::ElemLen::to_usize()
}

fn key_len<CS: CipherSuite>() -> usize {
    <<CS::KeyFormat as KeyPair>::Repr as SizedBytes>::Len::to_usize()
}

fn ke2_message_len<CS: CipherSuite>() -> usize {
    <CS::KeyExchange as KeyExchange<CS::Hash, CS::KeyFormat>>::ke2_message_size()
}

/// The message sent by the client to the server to initiate registration:
/// the blinded password
pub struct RegistrationRequest<CS: CipherSuite> {
    pub(crate) alpha: CS::Group,
}

impl_clone_for!(struct RegistrationRequest<CS: CipherSuite>, [alpha], [CS::Group]);
impl_debug_eq_hash_for!(struct RegistrationRequest<CS: CipherSuite>, [alpha], [CS::Group]);

impl<CS: CipherSuite> RegistrationRequest<CS> {
    /// Byte representation of the message
    pub fn serialize(&self) -> Vec<u8> {
        self.alpha.to_arr().to_vec()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let checked_bytes = check_slice_size(input, elem_len::<CS>(), "registration_request")?;
        Ok(Self {
            alpha: CS::Group::from_element_slice(GenericArray::from_slice(checked_bytes))?,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for RegistrationRequest<CS> {
    type Error = ProtocolError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The server's answer to a registration request: the evaluated element and
/// the server public key the envelope will be sealed against
pub struct RegistrationResponse<CS: CipherSuite> {
    pub(crate) beta: CS::Group,
    pub(crate) server_s_pk: <CS::KeyFormat as KeyPair>::Repr,
}

impl_clone_for!(
    struct RegistrationResponse<CS: CipherSuite>,
    [beta, server_s_pk],
    [CS::Group, <CS::KeyFormat as KeyPair>::Repr],
);
impl_debug_eq_hash_for!(
    struct RegistrationResponse<CS: CipherSuite>,
    [beta, server_s_pk],
    [CS::Group, <CS::KeyFormat as KeyPair>::Repr],
);

impl<CS: CipherSuite> RegistrationResponse<CS> {
    /// Byte representation of the message
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.beta.to_arr()[..],
            &self.server_s_pk.to_arr()[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let elem_len = elem_len::<CS>();
        let checked_bytes = check_slice_size(
            input,
            elem_len + key_len::<CS>(),
            "registration_response",
        )?;
        Ok(Self {
            beta: CS::Group::from_element_slice(GenericArray::from_slice(
                &checked_bytes[..elem_len],
            ))?,
            server_s_pk: <CS::KeyFormat as KeyPair>::Repr::from_arr(GenericArray::from_slice(
                &checked_bytes[elem_len..],
            ))?,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for RegistrationResponse<CS> {
    type Error = ProtocolError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The final registration message from the client: the sealed envelope and
/// the client's long-term public key, to be stored in the password file
pub struct RegistrationUpload<CS: CipherSuite> {
    pub(crate) envelope: Envelope<CS::Hash>,
    pub(crate) client_s_pk: <CS::KeyFormat as KeyPair>::Repr,
}

impl_clone_for!(
    struct RegistrationUpload<CS: CipherSuite>,
    [envelope, client_s_pk],
    [<CS::KeyFormat as KeyPair>::Repr],
);
impl_debug_eq_hash_for!(
    struct RegistrationUpload<CS: CipherSuite>,
    [envelope, client_s_pk],
    [<CS::KeyFormat as KeyPair>::Repr],
);

impl<CS: CipherSuite> RegistrationUpload<CS> {
    /// Byte representation of the message
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.envelope.to_bytes()[..],
            &self.client_s_pk.to_arr()[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let key_len = key_len::<CS>();
        let envelope_len = Envelope::<CS::Hash>::envelope_size(key_len);
        let checked_bytes =
            check_slice_size(input, envelope_len + key_len, "registration_upload")?;
        Ok(Self {
            envelope: Envelope::<CS::Hash>::from_bytes(&checked_bytes[..envelope_len], key_len)?,
            client_s_pk: <CS::KeyFormat as KeyPair>::Repr::from_arr(GenericArray::from_slice(
                &checked_bytes[envelope_len..],
            ))?,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for RegistrationUpload<CS> {
    type Error = ProtocolError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The message sent by the client to initiate the credential exchange: the
/// blinded password along with the first key exchange message
pub struct CredentialRequest<CS: CipherSuite> {
    pub(crate) alpha: CS::Group,
    pub(crate) ke1_message: Ke1Message<CS>,
}

impl_clone_for!(
    struct CredentialRequest<CS: CipherSuite>,
    [alpha, ke1_message],
    [CS::Group, Ke1Message<CS>],
);
impl_debug_eq_hash_for!(
    struct CredentialRequest<CS: CipherSuite>,
    [alpha, ke1_message],
    [CS::Group, Ke1Message<CS>],
);

impl<CS: CipherSuite> CredentialRequest<CS> {
    /// Byte representation of the message
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.alpha.to_arr()[..],
            &self.ke1_message.to_bytes()[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let elem_len = elem_len::<CS>();
        // the ke1 message performs its own exact size check on the remainder
        let checked_bytes = check_slice_size_atleast(input, elem_len, "credential_request")?;
        Ok(Self {
            alpha: CS::Group::from_element_slice(GenericArray::from_slice(
                &checked_bytes[..elem_len],
            ))?,
            ke1_message: Ke1Message::<CS>::from_bytes(&checked_bytes[elem_len..])?,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for CredentialRequest<CS> {
    type Error = ProtocolError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The server's answer to a credential request: the evaluated element, the
/// stored envelope, and the second key exchange message
pub struct CredentialResponse<CS: CipherSuite> {
    pub(crate) beta: CS::Group,
    pub(crate) envelope: Envelope<CS::Hash>,
    pub(crate) ke2_message: Ke2Message<CS>,
}

impl_clone_for!(
    struct CredentialResponse<CS: CipherSuite>,
    [beta, envelope, ke2_message],
    [CS::Group, Ke2Message<CS>],
);
impl_debug_eq_hash_for!(
    struct CredentialResponse<CS: CipherSuite>,
    [beta, envelope, ke2_message],
    [CS::Group, Ke2Message<CS>],
);

impl<CS: CipherSuite> CredentialResponse<CS> {
    /// Byte representation of the message
    pub fn serialize(&self) -> Vec<u8> {
        [
            &Self::serialize_without_ke(&self.beta, &self.envelope)[..],
            &self.ke2_message.to_bytes()[..],
        ]
        .concat()
    }

    /// The part of the message covered by the key exchange transcript: the
    /// evaluated element and the envelope
    pub(crate) fn serialize_without_ke(beta: &CS::Group, envelope: &Envelope<CS::Hash>) -> Vec<u8> {
        [&beta.to_arr()[..], &envelope.to_bytes()[..]].concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let elem_len = elem_len::<CS>();
        let key_len = key_len::<CS>();
        let envelope_len = Envelope::<CS::Hash>::envelope_size(key_len);
        let checked_bytes = check_slice_size(
            input,
            elem_len + envelope_len + ke2_message_len::<CS>(),
            "credential_response",
        )?;
        Ok(Self {
            beta: CS::Group::from_element_slice(GenericArray::from_slice(
                &checked_bytes[..elem_len],
            ))?,
            envelope: Envelope::<CS::Hash>::from_bytes(
                &checked_bytes[elem_len..elem_len + envelope_len],
                key_len,
            )?,
            ke2_message: Ke2Message::<CS>::from_bytes(&checked_bytes[elem_len + envelope_len..])?,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for CredentialResponse<CS> {
    type Error = ProtocolError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The final message of the credential exchange, from client to server: the
/// client's confirmation MAC
pub struct CredentialFinalization<CS: CipherSuite> {
    pub(crate) ke3_message: Ke3Message<CS>,
}

impl_clone_for!(
    struct CredentialFinalization<CS: CipherSuite>,
    [ke3_message],
    [Ke3Message<CS>],
);
impl_debug_eq_hash_for!(
    struct CredentialFinalization<CS: CipherSuite>,
    [ke3_message],
    [Ke3Message<CS>],
);

impl<CS: CipherSuite> CredentialFinalization<CS> {
    /// Byte representation of the message
    pub fn serialize(&self) -> Vec<u8> {
        self.ke3_message.to_bytes()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            ke3_message: Ke3Message::<CS>::from_bytes(input)?,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for CredentialFinalization<CS> {
    type Error = ProtocolError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}
