// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Provides the main OPAQUE API: the registration and credential exchange
//! state machines

use crate::{
    ciphersuite::CipherSuite,
    envelope::Envelope,
    errors::{
        utils::{check_slice_size, check_slice_size_atleast},
        InternalPakeError, PakeError, ProtocolError,
    },
    group::Group,
    key_derivation::derive_randomized_pwd,
    key_exchange::traits::{FromBytes, KeyExchange, ToBytes},
    keypair::{KeyPair, SizedBytes},
    messages::{
        CredentialFinalization, CredentialRequest, CredentialResponse, RegistrationRequest,
        RegistrationResponse, RegistrationUpload,
    },
    oprf,
    serialization::tokenize,
};
use digest::Digest;
use generic_array::{typenum::Unsigned, GenericArray};
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

type KeyFormatRepr<CS> = <<CS as CipherSuite>::KeyFormat as KeyPair>::Repr;
type KeyExchangeOf<CS> = <CS as CipherSuite>::KeyExchange;
type Ke1StateOf<CS> = <KeyExchangeOf<CS> as KeyExchange<
    <CS as CipherSuite>::Hash,
    <CS as CipherSuite>::KeyFormat,
>>::KE1State;
type Ke2StateOf<CS> = <KeyExchangeOf<CS> as KeyExchange<
    <CS as CipherSuite>::Hash,
    <CS as CipherSuite>::KeyFormat,
>>::KE2State;
type ExportKey<CS> = GenericArray<u8, <<CS as CipherSuite>::Hash as Digest>::OutputSize>;

// Leading tag byte on serialized session states, so a blob replayed into an
// operation from a different phase is rejected instead of misparsed
const CLIENT_REGISTRATION_TAG: u8 = 1;
const CLIENT_LOGIN_TAG: u8 = 2;
const SERVER_REGISTRATION_TAG: u8 = 3;
const SERVER_LOGIN_TAG: u8 = 4;

fn check_state_tag(input: &[u8], expected: u8) -> Result<&[u8], ProtocolError> {
    let checked_bytes = check_slice_size_atleast(input, 1, "state_tag")?;
    if checked_bytes[0] != expected {
        return Err(PakeError::InvalidStateError.into());
    }
    Ok(&checked_bytes[1..])
}

/// Optional identity strings for the two parties. When absent, each party is
/// identified by its long-term public key
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Identifiers<'a> {
    /// The client identity, e.g. a username
    pub client: Option<&'a [u8]>,
    /// The server identity, e.g. a domain name
    pub server: Option<&'a [u8]>,
}

/// Optional parameters for the client's registration finish
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ClientRegistrationFinishParameters<'a> {
    /// Identity strings sealed into the envelope
    pub identifiers: Identifiers<'a>,
}

/// Optional parameters for the server's login start
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ServerLoginStartParameters<'a> {
    /// Shared context bytes bound into the key exchange transcript
    pub context: &'a [u8],
    /// Identity strings; must match what registration sealed
    pub identifiers: Identifiers<'a>,
}

/// Optional parameters for the client's login finish
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ClientLoginFinishParameters<'a> {
    /// Shared context bytes bound into the key exchange transcript
    pub context: &'a [u8],
    /// Identity strings; must match what registration sealed
    pub identifiers: Identifiers<'a>,
}

/// The server's long-term key material for a registration
pub enum ServerKeyConfig<CS: CipherSuite> {
    /// Use an existing private key, shared across all registrations
    Persistent(KeyFormatRepr<CS>),
    /// Generate a fresh keypair for this registration only
    Ephemeral,
}

// ===========================
// Registration, client side
// ===========================

/// The state elements the client holds between the start and finish of its
/// registration
pub struct ClientRegistration<CS: CipherSuite> {
    token: oprf::Token<CS::Group>,
    alpha: CS::Group,
}

impl_debug_eq_hash_for!(
    struct ClientRegistration<CS: CipherSuite>,
    [token, alpha],
    [oprf::Token<CS::Group>, CS::Group],
);

/// The output of [`ClientRegistration::start`]
pub struct ClientRegistrationStartResult<CS: CipherSuite> {
    /// The first registration message, to be sent to the server
    pub message: RegistrationRequest<CS>,
    /// The state to be retained until [`ClientRegistration::finish`]
    pub state: ClientRegistration<CS>,
}

/// The output of [`ClientRegistration::finish`]
pub struct ClientRegistrationFinishResult<CS: CipherSuite> {
    /// The final registration message, to be sent to the server
    pub message: RegistrationUpload<CS>,
    /// A key the client may use to encrypt additional data, never seen by
    /// the server
    pub export_key: ExportKey<CS>,
}

impl<CS: CipherSuite> ClientRegistration<CS> {
    /// Returns an initial registration request and the client state, given
    /// the client's password
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        password: &[u8],
    ) -> Result<ClientRegistrationStartResult<CS>, ProtocolError> {
        let (token, alpha) = oprf::blind::<R, CS::Group, CS::Hash>(password, rng)?;
        Ok(ClientRegistrationStartResult {
            message: RegistrationRequest { alpha },
            state: Self { token, alpha },
        })
    }

    /// Consumes the server's response to produce the envelope upload and the
    /// export key
    pub fn finish<R: RngCore + CryptoRng>(
        self,
        rng: &mut R,
        response: RegistrationResponse<CS>,
        params: ClientRegistrationFinishParameters<'_>,
    ) -> Result<ClientRegistrationFinishResult<CS>, ProtocolError> {
        check_beta_not_reflected::<CS>(&self.alpha, &response.beta)?;

        let oprf_output =
            oprf::finalize::<CS::Group, CS::Hash>(&self.token.data, &self.token.blind, response.beta)?;
        let rwd_hkdf = derive_randomized_pwd::<CS::Hash, CS::SlowHash>(oprf_output)?;

        let server_s_pk =
            <CS::KeyFormat as KeyPair>::check_public_key(response.server_s_pk)?;
        let client_kp = CS::KeyFormat::generate_random(rng)?;

        let client_s_pk_bytes = client_kp.public().to_arr().to_vec();
        let server_s_pk_bytes = server_s_pk.to_arr().to_vec();
        let id_u = params.identifiers.client.unwrap_or(&client_s_pk_bytes);
        let id_s = params.identifiers.server.unwrap_or(&server_s_pk_bytes);

        let (envelope, export_key) = Envelope::<CS::Hash>::seal::<R, CS::KeyFormat>(
            rng,
            &rwd_hkdf,
            client_kp.private(),
            &server_s_pk,
            id_u,
            id_s,
        )?;

        Ok(ClientRegistrationFinishResult {
            message: RegistrationUpload {
                envelope,
                client_s_pk: client_kp.public().clone(),
            },
            export_key,
        })
    }

    /// Byte representation of the client registration state
    pub fn serialize(&self) -> Vec<u8> {
        [
            &[CLIENT_REGISTRATION_TAG][..],
            &CS::Group::scalar_as_bytes(&self.token.blind)[..],
            &self.alpha.to_arr()[..],
            &self.token.data[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let untagged = check_state_tag(input, CLIENT_REGISTRATION_TAG)?;
        let scalar_len = <CS::Group as Group>::ScalarLen::to_usize();
        let elem_len = <CS::Group as Group>::ElemLen::to_usize();
        let checked_bytes =
            check_slice_size_atleast(untagged, scalar_len + elem_len, "client_registration")?;

        let blind = CS::Group::from_scalar_slice(GenericArray::from_slice(
            &checked_bytes[..scalar_len],
        ))?;
        let alpha = CS::Group::from_element_slice(GenericArray::from_slice(
            &checked_bytes[scalar_len..scalar_len + elem_len],
        ))?;
        Ok(Self {
            token: oprf::Token {
                data: checked_bytes[scalar_len + elem_len..].to_vec(),
                blind,
            },
            alpha,
        })
    }
}

// ===========================
// Registration, server side
// ===========================

/// The state elements the server holds between issuing its registration
/// response and receiving the client's upload
pub struct ServerRegistration<CS: CipherSuite> {
    oprf_key: <CS::Group as Group>::Scalar,
    server_s_sk: KeyFormatRepr<CS>,
    server_s_pk: KeyFormatRepr<CS>,
}

impl_debug_eq_hash_for!(
    struct ServerRegistration<CS: CipherSuite>,
    [oprf_key, server_s_sk, server_s_pk],
    [<CS::Group as Group>::Scalar, KeyFormatRepr<CS>],
);

impl<CS: CipherSuite> Zeroize for ServerRegistration<CS> {
    fn zeroize(&mut self) {
        self.oprf_key.zeroize();
        self.server_s_sk.zeroize();
    }
}

impl<CS: CipherSuite> Drop for ServerRegistration<CS> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// The output of [`ServerRegistration::start`]
pub struct ServerRegistrationStartResult<CS: CipherSuite> {
    /// The registration response, to be sent to the client
    pub message: RegistrationResponse<CS>,
    /// The state to be retained until [`ServerRegistration::finish`]
    pub state: ServerRegistration<CS>,
}

impl<CS: CipherSuite> ServerRegistration<CS> {
    /// From the client's blinded password, evaluate the OPRF under a freshly
    /// sampled per-user key and attach the server public key the client will
    /// seal its envelope against
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        message: RegistrationRequest<CS>,
        key_config: ServerKeyConfig<CS>,
    ) -> Result<ServerRegistrationStartResult<CS>, ProtocolError> {
        let oprf_key = CS::Group::random_nonzero_scalar(rng)?;
        let beta = oprf::evaluate::<CS::Group>(message.alpha, &oprf_key)?;

        let (server_s_sk, server_s_pk) = match key_config {
            ServerKeyConfig::Persistent(sk) => {
                let pk = CS::KeyFormat::public_from_private(&sk);
                (sk, pk)
            }
            ServerKeyConfig::Ephemeral => {
                let kp = CS::KeyFormat::generate_random(rng)?;
                (kp.private().clone(), kp.public().clone())
            }
        };

        Ok(ServerRegistrationStartResult {
            message: RegistrationResponse {
                beta,
                server_s_pk: server_s_pk.clone(),
            },
            state: Self {
                oprf_key,
                server_s_sk,
                server_s_pk,
            },
        })
    }

    /// Consumes the client's upload to produce the password file to be
    /// stored for this user
    pub fn finish(self, message: RegistrationUpload<CS>) -> Result<PasswordFile<CS>, ProtocolError> {
        let client_s_pk = <CS::KeyFormat as KeyPair>::check_public_key(message.client_s_pk)?;
        Ok(PasswordFile {
            oprf_key: self.oprf_key.clone(),
            server_s_sk: self.server_s_sk.clone(),
            server_s_pk: self.server_s_pk.clone(),
            client_s_pk,
            envelope: message.envelope,
        })
    }

    /// Byte representation of the server registration state
    pub fn serialize(&self) -> Vec<u8> {
        [
            &[SERVER_REGISTRATION_TAG][..],
            &CS::Group::scalar_as_bytes(&self.oprf_key)[..],
            &self.server_s_sk.to_arr()[..],
            &self.server_s_pk.to_arr()[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let untagged = check_state_tag(input, SERVER_REGISTRATION_TAG)?;
        let scalar_len = <CS::Group as Group>::ScalarLen::to_usize();
        let key_len = <KeyFormatRepr<CS> as SizedBytes>::Len::to_usize();
        let checked_bytes = check_slice_size(
            untagged,
            scalar_len + key_len + key_len,
            "server_registration",
        )?;

        Ok(Self {
            oprf_key: CS::Group::from_scalar_slice(GenericArray::from_slice(
                &checked_bytes[..scalar_len],
            ))?,
            server_s_sk: KeyFormatRepr::<CS>::from_arr(GenericArray::from_slice(
                &checked_bytes[scalar_len..scalar_len + key_len],
            ))?,
            server_s_pk: KeyFormatRepr::<CS>::from_arr(GenericArray::from_slice(
                &checked_bytes[scalar_len + key_len..],
            ))?,
        })
    }
}

/// The per-user record the server stores: the OPRF key, the server keypair
/// recorded for this user, the client's long-term public key, and the
/// client's sealed envelope
pub struct PasswordFile<CS: CipherSuite> {
    pub(crate) oprf_key: <CS::Group as Group>::Scalar,
    pub(crate) server_s_sk: KeyFormatRepr<CS>,
    pub(crate) server_s_pk: KeyFormatRepr<CS>,
    pub(crate) client_s_pk: KeyFormatRepr<CS>,
    pub(crate) envelope: Envelope<CS::Hash>,
}

impl_clone_for!(
    struct PasswordFile<CS: CipherSuite>,
    [oprf_key, server_s_sk, server_s_pk, client_s_pk, envelope],
    [<CS::Group as Group>::Scalar, KeyFormatRepr<CS>],
);
impl_debug_eq_hash_for!(
    struct PasswordFile<CS: CipherSuite>,
    [oprf_key, server_s_sk, server_s_pk, client_s_pk, envelope],
    [<CS::Group as Group>::Scalar, KeyFormatRepr<CS>],
);

impl<CS: CipherSuite> Zeroize for PasswordFile<CS> {
    fn zeroize(&mut self) {
        self.oprf_key.zeroize();
        self.server_s_sk.zeroize();
    }
}

impl<CS: CipherSuite> Drop for PasswordFile<CS> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<CS: CipherSuite> PasswordFile<CS> {
    /// Byte representation of the password file
    pub fn serialize(&self) -> Vec<u8> {
        [
            &CS::Group::scalar_as_bytes(&self.oprf_key)[..],
            &self.server_s_sk.to_arr()[..],
            &self.server_s_pk.to_arr()[..],
            &self.client_s_pk.to_arr()[..],
            &self.envelope.to_bytes()[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let scalar_len = <CS::Group as Group>::ScalarLen::to_usize();
        let key_len = <KeyFormatRepr<CS> as SizedBytes>::Len::to_usize();
        let envelope_len = Envelope::<CS::Hash>::envelope_size(key_len);
        let checked_bytes = check_slice_size(
            input,
            scalar_len + 3 * key_len + envelope_len,
            "password_file",
        )?;

        let mut offset = 0;
        let oprf_key = CS::Group::from_scalar_slice(GenericArray::from_slice(
            &checked_bytes[offset..offset + scalar_len],
        ))?;
        offset += scalar_len;
        let server_s_sk = KeyFormatRepr::<CS>::from_arr(GenericArray::from_slice(
            &checked_bytes[offset..offset + key_len],
        ))?;
        offset += key_len;
        let server_s_pk = KeyFormatRepr::<CS>::from_arr(GenericArray::from_slice(
            &checked_bytes[offset..offset + key_len],
        ))?;
        offset += key_len;
        let client_s_pk = KeyFormatRepr::<CS>::from_arr(GenericArray::from_slice(
            &checked_bytes[offset..offset + key_len],
        ))?;
        offset += key_len;
        let envelope = Envelope::<CS::Hash>::from_bytes(&checked_bytes[offset..], key_len)?;

        Ok(Self {
            oprf_key,
            server_s_sk,
            server_s_pk,
            client_s_pk,
            envelope,
        })
    }
}

// ===========================
// Login, client side
// ===========================

/// The state elements the client holds between the start and finish of its
/// credential exchange
pub struct ClientLogin<CS: CipherSuite> {
    token: oprf::Token<CS::Group>,
    alpha: CS::Group,
    ke1_state: Ke1StateOf<CS>,
    serialized_credential_request: Vec<u8>,
}

impl_debug_eq_hash_for!(
    struct ClientLogin<CS: CipherSuite>,
    [token, alpha, ke1_state, serialized_credential_request],
    [oprf::Token<CS::Group>, CS::Group, Ke1StateOf<CS>],
);

/// The output of [`ClientLogin::start`]
pub struct ClientLoginStartResult<CS: CipherSuite> {
    /// The credential request, to be sent to the server
    pub message: CredentialRequest<CS>,
    /// The state to be retained until [`ClientLogin::finish`]
    pub state: ClientLogin<CS>,
}

/// The output of [`ClientLogin::finish`]
pub struct ClientLoginFinishResult<CS: CipherSuite> {
    /// The confirmation message, to be sent to the server
    pub message: CredentialFinalization<CS>,
    /// The shared session key
    pub session_key: Vec<u8>,
    /// A key the client may use to encrypt additional data, never seen by
    /// the server
    pub export_key: ExportKey<CS>,
    /// The server public key recovered from the envelope
    pub server_s_pk: KeyFormatRepr<CS>,
}

impl<CS: CipherSuite> ClientLogin<CS> {
    /// Returns an initial credential request and the client state, given the
    /// client's password
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        password: &[u8],
    ) -> Result<ClientLoginStartResult<CS>, ProtocolError> {
        let (token, alpha) = oprf::blind::<R, CS::Group, CS::Hash>(password, rng)?;
        let (ke1_state, ke1_message) =
            <KeyExchangeOf<CS> as KeyExchange<CS::Hash, CS::KeyFormat>>::generate_ke1(rng)?;

        let message = CredentialRequest {
            alpha,
            ke1_message,
        };
        let serialized_credential_request = message.serialize();

        Ok(ClientLoginStartResult {
            message,
            state: Self {
                token,
                alpha,
                ke1_state,
                serialized_credential_request,
            },
        })
    }

    /// Consumes the server's response to recover the credentials and derive
    /// the session key. A wrong password surfaces as
    /// `PakeError::InvalidLoginError`, indistinguishable from a tampered
    /// envelope
    pub fn finish(
        self,
        message: CredentialResponse<CS>,
        params: ClientLoginFinishParameters<'_>,
    ) -> Result<ClientLoginFinishResult<CS>, ProtocolError> {
        check_beta_not_reflected::<CS>(&self.alpha, &message.beta)?;

        let oprf_output =
            oprf::finalize::<CS::Group, CS::Hash>(&self.token.data, &self.token.blind, message.beta)?;
        let rwd_hkdf = derive_randomized_pwd::<CS::Hash, CS::SlowHash>(oprf_output)?;

        let opened = message
            .envelope
            .open::<CS::KeyFormat>(
                &rwd_hkdf,
                params.identifiers.client,
                params.identifiers.server,
            )
            .map_err(|e| match e {
                ProtocolError::VerificationError(PakeError::CryptoError(
                    InternalPakeError::SealOpenHmacError,
                )) => ProtocolError::from(PakeError::InvalidLoginError),
                err => err,
            })?;

        let client_s_pk_bytes = opened.client_s_pk.to_arr().to_vec();
        let server_s_pk_bytes = opened.server_s_pk.to_arr().to_vec();
        let id_u = params.identifiers.client.unwrap_or(&client_s_pk_bytes);
        let id_s = params.identifiers.server.unwrap_or(&server_s_pk_bytes);

        let l2_component =
            CredentialResponse::<CS>::serialize_without_ke(&message.beta, &message.envelope);

        let (session_key, ke3_message) =
            <KeyExchangeOf<CS> as KeyExchange<CS::Hash, CS::KeyFormat>>::generate_ke3(
            &l2_component,
            message.ke2_message,
            &self.ke1_state,
            &self.serialized_credential_request,
            opened.server_s_pk.clone(),
            opened.client_s_sk,
            id_u,
            id_s,
            params.context,
        )?;

        Ok(ClientLoginFinishResult {
            message: CredentialFinalization { ke3_message },
            session_key,
            export_key: opened.export_key,
            server_s_pk: opened.server_s_pk,
        })
    }

    /// Byte representation of the client login state
    pub fn serialize(&self) -> Vec<u8> {
        [
            &[CLIENT_LOGIN_TAG][..],
            &CS::Group::scalar_as_bytes(&self.token.blind)[..],
            &self.alpha.to_arr()[..],
            &self.ke1_state.to_bytes()[..],
            // the credential request has a fixed size which fits the prefix
            &(self.serialized_credential_request.len() as u16).to_be_bytes()[..],
            &self.serialized_credential_request[..],
            &self.token.data[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let untagged = check_state_tag(input, CLIENT_LOGIN_TAG)?;
        let scalar_len = <CS::Group as Group>::ScalarLen::to_usize();
        let elem_len = <CS::Group as Group>::ElemLen::to_usize();
        let ke1_state_len =
            <KeyExchangeOf<CS> as KeyExchange<CS::Hash, CS::KeyFormat>>::ke1_state_size();
        let checked_bytes = check_slice_size_atleast(
            untagged,
            scalar_len + elem_len + ke1_state_len,
            "client_login",
        )?;

        let blind = CS::Group::from_scalar_slice(GenericArray::from_slice(
            &checked_bytes[..scalar_len],
        ))?;
        let alpha = CS::Group::from_element_slice(GenericArray::from_slice(
            &checked_bytes[scalar_len..scalar_len + elem_len],
        ))?;
        let ke1_state = Ke1StateOf::<CS>::from_bytes(
            &checked_bytes[scalar_len + elem_len..scalar_len + elem_len + ke1_state_len],
        )?;
        let (serialized_credential_request, password) =
            tokenize(&checked_bytes[scalar_len + elem_len + ke1_state_len..], 2)?;

        Ok(Self {
            token: oprf::Token {
                data: password,
                blind,
            },
            alpha,
            ke1_state,
            serialized_credential_request,
        })
    }
}

// ===========================
// Login, server side
// ===========================

/// The state elements the server holds between sending its credential
/// response and receiving the client's confirmation
pub struct ServerLogin<CS: CipherSuite> {
    ke2_state: Ke2StateOf<CS>,
}

impl_debug_eq_hash_for!(
    struct ServerLogin<CS: CipherSuite>,
    [ke2_state],
    [Ke2StateOf<CS>],
);

/// The output of [`ServerLogin::start`]
pub struct ServerLoginStartResult<CS: CipherSuite> {
    /// The credential response, to be sent to the client
    pub message: CredentialResponse<CS>,
    /// The state to be retained until [`ServerLogin::finish`]
    pub state: ServerLogin<CS>,
}

/// The output of [`ServerLogin::finish`]
pub struct ServerLoginFinishResult {
    /// The shared session key
    pub session_key: Vec<u8>,
}

impl<CS: CipherSuite> ServerLogin<CS> {
    /// From the client's credential request and the user's password file,
    /// evaluate the OPRF, echo the stored envelope, and run the server side
    /// of the key exchange
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        password_file: &PasswordFile<CS>,
        message: CredentialRequest<CS>,
        params: ServerLoginStartParameters<'_>,
    ) -> Result<ServerLoginStartResult<CS>, ProtocolError> {
        let beta = oprf::evaluate::<CS::Group>(message.alpha, &password_file.oprf_key)?;

        let client_s_pk_bytes = password_file.client_s_pk.to_arr().to_vec();
        let server_s_pk_bytes = password_file.server_s_pk.to_arr().to_vec();
        let id_u = params.identifiers.client.unwrap_or(&client_s_pk_bytes);
        let id_s = params.identifiers.server.unwrap_or(&server_s_pk_bytes);

        let serialized_credential_request = message.serialize();
        let l2_component =
            CredentialResponse::<CS>::serialize_without_ke(&beta, &password_file.envelope);

        let (ke2_state, ke2_message) =
            <KeyExchangeOf<CS> as KeyExchange<CS::Hash, CS::KeyFormat>>::generate_ke2(
            rng,
            &serialized_credential_request,
            &l2_component,
            message.ke1_message,
            password_file.client_s_pk.clone(),
            password_file.server_s_sk.clone(),
            id_u,
            id_s,
            params.context,
        )?;

        Ok(ServerLoginStartResult {
            message: CredentialResponse {
                beta,
                envelope: password_file.envelope.clone(),
                ke2_message,
            },
            state: Self { ke2_state },
        })
    }

    /// Consumes the client's confirmation to produce the session key. A
    /// client that failed to recover its credentials surfaces here as
    /// `PakeError::InvalidLoginError`
    pub fn finish(
        self,
        message: CredentialFinalization<CS>,
    ) -> Result<ServerLoginFinishResult, ProtocolError> {
        let session_key = <KeyExchangeOf<CS> as KeyExchange<CS::Hash, CS::KeyFormat>>::finish_ke(
            message.ke3_message,
            &self.ke2_state,
        )?;
        Ok(ServerLoginFinishResult { session_key })
    }

    /// Byte representation of the server login state
    pub fn serialize(&self) -> Vec<u8> {
        [&[SERVER_LOGIN_TAG][..], &self.ke2_state.to_bytes()[..]].concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let untagged = check_state_tag(input, SERVER_LOGIN_TAG)?;
        Ok(Self {
            ke2_state: Ke2StateOf::<CS>::from_bytes(untagged)?,
        })
    }
}

// ===========================
// One-shot registration
// ===========================

/// Runs all four registration steps locally, for deployments that provision
/// a user record directly from a known password instead of running the
/// interactive flow. Returns the password file and the export key
pub fn register<CS: CipherSuite, R: RngCore + CryptoRng>(
    rng: &mut R,
    password: &[u8],
    key_config: ServerKeyConfig<CS>,
    params: ClientRegistrationFinishParameters<'_>,
) -> Result<(PasswordFile<CS>, ExportKey<CS>), ProtocolError> {
    let client_start = ClientRegistration::<CS>::start(rng, password)?;
    let server_start = ServerRegistration::<CS>::start(rng, client_start.message, key_config)?;
    let client_finish = client_start
        .state
        .finish(rng, server_start.message, params)?;
    let password_file = server_start.state.finish(client_finish.message)?;
    Ok((password_file, client_finish.export_key))
}

/// Rejects an evaluation that simply mirrors the blinded element, which
/// would let a dishonest server fix the OPRF output
fn check_beta_not_reflected<CS: CipherSuite>(
    alpha: &CS::Group,
    beta: &CS::Group,
) -> Result<(), ProtocolError> {
    if alpha
        .to_arr()
        .as_slice()
        .ct_eq(beta.to_arr().as_slice())
        .unwrap_u8()
        == 1
    {
        return Err(ProtocolError::ReflectedValueError);
    }
    Ok(())
}
