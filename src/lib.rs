// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the OPAQUE augmented password-authenticated key
//! exchange protocol
//!
//! Note: This implementation is meant to be used for prototyping purposes
//! and should not be considered production-ready until it has received an
//! independent security review.
//!
//! # Overview
//!
//! OPAQUE is a protocol between a client and a server. They must first run
//! the registration flow, once per password, so the server can store a
//! per-user record called the password file. Afterwards, the client and
//! server can run the login flow any number of times; a successful login
//! ends with both sides holding the same fresh session key, and the client
//! additionally holding an export key the server never sees.
//!
//! The password itself never leaves the client: the server only ever
//! operates on a blinded form of it, through an oblivious pseudorandom
//! function (OPRF).
//!
//! # Setup
//!
//! To use this library, the consumer must first settle on a cipher suite,
//! which fixes the prime-order group used by the OPRF, the keypair format
//! for the key exchange, the key exchange protocol itself, the hash
//! function, and the slow hash applied to the OPRF output:
//!
//! ```
//! use opaque_pake::ciphersuite::CipherSuite;
//! struct Default;
//! impl CipherSuite for Default {
//!     type Group = curve25519_dalek::ristretto::RistrettoPoint;
//!     type KeyFormat = opaque_pake::keypair::X25519KeyPair;
//!     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDH;
//!     type Hash = sha2::Sha512;
//!     type SlowHash = opaque_pake::slow_hash::NoOpHash;
//! }
//! ```
//!
//! A deployment should gate the `slow-hash` feature and use
//! `scrypt::ScryptParams` as the `SlowHash` instead of `NoOpHash`, so that
//! an attacker who compromises the password file cannot run an offline
//! dictionary attack at hash speed.
//!
//! # Registration
//!
//! The registration flow is a four-step protocol producing the password
//! file. It must be run over an authenticated channel; the flow offers no
//! protection against an active attacker standing in for the server.
//!
//! ```
//! # use opaque_pake::ciphersuite::CipherSuite;
//! # struct Default;
//! # impl CipherSuite for Default {
//! #     type Group = curve25519_dalek::ristretto::RistrettoPoint;
//! #     type KeyFormat = opaque_pake::keypair::X25519KeyPair;
//! #     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDH;
//! #     type Hash = sha2::Sha512;
//! #     type SlowHash = opaque_pake::slow_hash::NoOpHash;
//! # }
//! use opaque_pake::{
//!     ClientRegistration, ClientRegistrationFinishParameters, ServerKeyConfig,
//!     ServerRegistration,
//! };
//! use rand_core::OsRng;
//!
//! let mut rng = OsRng;
//!
//! // Step 1: the client blinds its password
//! let client_start = ClientRegistration::<Default>::start(&mut rng, b"hunter2")?;
//!
//! // Step 2: the server evaluates the OPRF under a fresh per-user key
//! let server_start = ServerRegistration::<Default>::start(
//!     &mut rng,
//!     client_start.message,
//!     ServerKeyConfig::Ephemeral,
//! )?;
//!
//! // Step 3: the client unblinds the evaluation and seals its envelope
//! let client_finish = client_start.state.finish(
//!     &mut rng,
//!     server_start.message,
//!     ClientRegistrationFinishParameters::default(),
//! )?;
//!
//! // Step 4: the server stores the password file
//! let password_file = server_start.state.finish(client_finish.message)?;
//! let record_bytes = password_file.serialize();
//! # Ok::<(), opaque_pake::errors::ProtocolError>(())
//! ```
//!
//! A deployment with a single long-term server keypair passes
//! `ServerKeyConfig::Persistent(private_key)` instead, in which case the
//! same key is recorded in every password file.
//!
//! # Login
//!
//! The login flow is also four steps, bracketing a triple Diffie-Hellman
//! key exchange. Unlike registration it needs no secure channel: the
//! protocol itself authenticates both sides against the registered
//! password.
//!
//! ```
//! # use opaque_pake::ciphersuite::CipherSuite;
//! # struct Default;
//! # impl CipherSuite for Default {
//! #     type Group = curve25519_dalek::ristretto::RistrettoPoint;
//! #     type KeyFormat = opaque_pake::keypair::X25519KeyPair;
//! #     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDH;
//! #     type Hash = sha2::Sha512;
//! #     type SlowHash = opaque_pake::slow_hash::NoOpHash;
//! # }
//! # use opaque_pake::{
//! #     ClientRegistrationFinishParameters, ServerKeyConfig,
//! # };
//! use opaque_pake::{
//!     register, ClientLogin, ClientLoginFinishParameters, ServerLogin,
//!     ServerLoginStartParameters,
//! };
//! use rand_core::OsRng;
//!
//! let mut rng = OsRng;
//! # let (password_file, _) = register::<Default, _>(
//! #     &mut rng,
//! #     b"hunter2",
//! #     ServerKeyConfig::Ephemeral,
//! #     ClientRegistrationFinishParameters::default(),
//! # )?;
//!
//! // Step 1: the client blinds its password and opens the key exchange
//! let client_start = ClientLogin::<Default>::start(&mut rng, b"hunter2")?;
//!
//! // Step 2: the server answers from the stored password file
//! let server_start = ServerLogin::start(
//!     &mut rng,
//!     &password_file,
//!     client_start.message,
//!     ServerLoginStartParameters::default(),
//! )?;
//!
//! // Step 3: the client recovers its credentials and derives the session key
//! let client_finish = client_start.state.finish(
//!     server_start.message,
//!     ClientLoginFinishParameters::default(),
//! )?;
//!
//! // Step 4: the server checks the confirmation and derives the same key
//! let server_finish = server_start.state.finish(client_finish.message)?;
//! assert_eq!(client_finish.session_key, server_finish.session_key);
//! # Ok::<(), opaque_pake::errors::ProtocolError>(())
//! ```
//!
//! A client supplying the wrong password fails at step 3 with
//! [`errors::PakeError::InvalidLoginError`]; the server cannot tell a wrong
//! password from a client that never completed the flow.
//!
//! For deployments that provision accounts out of band, [`register`] runs
//! the whole registration locally from a known password.

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod impls;

pub mod ciphersuite;
pub mod errors;
pub mod group;
pub mod hash;
pub mod key_exchange;
pub mod keypair;
pub mod map_to_curve;
pub mod slow_hash;

mod envelope;
mod key_derivation;
mod messages;
mod opaque;
mod oprf;
mod serialization;

#[cfg(test)]
mod tests;

pub use crate::messages::{
    CredentialFinalization, CredentialRequest, CredentialResponse, RegistrationRequest,
    RegistrationResponse, RegistrationUpload,
};
pub use crate::opaque::{
    register, ClientLogin, ClientLoginFinishParameters, ClientLoginFinishResult,
    ClientLoginStartResult, ClientRegistration, ClientRegistrationFinishParameters,
    ClientRegistrationFinishResult, ClientRegistrationStartResult, Identifiers, PasswordFile,
    ServerKeyConfig, ServerLogin, ServerLoginFinishResult, ServerLoginStartParameters,
    ServerLoginStartResult, ServerRegistration, ServerRegistrationStartResult,
};
