// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the Triple Diffie-Hellman key exchange protocol

use crate::{
    errors::{utils::check_slice_size, InternalPakeError, PakeError, ProtocolError},
    hash::Hash,
    key_derivation::{
        derive_secret, hkdf_expand_label, STR_CLIENT_MAC, STR_HANDSHAKE_SECRET, STR_SERVER_MAC,
        STR_SESSION_KEY,
    },
    key_exchange::traits::{FromBytes, KeyExchange, ToBytes},
    keypair::{KeyPair, SizedBytes},
    serialization::serialize,
};
use digest::Digest;
use generic_array::{typenum::Unsigned, GenericArray};
use hkdf::Hkdf;
use hmac::{Hmac, Mac, NewMac};
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

pub(crate) const NONCE_LEN: usize = 32;

static STR_3DH: &[u8] = b"OPAQUE-3DH";

/// The Triple Diffie-Hellman key exchange
pub struct TripleDH;

/// The client state produced by generate_ke1
pub struct Ke1State<KF: KeyPair> {
    client_e_sk: KF::Repr,
    client_nonce: Vec<u8>,
}

impl_clone_for!(struct Ke1State<KF: KeyPair>, [client_e_sk, client_nonce], [KF::Repr]);
impl_debug_eq_hash_for!(struct Ke1State<KF: KeyPair>, [client_e_sk, client_nonce], [KF::Repr]);

impl<KF: KeyPair> Zeroize for Ke1State<KF> {
    fn zeroize(&mut self) {
        self.client_e_sk.zeroize();
        self.client_nonce.zeroize();
    }
}

impl<KF: KeyPair> Drop for Ke1State<KF> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// The first message of the exchange, sent to the server
pub struct Ke1Message<KF: KeyPair> {
    client_nonce: Vec<u8>,
    client_e_pk: KF::Repr,
}

impl_clone_for!(struct Ke1Message<KF: KeyPair>, [client_nonce, client_e_pk], [KF::Repr]);
impl_debug_eq_hash_for!(struct Ke1Message<KF: KeyPair>, [client_nonce, client_e_pk], [KF::Repr]);

/// The server state produced by generate_ke2
pub struct Ke2State {
    km3: Vec<u8>,
    hashed_transcript: Vec<u8>,
    session_key: Vec<u8>,
}

impl_clone_for!(struct Ke2State, [km3, hashed_transcript, session_key]);
impl_debug_eq_hash_for!(struct Ke2State, [km3, hashed_transcript, session_key]);

impl Zeroize for Ke2State {
    fn zeroize(&mut self) {
        self.km3.zeroize();
        self.hashed_transcript.zeroize();
        self.session_key.zeroize();
    }
}

impl Drop for Ke2State {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// The second message of the exchange, sent to the client
pub struct Ke2Message<D: Hash, KF: KeyPair> {
    server_nonce: Vec<u8>,
    server_e_pk: KF::Repr,
    mac: GenericArray<u8, <D as Digest>::OutputSize>,
}

impl_clone_for!(struct Ke2Message<D: Hash, KF: KeyPair>, [server_nonce, server_e_pk, mac], [KF::Repr]);
impl_debug_eq_hash_for!(struct Ke2Message<D: Hash, KF: KeyPair>, [server_nonce, server_e_pk, mac], [KF::Repr]);

/// The third message of the exchange, sent to the server
pub struct Ke3Message<D: Hash> {
    mac: GenericArray<u8, <D as Digest>::OutputSize>,
}

impl_clone_for!(struct Ke3Message<D: Hash>, [mac]);
impl_debug_eq_hash_for!(struct Ke3Message<D: Hash>, [mac]);

impl<D: Hash, KF: KeyPair> KeyExchange<D, KF> for TripleDH {
    type KE1State = Ke1State<KF>;
    type KE2State = Ke2State;
    type KE1Message = Ke1Message<KF>;
    type KE2Message = Ke2Message<D, KF>;
    type KE3Message = Ke3Message<D>;

    fn generate_ke1<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<(Self::KE1State, Self::KE1Message), ProtocolError> {
        let client_e_kp = KF::generate_random(rng)?;
        let mut client_nonce = vec![0u8; NONCE_LEN];
        rng.try_fill_bytes(&mut client_nonce)
            .map_err(|_| InternalPakeError::RandomnessError)?;

        let ke1_message = Ke1Message {
            client_nonce: client_nonce.clone(),
            client_e_pk: client_e_kp.public().clone(),
        };

        Ok((
            Ke1State {
                client_e_sk: client_e_kp.private().clone(),
                client_nonce,
            },
            ke1_message,
        ))
    }

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
    ) -> Result<(Self::KE2State, Self::KE2Message), ProtocolError> {
        let client_e_pk = KF::check_public_key(ke1_message.client_e_pk)?;

        let server_e_kp = KF::generate_random(rng)?;
        let mut server_nonce = vec![0u8; NONCE_LEN];
        rng.try_fill_bytes(&mut server_nonce)
            .map_err(|_| InternalPakeError::RandomnessError)?;

        let transcript_hasher = D::new()
            .chain(STR_3DH)
            .chain(&serialize(context, 2)?)
            .chain(&serialize(id_u, 2)?)
            .chain(serialized_credential_request)
            .chain(&serialize(id_s, 2)?)
            .chain(l2_component)
            .chain(&server_nonce)
            .chain(&server_e_kp.public().to_arr());

        let ikm = [
            KF::diffie_hellman(&client_e_pk, server_e_kp.private())?,
            KF::diffie_hellman(&client_e_pk, &server_s_sk)?,
            KF::diffie_hellman(&client_s_pk, server_e_kp.private())?,
        ]
        .concat();

        let hashed_transcript_without_mac = transcript_hasher.clone().finalize();
        let (session_key, km2, km3) =
            derive_3dh_keys::<D>(&ikm, &hashed_transcript_without_mac)?;

        let mut mac_hasher =
            Hmac::<D>::new_varkey(&km2).map_err(|_| InternalPakeError::HmacError)?;
        mac_hasher.update(&hashed_transcript_without_mac);
        let mac = mac_hasher.finalize().into_bytes();

        let hashed_transcript = transcript_hasher.chain(&mac).finalize();

        Ok((
            Ke2State {
                km3,
                hashed_transcript: hashed_transcript.to_vec(),
                session_key,
            },
            Ke2Message {
                server_nonce,
                server_e_pk: server_e_kp.public().clone(),
                mac,
            },
        ))
    }

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
    ) -> Result<(Vec<u8>, Self::KE3Message), ProtocolError> {
        let server_e_pk = KF::check_public_key(ke2_message.server_e_pk)?;

        let transcript_hasher = D::new()
            .chain(STR_3DH)
            .chain(&serialize(context, 2)?)
            .chain(&serialize(id_u, 2)?)
            .chain(serialized_credential_request)
            .chain(&serialize(id_s, 2)?)
            .chain(l2_component)
            .chain(&ke2_message.server_nonce)
            .chain(&server_e_pk.to_arr());

        let ikm = [
            KF::diffie_hellman(&server_e_pk, &ke1_state.client_e_sk)?,
            KF::diffie_hellman(&server_s_pk, &ke1_state.client_e_sk)?,
            KF::diffie_hellman(&server_e_pk, &client_s_sk)?,
        ]
        .concat();

        let hashed_transcript_without_mac = transcript_hasher.clone().finalize();
        let (session_key, km2, km3) =
            derive_3dh_keys::<D>(&ikm, &hashed_transcript_without_mac)?;

        let mut server_mac =
            Hmac::<D>::new_varkey(&km2).map_err(|_| InternalPakeError::HmacError)?;
        server_mac.update(&hashed_transcript_without_mac);
        server_mac
            .verify(&ke2_message.mac)
            .map_err(|_| PakeError::InvalidLoginError)?;

        let hashed_transcript = transcript_hasher.chain(&ke2_message.mac).finalize();

        let mut client_mac =
            Hmac::<D>::new_varkey(&km3).map_err(|_| InternalPakeError::HmacError)?;
        client_mac.update(&hashed_transcript);

        Ok((
            session_key,
            Ke3Message {
                mac: client_mac.finalize().into_bytes(),
            },
        ))
    }

    fn finish_ke(
        ke3_message: Self::KE3Message,
        ke2_state: &Self::KE2State,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut client_mac =
            Hmac::<D>::new_varkey(&ke2_state.km3).map_err(|_| InternalPakeError::HmacError)?;
        client_mac.update(&ke2_state.hashed_transcript);
        client_mac
            .verify(&ke3_message.mac)
            .map_err(|_| PakeError::InvalidLoginError)?;

        Ok(ke2_state.session_key.clone())
    }

    fn ke1_state_size() -> usize {
        <KF::Repr as SizedBytes>::Len::to_usize() + NONCE_LEN
    }

    fn ke2_message_size() -> usize {
        NONCE_LEN + <KF::Repr as SizedBytes>::Len::to_usize() + <D as Digest>::output_size()
    }
}

/// The key derivation of the exchange: the concatenated Diffie-Hellman
/// outputs are extracted, the handshake secret and session key are expanded
/// under the hashed transcript, and one MAC key per direction is expanded
/// from the handshake secret
fn derive_3dh_keys<D: Hash>(
    ikm: &[u8],
    hashed_transcript: &[u8],
) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), ProtocolError> {
    let (_, extracted_ikm) = Hkdf::<D>::extract(None, ikm);
    let handshake_secret = derive_secret::<D>(&extracted_ikm, STR_HANDSHAKE_SECRET, hashed_transcript)?;
    let session_key = derive_secret::<D>(&extracted_ikm, STR_SESSION_KEY, hashed_transcript)?;

    let mut km2 = vec![0u8; <D as Digest>::output_size()];
    hkdf_expand_label::<D>(&handshake_secret, STR_SERVER_MAC, b"", &mut km2)?;
    let mut km3 = vec![0u8; <D as Digest>::output_size()];
    hkdf_expand_label::<D>(&handshake_secret, STR_CLIENT_MAC, b"", &mut km3)?;

    Ok((session_key, km2, km3))
}

impl<KF: KeyPair> FromBytes for Ke1State<KF> {
    fn from_bytes(input: &[u8]) -> Result<Self, ProtocolError> {
        let key_len = <KF::Repr as SizedBytes>::Len::to_usize();
        let checked_bytes = check_slice_size(input, key_len + NONCE_LEN, "ke1_state")?;

        Ok(Self {
            client_e_sk: KF::Repr::from_arr(GenericArray::from_slice(&checked_bytes[..key_len]))?,
            client_nonce: checked_bytes[key_len..].to_vec(),
        })
    }
}

impl<KF: KeyPair> ToBytes for Ke1State<KF> {
    fn to_bytes(&self) -> Vec<u8> {
        [&self.client_e_sk.to_arr()[..], &self.client_nonce[..]].concat()
    }
}

impl<KF: KeyPair> FromBytes for Ke1Message<KF> {
    fn from_bytes(input: &[u8]) -> Result<Self, ProtocolError> {
        let key_len = <KF::Repr as SizedBytes>::Len::to_usize();
        let checked_bytes = check_slice_size(input, NONCE_LEN + key_len, "ke1_message")?;

        Ok(Self {
            client_nonce: checked_bytes[..NONCE_LEN].to_vec(),
            client_e_pk: KF::Repr::from_arr(GenericArray::from_slice(
                &checked_bytes[NONCE_LEN..],
            ))?,
        })
    }
}

impl<KF: KeyPair> ToBytes for Ke1Message<KF> {
    fn to_bytes(&self) -> Vec<u8> {
        [&self.client_nonce[..], &self.client_e_pk.to_arr()[..]].concat()
    }
}

impl FromBytes for Ke2State {
    fn from_bytes(input: &[u8]) -> Result<Self, ProtocolError> {
        // three digest-sized chunks
        if input.len() % 3 != 0 || input.is_empty() {
            return Err(PakeError::SerializationError.into());
        }
        let chunk = input.len() / 3;

        Ok(Self {
            km3: input[..chunk].to_vec(),
            hashed_transcript: input[chunk..2 * chunk].to_vec(),
            session_key: input[2 * chunk..].to_vec(),
        })
    }
}

impl ToBytes for Ke2State {
    fn to_bytes(&self) -> Vec<u8> {
        [
            &self.km3[..],
            &self.hashed_transcript[..],
            &self.session_key[..],
        ]
        .concat()
    }
}

impl<D: Hash, KF: KeyPair> FromBytes for Ke2Message<D, KF> {
    fn from_bytes(input: &[u8]) -> Result<Self, ProtocolError> {
        let key_len = <KF::Repr as SizedBytes>::Len::to_usize();
        let mac_len = <D as Digest>::output_size();
        let checked_bytes =
            check_slice_size(input, NONCE_LEN + key_len + mac_len, "ke2_message")?;

        Ok(Self {
            server_nonce: checked_bytes[..NONCE_LEN].to_vec(),
            server_e_pk: KF::Repr::from_arr(GenericArray::from_slice(
                &checked_bytes[NONCE_LEN..NONCE_LEN + key_len],
            ))?,
            mac: GenericArray::clone_from_slice(&checked_bytes[NONCE_LEN + key_len..]),
        })
    }
}

impl<D: Hash, KF: KeyPair> ToBytes for Ke2Message<D, KF> {
    fn to_bytes(&self) -> Vec<u8> {
        [
            &self.server_nonce[..],
            &self.server_e_pk.to_arr()[..],
            &self.mac[..],
        ]
        .concat()
    }
}

impl<D: Hash> FromBytes for Ke3Message<D> {
    fn from_bytes(input: &[u8]) -> Result<Self, ProtocolError> {
        let checked_bytes = check_slice_size(input, <D as Digest>::output_size(), "ke3_message")?;

        Ok(Self {
            mac: GenericArray::clone_from_slice(checked_bytes),
        })
    }
}

impl<D: Hash> ToBytes for Ke3Message<D> {
    fn to_bytes(&self) -> Vec<u8> {
        self.mac.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::X25519KeyPair;
    use rand_core::OsRng;
    use sha2::Sha512;

    type KE = TripleDH;

    fn run_exchange(
        context: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
        let mut rng = OsRng;
        let client_kp = X25519KeyPair::generate_random(&mut rng)?;
        let server_kp = X25519KeyPair::generate_random(&mut rng)?;
        let id_u = client_kp.public().to_vec();
        let id_s = server_kp.public().to_vec();
        let l1 = b"serialized credential request";
        let l2 = b"oprf evaluation and envelope";

        let (ke1_state, ke1m) =
            <KE as KeyExchange<Sha512, X25519KeyPair>>::generate_ke1(&mut rng)?;
        let (ke2_state, ke2m) = <KE as KeyExchange<Sha512, X25519KeyPair>>::generate_ke2(
            &mut rng,
            l1,
            l2,
            ke1m,
            client_kp.public().clone(),
            server_kp.private().clone(),
            &id_u,
            &id_s,
            context,
        )?;
        let (client_session_key, ke3m) =
            <KE as KeyExchange<Sha512, X25519KeyPair>>::generate_ke3(
                l2,
                ke2m,
                &ke1_state,
                l1,
                server_kp.public().clone(),
                client_kp.private().clone(),
                &id_u,
                &id_s,
                context,
            )?;
        let server_session_key =
            <KE as KeyExchange<Sha512, X25519KeyPair>>::finish_ke(ke3m, &ke2_state)?;
        Ok((client_session_key, server_session_key))
    }

    #[test]
    fn both_sides_derive_the_same_session_key() -> Result<(), ProtocolError> {
        let (client_sk, server_sk) = run_exchange(b"test context")?;
        assert_eq!(client_sk, server_sk);
        assert_eq!(client_sk.len(), 64);
        Ok(())
    }

    #[test]
    fn mismatched_static_keys_fail_authentication() -> Result<(), ProtocolError> {
        let mut rng = OsRng;
        let client_kp = X25519KeyPair::generate_random(&mut rng)?;
        let server_kp = X25519KeyPair::generate_random(&mut rng)?;
        let other_kp = X25519KeyPair::generate_random(&mut rng)?;
        let id_u = client_kp.public().to_vec();
        let id_s = server_kp.public().to_vec();

        let (ke1_state, ke1m) =
            <KE as KeyExchange<Sha512, X25519KeyPair>>::generate_ke1(&mut rng)?;
        let (_, ke2m) = <KE as KeyExchange<Sha512, X25519KeyPair>>::generate_ke2(
            &mut rng,
            b"l1",
            b"l2",
            ke1m,
            client_kp.public().clone(),
            server_kp.private().clone(),
            &id_u,
            &id_s,
            b"",
        )?;
        // the client expects a different server public key
        let result = <KE as KeyExchange<Sha512, X25519KeyPair>>::generate_ke3(
            b"l2",
            ke2m,
            &ke1_state,
            b"l1",
            other_kp.public().clone(),
            client_kp.private().clone(),
            &id_u,
            &id_s,
            b"",
        );
        assert!(matches!(
            result,
            Err(ProtocolError::VerificationError(
                PakeError::InvalidLoginError
            ))
        ));
        Ok(())
    }

    #[test]
    fn ke2_message_roundtrips() -> Result<(), ProtocolError> {
        let mut rng = OsRng;
        let server_kp = X25519KeyPair::generate_random(&mut rng)?;
        let msg = Ke2Message::<Sha512, X25519KeyPair> {
            server_nonce: vec![3u8; NONCE_LEN],
            server_e_pk: server_kp.public().clone(),
            mac: GenericArray::clone_from_slice(&[7u8; 64]),
        };
        let bytes = msg.to_bytes();
        assert_eq!(
            bytes.len(),
            <KE as KeyExchange<Sha512, X25519KeyPair>>::ke2_message_size()
        );
        assert_eq!(Ke2Message::<Sha512, X25519KeyPair>::from_bytes(&bytes)?, msg);
        Ok(())
    }
}
