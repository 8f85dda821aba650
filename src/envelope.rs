// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::{
    errors::{utils::check_slice_size, InternalPakeError, ProtocolError},
    hash::Hash,
    keypair::{KeyPair, SizedBytes},
    serialization::serialize,
};
use digest::Digest;
use generic_array::{typenum::Unsigned, GenericArray};
use hkdf::Hkdf;
use hmac::{Hmac, Mac, NewMac};
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

static STR_PAD: &[u8] = b"Pad";
static STR_AUTH_KEY: &[u8] = b"AuthKey";
static STR_EXPORT_KEY: &[u8] = b"ExportKey";

pub(crate) const NONCE_LEN: usize = 32;

/// This struct is an instantiation of the envelope: the client's long-term
/// private key encrypted under the randomized password, the server's public
/// key carried as authenticated cleartext, and an HMAC binding both to the
/// client and server identities.
///
/// Note that earlier versions of this construction dropped the cleartext
/// public key and relied on the caller to supply it out of band; carrying it
/// here lets credential recovery run from the password alone.
pub(crate) struct Envelope<D: Hash> {
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
    server_s_pk: Vec<u8>,
    hmac: GenericArray<u8, <D as Digest>::OutputSize>,
}

// Cannot be derived because it would require for D to be Clone.
impl_clone_for!(
    struct Envelope<D: Hash>,
    [nonce, ciphertext, server_s_pk, hmac],
);

impl_debug_eq_hash_for!(
    struct Envelope<D: Hash>,
    [nonce, ciphertext, server_s_pk, hmac],
);

/// The result of opening an envelope: the recovered client key material,
/// the server public key it was sealed against, and the export key
pub(crate) struct OpenedEnvelope<KF: KeyPair, D: Hash> {
    pub(crate) client_s_sk: KF::Repr,
    pub(crate) client_s_pk: KF::Repr,
    pub(crate) server_s_pk: KF::Repr,
    pub(crate) export_key: GenericArray<u8, <D as Digest>::OutputSize>,
}

impl<D: Hash> Envelope<D> {
    fn hmac_size() -> usize {
        <D as Digest>::output_size()
    }

    /// The fixed serialized size of an envelope for a given key length
    pub(crate) fn envelope_size(key_len: usize) -> usize {
        NONCE_LEN + key_len + key_len + Self::hmac_size()
    }

    /// Uses a key to convert the plaintext into an envelope, authenticated by
    /// the aad field. Note that a new nonce is sampled for each call to seal
    pub(crate) fn seal<R: RngCore + CryptoRng, KF: KeyPair>(
        rng: &mut R,
        rwd_hkdf: &Hkdf<D>,
        client_s_sk: &KF::Repr,
        server_s_pk: &KF::Repr,
        id_u: &[u8],
        id_s: &[u8],
    ) -> Result<(Self, GenericArray<u8, <D as Digest>::OutputSize>), ProtocolError> {
        let mut nonce = vec![0u8; NONCE_LEN];
        rng.try_fill_bytes(&mut nonce)
            .map_err(|_| InternalPakeError::RandomnessError)?;

        let plaintext = Zeroizing::new(client_s_sk.to_arr().to_vec());
        let server_s_pk_bytes = server_s_pk.to_arr().to_vec();

        let (pad, auth_key, export_key) = Self::derive_keys(rwd_hkdf, &nonce, plaintext.len())?;
        let ciphertext: Vec<u8> = plaintext
            .iter()
            .zip(pad.iter())
            .map(|(x, y)| x ^ y)
            .collect();

        let hmac = Self::compute_hmac(&auth_key, &nonce, &ciphertext, &server_s_pk_bytes, id_u, id_s)?;

        Ok((
            Self {
                nonce,
                ciphertext,
                server_s_pk: server_s_pk_bytes,
                hmac,
            },
            GenericArray::clone_from_slice(&export_key),
        ))
    }

    /// Attempts to decrypt and authenticate the envelope with the given key.
    /// Decryption runs first: the default client identity is the client
    /// public key, which is only derivable from the recovered private key.
    /// The hmac check still covers every byte of the envelope before
    /// anything is returned
    pub(crate) fn open<KF: KeyPair>(
        &self,
        rwd_hkdf: &Hkdf<D>,
        id_u: Option<&[u8]>,
        id_s: Option<&[u8]>,
    ) -> Result<OpenedEnvelope<KF, D>, ProtocolError> {
        let (pad, auth_key, export_key) =
            Self::derive_keys(rwd_hkdf, &self.nonce, self.ciphertext.len())?;

        let plaintext = Zeroizing::new(
            self.ciphertext
                .iter()
                .zip(pad.iter())
                .map(|(x, y)| x ^ y)
                .collect::<Vec<u8>>(),
        );

        let client_s_sk = KF::Repr::from_arr(GenericArray::from_slice(check_slice_size(
            &plaintext,
            <KF::Repr as SizedBytes>::Len::to_usize(),
            "client_s_sk",
        )?))?;
        let client_s_pk = KF::public_from_private(&client_s_sk);
        let client_s_pk_bytes = client_s_pk.to_arr().to_vec();

        let id_u_bytes = id_u.unwrap_or(&client_s_pk_bytes);
        let id_s_bytes = id_s.unwrap_or(&self.server_s_pk);

        let expected_hmac = Self::compute_hmac(
            &auth_key,
            &self.nonce,
            &self.ciphertext,
            &self.server_s_pk,
            id_u_bytes,
            id_s_bytes,
        )?;
        if expected_hmac.as_slice().ct_eq(self.hmac.as_slice()).unwrap_u8() != 1 {
            return Err(InternalPakeError::SealOpenHmacError.into());
        }

        let server_s_pk = KF::Repr::from_arr(GenericArray::from_slice(check_slice_size(
            &self.server_s_pk,
            <KF::Repr as SizedBytes>::Len::to_usize(),
            "server_s_pk",
        )?))?;

        Ok(OpenedEnvelope {
            client_s_sk,
            client_s_pk,
            server_s_pk,
            export_key: GenericArray::clone_from_slice(&export_key),
        })
    }

    fn compute_hmac(
        auth_key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        server_s_pk: &[u8],
        id_u: &[u8],
        id_s: &[u8],
    ) -> Result<GenericArray<u8, <D as Digest>::OutputSize>, ProtocolError> {
        let mut hmac =
            Hmac::<D>::new_varkey(auth_key).map_err(|_| InternalPakeError::HmacError)?;
        hmac.update(nonce);
        hmac.update(ciphertext);
        hmac.update(server_s_pk);
        hmac.update(&serialize(id_u, 2)?);
        hmac.update(&serialize(id_s, 2)?);
        Ok(hmac.finalize().into_bytes())
    }

    // The pad and the auth key are wiped when they fall out of scope, on
    // error paths included
    fn derive_keys(
        rwd_hkdf: &Hkdf<D>,
        nonce: &[u8],
        pad_len: usize,
    ) -> Result<(Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>, Vec<u8>), InternalPakeError> {
        let mut pad = Zeroizing::new(vec![0u8; pad_len]);
        rwd_hkdf
            .expand(&[nonce, STR_PAD].concat(), &mut pad)
            .map_err(|_| InternalPakeError::HkdfError)?;
        let mut auth_key = Zeroizing::new(vec![0u8; Self::hmac_size()]);
        rwd_hkdf
            .expand(&[nonce, STR_AUTH_KEY].concat(), &mut auth_key)
            .map_err(|_| InternalPakeError::HkdfError)?;
        let mut export_key = vec![0u8; Self::hmac_size()];
        rwd_hkdf
            .expand(&[nonce, STR_EXPORT_KEY].concat(), &mut export_key)
            .map_err(|_| InternalPakeError::HkdfError)?;
        Ok((pad, auth_key, export_key))
    }

    /// The bytes of the server public key sealed into this envelope
    pub(crate) fn server_s_pk_bytes(&self) -> &[u8] {
        &self.server_s_pk
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        [
            &self.nonce[..],
            &self.ciphertext[..],
            &self.server_s_pk[..],
            &self.hmac[..],
        ]
        .concat()
    }

    pub(crate) fn from_bytes(bytes: &[u8], key_len: usize) -> Result<Self, InternalPakeError> {
        let expected = Self::envelope_size(key_len);
        if bytes.len() != expected {
            return Err(InternalPakeError::InvalidEnvelopeStructureError);
        }
        let hmac_start = bytes.len() - Self::hmac_size();
        Ok(Self {
            nonce: bytes[..NONCE_LEN].to_vec(),
            ciphertext: bytes[NONCE_LEN..NONCE_LEN + key_len].to_vec(),
            server_s_pk: bytes[NONCE_LEN + key_len..hmac_start].to_vec(),
            hmac: GenericArray::clone_from_slice(&bytes[hmac_start..]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::X25519KeyPair;
    use rand_core::OsRng;
    use sha2::Sha512;

    fn random_hkdf(rng: &mut OsRng) -> Hkdf<Sha512> {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Hkdf::<Sha512>::new(None, &key)
    }

    #[test]
    fn seal_and_open() -> anyhow::Result<()> {
        let mut rng = OsRng;
        let client_kp = X25519KeyPair::generate_random(&mut rng)?;
        let server_kp = X25519KeyPair::generate_random(&mut rng)?;
        let rwd = random_hkdf(&mut rng);

        let (envelope, export_key) = Envelope::<Sha512>::seal::<_, X25519KeyPair>(
            &mut rng,
            &rwd,
            client_kp.private(),
            server_kp.public(),
            &client_kp.public().to_vec(),
            &server_kp.public().to_vec(),
        )?;

        let opened = envelope.open::<X25519KeyPair>(&rwd, None, None)?;
        assert_eq!(&opened.client_s_sk, client_kp.private());
        assert_eq!(&opened.client_s_pk, client_kp.public());
        assert_eq!(&opened.server_s_pk, server_kp.public());
        assert_eq!(opened.export_key, export_key);
        Ok(())
    }

    #[test]
    fn open_with_wrong_key_fails() -> anyhow::Result<()> {
        let mut rng = OsRng;
        let client_kp = X25519KeyPair::generate_random(&mut rng)?;
        let server_kp = X25519KeyPair::generate_random(&mut rng)?;
        let rwd = random_hkdf(&mut rng);
        let other_rwd = random_hkdf(&mut rng);

        let (envelope, _) = Envelope::<Sha512>::seal::<_, X25519KeyPair>(
            &mut rng,
            &rwd,
            client_kp.private(),
            server_kp.public(),
            &client_kp.public().to_vec(),
            &server_kp.public().to_vec(),
        )?;

        assert_eq!(
            envelope.open::<X25519KeyPair>(&other_rwd, None, None).err(),
            Some(ProtocolError::from(InternalPakeError::SealOpenHmacError))
        );
        Ok(())
    }

    #[test]
    fn tampered_envelope_fails_to_open() -> anyhow::Result<()> {
        let mut rng = OsRng;
        let client_kp = X25519KeyPair::generate_random(&mut rng)?;
        let server_kp = X25519KeyPair::generate_random(&mut rng)?;
        let rwd = random_hkdf(&mut rng);

        let (envelope, _) = Envelope::<Sha512>::seal::<_, X25519KeyPair>(
            &mut rng,
            &rwd,
            client_kp.private(),
            server_kp.public(),
            &client_kp.public().to_vec(),
            &server_kp.public().to_vec(),
        )?;

        let bytes = envelope.to_bytes();
        for i in 0..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[i] ^= 0x01;
            let tampered_envelope = Envelope::<Sha512>::from_bytes(&tampered, 32)?;
            assert!(tampered_envelope
                .open::<X25519KeyPair>(&rwd, None, None)
                .is_err());
        }
        Ok(())
    }

    #[test]
    fn open_with_mismatched_identity_fails() -> anyhow::Result<()> {
        let mut rng = OsRng;
        let client_kp = X25519KeyPair::generate_random(&mut rng)?;
        let server_kp = X25519KeyPair::generate_random(&mut rng)?;
        let rwd = random_hkdf(&mut rng);

        let (envelope, _) = Envelope::<Sha512>::seal::<_, X25519KeyPair>(
            &mut rng,
            &rwd,
            client_kp.private(),
            server_kp.public(),
            b"alice",
            b"server.example.com",
        )?;

        assert!(envelope
            .open::<X25519KeyPair>(&rwd, Some(&b"alice"[..]), Some(&b"server.example.com"[..]))
            .is_ok());
        assert!(envelope
            .open::<X25519KeyPair>(&rwd, Some(&b"bob"[..]), Some(&b"server.example.com"[..]))
            .is_err());
        // defaults (the public keys) were not what the envelope was sealed to
        assert!(envelope.open::<X25519KeyPair>(&rwd, None, None).is_err());
        Ok(())
    }

    #[test]
    fn malformed_envelope_bytes_rejected() {
        assert_eq!(
            Envelope::<Sha512>::from_bytes(&[0u8; 10], 32).err(),
            Some(InternalPakeError::InvalidEnvelopeStructureError)
        );
    }
}
