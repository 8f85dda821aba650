// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Defines the CipherSuite trait to specialize the library to a particular
//! set of primitives

use crate::{
    hash::Hash, key_exchange::traits::KeyExchange, keypair::KeyPair,
    map_to_curve::GroupWithMapToCurve, slow_hash::SlowHash,
};

/// Configures the underlying primitives for OPAQUE:
/// * `Group`: a prime order group for the OPRF, supporting a
///   password-to-curve mapping
/// * `KeyFormat`: a keypair type for the authenticated key exchange
/// * `KeyExchange`: the key exchange protocol run during login
/// * `Hash`: the main hashing function shared by the key schedule and MACs
/// * `SlowHash`: the memory-hard function run on the OPRF output
pub trait CipherSuite {
    /// A prime order group with an associated hash-to-curve
    type Group: GroupWithMapToCurve;
    /// A keypair for the key exchange
    type KeyFormat: KeyPair;
    /// The key exchange protocol run at login
    type KeyExchange: KeyExchange<Self::Hash, Self::KeyFormat>;
    /// The main hash function
    type Hash: Hash;
    /// The memory-hard stretching function
    type SlowHash: SlowHash<Self::Hash>;
}
