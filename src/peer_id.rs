// Copyright 2023 litep2p developers
// Copyright 2026 transport-core developers
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
// OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Self-identifying cryptographic peer identity.

use crate::{crypto::PublicKey, error::AddressError};

use multihash::{Code, Multihash, MultihashDigest};

use std::fmt;

/// A content-addressed identifier derived from a peer's public key.
///
/// Two [`PeerId`]s are equal iff their multihash bytes are equal; the multihash embeds
/// the hash of the public key (or the raw key bytes themselves, for short keys), never
/// the key in the clear beyond what the hash already reveals.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PeerId(Multihash);

impl PeerId {
    /// Derive a [`PeerId`] from `key`.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let bytes = key.to_protobuf_encoding();
        Self(Code::Sha2_256.digest(&bytes))
    }

    /// Wrap an already-computed [`Multihash`], validating that it uses a supported code.
    pub fn from_multihash(hash: Multihash) -> Result<Self, AddressError> {
        match Code::try_from(hash.code()) {
            Ok(_) => Ok(Self(hash)),
            Err(_) => Err(AddressError::InvalidPeerId(hash)),
        }
    }

    /// Generate a random [`PeerId`], useful for tests and ephemeral identities.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(Code::Sha2_256.digest(&bytes))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    pub fn as_multihash(&self) -> &Multihash {
        &self.0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.to_bytes()).into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ed25519::Keypair;

    #[test]
    fn equal_keys_produce_equal_peer_ids() {
        let keypair = Keypair::generate();
        let a = PeerId::from_public_key(&PublicKey::Ed25519(keypair.public()));
        let b = PeerId::from_public_key(&PublicKey::Ed25519(keypair.public()));
        assert_eq!(a, b);
    }

    #[test]
    fn different_keys_produce_different_peer_ids() {
        let a = PeerId::from_public_key(&PublicKey::Ed25519(Keypair::generate().public()));
        let b = PeerId::from_public_key(&PublicKey::Ed25519(Keypair::generate().public()));
        assert_ne!(a, b);
    }

    #[test]
    fn random_peer_ids_are_distinct() {
        assert_ne!(PeerId::random(), PeerId::random());
    }

    #[test]
    fn sha2_256_digest_matches_a_known_test_vector() {
        let expected = hex_literal::hex!("1cd7406674afe24db5a021766407e32179327d407bec94ba7fc358791911f7f6");
        let digest = Code::Sha2_256.digest(b"transport-core");
        assert_eq!(digest.digest(), &expected[..]);
    }
}
