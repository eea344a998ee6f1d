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

//! Ed25519 key material, used both to derive [`crate::peer_id::PeerId`]s and to sign the
//! identity payload exchanged during the Noise handshake.

use ed25519_dalek::Signer as _;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use std::fmt;

/// An Ed25519 keypair.
#[derive(Clone)]
pub struct Keypair(ed25519_dalek::Keypair);

impl Keypair {
    /// Generate a new, random keypair.
    pub fn generate() -> Self {
        Self(ed25519_dalek::Keypair::generate(&mut OsRng))
    }

    /// Build a keypair from a 32-byte secret scalar.
    pub fn from_bytes(mut bytes: [u8; 32]) -> Result<Self, ed25519_dalek::SignatureError> {
        let secret = ed25519_dalek::SecretKey::from_bytes(&bytes)?;
        bytes.zeroize();
        let public = ed25519_dalek::PublicKey::from(&secret);
        Ok(Self(ed25519_dalek::Keypair { secret, public }))
    }

    /// Public half of this keypair.
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.public)
    }

    /// Sign `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", bs58::encode(self.public().to_bytes()).into_string())
    }
}

/// An Ed25519 public key.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PublicKey(ed25519_dalek::PublicKey);

impl PublicKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ed25519_dalek::SignatureError> {
        Ok(Self(ed25519_dalek::PublicKey::from_bytes(bytes)?))
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(sig) = ed25519_dalek::Signature::from_bytes(&signature.0) else {
            return false;
        };
        ed25519_dalek::Verifier::verify(&self.0, message, &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", bs58::encode(self.to_bytes()).into_string())
    }
}

/// An Ed25519 signature.
#[derive(Clone)]
pub struct Signature(pub(crate) [u8; 64]);

impl Signature {
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 64] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(b"hello world");
        assert!(keypair.public().verify(b"hello world", &signature));
        assert!(!keypair.public().verify(b"goodbye world", &signature));
    }
}
