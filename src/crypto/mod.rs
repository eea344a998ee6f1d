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

//! Key material used to derive [`crate::peer_id::PeerId`]s and drive handshakes.

pub mod ed25519;
pub mod noise;

/// Public key variants this crate knows how to turn into a [`crate::peer_id::PeerId`].
///
/// Only Ed25519 is implemented; the enum exists so that adding a second key type is
/// additive rather than a breaking change to [`crate::peer_id::PeerId::from_public_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(ed25519::PublicKey),
}

impl PublicKey {
    /// Encode as an unsigned-varint-free, minimal protobuf-like envelope: a one-byte key
    /// type tag followed by the raw key bytes. This is internal to the crate and is not a
    /// wire format covered by the negotiation protocol's own framing.
    pub fn to_protobuf_encoding(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(key) => {
                let mut out = Vec::with_capacity(1 + 32);
                out.push(0u8);
                out.extend_from_slice(&key.to_bytes());
                out
            }
        }
    }
}
