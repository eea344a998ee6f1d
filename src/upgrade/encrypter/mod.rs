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

//! Cryptographic handshake seam, negotiated once per connection (spec §4.2, §6).

pub mod noise;

use crate::{connection::AsyncReadWrite, crypto::ed25519, error::Error, peer_id::PeerId, types::ProtocolName};

use async_trait::async_trait;

/// Turns a raw (optionally privately-protected) byte stream into an authenticated, encrypted
/// one, producing the remote's [`PeerId`] as derived from the handshake.
#[async_trait]
pub trait ConnectionEncrypter: Send + Sync {
    fn protocol(&self) -> &ProtocolName;

    async fn secure_inbound(
        &self,
        keypair: &ed25519::Keypair,
        io: Box<dyn AsyncReadWrite>,
    ) -> Result<(Box<dyn AsyncReadWrite>, PeerId), Error>;

    /// `expected_remote` comes from a `/p2p/<peer>` suffix on the dial address, when present;
    /// implementations that can verify it against the handshake should do so and fail with
    /// [`Error::InvalidPeer`] on mismatch (spec §4.1: "peer id embedded in the multiaddr... is
    /// validated against the connection's actual remote peer").
    async fn secure_outbound(
        &self,
        keypair: &ed25519::Keypair,
        io: Box<dyn AsyncReadWrite>,
        expected_remote: Option<PeerId>,
    ) -> Result<(Box<dyn AsyncReadWrite>, PeerId), Error>;
}
