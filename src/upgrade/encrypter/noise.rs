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

//! `/noise` [`ConnectionEncrypter`], driving [`crate::crypto::noise::handshake`].

use super::ConnectionEncrypter;
use crate::{
    connection::AsyncReadWrite,
    crypto::{
        ed25519,
        noise::{self, NoiseConfiguration, Role},
    },
    error::Error,
    peer_id::PeerId,
    types::ProtocolName,
};

use async_trait::async_trait;

/// Logging target for the file.
const LOG_TARGET: &str = "upgrade::encrypter::noise";

pub struct NoiseEncrypter {
    protocol: ProtocolName,
}

impl NoiseEncrypter {
    pub fn new() -> Self {
        Self {
            protocol: ProtocolName::from("/noise"),
        }
    }
}

impl Default for NoiseEncrypter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionEncrypter for NoiseEncrypter {
    fn protocol(&self) -> &ProtocolName {
        &self.protocol
    }

    async fn secure_inbound(
        &self,
        keypair: &ed25519::Keypair,
        io: Box<dyn AsyncReadWrite>,
    ) -> Result<(Box<dyn AsyncReadWrite>, PeerId), Error> {
        let config = NoiseConfiguration::new(keypair, Role::Listener);
        let (socket, remote_peer) = noise::handshake(io, config).await?;
        tracing::trace!(target: LOG_TARGET, %remote_peer, "noise handshake complete (inbound)");
        Ok((Box::new(socket), remote_peer))
    }

    async fn secure_outbound(
        &self,
        keypair: &ed25519::Keypair,
        io: Box<dyn AsyncReadWrite>,
        expected_remote: Option<PeerId>,
    ) -> Result<(Box<dyn AsyncReadWrite>, PeerId), Error> {
        let config = NoiseConfiguration::new(keypair, Role::Dialer);
        let (socket, remote_peer) = noise::handshake(io, config).await?;

        if let Some(expected) = expected_remote {
            if expected != remote_peer {
                return Err(Error::InvalidPeer { expected, got: remote_peer });
            }
        }

        tracing::trace!(target: LOG_TARGET, %remote_peer, "noise handshake complete (outbound)");
        Ok((Box::new(socket), remote_peer))
    }
}
