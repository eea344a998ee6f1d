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

//! Private-network protection (pnet): an XSalsa20 stream cipher keyed on a shared secret,
//! applied to every byte before any capability negotiation happens (spec §4.2, applied first,
//! "Protect"). Grounded on the `libp2p-pnet` crate's choice of XSalsa20 + a SHA3-256-derived
//! fingerprint exchange, reimplemented here as a poll-based [`AsyncReadWrite`] wrapper matching
//! this crate's [`crate::crypto::noise::NoiseSocket`] buffering idiom.

use crate::{connection::AsyncReadWrite, error::Error};

use async_trait::async_trait;
use futures::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use salsa20::{
    cipher::{KeyIvInit, StreamCipher},
    XSalsa20,
};
use sha3::{Digest, Sha3_256};

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

/// Logging target for the file.
const LOG_TARGET: &str = "upgrade::protector";

/// Length of the random nonce each side sends in the clear before switching the cipher on,
/// matching pnet's handshake.
const NONCE_LEN: usize = 24;

/// Wraps a raw byte transport with a pre-shared-key XSalsa20 cipher (spec §4.2 "Protect" phase).
#[async_trait]
pub trait ConnectionProtector: Send + Sync {
    async fn protect(&self, io: Box<dyn AsyncReadWrite>) -> Result<Box<dyn AsyncReadWrite>, Error>;
}

/// The pre-shared network secret, hashed down to a 32-byte XSalsa20 key.
#[derive(Clone)]
pub struct PreSharedKey {
    key: [u8; 32],
}

impl PreSharedKey {
    pub fn new(secret: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(secret);
        let digest = hasher.finalize();
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }
}

/// [`ConnectionProtector`] implementation keyed on a fixed [`PreSharedKey`], exchanging random
/// nonces in the clear and then encrypting with independent read/write XSalsa20 keystreams.
pub struct PnetProtector {
    psk: PreSharedKey,
}

impl PnetProtector {
    pub fn new(psk: PreSharedKey) -> Self {
        Self { psk }
    }
}

#[async_trait]
impl ConnectionProtector for PnetProtector {
    async fn protect(&self, mut io: Box<dyn AsyncReadWrite>) -> Result<Box<dyn AsyncReadWrite>, Error> {
        let mut local_nonce = [0u8; NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut local_nonce);

        io.write_all(&local_nonce).await?;
        io.flush().await?;

        let mut remote_nonce = [0u8; NONCE_LEN];
        io.read_exact(&mut remote_nonce).await?;

        tracing::trace!(target: LOG_TARGET, "pnet nonce exchange complete");

        let write_cipher = XSalsa20::new(&self.psk.key.into(), &local_nonce.into());
        let read_cipher = XSalsa20::new(&self.psk.key.into(), &remote_nonce.into());

        Ok(Box::new(PnetSocket {
            io,
            read_cipher,
            write_cipher,
            pending_write: Vec::new(),
            pending_written: 0,
            pending_plaintext_len: 0,
        }))
    }
}

struct PnetSocket {
    io: Box<dyn AsyncReadWrite>,
    read_cipher: XSalsa20,
    write_cipher: XSalsa20,
    /// Ciphertext already derived from the keystream but not yet fully handed to `io`.
    ///
    /// The keystream must advance in lockstep with bytes actually written to the wire, so a
    /// short inner `poll_write` cannot simply be retried with a freshly re-encrypted buffer --
    /// the already-encrypted tail is held here until `io` accepts the rest.
    pending_write: Vec<u8>,
    pending_written: usize,
    /// Plaintext length represented by `pending_write`, reported to the caller once flushed.
    pending_plaintext_len: usize,
}

impl AsyncRead for PnetSocket {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let n = futures::ready!(Pin::new(&mut this.io).poll_read(cx, buf))?;
        this.read_cipher.apply_keystream(&mut buf[..n]);
        Poll::Ready(Ok(n))
    }
}

impl PnetSocket {
    fn poll_drain_pending(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.pending_written < self.pending_write.len() {
            let n = futures::ready!(
                Pin::new(&mut self.io).poll_write(cx, &self.pending_write[self.pending_written..])
            )?;
            if n == 0 {
                return Poll::Ready(Err(io::Error::from(io::ErrorKind::WriteZero)));
            }
            self.pending_written += n;
        }
        self.pending_write.clear();
        self.pending_written = 0;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for PnetSocket {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        if !this.pending_write.is_empty() {
            futures::ready!(this.poll_drain_pending(cx))?;
            return Poll::Ready(Ok(this.pending_plaintext_len));
        }

        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let mut ciphertext = buf.to_vec();
        this.write_cipher.apply_keystream(&mut ciphertext);
        this.pending_write = ciphertext;
        this.pending_written = 0;
        this.pending_plaintext_len = buf.len();

        futures::ready!(this.poll_drain_pending(cx))?;
        Poll::Ready(Ok(this.pending_plaintext_len))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        futures::ready!(this.poll_drain_pending(cx))?;
        Pin::new(&mut this.io).poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        futures::ready!(this.poll_drain_pending(cx))?;
        Pin::new(&mut this.io).poll_close(cx)
    }
}
