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

//! Noise-XX handshake and post-handshake transport framing.
//!
//! This is the low-level primitive that [`crate::upgrade::encrypter::noise`] drives as the
//! crate's `/noise` [`crate::upgrade::encrypter::ConnectionEncrypter`]. The wire layout of the
//! identity payload exchanged inside the handshake is this crate's own (the specification treats
//! handshake wire formats as a non-goal): a `varint`-length-prefixed protobuf-free envelope of
//! `{ ed25519 public key (32B) | signature over b"noise-libp2p-static-key:" || noise static
//! public key (64B) }`.

use crate::{crypto::ed25519, error::NegotiationError, peer_id::PeerId};

use futures::{ready, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

/// Maximum Noise transport message length, per the Noise specification.
const MAX_NOISE_MESSAGE_LEN: usize = 65535;

/// Largest plaintext chunk that still fits a single Noise transport message once the 16-byte
/// AEAD tag is added.
const MAX_PLAINTEXT_LEN: usize = MAX_NOISE_MESSAGE_LEN - 16;

/// Domain-separation prefix signed over the ephemeral Noise static key.
const SIGNATURE_DOMAIN: &[u8] = b"noise-libp2p-static-key:";

/// Role a peer plays in the handshake.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Dialer,
    Listener,
}

/// Configuration for one Noise-XX handshake.
#[derive(Clone)]
pub struct NoiseConfiguration {
    keypair: ed25519::Keypair,
    role: Role,
}

impl NoiseConfiguration {
    pub fn new(keypair: &ed25519::Keypair, role: Role) -> Self {
        Self {
            keypair: keypair.clone(),
            role,
        }
    }
}

fn identity_payload(keypair: &ed25519::Keypair, noise_static_public: &[u8]) -> Vec<u8> {
    let mut to_sign = SIGNATURE_DOMAIN.to_vec();
    to_sign.extend_from_slice(noise_static_public);
    let signature = keypair.sign(&to_sign);

    let public = keypair.public().to_bytes();
    let mut out = Vec::with_capacity(32 + 64);
    out.extend_from_slice(&public);
    out.extend_from_slice(&signature.to_bytes());
    out
}

fn verify_identity_payload(
    payload: &[u8],
    noise_static_public: &[u8],
) -> Result<PeerId, NegotiationError> {
    if payload.len() != 32 + 64 {
        return Err(NegotiationError::PeerIdMissing);
    }
    let public = ed25519::PublicKey::from_bytes(&payload[..32])
        .map_err(|_| NegotiationError::PeerIdMissing)?;
    let signature =
        ed25519::Signature::from_bytes(&payload[32..]).ok_or(NegotiationError::BadSignature)?;

    let mut to_verify = SIGNATURE_DOMAIN.to_vec();
    to_verify.extend_from_slice(noise_static_public);
    if !public.verify(&to_verify, &signature) {
        return Err(NegotiationError::BadSignature);
    }

    Ok(PeerId::from_public_key(&crate::crypto::PublicKey::Ed25519(public)))
}

async fn write_framed<S: AsyncWrite + Unpin>(io: &mut S, msg: &[u8]) -> io::Result<()> {
    let len = u16::try_from(msg.len()).map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
    io.write_all(&len.to_be_bytes()).await?;
    io.write_all(msg).await?;
    io.flush().await
}

async fn read_framed<S: AsyncRead + Unpin>(io: &mut S) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    io.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    io.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Drive the Noise-XX handshake to completion over `io` and return the now-encrypted socket
/// together with the remote's [`PeerId`], derived from its identity payload.
pub async fn handshake<S: AsyncRead + AsyncWrite + Unpin + Send>(
    mut io: S,
    config: NoiseConfiguration,
) -> Result<(NoiseSocket<S>, PeerId), NegotiationError> {
    let builder = snow::Builder::new("Noise_XX_25519_ChaChaPoly_SHA256".parse().unwrap());
    let static_keypair = builder.generate_keypair()?;
    let builder = builder.local_private_key(&static_keypair.private);

    let mut handshake_state = match config.role {
        Role::Dialer => builder.build_initiator()?,
        Role::Listener => builder.build_responder()?,
    };

    let mut buf = vec![0u8; MAX_NOISE_MESSAGE_LEN];
    let remote_payload: Vec<u8>;

    // Noise_XX: -> e, <- e, ee, s, es, -> s, se. Exactly one of the three messages on each
    // side carries the peer's identity payload as its Noise payload.
    match config.role {
        Role::Dialer => {
            let len = handshake_state.write_message(&[], &mut buf)?;
            write_framed(&mut io, &buf[..len]).await?;

            let msg = read_framed(&mut io).await?;
            let len = handshake_state.read_message(&msg, &mut buf)?;
            remote_payload = buf[..len].to_vec();

            let payload = identity_payload(&config.keypair, &static_keypair.public);
            let len = handshake_state.write_message(&payload, &mut buf)?;
            write_framed(&mut io, &buf[..len]).await?;
        }
        Role::Listener => {
            let msg = read_framed(&mut io).await?;
            handshake_state.read_message(&msg, &mut buf)?;

            let payload = identity_payload(&config.keypair, &static_keypair.public);
            let len = handshake_state.write_message(&payload, &mut buf)?;
            write_framed(&mut io, &buf[..len]).await?;

            let msg = read_framed(&mut io).await?;
            let len = handshake_state.read_message(&msg, &mut buf)?;
            remote_payload = buf[..len].to_vec();
        }
    }

    let remote_static = handshake_state
        .get_remote_static()
        .ok_or(NegotiationError::PeerIdMissing)?
        .to_vec();

    let remote_peer = verify_identity_payload(&remote_payload, &remote_static)?;

    let transport_state = handshake_state.into_transport_mode()?;

    Ok((
        NoiseSocket {
            io,
            state: transport_state,
            read_buffer: Vec::new(),
            read_offset: 0,
            read_state: ReadState::Length { buf: [0u8; 2], filled: 0 },
            write_state: WriteState::Idle,
        },
        remote_peer,
    ))
}

/// A byte stream encrypted with a completed Noise session.
///
/// Implements [`AsyncRead`]/[`AsyncWrite`] directly (rather than only exposing whole-frame
/// `async fn`s) so it can be boxed as a `dyn` transport and driven by multistream-select and
/// the stream multiplexer, both of which poll byte-oriented streams.
pub struct NoiseSocket<S> {
    io: S,
    state: snow::TransportState,
    read_buffer: Vec<u8>,
    read_offset: usize,
    read_state: ReadState,
    write_state: WriteState,
}

enum ReadState {
    /// Reading the 2-byte big-endian ciphertext frame length.
    Length { buf: [u8; 2], filled: usize },
    /// Reading `len` bytes of ciphertext.
    Body { len: usize, buf: Vec<u8>, filled: usize },
}

enum WriteState {
    Idle,
    /// Flushing an already-encrypted frame; `plaintext_len` is what `poll_write` reports back
    /// to the caller once the whole frame has reached the inner transport.
    Writing { buf: Vec<u8>, written: usize, plaintext_len: usize },
}

impl<S: AsyncRead + AsyncWrite + Unpin> NoiseSocket<S> {
    pub async fn write_frame(&mut self, plaintext: &[u8]) -> io::Result<()> {
        let mut ciphertext = vec![0u8; plaintext.len() + 16];
        let len = self
            .state
            .write_message(plaintext, &mut ciphertext)
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
        write_framed(&mut self.io, &ciphertext[..len]).await
    }

    pub async fn read_frame(&mut self) -> io::Result<Vec<u8>> {
        if self.read_offset < self.read_buffer.len() {
            let rest = self.read_buffer[self.read_offset..].to_vec();
            self.read_offset = self.read_buffer.len();
            return Ok(rest);
        }
        let ciphertext = read_framed(&mut self.io).await?;
        let mut plaintext = vec![0u8; ciphertext.len()];
        let len = self
            .state
            .read_message(&ciphertext, &mut plaintext)
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
        plaintext.truncate(len);
        Ok(plaintext)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncRead for NoiseSocket<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        loop {
            if this.read_offset < this.read_buffer.len() {
                let available = &this.read_buffer[this.read_offset..];
                let n = std::cmp::min(available.len(), buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                this.read_offset += n;
                return Poll::Ready(Ok(n));
            }

            match &mut this.read_state {
                ReadState::Length { buf: len_buf, filled } => {
                    while *filled < len_buf.len() {
                        let n = ready!(Pin::new(&mut this.io).poll_read(cx, &mut len_buf[*filled..]))?;
                        if n == 0 {
                            return Poll::Ready(Ok(0));
                        }
                        *filled += n;
                    }
                    let len = u16::from_be_bytes(*len_buf) as usize;
                    this.read_state = ReadState::Body { len, buf: vec![0u8; len], filled: 0 };
                }
                ReadState::Body { len, buf: body_buf, filled } => {
                    while *filled < *len {
                        let n = ready!(Pin::new(&mut this.io).poll_read(cx, &mut body_buf[*filled..]))?;
                        if n == 0 {
                            return Poll::Ready(Err(io::Error::from(io::ErrorKind::UnexpectedEof)));
                        }
                        *filled += n;
                    }

                    let ciphertext = std::mem::take(body_buf);
                    let mut plaintext = vec![0u8; ciphertext.len()];
                    let plain_len = this
                        .state
                        .read_message(&ciphertext, &mut plaintext)
                        .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
                    plaintext.truncate(plain_len);

                    this.read_buffer = plaintext;
                    this.read_offset = 0;
                    this.read_state = ReadState::Length { buf: [0u8; 2], filled: 0 };
                }
            }
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncWrite for NoiseSocket<S> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        loop {
            match &mut this.write_state {
                WriteState::Idle => {
                    if buf.is_empty() {
                        return Poll::Ready(Ok(0));
                    }
                    let chunk_len = std::cmp::min(buf.len(), MAX_PLAINTEXT_LEN);

                    let mut framed = vec![0u8; 2 + chunk_len + 16];
                    let cipher_len = this
                        .state
                        .write_message(&buf[..chunk_len], &mut framed[2..])
                        .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
                    let frame_len = u16::try_from(cipher_len)
                        .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
                    framed[..2].copy_from_slice(&frame_len.to_be_bytes());
                    framed.truncate(2 + cipher_len);

                    this.write_state = WriteState::Writing {
                        buf: framed,
                        written: 0,
                        plaintext_len: chunk_len,
                    };
                }
                WriteState::Writing { buf: frame, written, plaintext_len } => {
                    while *written < frame.len() {
                        let n = ready!(Pin::new(&mut this.io).poll_write(cx, &frame[*written..]))?;
                        if n == 0 {
                            return Poll::Ready(Err(io::Error::from(io::ErrorKind::WriteZero)));
                        }
                        *written += n;
                    }
                    let plaintext_len = *plaintext_len;
                    this.write_state = WriteState::Idle;
                    return Poll::Ready(Ok(plaintext_len));
                }
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            match &mut this.write_state {
                WriteState::Idle => return Pin::new(&mut this.io).poll_flush(cx),
                WriteState::Writing { buf: frame, written, .. } => {
                    while *written < frame.len() {
                        let n = ready!(Pin::new(&mut this.io).poll_write(cx, &frame[*written..]))?;
                        if n == 0 {
                            return Poll::Ready(Err(io::Error::from(io::ErrorKind::WriteZero)));
                        }
                        *written += n;
                    }
                    this.write_state = WriteState::Idle;
                }
            }
        }
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        ready!(self.as_mut().poll_flush(cx))?;
        Pin::new(&mut self.get_mut().io).poll_close(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handshake_over_an_in_memory_duplex_yields_matching_peer_ids() {
        let (dialer_io, listener_io) = futures_ringbuf::Endpoint::pair(4096, 4096);

        let dialer_keys = ed25519::Keypair::generate();
        let listener_keys = ed25519::Keypair::generate();
        let expected_dialer_peer =
            PeerId::from_public_key(&crate::crypto::PublicKey::Ed25519(dialer_keys.public()));
        let expected_listener_peer =
            PeerId::from_public_key(&crate::crypto::PublicKey::Ed25519(listener_keys.public()));

        let dialer = handshake(dialer_io, NoiseConfiguration::new(&dialer_keys, Role::Dialer));
        let listener = handshake(listener_io, NoiseConfiguration::new(&listener_keys, Role::Listener));

        let (dialer_result, listener_result) = tokio::join!(dialer, listener);
        let (mut dialer_socket, dialer_saw_peer) = dialer_result.unwrap();
        let (mut listener_socket, listener_saw_peer) = listener_result.unwrap();

        assert_eq!(dialer_saw_peer, expected_listener_peer);
        assert_eq!(listener_saw_peer, expected_dialer_peer);

        dialer_socket.write_frame(b"hello from dialer").await.unwrap();
        let received = listener_socket.read_frame().await.unwrap();
        assert_eq!(received, b"hello from dialer");
    }
}
