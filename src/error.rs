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

//! Crate-wide error kinds.

use crate::{peer_id::PeerId, types::ProtocolName};

use multiaddr::Multiaddr;
use multihash::Multihash;

use std::io::{self, ErrorKind};

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error kinds produced by the dial queue, upgrader and connection layer.
///
/// Variant names mirror the stable error-kind identifiers of the contract this crate
/// implements (e.g. `DIALED_SELF` -> [`Error::DialedSelf`]) so that callers can match on
/// a kind without parsing display strings.
///
/// `Clone` is derived so that [`crate::dial::DialQueue`] can broadcast one terminal `Result`
/// to every caller joined onto the same in-flight dial (spec §4.1 step 4: "return that dial's
/// completion future (shared)") without boxing the error behind an `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("connection denied by gater")]
    ConnectionDenied,
    #[error("connection intercepted by gater")]
    ConnectionIntercepted,
    #[error("tried to dial the local peer")]
    DialedSelf,
    #[error("gater intercepted dial of peer `{0}`")]
    PeerDialIntercepted(PeerId),
    #[error("no valid addresses remained after filtering")]
    NoValidAddresses,
    #[error("too many candidate addresses ({0} > {1})")]
    TooManyAddresses(usize, usize),
    #[error("invalid multiaddr: `{0}`")]
    InvalidMultiaddr(Multiaddr),
    #[error("invalid peer id: expected `{expected}`, got `{got}`")]
    InvalidPeer { expected: PeerId, got: PeerId },
    #[error("invalid peer id: no peer identity available for this dial")]
    InvalidPeerMissing,
    #[error("invalid parameters: `{0}`")]
    InvalidParameters(String),
    #[error("encryption handshake failed: `{0}`")]
    EncryptionFailed(String),
    #[error("no configured muxer was accepted by the remote: `{0}`")]
    MuxerUnavailable(String),
    #[error("connection has no negotiated multiplexer")]
    ConnectionNotMultiplexed,
    #[error("protocol `{0:?}` does not run on transient connections")]
    TransientConnection(ProtocolName),
    #[error("too many inbound streams for protocol `{0:?}`")]
    TooManyInboundProtocolStreams(ProtocolName),
    #[error("too many outbound streams for protocol `{0:?}`")]
    TooManyOutboundProtocolStreams(ProtocolName),
    #[error("remote does not support any of the offered protocols")]
    UnsupportedProtocol,
    #[error("operation timed out")]
    Timeout,
    #[error("no handler registered for protocol `{0:?}`")]
    NoHandlerForProtocol(ProtocolName),
    #[error("transport dial failed: `{0}`")]
    TransportDialFailed(String),
    #[error("operation aborted")]
    Abort,

    #[error("address error: `{0}`")]
    AddressError(#[from] AddressError),
    #[error("negotiation error: `{0}`")]
    NegotiationError(#[from] NegotiationError),
    #[error("substream error: `{0}`")]
    SubstreamError(#[from] SubstreamError),
    #[error("i/o error: `{0:?}`")]
    IoError(ErrorKind),
    #[error("essential task closed")]
    EssentialTaskClosed,
    #[error("dial failed: `{0}`")]
    Dial(#[from] DialError),
}

/// Errors raised while parsing or validating a [`crate::address::Address`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address uses a transport protocol this node does not support")]
    InvalidProtocol,
    #[error("address is missing a trailing peer id")]
    PeerIdMissing,
    #[error("address multihash does not decode to a valid peer id: `{0:?}`")]
    InvalidPeerId(Multihash),
    #[error("no known address for peer")]
    AddressNotAvailable,
}

/// Errors raised while negotiating a capability (encrypter, muxer or application protocol).
///
/// The two external error types this crate would otherwise wrap directly
/// (`multistream_select::NegotiationError`, `snow::Error`) are neither `Clone` nor `Eq`, so they
/// are flattened to their `Display` string here; that string is still surfaced to the caller via
/// [`Error::EncryptionFailed`]/[`Error::MuxerUnavailable`] before it would otherwise be consulted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    #[error("multistream-select error: `{0}`")]
    MultistreamSelect(String),
    #[error("noise handshake error: `{0}`")]
    Noise(String),
    #[error("peer id missing from handshake payload")]
    PeerIdMissing,
    #[error("remote identity signature did not verify")]
    BadSignature,
    #[error("peer id mismatch: expected `{expected}`, got `{got}`")]
    PeerIdMismatch { expected: PeerId, got: PeerId },
    #[error("i/o error: `{0:?}`")]
    IoError(ErrorKind),
    #[error("timed out negotiating capability")]
    Timeout,
}

impl From<multistream_select::NegotiationError> for NegotiationError {
    fn from(error: multistream_select::NegotiationError) -> Self {
        NegotiationError::MultistreamSelect(error.to_string())
    }
}

impl From<snow::Error> for NegotiationError {
    fn from(error: snow::Error) -> Self {
        NegotiationError::Noise(error.to_string())
    }
}

/// Errors raised while reading or writing an application-protocol stream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubstreamError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("channel clogged")]
    ChannelClogged,
    #[error("i/o error: `{0:?}`")]
    IoError(ErrorKind),
    #[error("failed to read from substream")]
    ReadFailure,
    #[error("failed to write to substream")]
    WriteFailure,
}

/// Errors surfaced by [`crate::dial::DialQueue::dial`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum DialError {
    #[error("dial timed out")]
    Timeout,
    #[error("all candidate addresses failed: {0:?}")]
    Aggregate(Vec<(Multiaddr, Error)>),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::IoError(error.kind())
    }
}

impl From<io::Error> for NegotiationError {
    fn from(error: io::Error) -> Self {
        NegotiationError::IoError(error.kind())
    }
}

impl From<io::Error> for SubstreamError {
    fn from(error: io::Error) -> SubstreamError {
        SubstreamError::IoError(error.kind())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::EssentialTaskClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::EssentialTaskClosed
    }
}

impl From<Multihash> for AddressError {
    fn from(hash: Multihash) -> Self {
        AddressError::InvalidPeerId(hash)
    }
}
