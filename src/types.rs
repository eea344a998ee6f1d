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

//! Small newtype identifiers shared across the crate.

use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Capability string identifying an application protocol, an encrypter or a muxer.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtocolName(smallvec::SmallVec<[u8; 32]>);

impl ProtocolName {
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("<invalid-utf8>")
    }
}

impl From<&str> for ProtocolName {
    fn from(value: &str) -> Self {
        Self(smallvec::SmallVec::from_slice(value.as_bytes()))
    }
}

impl From<String> for ProtocolName {
    fn from(value: String) -> Self {
        Self(smallvec::SmallVec::from_slice(value.as_bytes()))
    }
}

impl fmt::Display for ProtocolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one attempt at establishing a connection, dialed or inbound.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConnectionId(usize);

impl ConnectionId {
    pub fn next(counter: &AtomicUsize) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<usize> for ConnectionId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Identifies one substream opened on a [`crate::connection::Connection`].
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubstreamId(usize);

impl SubstreamId {
    pub fn next(counter: &AtomicUsize) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<usize> for SubstreamId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl fmt::Display for SubstreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubstreamId({})", self.0)
    }
}

/// Direction in which a connection or stream was established.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Opaque identifier of a [`crate::dial::PendingDial`].
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct DialId(String);

impl DialId {
    pub fn random() -> Self {
        use rand::Rng;
        let bytes: [u8; 16] = rand::thread_rng().gen();
        Self(bs58::encode(bytes).into_string())
    }
}

impl fmt::Display for DialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
