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

//! Stream multiplexing seam: negotiated once per connection, then used to open outbound and
//! accept inbound application-protocol streams (spec §4.2, §6).

pub mod yamux;

use crate::{connection::AsyncReadWrite, error::Error, types::{Direction, ProtocolName}};

use async_trait::async_trait;

use std::{sync::Arc, time::Duration};

/// Options accepted by [`MuxerHandle::close`].
#[derive(Default, Clone, Copy)]
pub struct CloseOpts {
    pub timeout: Option<Duration>,
}

/// A running multiplexer session bound to one upgraded connection.
///
/// Object-safe by design: the `Upgrader` only ever holds this behind `Arc<dyn MuxerHandle>`,
/// since the concrete muxer type varies per negotiated `/yamux/1.0.0`-style capability.
#[async_trait]
pub trait MuxerHandle: Send + Sync {
    /// Open a new outbound substream. Returns a raw byte stream; protocol negotiation on top of
    /// it is [`crate::connection::Connection::new_stream`]'s job, not the muxer's.
    async fn open_stream(&self) -> Result<Box<dyn AsyncReadWrite>, Error>;

    /// Yield the next inbound substream accepted by the remote, or `None` once the session is
    /// closed and no further streams will arrive.
    async fn accept_stream(&self) -> Option<Box<dyn AsyncReadWrite>>;

    /// Close gracefully, letting in-flight streams drain per the muxer's own policy.
    async fn close(&self, options: CloseOpts) -> Result<(), Error>;

    /// Abort immediately; `err` is informational only (surfaced in logs).
    fn abort(&self, err: Error);

    fn protocol(&self) -> &ProtocolName;
}

/// Negotiates and constructs a [`MuxerHandle`] for one connection direction.
#[async_trait]
pub trait StreamMuxerFactory: Send + Sync {
    fn protocol(&self) -> &ProtocolName;

    async fn create(
        &self,
        io: Box<dyn AsyncReadWrite>,
        direction: Direction,
    ) -> Result<Arc<dyn MuxerHandle>, Error>;
}
