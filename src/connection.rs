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

//! The lifecycle wrapper the [`crate::upgrade::Upgrader`] hands back to callers (spec §3/§4.3).

use crate::{
    error::Error,
    events::EventBus,
    negotiate,
    peer_id::PeerId,
    registrar::Registrar,
    types::{ConnectionId, Direction, SubstreamId},
    upgrade::muxer::{CloseOpts, MuxerHandle},
};

use futures::io::{AsyncRead, AsyncWrite};
use multiaddr::Multiaddr;
use parking_lot::Mutex;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::SystemTime,
};

/// Logging target for the file.
const LOG_TARGET: &str = "connection";

/// Where a [`Connection`] currently sits in its `open -> closing -> closed` lifecycle
/// (spec §4.3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Open,
    Closing,
    Closed,
}

/// Timestamps marking a [`Connection`]'s lifecycle transitions (spec §3).
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    pub open: Option<SystemTime>,
    pub upgraded: Option<SystemTime>,
    pub close: Option<SystemTime>,
}

/// A bidirectional byte channel bound to a [`Connection`], with an agreed protocol capability
/// (spec §3). `io` is boxed because it may be a negotiated muxed substream or, for
/// `skipEncryption`/no-muxer paths exercised only in tests, a plain in-memory duplex.
pub struct Stream {
    id: SubstreamId,
    protocol: crate::types::ProtocolName,
    direction: Direction,
    timeline: Timeline,
    io: Box<dyn AsyncReadWrite>,
    /// Back-reference used only to decrement the owning connection's per-protocol stream
    /// count when this stream is dropped; absent for streams built in isolation by tests.
    owner: Option<Connection>,
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.take() {
            owner.note_stream_closed(&self.protocol, self.direction);
        }
    }
}

/// Convenience bound alias for a boxed bidirectional byte stream.
pub trait AsyncReadWrite: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncReadWrite for T {}

impl Stream {
    pub fn protocol(&self) -> &crate::types::ProtocolName {
        &self.protocol
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn id(&self) -> SubstreamId {
        self.id
    }

    pub fn into_io(self) -> Box<dyn AsyncReadWrite> {
        self.io
    }

    pub fn close(&mut self) {
        self.timeline.close = Some(SystemTime::now());
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("protocol", &self.protocol)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

/// Options accepted by [`Connection::new_stream`].
#[derive(Default)]
pub struct NewStreamOptions {
    /// Caller-supplied cancellation; if absent, a default 30s timeout applies (spec §4.2).
    pub timeout: Option<std::time::Duration>,
}

/// Options accepted by [`Connection::close`].
#[derive(Default, Clone, Copy)]
pub struct CloseOptions {
    pub timeout: Option<std::time::Duration>,
}

static NEXT_SUBSTREAM_ID: AtomicUsize = AtomicUsize::new(0);

struct ConnectionInner {
    id: ConnectionId,
    remote_addr: Multiaddr,
    remote_peer: PeerId,
    direction: Direction,
    encryption: crate::types::ProtocolName,
    multiplexer: Option<crate::types::ProtocolName>,
    transient: bool,
    timeline: Mutex<Timeline>,
    status: Mutex<ConnectionStatus>,
    muxer: Option<Arc<dyn MuxerHandle>>,
    /// Open-stream counts per (protocol, direction), enforced against the registrar's caps
    /// (spec invariant 3).
    stream_counts: Mutex<HashMap<(crate::types::ProtocolName, Direction), usize>>,
    registrar: Arc<dyn Registrar>,
    peer_store: Arc<dyn crate::peer_store::PeerStore>,
    events: EventBus,
}

/// A thin, carefully-defined handle over one upgraded connection (spec §4.3).
///
/// Cloning a [`Connection`] clones the handle, not the connection: all clones observe the same
/// lifecycle and share the same stream-cap bookkeeping.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ConnectionId,
        remote_addr: Multiaddr,
        remote_peer: PeerId,
        direction: Direction,
        encryption: crate::types::ProtocolName,
        multiplexer: Option<crate::types::ProtocolName>,
        transient: bool,
        muxer: Option<Arc<dyn MuxerHandle>>,
        registrar: Arc<dyn Registrar>,
        peer_store: Arc<dyn crate::peer_store::PeerStore>,
        events: EventBus,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                remote_addr,
                remote_peer,
                direction,
                encryption,
                multiplexer,
                transient,
                timeline: Mutex::new(Timeline {
                    open: Some(now),
                    upgraded: Some(now),
                    close: None,
                }),
                status: Mutex::new(ConnectionStatus::Open),
                muxer,
                stream_counts: Mutex::new(HashMap::new()),
                registrar,
                peer_store,
                events,
            }),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn remote_addr(&self) -> &Multiaddr {
        &self.inner.remote_addr
    }

    pub fn remote_peer(&self) -> &PeerId {
        &self.inner.remote_peer
    }

    pub fn direction(&self) -> Direction {
        self.inner.direction
    }

    pub fn encryption(&self) -> &crate::types::ProtocolName {
        &self.inner.encryption
    }

    pub fn multiplexer(&self) -> Option<&crate::types::ProtocolName> {
        self.inner.multiplexer.as_ref()
    }

    pub fn transient(&self) -> bool {
        self.inner.transient
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.lock()
    }

    pub fn timeline(&self) -> Timeline {
        self.inner.timeline.lock().clone()
    }

    fn stream_count(&self, protocol: &crate::types::ProtocolName, direction: Direction) -> usize {
        *self
            .inner
            .stream_counts
            .lock()
            .get(&(protocol.clone(), direction))
            .unwrap_or(&0)
    }

    fn bump_stream_count(&self, protocol: &crate::types::ProtocolName, direction: Direction, delta: i64) {
        let mut counts = self.inner.stream_counts.lock();
        let entry = counts.entry((protocol.clone(), direction)).or_insert(0);
        *entry = (*entry as i64 + delta).max(0) as usize;
    }

    /// Open a new outbound stream negotiating one of `protocols` (spec §4.2).
    ///
    /// Fails with [`Error::ConnectionNotMultiplexed`] if this connection has no negotiated
    /// muxer (spec invariant 2), and with [`Error::TooManyOutboundProtocolStreams`] once the
    /// per-protocol outbound cap is reached -- checked with `>=` (spec §9 open question: the
    /// outbound side compares after the fact, unlike the inbound `==` check).
    pub async fn new_stream(
        &self,
        protocols: Vec<String>,
        options: NewStreamOptions,
    ) -> Result<Stream, Error> {
        let Some(muxer) = self.inner.muxer.as_ref() else {
            return Err(Error::ConnectionNotMultiplexed);
        };

        let timeout = options.timeout.unwrap_or(std::time::Duration::from_secs(30));
        let raw = tokio::time::timeout(timeout, muxer.open_stream())
            .await
            .map_err(|_| Error::Timeout)??;

        let negotiate_fut = negotiate::select(raw, protocols);
        let negotiated =
            tokio::time::timeout(timeout, negotiate_fut).await.map_err(|_| Error::Timeout)??;

        let protocol_name = crate::types::ProtocolName::from(negotiated.protocol.as_str());

        let limit = self
            .inner
            .registrar
            .get_handler(&protocol_name)
            .map(|h| h.options.max_outbound_streams)
            .unwrap_or(crate::registrar::DEFAULT_STREAM_LIMIT);

        // NB: `>=` on the outbound side, per spec §9's documented asymmetry with inbound's
        // strict `==` check. The negotiated stream is simply dropped here, closing it; there
        // is no separate muxer-level reset needed for this crate's `yamux` backing.
        if self.stream_count(&protocol_name, Direction::Outbound) >= limit {
            drop(negotiated.stream);
            return Err(Error::TooManyOutboundProtocolStreams(protocol_name));
        }

        self.inner.peer_store.merge_protocols(&self.inner.remote_peer, &[protocol_name.clone()]);
        self.bump_stream_count(&protocol_name, Direction::Outbound, 1);

        let id = SubstreamId::next(&NEXT_SUBSTREAM_ID);
        Ok(Stream {
            id,
            protocol: protocol_name,
            direction: Direction::Outbound,
            timeline: Timeline {
                open: Some(SystemTime::now()),
                upgraded: None,
                close: None,
            },
            io: Box::new(negotiated.stream),
            owner: Some(self.clone()),
        })
    }

    /// Called by the [`crate::upgrade::Upgrader`]'s `onIncomingStream` routing for every
    /// muxed stream accepted on this connection (spec §4.2).
    ///
    /// Enforces the per-protocol inbound cap with a strict `==` check against the *current*
    /// count (i.e. before this stream is added) -- spec §9's documented asymmetry with the
    /// outbound `>=` check in [`Connection::new_stream`].
    pub(crate) fn accept_incoming_stream(
        &self,
        protocol_name: crate::types::ProtocolName,
        io: Box<dyn AsyncReadWrite>,
    ) -> Result<Stream, Error> {
        let limit = self
            .inner
            .registrar
            .get_handler(&protocol_name)
            .map(|h| h.options.max_inbound_streams)
            .unwrap_or(crate::registrar::DEFAULT_STREAM_LIMIT);

        if self.stream_count(&protocol_name, Direction::Inbound) == limit {
            return Err(Error::TooManyInboundProtocolStreams(protocol_name));
        }

        self.inner.peer_store.merge_protocols(&self.inner.remote_peer, &[protocol_name.clone()]);
        self.bump_stream_count(&protocol_name, Direction::Inbound, 1);

        let id = SubstreamId::next(&NEXT_SUBSTREAM_ID);
        Ok(Stream {
            id,
            protocol: protocol_name,
            direction: Direction::Inbound,
            timeline: Timeline {
                open: Some(SystemTime::now()),
                upgraded: None,
                close: None,
            },
            io,
            owner: Some(self.clone()),
        })
    }

    /// Number of currently-open streams (used by tests asserting stream-cap invariants).
    pub fn get_streams(&self) -> HashMap<(crate::types::ProtocolName, Direction), usize> {
        self.inner.stream_counts.lock().clone()
    }

    pub(crate) fn note_stream_closed(&self, protocol: &crate::types::ProtocolName, direction: Direction) {
        self.bump_stream_count(protocol, direction, -1);
    }

    /// Gracefully close: close the raw transport, then (if present) the muxer, letting
    /// remaining streams drain per the muxer's own policy (spec §4.2).
    pub async fn close(&self, options: CloseOptions) {
        {
            let mut status = self.inner.status.lock();
            if *status == ConnectionStatus::Closed {
                return;
            }
            *status = ConnectionStatus::Closing;
        }

        if let Some(muxer) = &self.inner.muxer {
            let opts = CloseOpts {
                timeout: options.timeout,
            };
            if let Err(error) = muxer.close(opts).await {
                tracing::debug!(target: LOG_TARGET, ?error, "muxer close failed");
            }
        }

        self.finish_close();
    }

    /// Abort immediately: both the raw transport and the muxer (spec §4.2).
    pub fn abort(&self, err: Error) {
        tracing::debug!(target: LOG_TARGET, ?err, connection = ?self.inner.id, "aborting connection");

        {
            let mut status = self.inner.status.lock();
            if *status == ConnectionStatus::Closed {
                return;
            }
            *status = ConnectionStatus::Closed;
        }

        if let Some(muxer) = &self.inner.muxer {
            muxer.abort(err);
        }

        {
            let mut timeline = self.inner.timeline.lock();
            if timeline.close.is_none() {
                timeline.close = Some(SystemTime::now());
            }
        }

        // `status` was just flipped from non-Closed to Closed above under the same lock
        // acquisition, so this fires exactly once per connection (spec invariant 5).
        self.inner.events.emit_close(self.clone());
    }

    /// Guards against a concurrent `close()`/`abort()` pair (or two overlapping `close()`
    /// calls) both reaching here: only the transition that actually lands on `Closed` emits
    /// (spec invariant 5: "at most once per Connection").
    fn finish_close(&self) {
        {
            let mut status = self.inner.status.lock();
            if *status == ConnectionStatus::Closed {
                return;
            }
            *status = ConnectionStatus::Closed;
        }

        {
            let mut timeline = self.inner.timeline.lock();
            if timeline.close.is_none() {
                timeline.close = Some(SystemTime::now());
            }
        }

        self.inner.events.emit_close(self.clone());
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("remote_addr", &self.inner.remote_addr)
            .field("remote_peer", &self.inner.remote_peer)
            .field("direction", &self.inner.direction)
            .field("status", &*self.inner.status.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::ConnectionEvent,
        peer_store::MemoryPeerStore,
        registrar::{ProtocolHandlerOptions, StaticRegistrar},
    };

    fn fresh_connection(
        registrar: Arc<dyn Registrar>,
        muxer: Option<Arc<dyn MuxerHandle>>,
    ) -> (Connection, EventBus) {
        let events = EventBus::new();
        let connection = Connection::new(
            ConnectionId::next(&AtomicUsize::new(0)),
            "/ip4/127.0.0.1/tcp/4001".parse().unwrap(),
            PeerId::random(),
            Direction::Outbound,
            crate::types::ProtocolName::from("noise"),
            muxer.as_ref().map(|_| crate::types::ProtocolName::from("yamux")),
            false,
            muxer,
            registrar,
            Arc::new(MemoryPeerStore::new()),
            events.clone(),
        );
        (connection, events)
    }

    /// Spec testable property 5: "on a Connection constructed with no muxer factory,
    /// `newStream` always fails with `CONNECTION_NOT_MULTIPLEXED` regardless of arguments."
    #[tokio::test]
    async fn new_stream_without_muxer_always_fails() {
        let (connection, _events) = fresh_connection(Arc::new(StaticRegistrar::new()), None);

        let result = connection.new_stream(vec!["/any/1.0.0".to_string()], NewStreamOptions::default()).await;
        assert!(matches!(result, Err(Error::ConnectionNotMultiplexed)));

        let result = connection.new_stream(vec![], NewStreamOptions::default()).await;
        assert!(matches!(result, Err(Error::ConnectionNotMultiplexed)));
    }

    fn fake_io() -> Box<dyn AsyncReadWrite> {
        let (a, _b) = futures_ringbuf::Endpoint::pair(16, 16);
        Box::new(a)
    }

    /// Spec testable property 3: opening `limit + 1` concurrent inbound streams of a protocol
    /// aborts the `(limit + 1)`-th with `TOO_MANY_INBOUND_PROTOCOL_STREAMS`, while the first
    /// `limit` survive. Uses the strict `==` comparison against the *pre-insertion* count
    /// (spec §9's documented inbound/outbound asymmetry).
    #[tokio::test]
    async fn inbound_stream_cap_rejects_the_one_past_the_limit() {
        let protocol = crate::types::ProtocolName::from("/ping/1.0.0");
        let mut registrar = StaticRegistrar::new();
        registrar.register(
            protocol.clone(),
            Arc::new(NoopHandler),
            ProtocolHandlerOptions { max_inbound_streams: 2, max_outbound_streams: 2, run_on_transient_connection: true },
        );
        let (connection, _events) = fresh_connection(Arc::new(registrar), None);

        let first = connection.accept_incoming_stream(protocol.clone(), fake_io()).unwrap();
        let second = connection.accept_incoming_stream(protocol.clone(), fake_io()).unwrap();
        let third = connection.accept_incoming_stream(protocol.clone(), fake_io());

        assert!(matches!(third, Err(Error::TooManyInboundProtocolStreams(_))));
        assert_eq!(connection.stream_count(&protocol, Direction::Inbound), 2);

        drop(first);
        drop(second);
        // Dropping each `Stream` releases its slot (spec §4.2 `onIncomingStream` bookkeeping).
        assert_eq!(connection.stream_count(&protocol, Direction::Inbound), 0);
    }

    struct NoopHandler;
    impl crate::registrar::ProtocolHandler for NoopHandler {
        fn on_inbound_stream(&self, _connection: Connection, _stream: Stream) {}
    }

    /// Spec invariant 5 / testable property 6: `connection:close` fires at most once, even
    /// when `close()` is invoked twice concurrently.
    #[tokio::test]
    async fn close_emits_at_most_once_even_when_called_twice() {
        let (connection, events) = fresh_connection(Arc::new(StaticRegistrar::new()), None);
        let mut subscriber = events.subscribe();

        tokio::join!(connection.close(CloseOptions::default()), connection.close(CloseOptions::default()));

        let mut close_events = 0;
        while let Ok(event) = subscriber.try_recv() {
            if matches!(event, ConnectionEvent::Close(_)) {
                close_events += 1;
            }
        }
        assert_eq!(close_events, 1);
        assert_eq!(connection.status(), ConnectionStatus::Closed);
    }

    /// Same guarantee when `close()` races `abort()` instead of itself.
    #[tokio::test]
    async fn close_and_abort_racing_still_emit_once() {
        let (connection, events) = fresh_connection(Arc::new(StaticRegistrar::new()), None);
        let mut subscriber = events.subscribe();

        let closer = connection.clone();
        let aborter = connection.clone();
        tokio::join!(closer.close(CloseOptions::default()), async move {
            aborter.abort(Error::Abort)
        });

        let mut close_events = 0;
        while let Ok(event) = subscriber.try_recv() {
            if matches!(event, ConnectionEvent::Close(_)) {
                close_events += 1;
            }
        }
        assert_eq!(close_events, 1);
    }
}
