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

//! `/yamux/1.0.0` backed [`StreamMuxerFactory`]/[`MuxerHandle`].
//!
//! `yamux::Connection` has no cloneable control handle in this crate's pinned release; both
//! inbound acceptance and outbound stream opening are polling operations that require `&mut
//! Connection`, so exactly one task -- [`drive`] -- owns it. `YamuxHandle::open_stream` asks
//! that task to open a stream over an mpsc channel and awaits the answer on a oneshot, the same
//! shape rust-libp2p's yamux wrapper uses to turn a poll-based session into one a multiplexed
//! `Connection` can call into from many tasks at once.

use super::{CloseOpts, MuxerHandle, StreamMuxerFactory};
use crate::{connection::AsyncReadWrite, error::Error, types::{Direction, ProtocolName}};

use async_trait::async_trait;
use futures::future::poll_fn;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use yamux::{Config, Connection, ConnectionError, Mode};

use std::{
    sync::Arc,
    task::{Context, Poll},
};

/// Logging target for the file.
const LOG_TARGET: &str = "upgrade::muxer::yamux";

/// Bound on buffered-but-not-yet-accepted inbound streams before the muxer applies backpressure
/// on the remote by pausing reads.
const INCOMING_STREAM_BUFFER: usize = 256;

/// Bound on outstanding open/close requests queued to [`drive`].
const REQUEST_BUFFER: usize = 32;

/// Negotiates `/yamux/1.0.0` and spins up a [`YamuxHandle`] for the connection.
pub struct YamuxMuxerFactory {
    protocol: ProtocolName,
    config: Config,
}

impl YamuxMuxerFactory {
    pub fn new() -> Self {
        Self {
            protocol: ProtocolName::from("/yamux/1.0.0"),
            config: Config::default(),
        }
    }
}

impl Default for YamuxMuxerFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamMuxerFactory for YamuxMuxerFactory {
    fn protocol(&self) -> &ProtocolName {
        &self.protocol
    }

    async fn create(
        &self,
        io: Box<dyn AsyncReadWrite>,
        direction: Direction,
    ) -> Result<Arc<dyn MuxerHandle>, Error> {
        let mode = match direction {
            Direction::Outbound => Mode::Client,
            Direction::Inbound => Mode::Server,
        };

        let connection = Connection::new(io, self.config.clone(), mode);
        Ok(Arc::new(YamuxHandle::spawn(connection, self.protocol.clone())))
    }
}

/// What [`drive`] is asked to do on behalf of a [`YamuxHandle`] call.
enum DriveRequest {
    Open(oneshot::Sender<Result<yamux::Stream, ConnectionError>>),
    Close(oneshot::Sender<Result<(), ConnectionError>>),
}

/// One iteration's outcome inside [`drive`]'s poll loop.
enum DriveEvent {
    NewRequest(Option<DriveRequest>),
    Opened(Result<yamux::Stream, ConnectionError>),
    Inbound(Option<Result<yamux::Stream, ConnectionError>>),
}

/// The sole task allowed to touch the underlying [`Connection`]; services outbound-open and
/// close requests from [`YamuxHandle`] and forwards inbound substreams to `inbound`, until the
/// remote closes the session, an error occurs, every [`YamuxHandle`] is dropped, or `shutdown`
/// fires (spec §4.3: `abort` tears the muxer down immediately).
async fn drive(
    mut connection: Connection<Box<dyn AsyncReadWrite>>,
    mut requests: mpsc::Receiver<DriveRequest>,
    inbound: mpsc::Sender<Box<dyn AsyncReadWrite>>,
    shutdown: CancellationToken,
) {
    let mut pending_open: Option<oneshot::Sender<Result<yamux::Stream, ConnectionError>>> = None;

    loop {
        let has_pending_open = pending_open.is_some();
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            event = poll_fn(|cx: &mut Context<'_>| {
                if has_pending_open {
                    if let Poll::Ready(result) = connection.poll_new_outbound(cx) {
                        return Poll::Ready(DriveEvent::Opened(result));
                    }
                } else if let Poll::Ready(request) = requests.poll_recv(cx) {
                    return Poll::Ready(DriveEvent::NewRequest(request));
                }

                match connection.poll_next_inbound(cx) {
                    Poll::Ready(item) => Poll::Ready(DriveEvent::Inbound(item)),
                    Poll::Pending => Poll::Pending,
                }
            }) => event,
        };

        match event {
            DriveEvent::NewRequest(Some(DriveRequest::Open(reply))) => {
                pending_open = Some(reply);
            }
            DriveEvent::NewRequest(Some(DriveRequest::Close(reply))) => {
                let result = poll_fn(|cx| connection.poll_close(cx)).await;
                let _ = reply.send(result);
            }
            DriveEvent::NewRequest(None) => break,
            DriveEvent::Opened(result) => {
                if let Some(reply) = pending_open.take() {
                    let _ = reply.send(result);
                }
            }
            DriveEvent::Inbound(Some(Ok(stream))) => {
                if inbound.send(Box::new(stream)).await.is_err() {
                    tracing::debug!(
                        target: LOG_TARGET,
                        "inbound stream channel receiver dropped, closing pump"
                    );
                    break;
                }
            }
            DriveEvent::Inbound(Some(Err(error))) => {
                tracing::debug!(target: LOG_TARGET, %error, "yamux connection error");
                break;
            }
            DriveEvent::Inbound(None) => break,
        }
    }
}

/// A running yamux session. `requests` hands outbound-open and close work to [`drive`];
/// `inbound` is the channel that task forwards accepted substreams onto; `shutdown` lets
/// [`MuxerHandle::abort`] tear the session down immediately without waiting on `drive`'s own
/// cooperative loop.
struct YamuxHandle {
    requests: mpsc::Sender<DriveRequest>,
    inbound: AsyncMutex<mpsc::Receiver<Box<dyn AsyncReadWrite>>>,
    shutdown: CancellationToken,
    protocol: ProtocolName,
}

impl YamuxHandle {
    fn spawn(connection: Connection<Box<dyn AsyncReadWrite>>, protocol: ProtocolName) -> Self {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(INCOMING_STREAM_BUFFER);
        let shutdown = CancellationToken::new();

        tokio::spawn(drive(connection, request_rx, inbound_tx, shutdown.clone()));

        Self {
            requests: request_tx,
            inbound: AsyncMutex::new(inbound_rx),
            shutdown,
            protocol,
        }
    }
}

#[async_trait]
impl MuxerHandle for YamuxHandle {
    async fn open_stream(&self) -> Result<Box<dyn AsyncReadWrite>, Error> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(DriveRequest::Open(reply_tx))
            .await
            .map_err(|_| Error::MuxerUnavailable("yamux connection closed".into()))?;

        let stream = reply_rx
            .await
            .map_err(|_| Error::MuxerUnavailable("yamux connection closed".into()))?
            .map_err(|error| Error::MuxerUnavailable(error.to_string()))?;

        Ok(Box::new(stream))
    }

    async fn accept_stream(&self) -> Option<Box<dyn AsyncReadWrite>> {
        let mut inbound = self.inbound.lock().await;
        inbound.recv().await
    }

    async fn close(&self, _options: CloseOpts) -> Result<(), Error> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.requests.send(DriveRequest::Close(reply_tx)).await.is_err() {
            // The drive task is already gone; nothing left to close gracefully.
            return Ok(());
        }

        match reply_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(Error::MuxerUnavailable(error.to_string())),
            Err(_) => Ok(()),
        }
    }

    /// Cancels [`drive`] directly rather than queuing a request behind it: an abort must not
    /// wait for the driver's cooperative poll loop to notice anything (spec §4.3, "aborts both
    /// immediately"). Dropping the task's `Connection` closes the underlying transport.
    fn abort(&self, err: Error) {
        tracing::debug!(target: LOG_TARGET, %err, "aborting yamux connection");
        self.shutdown.cancel();
    }

    fn protocol(&self) -> &ProtocolName {
        &self.protocol
    }
}
