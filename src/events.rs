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

//! Connection lifecycle event bus (`connection:open` / `connection:close`, spec §3/§6).

use crate::connection::Connection;

use tokio::sync::broadcast;

/// Logging target for the file.
const LOG_TARGET: &str = "events";

/// Default channel depth; an idle listener lagging past this loses the oldest events, which
/// `tokio::sync::broadcast` surfaces as [`broadcast::error::RecvError::Lagged`].
const DEFAULT_CHANNEL_SIZE: usize = 1024;

/// One lifecycle transition of a [`Connection`].
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Fired exactly once, when a [`Connection`] becomes observable (spec invariant 4).
    Open(Connection),
    /// Fired at most once, on the connection's terminal transition (spec invariant 5).
    Close(Connection),
}

/// Broadcast bus for [`ConnectionEvent`]s, delivered to listeners in registration order
/// (spec §5: "both are delivered in registration order to listeners").
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ConnectionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit_open(&self, connection: Connection) {
        tracing::trace!(target: LOG_TARGET, connection = ?connection.id(), "connection:open");
        let _ = self.tx.send(ConnectionEvent::Open(connection));
    }

    pub(crate) fn emit_close(&self, connection: Connection) {
        tracing::trace!(target: LOG_TARGET, connection = ?connection.id(), "connection:close");
        let _ = self.tx.send(ConnectionEvent::Close(connection));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}
