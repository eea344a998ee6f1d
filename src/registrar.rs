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

//! Catalogue of application-protocol handlers and their per-protocol stream-cap options.

use crate::{connection::Connection, types::ProtocolName};

use std::{collections::HashMap, sync::Arc};

/// Default per-(connection, protocol, direction) open-stream cap applied when a handler does
/// not specify one (spec §4.2, `newStream`/`onIncomingStream`).
pub const DEFAULT_STREAM_LIMIT: usize = 256;

/// Per-protocol options a registered handler may specify.
#[derive(Clone)]
pub struct ProtocolHandlerOptions {
    pub max_inbound_streams: usize,
    pub max_outbound_streams: usize,
    /// Whether this handler may run on a [`Connection`] marked `transient`.
    pub run_on_transient_connection: bool,
}

impl Default for ProtocolHandlerOptions {
    fn default() -> Self {
        Self {
            max_inbound_streams: DEFAULT_STREAM_LIMIT,
            max_outbound_streams: DEFAULT_STREAM_LIMIT,
            run_on_transient_connection: false,
        }
    }
}

/// An application-level protocol handler, invoked once per accepted inbound stream.
///
/// Out of scope for this crate's core (spec §1: "protocol-specific application handlers are
/// also out of scope"); the trait exists only so the `Upgrader`'s `_onStream` routing (spec
/// §4.2) has a concrete seam to dispatch through.
pub trait ProtocolHandler: Send + Sync {
    fn on_inbound_stream(&self, connection: Connection, stream: crate::connection::Stream);
}

/// A registered application-protocol handler, as returned by [`Registrar::get_handler`].
#[derive(Clone)]
pub struct RegisteredHandler {
    pub protocol: ProtocolName,
    pub options: ProtocolHandlerOptions,
    pub handler: Arc<dyn ProtocolHandler>,
}

/// The catalogue of application protocol handlers (spec §6).
pub trait Registrar: Send + Sync {
    fn get_handler(&self, protocol: &ProtocolName) -> Option<RegisteredHandler>;

    fn protocols(&self) -> Vec<ProtocolName>;
}

struct Registration {
    options: ProtocolHandlerOptions,
    handler: Arc<dyn ProtocolHandler>,
}

/// A [`Registrar`] backed by a plain `HashMap`, the ambient default collaborator.
#[derive(Default)]
pub struct StaticRegistrar {
    handlers: HashMap<ProtocolName, Registration>,
}

impl StaticRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        protocol: ProtocolName,
        handler: Arc<dyn ProtocolHandler>,
        options: ProtocolHandlerOptions,
    ) {
        self.handlers.insert(protocol, Registration { options, handler });
    }
}

impl Registrar for StaticRegistrar {
    fn get_handler(&self, protocol: &ProtocolName) -> Option<RegisteredHandler> {
        self.handlers.get(protocol).map(|registration| RegisteredHandler {
            protocol: protocol.clone(),
            options: registration.options.clone(),
            handler: registration.handler.clone(),
        })
    }

    fn protocols(&self) -> Vec<ProtocolName> {
        self.handlers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;
    impl ProtocolHandler for NoopHandler {
        fn on_inbound_stream(&self, _connection: Connection, _stream: crate::connection::Stream) {}
    }

    #[test]
    fn unregistered_protocol_yields_none() {
        let registrar = StaticRegistrar::new();
        assert!(registrar.get_handler(&ProtocolName::from("/ping/1.0.0")).is_none());
    }

    #[test]
    fn registered_protocol_round_trips_options() {
        let mut registrar = StaticRegistrar::new();
        registrar.register(
            ProtocolName::from("/ping/1.0.0"),
            Arc::new(NoopHandler),
            ProtocolHandlerOptions {
                max_inbound_streams: 2,
                max_outbound_streams: 2,
                run_on_transient_connection: true,
            },
        );

        let handler = registrar.get_handler(&ProtocolName::from("/ping/1.0.0")).unwrap();
        assert_eq!(handler.options.max_inbound_streams, 2);
        assert!(handler.options.run_on_transient_connection);
    }
}
