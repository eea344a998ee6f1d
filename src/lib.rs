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

//! Dial-racing and connection-upgrade core for a peer-to-peer transport runtime.
//!
//! Two collaborators sit at the center of this crate:
//!
//! - [`dial::DialQueue`] turns a peer id or a set of addresses into one racing, deduplicated
//!   dial, picking the first transport-level connection to succeed and cancelling the rest.
//! - [`upgrade::Upgrader`] drives a raw byte connection (whichever transport produced it)
//!   through private-network protection, encryption, multiplexer negotiation and the
//!   connection gater's checkpoints, producing a live [`connection::Connection`].
//!
//! Everything else -- transports, encryption schemes, multiplexers, address resolution,
//! the peer store, the connection gater -- is expressed as a trait so the runtime can be
//! exercised against fakes in tests and extended with new protocols without touching the
//! dial or upgrade state machines themselves.

pub mod address;
pub mod config;
pub mod connection;
pub mod crypto;
pub mod dial;
pub mod error;
pub mod events;
pub mod executor;
pub mod gater;
pub mod negotiate;
pub mod peer_id;
pub mod peer_store;
pub mod registrar;
pub mod resolve;
pub mod sorter;
pub mod transport;
pub mod types;
pub mod upgrade;

pub use address::Address;
pub use connection::Connection;
pub use dial::{DialOptions, DialQueue, DialTarget};
pub use error::{Error, Result};
pub use events::{ConnectionEvent, EventBus};
pub use peer_id::PeerId;
pub use upgrade::{Upgrader, UpgraderConfig};
