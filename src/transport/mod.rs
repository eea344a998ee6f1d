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

//! Transport driver contract (spec §6): an external collaborator providing raw byte
//! connections for a given address. [`tcp`] supplies the one concrete driver this crate
//! carries, to exercise [`crate::dial::DialQueue`] and [`crate::upgrade::Upgrader`] end to end.

pub mod tcp;

use crate::{connection::AsyncReadWrite, error::Error};

use async_trait::async_trait;
use multiaddr::Multiaddr;

/// Dials and accepts raw, unencrypted byte connections for the transport stacks it supports.
#[async_trait]
pub trait TransportDriver: Send + Sync {
    /// Whether this driver claims to support `address`'s transport stack (spec §4.1 filtering
    /// step: "drop any Address for which no transport driver claims support").
    fn supports(&self, address: &Multiaddr) -> bool;

    /// Dial `address`, returning a raw byte stream once the transport-level connection (e.g.
    /// the TCP three-way handshake) completes. Encryption, multiplexing and protocol
    /// negotiation are the [`crate::upgrade::Upgrader`]'s job, not the driver's.
    async fn dial(&self, address: &Multiaddr) -> Result<Box<dyn AsyncReadWrite>, Error>;
}
