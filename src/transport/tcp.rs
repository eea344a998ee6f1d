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

//! A minimal TCP [`TransportDriver`] (spec §6 "transport driver" contract), grounded on the
//! teacher's own `transport::tcp::get_socket_address` multiaddr parsing. Encryption,
//! multiplexing and protocol negotiation are the [`crate::upgrade::Upgrader`]'s job; this
//! module only establishes (or accepts) the raw, unencrypted byte stream.

use crate::{
    address::Address,
    connection::AsyncReadWrite,
    error::{AddressError, Error},
    peer_id::PeerId,
    transport::TransportDriver,
};

use async_trait::async_trait;
use multiaddr::{Multiaddr, Protocol};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::compat::TokioAsyncReadCompatExt;

use std::net::{IpAddr, SocketAddr};

/// Logging target for the file.
const LOG_TARGET: &str = "transport::tcp";

/// Extract the [`SocketAddr`] and optional embedded [`PeerId`] from a `/ip4|ip6/.../tcp/<port>
/// [/p2p/<peer>]` multiaddr.
fn get_socket_address(address: &Multiaddr) -> Result<(SocketAddr, Option<PeerId>), Error> {
    let mut iter = address.iter();

    let ip = match iter.next() {
        Some(Protocol::Ip4(address)) => IpAddr::V4(address),
        Some(Protocol::Ip6(address)) => IpAddr::V6(address),
        protocol => {
            tracing::trace!(target: LOG_TARGET, ?protocol, "unsupported leading protocol");
            return Err(Error::AddressError(AddressError::InvalidProtocol));
        }
    };

    let port = match iter.next() {
        Some(Protocol::Tcp(port)) => port,
        protocol => {
            tracing::trace!(target: LOG_TARGET, ?protocol, "expected `/tcp/<port>`");
            return Err(Error::AddressError(AddressError::InvalidProtocol));
        }
    };

    let peer = match iter.next() {
        Some(Protocol::P2p(multihash)) => Some(PeerId::from_multihash(multihash)?),
        None => None,
        protocol => {
            tracing::trace!(target: LOG_TARGET, ?protocol, "expected trailing `/p2p/<peer>` or end");
            return Err(Error::AddressError(AddressError::InvalidProtocol));
        }
    };

    if iter.next().is_some() {
        return Err(Error::AddressError(AddressError::InvalidProtocol));
    }

    Ok((SocketAddr::new(ip, port), peer))
}

/// A plaintext TCP [`TransportDriver`] (spec §4.1 filtering step: "drop any Address for which
/// no transport driver claims support"). Deliberately minimal -- no TLS, no backpressure
/// tuning -- since the specification treats transport-layer dialing as an external contract;
/// this exists to exercise [`crate::dial::DialQueue`] and [`crate::upgrade::Upgrader`] end to
/// end.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransportDriver;

impl TcpTransportDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportDriver for TcpTransportDriver {
    fn supports(&self, address: &Multiaddr) -> bool {
        get_socket_address(address).is_ok()
    }

    async fn dial(&self, address: &Multiaddr) -> Result<Box<dyn AsyncReadWrite>, Error> {
        let (socket_address, _peer) = get_socket_address(address)?;
        tracing::trace!(target: LOG_TARGET, %socket_address, "dialing");
        let stream = TcpStream::connect(socket_address).await?;
        stream.set_nodelay(true).ok();
        Ok(Box::new(stream.compat()))
    }
}

/// A bound TCP listener accepting raw, unencrypted byte connections (spec §6 inbound path:
/// "transport accept -> Upgrader.upgradeInbound -> Connection"). Accepting is not part of the
/// [`TransportDriver`] contract (spec §6 only requires `dial`/`transportForMultiaddr`), so this
/// is a standalone helper the embedding application drives its own accept loop with.
pub struct TcpListenerDriver {
    listener: TcpListener,
}

impl TcpListenerDriver {
    pub async fn bind(address: SocketAddr) -> Result<Self, Error> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the next inbound connection, returning the raw byte stream and the remote's
    /// observed address (uncertified: nothing at this layer vouches for it).
    pub async fn accept(&self) -> Result<(Box<dyn AsyncReadWrite>, Address), Error> {
        let (stream, peer_addr) = self.listener.accept().await?;
        stream.set_nodelay(true).ok();

        let mut multiaddr = Multiaddr::empty();
        multiaddr.push(match peer_addr.ip() {
            IpAddr::V4(v4) => Protocol::Ip4(v4),
            IpAddr::V6(v6) => Protocol::Ip6(v6),
        });
        multiaddr.push(Protocol::Tcp(peer_addr.port()));

        Ok((Box::new(stream.compat()), Address::new(multiaddr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ip4_and_ip6_with_and_without_peer_id() {
        assert!(get_socket_address(&"/ip6/::1/tcp/8888".parse().unwrap()).is_ok());
        assert!(get_socket_address(&"/ip4/127.0.0.1/tcp/8888".parse().unwrap()).is_ok());
        assert!(get_socket_address(
            &"/ip6/::1/tcp/8888/p2p/12D3KooWT2ouvz5uMmCvHJGzAGRHiqDts5hzXR7NdoQ27pGdzp9Q"
                .parse()
                .unwrap()
        )
        .is_ok());
        assert!(get_socket_address(
            &"/ip4/127.0.0.1/tcp/8888/p2p/12D3KooWT2ouvz5uMmCvHJGzAGRHiqDts5hzXR7NdoQ27pGdzp9Q"
                .parse()
                .unwrap()
        )
        .is_ok());
    }

    #[test]
    fn rejects_non_tcp_transports() {
        assert!(get_socket_address(
            &"/ip6/::1/udp/8888/p2p/12D3KooWT2ouvz5uMmCvHJGzAGRHiqDts5hzXR7NdoQ27pGdzp9Q"
                .parse()
                .unwrap()
        )
        .is_err());
        assert!(get_socket_address(
            &"/ip4/127.0.0.1/udp/8888/p2p/12D3KooWT2ouvz5uMmCvHJGzAGRHiqDts5hzXR7NdoQ27pGdzp9Q"
                .parse()
                .unwrap()
        )
        .is_err());
    }

    #[test]
    fn driver_supports_matches_parseability() {
        let driver = TcpTransportDriver::new();
        assert!(driver.supports(&"/ip4/127.0.0.1/tcp/4001".parse().unwrap()));
        assert!(!driver.supports(&"/dns4/example.com/tcp/4001".parse().unwrap()));
    }

    #[tokio::test]
    async fn dial_and_accept_round_trip() {
        let listener = TcpListenerDriver::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let local = listener.local_addr().unwrap();

        let driver = TcpTransportDriver::new();
        let mut dial_addr = Multiaddr::empty();
        dial_addr.push(Protocol::Ip4(match local.ip() {
            IpAddr::V4(v4) => v4,
            _ => unreachable!(),
        }));
        dial_addr.push(Protocol::Tcp(local.port()));

        let (accepted, dialed) =
            tokio::join!(listener.accept(), driver.dial(&dial_addr));

        assert!(accepted.is_ok());
        assert!(dialed.is_ok());
    }
}
