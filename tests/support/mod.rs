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

//! Shared fakes and harness for the integration tests in this directory.

#![allow(dead_code)]

use transport_core::{
    crypto::ed25519::Keypair,
    events::EventBus,
    executor,
    gater::AllowAllGater,
    peer_id::PeerId,
    peer_store::MemoryPeerStore,
    registrar::StaticRegistrar,
    transport::tcp::TcpListenerDriver,
    upgrade::{encrypter::noise::NoiseEncrypter, muxer::yamux::YamuxMuxerFactory, UpgradeOptions, Upgrader, UpgraderConfig},
    Address,
};

use std::net::SocketAddr;
use std::sync::Arc;

/// Installs a `tracing` subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A freshly keyed [`Upgrader`] with noise encryption and yamux multiplexing registered,
/// matching the pairing [`TcpTransportDriver`](transport_core::transport::tcp::TcpTransportDriver)
/// connections are expected to negotiate.
pub fn build_upgrader() -> (Upgrader, PeerId) {
    let keypair = Keypair::generate();
    let config = UpgraderConfig::builder()
        .with_encrypter(Arc::new(NoiseEncrypter::new()))
        .with_muxer(Arc::new(YamuxMuxerFactory::new()))
        .build();

    let upgrader = Upgrader::new(
        keypair,
        config,
        Arc::new(AllowAllGater),
        Arc::new(StaticRegistrar::new()),
        Arc::new(MemoryPeerStore::new()),
        EventBus::new(),
        executor::default_executor(),
    );
    let peer = upgrader.local_peer();
    (upgrader, peer)
}

/// Build the dial-able [`Address`] for a listener bound at `socket`, carrying `peer`'s
/// identity so [`transport_core::dial::DialQueue`] can embed/validate it.
pub fn listener_address(socket: SocketAddr, peer: PeerId) -> Address {
    let mut multiaddr = multiaddr::Multiaddr::empty();
    multiaddr.push(match socket.ip() {
        std::net::IpAddr::V4(v4) => multiaddr::Protocol::Ip4(v4),
        std::net::IpAddr::V6(v6) => multiaddr::Protocol::Ip6(v6),
    });
    multiaddr.push(multiaddr::Protocol::Tcp(socket.port()));
    Address::new(multiaddr).with_peer_id(peer)
}

/// Runs `listener`'s accept loop in the background, upgrading every inbound connection with
/// `upgrader` and dropping the resulting [`transport_core::Connection`] (tests only assert on
/// the dialer's side of the handshake).
pub fn spawn_accept_loop(listener: TcpListenerDriver, upgrader: Upgrader) {
    let upgrader = Arc::new(upgrader);
    tokio::spawn(async move {
        loop {
            let (io, remote_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => break,
            };

            let upgrader = upgrader.clone();
            tokio::spawn(async move {
                if let Err(error) =
                    upgrader.upgrade_inbound(io, remote_addr, UpgradeOptions::default()).await
                {
                    tracing::debug!(target: "test-support", ?error, "inbound upgrade failed");
                }
            });
        }
    });
}
