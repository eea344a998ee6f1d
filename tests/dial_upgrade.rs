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

//! End-to-end exercise of [`DialQueue`] racing a real TCP dial against an [`Upgrader`]
//! performing a full noise + yamux handshake on both ends.

mod support;

use support::{build_upgrader, init_tracing, listener_address, spawn_accept_loop};

use transport_core::{
    config::DialQueueConfig,
    dial::{DialOptions, DialQueue, DialTarget},
    error::Error,
    gater::AllowAllGater,
    peer_store::MemoryPeerStore,
    transport::tcp::{TcpListenerDriver, TcpTransportDriver},
};

use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn dials_a_single_tcp_listener_end_to_end() {
    init_tracing();
    let listener = TcpListenerDriver::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let listener_addr = listener.local_addr().unwrap();

    let (listener_upgrader, listener_peer) = build_upgrader();
    spawn_accept_loop(listener, listener_upgrader);

    let (dialer_upgrader, _dialer_peer) = build_upgrader();
    let dial_queue = DialQueue::new(
        DialQueueConfig::builder().with_dial_timeout(Duration::from_secs(5)).build(),
        Arc::new(AllowAllGater),
        Arc::new(MemoryPeerStore::new()),
        vec![Arc::new(TcpTransportDriver::new())],
        Arc::new(dialer_upgrader),
    );

    let target = listener_address(listener_addr, listener_peer);
    let connection = dial_queue.dial(DialTarget::from(target), DialOptions::default()).await.unwrap();

    assert_eq!(connection.remote_peer(), &listener_peer);
    assert!(connection.multiplexer().is_some());
}

#[tokio::test]
async fn deduplicates_concurrent_dials_to_the_same_peer() {
    init_tracing();
    let listener = TcpListenerDriver::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let listener_addr = listener.local_addr().unwrap();

    let (listener_upgrader, listener_peer) = build_upgrader();
    spawn_accept_loop(listener, listener_upgrader);

    let (dialer_upgrader, _dialer_peer) = build_upgrader();
    let dial_queue = DialQueue::new(
        DialQueueConfig::builder().with_dial_timeout(Duration::from_secs(5)).build(),
        Arc::new(AllowAllGater),
        Arc::new(MemoryPeerStore::new()),
        vec![Arc::new(TcpTransportDriver::new())],
        Arc::new(dialer_upgrader),
    );

    let target = listener_address(listener_addr, listener_peer);
    let (a, b) = tokio::join!(
        dial_queue.dial(DialTarget::from(target.clone()), DialOptions::default()),
        dial_queue.dial(DialTarget::from(target), DialOptions::default()),
    );

    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.id(), b.id());
}

#[tokio::test]
async fn dialing_self_is_rejected_before_any_network_activity() {
    init_tracing();
    let (dialer_upgrader, dialer_peer) = build_upgrader();
    let dial_queue = DialQueue::new(
        DialQueueConfig::builder().build(),
        Arc::new(AllowAllGater),
        Arc::new(MemoryPeerStore::new()),
        vec![Arc::new(TcpTransportDriver::new())],
        Arc::new(dialer_upgrader),
    );

    let result = dial_queue.dial(DialTarget::from(dialer_peer), DialOptions::default()).await;
    assert!(matches!(result, Err(Error::DialedSelf)));
}

#[tokio::test]
async fn dialing_an_unreachable_port_fails_with_a_transport_error() {
    init_tracing();
    let (dialer_upgrader, _dialer_peer) = build_upgrader();
    let dial_queue = DialQueue::new(
        DialQueueConfig::builder().with_dial_timeout(Duration::from_millis(500)).build(),
        Arc::new(AllowAllGater),
        Arc::new(MemoryPeerStore::new()),
        vec![Arc::new(TcpTransportDriver::new())],
        Arc::new(dialer_upgrader),
    );

    // Port 0 never accepts connections, so the transport driver's `dial` fails quickly.
    let address: multiaddr::Multiaddr = "/ip4/127.0.0.1/tcp/1".parse().unwrap();
    let target = transport_core::Address::new(address).with_peer_id(transport_core::PeerId::random());
    let result = dial_queue.dial(DialTarget::from(target), DialOptions::default()).await;
    assert!(result.is_err());
}
