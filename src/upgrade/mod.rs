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

//! Takes a raw bidirectional byte transport and layers private-network protection,
//! cryptographic identity exchange and stream multiplexing on top of it (spec §4.2).

pub mod encrypter;
pub mod muxer;
pub mod protector;

use crate::{
    address::Address,
    connection::{AsyncReadWrite, Connection},
    error::Error,
    events::EventBus,
    gater::ConnectionGater,
    negotiate,
    peer_id::PeerId,
    peer_store::PeerStore,
    registrar::Registrar,
    types::{ConnectionId, Direction, ProtocolName},
};

use encrypter::ConnectionEncrypter;
use muxer::StreamMuxerFactory;
use protector::ConnectionProtector;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// Logging target for the file.
const LOG_TARGET: &str = "upgrader";

/// Pseudo-protocol recorded on a [`Connection`] when `skip_encryption` bypassed the
/// cryptographic handshake because the transport itself provides encryption (spec §4.2).
pub const NATIVE_ENCRYPTION: &str = "native";

/// Options accepted by [`Upgrader::upgrade_inbound`]/[`Upgrader::upgrade_outbound`] (spec §4.2).
#[derive(Default)]
pub struct UpgradeOptions {
    pub skip_protection: bool,
    /// The transport already provides encryption; the remote [`PeerId`] must come from the
    /// address instead of a handshake.
    pub skip_encryption: bool,
    /// Force a specific multiplexer, bypassing negotiation.
    pub muxer_factory: Option<Arc<dyn StreamMuxerFactory>>,
    pub transient: bool,
}

/// Configuration for the [`Upgrader`] (spec §4.2).
pub struct UpgraderConfig {
    pub encrypters: HashMap<ProtocolName, Arc<dyn ConnectionEncrypter>>,
    pub muxers: HashMap<ProtocolName, Arc<dyn StreamMuxerFactory>>,
    pub inbound_upgrade_timeout: Duration,
    pub protector: Option<Arc<dyn ConnectionProtector>>,
}

impl UpgraderConfig {
    pub fn builder() -> UpgraderConfigBuilder {
        UpgraderConfigBuilder::default()
    }
}

/// Builder for [`UpgraderConfig`], following this crate's `*ConfigBuilder` convention.
#[derive(Default)]
pub struct UpgraderConfigBuilder {
    encrypters: HashMap<ProtocolName, Arc<dyn ConnectionEncrypter>>,
    muxers: HashMap<ProtocolName, Arc<dyn StreamMuxerFactory>>,
    inbound_upgrade_timeout: Option<Duration>,
    protector: Option<Arc<dyn ConnectionProtector>>,
}

impl UpgraderConfigBuilder {
    pub fn with_encrypter(mut self, encrypter: Arc<dyn ConnectionEncrypter>) -> Self {
        self.encrypters.insert(encrypter.protocol().clone(), encrypter);
        self
    }

    pub fn with_muxer(mut self, muxer: Arc<dyn StreamMuxerFactory>) -> Self {
        self.muxers.insert(muxer.protocol().clone(), muxer);
        self
    }

    pub fn with_inbound_upgrade_timeout(mut self, timeout: Duration) -> Self {
        self.inbound_upgrade_timeout = Some(timeout);
        self
    }

    pub fn with_protector(mut self, protector: Arc<dyn ConnectionProtector>) -> Self {
        self.protector = Some(protector);
        self
    }

    pub fn build(self) -> UpgraderConfig {
        UpgraderConfig {
            encrypters: self.encrypters,
            muxers: self.muxers,
            inbound_upgrade_timeout: self.inbound_upgrade_timeout
                .unwrap_or(Duration::from_secs(10)),
            protector: self.protector,
        }
    }
}

/// Drives a raw byte transport through `Protect -> Encrypt -> Gate -> Mux -> Gate` and
/// constructs the resulting [`Connection`] (spec §4.2).
pub struct Upgrader {
    local_peer: PeerId,
    keypair: crate::crypto::ed25519::Keypair,
    config: UpgraderConfig,
    gater: Arc<dyn ConnectionGater>,
    registrar: Arc<dyn Registrar>,
    peer_store: Arc<dyn PeerStore>,
    events: EventBus,
    executor: Arc<dyn crate::executor::Executor>,
    next_connection_id: Arc<AtomicUsize>,
}

impl Upgrader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        keypair: crate::crypto::ed25519::Keypair,
        config: UpgraderConfig,
        gater: Arc<dyn ConnectionGater>,
        registrar: Arc<dyn Registrar>,
        peer_store: Arc<dyn PeerStore>,
        events: EventBus,
        executor: Arc<dyn crate::executor::Executor>,
    ) -> Self {
        let local_peer = PeerId::from_public_key(&crate::crypto::PublicKey::Ed25519(keypair.public()));
        Self {
            local_peer,
            keypair,
            config,
            gater,
            registrar,
            peer_store,
            events,
            executor,
            next_connection_id: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::next(&self.next_connection_id)
    }

    /// The local node's identity, derived from the keypair this [`Upgrader`] was built with.
    /// [`crate::dial::DialQueue`] uses this for its `DIALED_SELF` check (spec §4.1 step 3).
    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    /// `Accepted -> GaterInbound -> Protected -> Encrypted -> GaterPostEncryption -> Muxed ->
    /// GaterPostUpgrade -> Live` (spec §4.2). A single `inbound_upgrade_timeout` bounds the
    /// whole sequence; expiry aborts the raw connection with [`Error::Timeout`].
    pub async fn upgrade_inbound(
        &self,
        raw: Box<dyn AsyncReadWrite>,
        remote_addr: Address,
        options: UpgradeOptions,
    ) -> Result<Connection, Error> {
        let timeout = self.config.inbound_upgrade_timeout;
        match tokio::time::timeout(timeout, self.upgrade_inbound_inner(raw, remote_addr, options))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn upgrade_inbound_inner(
        &self,
        raw: Box<dyn AsyncReadWrite>,
        remote_addr: Address,
        options: UpgradeOptions,
    ) -> Result<Connection, Error> {
        if self.gater.deny_inbound_connection(remote_addr.multiaddr()) {
            return Err(Error::ConnectionDenied);
        }

        let protected = self.protect(raw, options.skip_protection).await?;

        let (encrypted, remote_peer, encryption) = self
            .encrypt_inbound(protected, &remote_addr, options.skip_encryption)
            .await?;

        if self.gater.deny_inbound_encrypted_connection(&remote_peer) {
            return Err(Error::ConnectionIntercepted);
        }

        let (muxer, multiplexer) =
            self.mux_inbound(encrypted, options.muxer_factory.clone()).await?;

        if self.gater.deny_inbound_upgraded_connection(&remote_peer) {
            return Err(Error::ConnectionIntercepted);
        }

        Ok(self.construct_connection(
            remote_addr.into_multiaddr(),
            remote_peer,
            Direction::Inbound,
            encryption,
            multiplexer,
            options.transient,
            muxer,
        ))
    }

    /// `GaterPre (if PeerId known) -> Protected -> Encrypted -> GaterPostEncryption -> Muxed ->
    /// GaterPostUpgrade -> Live` (spec §4.2). No fixed timeout here: the caller's dial timeout
    /// bounds it.
    pub async fn upgrade_outbound(
        &self,
        raw: Box<dyn AsyncReadWrite>,
        remote_addr: Address,
        options: UpgradeOptions,
    ) -> Result<Connection, Error> {
        let expected_peer = remote_addr.peer_id();

        if let Some(peer) = &expected_peer {
            if self.gater.deny_outbound_connection(Some(peer), remote_addr.multiaddr()) {
                return Err(Error::ConnectionDenied);
            }
        }

        let protected = self.protect(raw, options.skip_protection).await?;

        let (encrypted, remote_peer, encryption) = self
            .encrypt_outbound(protected, &remote_addr, expected_peer, options.skip_encryption)
            .await?;

        if self.gater.deny_outbound_encrypted_connection(&remote_peer) {
            return Err(Error::ConnectionIntercepted);
        }

        let (muxer, multiplexer) =
            self.mux_outbound(encrypted, options.muxer_factory.clone()).await?;

        if self.gater.deny_outbound_upgraded_connection(&remote_peer) {
            return Err(Error::ConnectionIntercepted);
        }

        Ok(self.construct_connection(
            remote_addr.into_multiaddr(),
            remote_peer,
            Direction::Outbound,
            encryption,
            multiplexer,
            options.transient,
            muxer,
        ))
    }

    async fn protect(
        &self,
        raw: Box<dyn AsyncReadWrite>,
        skip: bool,
    ) -> Result<Box<dyn AsyncReadWrite>, Error> {
        match (&self.config.protector, skip) {
            (Some(protector), false) => protector.protect(raw).await,
            _ => Ok(raw),
        }
    }

    async fn encrypt_inbound(
        &self,
        io: Box<dyn AsyncReadWrite>,
        remote_addr: &Address,
        skip_encryption: bool,
    ) -> Result<(Box<dyn AsyncReadWrite>, PeerId, ProtocolName), Error> {
        if skip_encryption {
            let peer = remote_addr
                .peer_id()
                .ok_or_else(|| Error::InvalidMultiaddr(remote_addr.multiaddr().clone()))?;
            return Ok((io, peer, ProtocolName::from(NATIVE_ENCRYPTION)));
        }

        let protocols: Vec<String> =
            self.config.encrypters.keys().map(ToString::to_string).collect();
        let negotiated = negotiate::handle(io, protocols)
            .await
            .map_err(|error| Error::EncryptionFailed(error.to_string()))?;

        let encrypter_protocol = ProtocolName::from(negotiated.protocol.as_str());
        let encrypter = self
            .config
            .encrypters
            .get(&encrypter_protocol)
            .ok_or_else(|| Error::EncryptionFailed("no matching encrypter".into()))?;

        let (conn, remote_peer) = encrypter
            .secure_inbound(&self.keypair, Box::new(negotiated.stream))
            .await
            .map_err(|error| Error::EncryptionFailed(error.to_string()))?;

        Ok((conn, remote_peer, encrypter_protocol))
    }

    async fn encrypt_outbound(
        &self,
        io: Box<dyn AsyncReadWrite>,
        remote_addr: &Address,
        expected_peer: Option<PeerId>,
        skip_encryption: bool,
    ) -> Result<(Box<dyn AsyncReadWrite>, PeerId, ProtocolName), Error> {
        if skip_encryption {
            // spec §4.2 "Encrypt" / testable property S4: the outbound counterpart to the
            // inbound `INVALID_MULTIADDR` case is `INVALID_PEER`, not a generic parameter error.
            let peer = expected_peer.ok_or(Error::InvalidPeerMissing)?;
            let _ = remote_addr;
            return Ok((io, peer, ProtocolName::from(NATIVE_ENCRYPTION)));
        }

        let protocols: Vec<String> =
            self.config.encrypters.keys().map(ToString::to_string).collect();
        let negotiated = negotiate::select(io, protocols)
            .await
            .map_err(|error| Error::EncryptionFailed(error.to_string()))?;

        let encrypter_protocol = ProtocolName::from(negotiated.protocol.as_str());
        let encrypter = self
            .config
            .encrypters
            .get(&encrypter_protocol)
            .ok_or_else(|| Error::EncryptionFailed("no matching encrypter".into()))?;

        let (conn, remote_peer) = encrypter
            .secure_outbound(&self.keypair, Box::new(negotiated.stream), expected_peer)
            .await
            .map_err(|error| Error::EncryptionFailed(error.to_string()))?;

        Ok((conn, remote_peer, encrypter_protocol))
    }

    async fn mux_inbound(
        &self,
        io: Box<dyn AsyncReadWrite>,
        forced: Option<Arc<dyn StreamMuxerFactory>>,
    ) -> Result<(Option<Arc<dyn muxer::MuxerHandle>>, Option<ProtocolName>), Error> {
        self.mux(io, forced, Direction::Inbound).await
    }

    async fn mux_outbound(
        &self,
        io: Box<dyn AsyncReadWrite>,
        forced: Option<Arc<dyn StreamMuxerFactory>>,
    ) -> Result<(Option<Arc<dyn muxer::MuxerHandle>>, Option<ProtocolName>), Error> {
        self.mux(io, forced, Direction::Outbound).await
    }

    async fn mux(
        &self,
        io: Box<dyn AsyncReadWrite>,
        forced: Option<Arc<dyn StreamMuxerFactory>>,
        direction: Direction,
    ) -> Result<(Option<Arc<dyn muxer::MuxerHandle>>, Option<ProtocolName>), Error> {
        if let Some(factory) = forced {
            let handle = factory.create(io, direction).await?;
            let protocol = handle.protocol().clone();
            return Ok((Some(handle), Some(protocol)));
        }

        if self.config.muxers.is_empty() {
            return Ok((None, None));
        }

        let protocols: Vec<String> = self.config.muxers.keys().map(ToString::to_string).collect();
        let negotiated = match direction {
            Direction::Inbound => negotiate::handle(io, protocols).await,
            Direction::Outbound => negotiate::select(io, protocols).await,
        }
        .map_err(|error| Error::MuxerUnavailable(error.to_string()))?;

        let muxer_protocol = ProtocolName::from(negotiated.protocol.as_str());
        let factory = self
            .config
            .muxers
            .get(&muxer_protocol)
            .ok_or_else(|| Error::MuxerUnavailable("no matching muxer".into()))?;

        let handle = factory.create(Box::new(negotiated.stream), direction).await?;
        Ok((Some(handle), Some(muxer_protocol)))
    }

    #[allow(clippy::too_many_arguments)]
    fn construct_connection(
        &self,
        remote_addr: multiaddr::Multiaddr,
        remote_peer: PeerId,
        direction: Direction,
        encryption: ProtocolName,
        multiplexer: Option<ProtocolName>,
        transient: bool,
        muxer: Option<Arc<dyn muxer::MuxerHandle>>,
    ) -> Connection {
        let connection = Connection::new(
            self.next_connection_id(),
            remote_addr,
            remote_peer,
            direction,
            encryption,
            multiplexer,
            transient,
            muxer.clone(),
            self.registrar.clone(),
            self.peer_store.clone(),
            self.events.clone(),
        );

        if let Some(muxer) = muxer {
            self.spawn_incoming_stream_pump(connection.clone(), muxer);
        }

        self.events.emit_open(connection.clone());
        connection
    }

    /// Concurrently pumps accepted muxed streams into `onIncomingStream` routing (spec §4.2):
    /// negotiate the application protocol as responder, enforce the inbound cap, update the
    /// peer store, then dispatch to `_onStream`. Errors on an individual stream are logged,
    /// never propagated to the caller of `upgrade_inbound`/`upgrade_outbound` (spec §5).
    fn spawn_incoming_stream_pump(&self, connection: Connection, muxer: Arc<dyn muxer::MuxerHandle>) {
        let registrar = self.registrar.clone();
        self.executor.run_with_name(
            "upgrader-incoming-stream-pump",
            Box::pin(async move {
                loop {
                    match muxer.accept_stream().await {
                        Some(io) => {
                            let connection = connection.clone();
                            let registrar = registrar.clone();
                            tokio::spawn(on_incoming_stream(connection, registrar, io));
                        }
                        None => {
                            tracing::debug!(target: LOG_TARGET, "muxer incoming stream channel closed");
                            break;
                        }
                    }
                }
            }),
        );
    }
}

async fn on_incoming_stream(
    connection: Connection,
    registrar: Arc<dyn Registrar>,
    io: Box<dyn AsyncReadWrite>,
) {
    let protocols = registrar.protocols().iter().map(ToString::to_string).collect();

    let negotiated = match negotiate::handle(io, protocols).await {
        Ok(negotiated) => negotiated,
        Err(error) => {
            tracing::debug!(target: LOG_TARGET, ?error, "inbound stream protocol negotiation failed");
            return;
        }
    };

    let protocol_name = ProtocolName::from(negotiated.protocol.as_str());

    let stream = match connection.accept_incoming_stream(protocol_name.clone(), Box::new(negotiated.stream)) {
        Ok(stream) => stream,
        Err(error) => {
            tracing::debug!(target: LOG_TARGET, ?error, "inbound stream rejected");
            return;
        }
    };

    let Some(registered) = registrar.get_handler(&protocol_name) else {
        tracing::debug!(target: LOG_TARGET, protocol = %protocol_name, "no handler for protocol");
        return;
    };

    if connection.transient() && !registered.options.run_on_transient_connection {
        tracing::debug!(
            target: LOG_TARGET,
            protocol = %protocol_name,
            "handler does not run on transient connections"
        );
        return;
    }

    registered.handler.on_inbound_stream(connection, stream);
}
