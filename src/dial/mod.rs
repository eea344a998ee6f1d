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

//! Turns a dial request (peer identity, explicit address list, or both) into exactly one
//! established, upgraded [`Connection`], racing candidate addresses and deduplicating against
//! in-flight requests (spec §4.1).

pub mod pending;
pub mod queue;

pub use pending::{DedupKey, DialStatus, PendingDial};

use crate::{
    address::Address,
    config::DialQueueConfig,
    connection::Connection,
    error::{DialError, Error},
    gater::ConnectionGater,
    peer_id::PeerId,
    peer_store::PeerStore,
    resolve::Resolver,
    transport::TransportDriver,
    types::DialId,
    upgrade::Upgrader,
};

use multiaddr::{Multiaddr, Protocol};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

/// Logging target for the file.
const LOG_TARGET: &str = "dial-queue";

/// What to dial (spec §4.1 "Public contract": "target is a PeerId, a single Address, or a
/// list of Addresses").
#[derive(Debug, Clone)]
pub enum DialTarget {
    Peer(PeerId),
    Address(Address),
    Addresses(Vec<Address>),
}

impl From<PeerId> for DialTarget {
    fn from(peer: PeerId) -> Self {
        DialTarget::Peer(peer)
    }
}

impl From<Address> for DialTarget {
    fn from(address: Address) -> Self {
        DialTarget::Address(address)
    }
}

impl From<Vec<Address>> for DialTarget {
    fn from(addresses: Vec<Address>) -> Self {
        DialTarget::Addresses(addresses)
    }
}

/// Per-call options accepted by [`DialQueue::dial`] (spec §4.1 "Public contract").
#[derive(Default)]
pub struct DialOptions {
    /// Caller cancellation signal, combined with the dial timeout and the queue's shutdown
    /// signal (spec §4.1 step 2).
    pub signal: Option<CancellationToken>,
    /// Advisory priority passed to the global dial queue (spec §9: "priority from the dial
    /// options is advisory to the global queue").
    pub priority: i32,
}

struct Inner {
    local_peer: PeerId,
    config: DialQueueConfig,
    gater: Arc<dyn ConnectionGater>,
    peer_store: Arc<dyn PeerStore>,
    transports: Vec<Arc<dyn TransportDriver>>,
    upgrader: Arc<Upgrader>,
    shutdown: CancellationToken,
    global_semaphore: Arc<Semaphore>,
    pending: Mutex<Vec<PendingDial>>,
    in_progress: AtomicUsize,
}

/// Accepts a dial request, expands and vets candidate addresses, deduplicates against
/// in-flight dials, enforces global and per-peer concurrency caps, races candidates, and
/// returns the first successfully-upgraded connection while cancelling the rest (spec §4.1).
#[derive(Clone)]
pub struct DialQueue {
    inner: Arc<Inner>,
}

impl DialQueue {
    pub fn new(
        config: DialQueueConfig,
        gater: Arc<dyn ConnectionGater>,
        peer_store: Arc<dyn PeerStore>,
        transports: Vec<Arc<dyn TransportDriver>>,
        upgrader: Arc<Upgrader>,
    ) -> Self {
        let local_peer = upgrader.local_peer();
        let global_semaphore = Arc::new(Semaphore::new(config.max_parallel_dials.max(1)));
        Self {
            inner: Arc::new(Inner {
                local_peer,
                config,
                gater,
                peer_store,
                transports,
                upgrader,
                shutdown: CancellationToken::new(),
                global_semaphore,
                pending: Mutex::new(Vec::new()),
                in_progress: AtomicUsize::new(0),
            }),
        }
    }

    /// Depth of the pending-dial registry (spec §4.1 "Observable metrics").
    pub fn pending_dial_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Number of dials currently racing candidates (spec §4.1 "Observable metrics").
    pub fn in_progress_dial_count(&self) -> usize {
        self.inner.in_progress.load(Ordering::Relaxed)
    }

    /// Cancel all pending and in-flight dials; idempotent (spec §4.1 "Public contract",
    /// invariant 6: "no new dial is accepted and all in-flight dials observe cancellation").
    pub fn stop(&self) {
        self.inner.shutdown.cancel();
    }

    /// Resolve `target` to exactly one established, upgraded [`Connection`] (spec §4.1
    /// algorithm, steps 1-7).
    pub async fn dial(&self, target: impl Into<DialTarget>, options: DialOptions) -> Result<Connection, Error> {
        if self.inner.shutdown.is_cancelled() {
            return Err(Error::Abort);
        }

        let (peer_id, explicit) = normalize_target(target.into())?;

        // Aggregate cancellation signal: dial timeout + shutdown + caller signal (spec §4.1
        // step 2). `signal` is what every downstream await honours.
        let signal = CancellationToken::new();
        let shutdown_forwarder = forward(self.inner.shutdown.clone(), signal.clone());
        let caller_forwarder = options.signal.map(|caller| forward(caller, signal.clone()));

        let timed_out = Arc::new(AtomicBool::new(false));
        let timer = {
            let signal = signal.clone();
            let timed_out = timed_out.clone();
            let timeout = self.inner.config.dial_timeout;
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        timed_out.store(true, Ordering::SeqCst);
                        signal.cancel();
                    }
                    _ = signal.cancelled() => {}
                }
            })
        };

        let result = self.dial_inner(peer_id, explicit, signal.clone()).await;

        signal.cancel();
        timer.abort();
        shutdown_forwarder.abort();
        if let Some(handle) = caller_forwarder {
            handle.abort();
        }

        // Rewrite the terminal error to TIMEOUT when the dial-timeout timer -- not the caller
        // or shutdown -- was what fired (spec §7: "the terminal error's kind is rewritten to
        // TIMEOUT when the originating signal was the dial-timeout timer").
        match result {
            Err(_) if timed_out.load(Ordering::SeqCst) => Err(Error::Dial(DialError::Timeout)),
            other => other,
        }
    }

    async fn dial_inner(
        &self,
        peer_id: Option<PeerId>,
        explicit: Vec<Address>,
        signal: CancellationToken,
    ) -> Result<Connection, Error> {
        let candidates = self.calculate_multiaddrs(peer_id, explicit).await?;
        let key = DedupKey::new(peer_id, &candidates);

        if let Some(existing) = self.find_pending(&key) {
            tracing::debug!(target: LOG_TARGET, id = %existing.id(), "joining in-flight dial");
            return tokio::select! {
                result = existing.join() => result,
                _ = signal.cancelled() => Err(Error::Abort),
            };
        }

        let id = DialId::random();
        let (pending, sender) = PendingDial::new(id.clone(), peer_id, candidates.clone());
        self.inner.pending.lock().push(pending.clone());
        self.inner.in_progress.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(target: LOG_TARGET, %id, candidates = candidates.len(), "starting dial");

        let result = queue::perform_dial(
            candidates,
            self.inner.config.max_parallel_dials_per_peer,
            self.inner.global_semaphore.clone(),
            |address| self.transport_for(address),
            self.inner.upgrader.clone(),
            pending.status_cell(),
            signal,
        )
        .await;

        pending.set_status(if result.is_ok() { DialStatus::Success } else { DialStatus::Error });
        self.inner.in_progress.fetch_sub(1, Ordering::Relaxed);
        self.inner.pending.lock().retain(|candidate| candidate.id() != &id);

        if result.is_err() {
            if let Some(peer) = peer_id {
                self.record_dial_failure(peer);
            }
        }

        // Best-effort broadcast to anyone who joined; a closed channel (no joiners ever
        // subscribed) is not an error (spec §7: side effects "must never fail the primary
        // operation").
        let _ = sender.send(Some(Arc::new(result.clone())));

        result
    }

    /// `calculateMultiaddrs` (spec §4.1 step 3): self-dial/gater short-circuits, peer-store
    /// fallback, resolution, filtering, dedup, peer-id stamping, gating and sorting.
    async fn calculate_multiaddrs(
        &self,
        peer_id: Option<PeerId>,
        explicit: Vec<Address>,
    ) -> Result<Vec<Address>, Error> {
        if let Some(peer) = peer_id {
            if peer == self.inner.local_peer {
                return Err(Error::DialedSelf);
            }
            if self.inner.gater.deny_dial_peer(&peer) {
                return Err(Error::PeerDialIntercepted(peer));
            }
        }

        let mut addresses = explicit;
        if addresses.is_empty() {
            if let Some(peer) = peer_id {
                if let Some(record) = self.inner.peer_store.get(&peer) {
                    addresses = record.addresses.into_iter().collect();
                }
            }
        }

        let mut resolved = Vec::with_capacity(addresses.len());
        for address in addresses {
            match self.resolver_for(address.multiaddr()) {
                Some(resolver) => resolved.extend(resolver.resolve(&address).await?),
                None => resolved.push(address),
            }
        }

        let filtered: Vec<Address> = resolved
            .into_iter()
            .filter(|address| self.transport_for(address).is_some())
            .filter(|address| address.validate_peer(peer_id.as_ref()).is_ok())
            .collect();

        let mut deduped: Vec<Address> = Vec::with_capacity(filtered.len());
        for address in filtered {
            match deduped.iter_mut().find(|existing| **existing == address) {
                Some(existing) => existing.merge_certification(address.is_certified()),
                None => deduped.push(address),
            }
        }

        if deduped.is_empty() {
            return Err(Error::NoValidAddresses);
        }
        if deduped.len() > self.inner.config.max_peer_addrs_to_dial {
            return Err(Error::TooManyAddresses(deduped.len(), self.inner.config.max_peer_addrs_to_dial));
        }

        let stamped: Vec<Address> = match peer_id {
            Some(peer) => deduped.into_iter().map(|address| address.with_peer_id(peer)).collect(),
            None => deduped,
        };

        let mut gated: Vec<Address> = stamped
            .into_iter()
            .filter(|address| !self.inner.gater.deny_dial_multiaddr(peer_id.as_ref(), address.multiaddr()))
            .collect();

        if gated.is_empty() {
            return Err(Error::NoValidAddresses);
        }

        self.inner.config.address_sorter.sort(&mut gated);
        Ok(gated)
    }

    fn transport_for(&self, address: &Address) -> Option<Arc<dyn TransportDriver>> {
        self.inner.transports.iter().find(|driver| driver.supports(address.multiaddr())).cloned()
    }

    fn resolver_for(&self, multiaddr: &Multiaddr) -> Option<Arc<dyn Resolver>> {
        let scheme = scheme_name(multiaddr)?;
        self.inner.config.resolvers.get(scheme).cloned()
    }

    fn find_pending(&self, key: &DedupKey) -> Option<PendingDial> {
        self.inner.pending.lock().iter().find(|existing| existing.key().matches(key)).cloned()
    }

    /// Best-effort `last-dial-failure` metadata update (spec §4.1 step 6). The value is the
    /// current epoch-millisecond timestamp encoded as its decimal-digit ASCII representation,
    /// matching the original implementation's on-wire encoding (spec §9).
    fn record_dial_failure(&self, peer: PeerId) {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let mut metadata = HashMap::new();
        metadata.insert("last-dial-failure".to_string(), millis.to_string().into_bytes());
        self.inner.peer_store.patch(&peer, metadata);
    }
}

/// Extract the optional [`PeerId`] and candidate [`Address`]es from a [`DialTarget`] (spec
/// §4.1 step 1). Conflicting embedded peer identities across an explicit address list fail
/// with `INVALID_PARAMETERS`.
fn normalize_target(target: DialTarget) -> Result<(Option<PeerId>, Vec<Address>), Error> {
    match target {
        DialTarget::Peer(peer) => Ok((Some(peer), Vec::new())),
        DialTarget::Address(address) => {
            let peer = address.peer_id();
            Ok((peer, vec![address]))
        }
        DialTarget::Addresses(addresses) => {
            let mut peer: Option<PeerId> = None;
            for address in &addresses {
                if let Some(embedded) = address.peer_id() {
                    match peer {
                        Some(existing) if existing != embedded => {
                            return Err(Error::InvalidParameters(
                                "addresses carry conflicting embedded peer identities".to_string(),
                            ));
                        }
                        _ => peer = Some(embedded),
                    }
                }
            }
            Ok((peer, addresses))
        }
    }
}

/// First address component's scheme name, for [`DialQueueConfig::resolvers`] lookup. Only the
/// DNS family needs resolution at this layer (spec §4.1: "e.g. DNS-based resolvers expand to
/// one or more Addresses").
fn scheme_name(multiaddr: &Multiaddr) -> Option<&'static str> {
    match multiaddr.iter().next()? {
        Protocol::Dns(_) => Some("dns"),
        Protocol::Dns4(_) => Some("dns4"),
        Protocol::Dns6(_) => Some("dns6"),
        _ => None,
    }
}

/// Spawns a task that cancels `target` as soon as `source` is cancelled, stopping on whichever
/// fires first so it never outlives the dial it was created for.
fn forward(source: CancellationToken, target: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = source.cancelled() => target.cancel(),
            _ = target.cancelled() => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_single_address_extracts_embedded_peer() {
        let peer = PeerId::random();
        let address = Address::new("/ip4/127.0.0.1/tcp/4001".parse().unwrap()).with_peer_id(peer);
        let (extracted, addresses) = normalize_target(DialTarget::Address(address)).unwrap();
        assert_eq!(extracted, Some(peer));
        assert_eq!(addresses.len(), 1);
    }

    #[test]
    fn normalize_rejects_conflicting_embedded_peers() {
        let a = Address::new("/ip4/127.0.0.1/tcp/1".parse().unwrap()).with_peer_id(PeerId::random());
        let b = Address::new("/ip4/127.0.0.1/tcp/2".parse().unwrap()).with_peer_id(PeerId::random());
        let result = normalize_target(DialTarget::Addresses(vec![a, b]));
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn normalize_peer_target_has_no_addresses() {
        let peer = PeerId::random();
        let (extracted, addresses) = normalize_target(DialTarget::Peer(peer)).unwrap();
        assert_eq!(extracted, Some(peer));
        assert!(addresses.is_empty());
    }
}
