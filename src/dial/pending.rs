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

//! A single in-flight dial request tracked by [`crate::dial::DialQueue`] (spec §3).

use crate::{address::Address, connection::Connection, error::Error, peer_id::PeerId, types::DialId};

use parking_lot::Mutex;
use tokio::sync::watch;

use std::sync::Arc;

/// Where a [`PendingDial`] sits in its lifecycle (spec §3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DialStatus {
    Queued,
    Active,
    Success,
    Error,
}

/// The terminal outcome of a [`PendingDial`], broadcast to every caller joined onto it.
pub type DialOutcome = Result<Connection, Error>;

/// The key two dial requests are compared on to decide whether they join the same
/// [`PendingDial`] (spec invariant 1 / spec §4.1 step 4): the same `peerId` when both sides
/// know one, otherwise an identical ordered set of candidate address strings.
#[derive(Debug, Clone)]
pub struct DedupKey {
    peer_id: Option<PeerId>,
    addresses: Vec<String>,
}

impl DedupKey {
    pub fn new(peer_id: Option<PeerId>, addresses: &[Address]) -> Self {
        Self {
            peer_id,
            addresses: addresses.iter().map(|address| address.multiaddr().to_string()).collect(),
        }
    }

    /// Whether `self` and `other` identify the same underlying dial (spec §4.1 step 4: "same
    /// PeerId (if both defined and equal) OR identical ordered set of candidate address
    /// strings" -- deliberately an OR, not a struct-level equality).
    pub fn matches(&self, other: &DedupKey) -> bool {
        match (self.peer_id, other.peer_id) {
            (Some(a), Some(b)) if a == b => return true,
            _ => {}
        }
        self.addresses == other.addresses
    }
}

/// One in-flight dial request, tracked by [`crate::dial::DialQueue`] from creation until
/// completion (spec §3). Cloning shares the same status cell and completion channel; every
/// joined caller holds a clone.
#[derive(Clone)]
pub struct PendingDial {
    id: DialId,
    key: DedupKey,
    peer_id: Option<PeerId>,
    multiaddrs: Vec<Address>,
    status: Arc<Mutex<DialStatus>>,
    outcome: watch::Receiver<Option<Arc<DialOutcome>>>,
}

impl PendingDial {
    pub fn new(
        id: DialId,
        peer_id: Option<PeerId>,
        multiaddrs: Vec<Address>,
    ) -> (Self, watch::Sender<Option<Arc<DialOutcome>>>) {
        let key = DedupKey::new(peer_id, &multiaddrs);
        let (tx, rx) = watch::channel(None);
        (
            Self {
                id,
                key,
                peer_id,
                multiaddrs,
                status: Arc::new(Mutex::new(DialStatus::Queued)),
                outcome: rx,
            },
            tx,
        )
    }

    pub fn id(&self) -> &DialId {
        &self.id
    }

    pub fn key(&self) -> &DedupKey {
        &self.key
    }

    pub fn peer_id(&self) -> Option<PeerId> {
        self.peer_id
    }

    pub fn multiaddrs(&self) -> &[Address] {
        &self.multiaddrs
    }

    pub fn status(&self) -> DialStatus {
        *self.status.lock()
    }

    pub(crate) fn set_status(&self, status: DialStatus) {
        *self.status.lock() = status;
    }

    /// The shared status cell, handed to [`super::queue::perform_dial`] so it can flip
    /// `Queued` -> `Active` as soon as a candidate starts dialing.
    pub(crate) fn status_cell(&self) -> Arc<Mutex<DialStatus>> {
        self.status.clone()
    }

    /// Await the shared completion of this dial, returning an owned clone of whatever the
    /// owning task resolved (spec §4.1 step 4: "return that dial's completion future").
    pub async fn join(&self) -> Result<Connection, Error> {
        let mut outcome = self.outcome.clone();
        loop {
            if let Some(result) = outcome.borrow().clone() {
                return (*result).clone();
            }
            if outcome.changed().await.is_err() {
                return Err(Error::EssentialTaskClosed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_with_addresses(addresses: Vec<String>) -> DedupKey {
        DedupKey { peer_id: None, addresses }
    }

    #[test]
    fn shared_peer_id_matches_regardless_of_addresses() {
        let peer = PeerId::random();
        let a = DedupKey { peer_id: Some(peer), addresses: vec!["/ip4/1.2.3.4/tcp/1".into()] };
        let b = DedupKey { peer_id: Some(peer), addresses: vec!["/ip4/5.6.7.8/tcp/2".into()] };
        assert!(a.matches(&b));
    }

    #[test]
    fn different_peer_ids_fall_back_to_address_comparison() {
        let a = DedupKey { peer_id: Some(PeerId::random()), addresses: vec!["/ip4/1.2.3.4/tcp/1".into()] };
        let b = DedupKey { peer_id: Some(PeerId::random()), addresses: vec!["/ip4/1.2.3.4/tcp/1".into()] };
        assert!(!a.matches(&b));
    }

    quickcheck::quickcheck! {
        /// With no peer id on either side, two [`DedupKey`]s match iff their address lists
        /// are equal element-for-element (spec §4.1 step 4's "identical ordered set").
        fn matches_without_peer_id_is_address_list_equality(left: Vec<String>, right: Vec<String>) -> bool {
            let a = key_with_addresses(left.clone());
            let b = key_with_addresses(right.clone());
            a.matches(&b) == (left == right)
        }

        /// Matching is reflexive for any address list, with or without a peer id.
        fn matches_is_reflexive(addresses: Vec<String>) -> bool {
            let key = key_with_addresses(addresses);
            key.matches(&key)
        }
    }
}
