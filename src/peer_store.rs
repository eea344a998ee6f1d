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

//! Persistent mapping of peer identity to known addresses and metadata.
//!
//! The specification (§1) treats the peer store as an external collaborator; this module
//! supplies the in-memory default this crate's tests and examples run against
//! (`MemoryPeerStore`), plus the [`PeerStore`] trait a real, persistent implementation would
//! satisfy instead.

use crate::{address::Address, peer_id::PeerId, types::ProtocolName};

use indexmap::IndexSet;
use parking_lot::RwLock;

use std::collections::{HashMap, HashSet};

/// Metadata and address-book record kept for one peer.
///
/// Addresses are kept in an [`IndexSet`] rather than a `Vec`: discovery and dialing both care
/// about insertion order (earlier-learned addresses are tried first), but merging in a
/// re-announced address must not duplicate it.
#[derive(Debug, Clone, Default)]
pub struct PeerRecord {
    pub addresses: IndexSet<Address>,
    pub protocols: HashSet<ProtocolName>,
    pub metadata: HashMap<String, Vec<u8>>,
}

/// Mapping from peer identity to known addresses and metadata (spec §6).
pub trait PeerStore: Send + Sync {
    fn get(&self, peer: &PeerId) -> Option<PeerRecord>;

    /// Best-effort merge of free-form metadata; failures must never propagate (spec §7).
    fn patch(&self, peer: &PeerId, metadata: HashMap<String, Vec<u8>>);

    /// Best-effort merge of the protocols known to be supported by `peer`.
    fn merge_protocols(&self, peer: &PeerId, protocols: &[ProtocolName]);
}

/// An in-memory [`PeerStore`], the ambient default when no persistent store is configured.
#[derive(Debug, Default)]
pub struct MemoryPeerStore {
    records: RwLock<HashMap<PeerId, PeerRecord>>,
}

impl MemoryPeerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `peer`'s known addresses, as a real application would after a successful
    /// discovery round. Used directly by tests; production code goes through [`PeerStore`].
    pub fn add_addresses(&self, peer: PeerId, addresses: impl IntoIterator<Item = Address>) {
        let mut records = self.records.write();
        let record = records.entry(peer).or_default();
        for mut incoming in addresses {
            if let Some(existing) = record.addresses.get(&incoming) {
                incoming.merge_certification(existing.is_certified());
            }
            record.addresses.replace(incoming);
        }
    }
}

impl PeerStore for MemoryPeerStore {
    fn get(&self, peer: &PeerId) -> Option<PeerRecord> {
        self.records.read().get(peer).cloned()
    }

    fn patch(&self, peer: &PeerId, metadata: HashMap<String, Vec<u8>>) {
        let mut records = self.records.write();
        let record = records.entry(*peer).or_default();
        record.metadata.extend(metadata);
    }

    fn merge_protocols(&self, peer: &PeerId, protocols: &[ProtocolName]) {
        let mut records = self.records.write();
        let record = records.entry(*peer).or_default();
        record.protocols.extend(protocols.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_is_merge_not_replace() {
        let store = MemoryPeerStore::new();
        let peer = PeerId::random();
        store.patch(&peer, HashMap::from([("a".to_string(), vec![1])]));
        store.patch(&peer, HashMap::from([("b".to_string(), vec![2])]));

        let record = store.get(&peer).unwrap();
        assert_eq!(record.metadata.get("a"), Some(&vec![1u8]));
        assert_eq!(record.metadata.get("b"), Some(&vec![2u8]));
    }

    #[test]
    fn get_on_unknown_peer_is_tolerated() {
        let store = MemoryPeerStore::new();
        assert!(store.get(&PeerId::random()).is_none());
    }
}
