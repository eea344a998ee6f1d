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

//! A [`Multiaddr`] paired with the bookkeeping the dial queue needs: whether the address was
//! signed by the peer that owns it, and (derived, not stored) the peer identity it embeds.

use crate::{error::AddressError, peer_id::PeerId};

use multiaddr::{Multiaddr, Protocol};

use std::fmt;

/// A network address plus the certification bit the dial queue tracks across deduplication.
///
/// Two [`Address`]es are equal iff their [`Multiaddr`] string forms are equal (spec §3); the
/// `is_certified` flag is deliberately excluded from [`PartialEq`] so dedup can find the
/// existing candidate and OR the flags together.
#[derive(Debug, Clone)]
pub struct Address {
    multiaddr: Multiaddr,
    is_certified: bool,
}

impl Address {
    pub fn new(multiaddr: Multiaddr) -> Self {
        Self {
            multiaddr,
            is_certified: false,
        }
    }

    pub fn certified(multiaddr: Multiaddr) -> Self {
        Self {
            multiaddr,
            is_certified: true,
        }
    }

    pub fn multiaddr(&self) -> &Multiaddr {
        &self.multiaddr
    }

    pub fn into_multiaddr(self) -> Multiaddr {
        self.multiaddr
    }

    pub fn is_certified(&self) -> bool {
        self.is_certified
    }

    /// Merge the certification bit of a duplicate observation of this address (spec §3: OR).
    pub fn merge_certification(&mut self, other_is_certified: bool) {
        self.is_certified = self.is_certified || other_is_certified;
    }

    /// The peer identity embedded as a trailing `/p2p/<peer>` component, if any.
    pub fn peer_id(&self) -> Option<PeerId> {
        self.multiaddr.iter().last().and_then(|protocol| match protocol {
            Protocol::P2p(hash) => PeerId::from_multihash(hash).ok(),
            _ => None,
        })
    }

    /// Append `peer` as a trailing `/p2p/<peer>` component, unless this address already
    /// carries one or is a pure path-style address (e.g. `/unix/...`) that cannot carry one.
    pub fn with_peer_id(mut self, peer: PeerId) -> Self {
        if self.peer_id().is_some() || is_path_style(&self.multiaddr) {
            return self;
        }
        self.multiaddr.push(Protocol::P2p(*peer.as_multihash()));
        self
    }

    /// Whether any transport driver in `drivers` claims to support this address's transport
    /// stack, per spec §4.1's filtering step.
    pub fn is_supported_by(&self, mut supports: impl FnMut(&Multiaddr) -> bool) -> bool {
        supports(&self.multiaddr)
    }

    /// Validate (and strip in error reporting) the embedded peer id against `expected`.
    pub fn validate_peer(&self, expected: Option<&PeerId>) -> Result<(), AddressError> {
        match (self.peer_id(), expected) {
            (Some(got), Some(expected)) if &got != expected => Err(AddressError::InvalidProtocol),
            _ => Ok(()),
        }
    }
}

fn is_path_style(multiaddr: &Multiaddr) -> bool {
    matches!(multiaddr.iter().next(), Some(Protocol::Unix(_)) | Some(Protocol::Memory(_)))
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.multiaddr == other.multiaddr
    }
}

impl Eq for Address {}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.multiaddr.to_string().hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.multiaddr)
    }
}

impl From<Multiaddr> for Address {
    fn from(multiaddr: Multiaddr) -> Self {
        Self::new(multiaddr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_certification() {
        let a: Multiaddr = "/ip4/127.0.0.1/tcp/4001".parse().unwrap();
        let certified = Address::certified(a.clone());
        let uncertified = Address::new(a);
        assert_eq!(certified, uncertified);
    }

    #[test]
    fn with_peer_id_is_idempotent_when_already_present() {
        let peer = PeerId::random();
        let base: Multiaddr = "/ip4/127.0.0.1/tcp/4001".parse().unwrap();
        let addr = Address::new(base).with_peer_id(peer);
        let same_peer_again = addr.clone().with_peer_id(peer);
        assert_eq!(addr, same_peer_again);
        assert_eq!(addr.peer_id(), Some(peer));
    }

    #[test]
    fn merge_certification_ors() {
        let a: Multiaddr = "/ip4/127.0.0.1/tcp/4001".parse().unwrap();
        let mut addr = Address::new(a);
        assert!(!addr.is_certified());
        addr.merge_certification(true);
        assert!(addr.is_certified());
        addr.merge_certification(false);
        assert!(addr.is_certified());
    }
}
