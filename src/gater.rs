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

//! Policy hooks consulted at well-defined lifecycle points of the dial and upgrade pipelines.
//!
//! Every hook returns `true` to mean "deny". All hooks default to `false` so a gater only needs
//! to override the ones it cares about.

use crate::peer_id::PeerId;

use multiaddr::Multiaddr;

/// Policy hooks for the dial and upgrade pipelines (spec §6).
///
/// All methods have a default (allow-everything) implementation; implementors override only
/// the phases they police.
pub trait ConnectionGater: Send + Sync {
    fn deny_dial_peer(&self, _peer: &PeerId) -> bool {
        false
    }

    fn deny_dial_multiaddr(&self, _peer: Option<&PeerId>, _address: &Multiaddr) -> bool {
        false
    }

    fn deny_inbound_connection(&self, _address: &Multiaddr) -> bool {
        false
    }

    fn deny_outbound_connection(&self, _peer: Option<&PeerId>, _address: &Multiaddr) -> bool {
        false
    }

    fn deny_inbound_encrypted_connection(&self, _peer: &PeerId) -> bool {
        false
    }

    fn deny_outbound_encrypted_connection(&self, _peer: &PeerId) -> bool {
        false
    }

    fn deny_inbound_upgraded_connection(&self, _peer: &PeerId) -> bool {
        false
    }

    fn deny_outbound_upgraded_connection(&self, _peer: &PeerId) -> bool {
        false
    }
}

impl ConnectionGater for () {}

/// A [`ConnectionGater`] whose every hook returns `false`; the ambient default collaborator
/// when the embedding application has no dial/connection policy of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllGater;

impl ConnectionGater for AllowAllGater {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_denies_nothing() {
        let gater = AllowAllGater;
        assert!(!gater.deny_dial_peer(&PeerId::random()));
        assert!(!gater.deny_inbound_connection(&Multiaddr::empty()));
    }
}
