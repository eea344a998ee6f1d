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

//! [`DialQueue`](crate::dial::DialQueue) configuration (spec §4.1). Purely programmatic --
//! no environment variables, CLI flags or on-disk state at this layer (spec §6).

use crate::{resolve::Resolver, sorter::{AddressSorter, PriorityAddressSorter}};

use std::{collections::HashMap, sync::Arc, time::Duration};

/// Configuration for a [`crate::dial::DialQueue`] (spec §4.1 "Configuration (enumerated)").
pub struct DialQueueConfig {
    pub address_sorter: Arc<dyn AddressSorter>,
    pub max_parallel_dials: usize,
    pub max_parallel_dials_per_peer: usize,
    pub max_peer_addrs_to_dial: usize,
    pub dial_timeout: Duration,
    /// Resolvers keyed by address-scheme name (e.g. `"dns"`, `"dns4"`, `"dns6"`).
    pub resolvers: HashMap<String, Arc<dyn Resolver>>,
}

impl DialQueueConfig {
    pub fn builder() -> DialQueueConfigBuilder {
        DialQueueConfigBuilder::default()
    }
}

/// Builder for [`DialQueueConfig`], following this crate's `*ConfigBuilder` convention (see
/// [`crate::upgrade::UpgraderConfigBuilder`]).
pub struct DialQueueConfigBuilder {
    address_sorter: Arc<dyn AddressSorter>,
    max_parallel_dials: usize,
    max_parallel_dials_per_peer: usize,
    max_peer_addrs_to_dial: usize,
    dial_timeout: Duration,
    resolvers: HashMap<String, Arc<dyn Resolver>>,
}

impl Default for DialQueueConfigBuilder {
    fn default() -> Self {
        Self {
            address_sorter: Arc::new(PriorityAddressSorter),
            max_parallel_dials: 8,
            max_parallel_dials_per_peer: 4,
            max_peer_addrs_to_dial: 8,
            dial_timeout: Duration::from_secs(10),
            resolvers: HashMap::new(),
        }
    }
}

impl DialQueueConfigBuilder {
    pub fn with_address_sorter(mut self, sorter: Arc<dyn AddressSorter>) -> Self {
        self.address_sorter = sorter;
        self
    }

    pub fn with_max_parallel_dials(mut self, max: usize) -> Self {
        self.max_parallel_dials = max;
        self
    }

    pub fn with_max_parallel_dials_per_peer(mut self, max: usize) -> Self {
        self.max_parallel_dials_per_peer = max;
        self
    }

    pub fn with_max_peer_addrs_to_dial(mut self, max: usize) -> Self {
        self.max_peer_addrs_to_dial = max;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_resolver(mut self, scheme: impl Into<String>, resolver: Arc<dyn Resolver>) -> Self {
        self.resolvers.insert(scheme.into(), resolver);
        self
    }

    pub fn build(self) -> DialQueueConfig {
        DialQueueConfig {
            address_sorter: self.address_sorter,
            max_parallel_dials: self.max_parallel_dials,
            max_parallel_dials_per_peer: self.max_parallel_dials_per_peer,
            max_peer_addrs_to_dial: self.max_peer_addrs_to_dial,
            dial_timeout: self.dial_timeout,
            resolvers: self.resolvers,
        }
    }
}
