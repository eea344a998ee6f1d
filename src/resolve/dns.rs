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

//! DNS resolver for `/dns`, `/dns4` and `/dns6` addresses.
//!
//! Grounded on the teacher's own (work-in-progress) `trust_dns_resolver` use in
//! `transport::manager::TransportManager::dial_address`/`on_resolved_dns_address`: the same
//! `AsyncResolver`, the same `/dns{,4,6}` -> `/ip{4,6}` rewrite, generalized here into a
//! standalone [`Resolver`] so `DialQueue` can call it for any scheme, not just inline in the
//! dial path.

use crate::{address::Address, error::Error, resolve::Resolver};

use async_trait::async_trait;
use multiaddr::{Multiaddr, Protocol};
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};

use std::net::IpAddr;

/// Logging target for the file.
const LOG_TARGET: &str = "resolve::dns";

/// Resolves `/dns`, `/dns4` and `/dns6` components into `/ip4`/`/ip6`, keeping the remainder
/// of the address stack (`/tcp/<port>/p2p/<peer>`, ...) intact.
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new() -> Result<Self, Error> {
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            .map_err(|_| Error::AddressError(crate::error::AddressError::AddressNotAvailable))?;
        Ok(Self { resolver })
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, address: &Address) -> Result<Vec<Address>, Error> {
        let multiaddr = address.multiaddr().clone();
        let mut iter = multiaddr.iter();

        let (name, is_v4_only, is_v6_only) = match iter.next() {
            Some(Protocol::Dns4(name)) => (name.to_string(), true, false),
            Some(Protocol::Dns6(name)) => (name.to_string(), false, true),
            Some(Protocol::Dns(name)) => (name.to_string(), false, false),
            _ => return Ok(vec![address.clone()]),
        };

        tracing::trace!(target: LOG_TARGET, %name, "resolving dns name");

        let lookup = self
            .resolver
            .lookup_ip(name.as_str())
            .await
            .map_err(|_| Error::AddressError(crate::error::AddressError::AddressNotAvailable))?;

        let remainder: Vec<_> = iter.collect();
        let mut resolved = Vec::new();

        for ip in lookup.iter() {
            let accept = match ip {
                IpAddr::V4(_) => !is_v6_only,
                IpAddr::V6(_) => !is_v4_only,
            };
            if !accept {
                continue;
            }

            let mut rebuilt = Multiaddr::empty();
            rebuilt.push(match ip {
                IpAddr::V4(v4) => Protocol::Ip4(v4),
                IpAddr::V6(v6) => Protocol::Ip6(v6),
            });
            for protocol in &remainder {
                rebuilt.push(protocol.clone());
            }

            let mut resolved_address = Address::new(rebuilt);
            if address.is_certified() {
                resolved_address.merge_certification(true);
            }
            resolved.push(resolved_address);
        }

        if resolved.is_empty() {
            return Err(Error::AddressError(crate::error::AddressError::AddressNotAvailable));
        }

        Ok(resolved)
    }
}
