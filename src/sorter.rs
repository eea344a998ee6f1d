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

//! Total order over candidate [`Address`]es, defining dial-attempt priority (spec §4.1).

use crate::address::Address;

/// A total order over candidate addresses. [`DialQueue`](crate::dial::DialQueue) sorts the
/// surviving candidates with this before racing them, so the order defines dial-attempt
/// priority, not a hard precedence (all candidates still race concurrently).
pub trait AddressSorter: Send + Sync {
    fn sort(&self, addresses: &mut Vec<Address>);
}

/// Stable sort placing certified addresses first, otherwise preserving insertion order.
///
/// The specification leaves the sorter's concrete policy unspecified (spec §9); certified
/// addresses first is a defensible default because they carry a stronger correctness signal
/// than an address merely supplied by the caller or resolved from DNS.
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorityAddressSorter;

impl AddressSorter for PriorityAddressSorter {
    fn sort(&self, addresses: &mut Vec<Address>) {
        addresses.sort_by_key(|address| std::cmp::Reverse(address.is_certified()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certified_addresses_sort_first_and_order_is_stable() {
        let a: Address = "/ip4/10.0.0.1/tcp/1".parse::<multiaddr::Multiaddr>().unwrap().into();
        let b = Address::certified("/ip4/10.0.0.2/tcp/2".parse().unwrap());
        let c: Address = "/ip4/10.0.0.3/tcp/3".parse::<multiaddr::Multiaddr>().unwrap().into();
        let mut addresses = vec![a.clone(), b.clone(), c.clone()];

        PriorityAddressSorter.sort(&mut addresses);

        assert_eq!(addresses[0], b);
        assert_eq!(addresses[1], a);
        assert_eq!(addresses[2], c);
    }
}
