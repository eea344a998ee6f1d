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

//! Races the candidate addresses of one [`super::PendingDial`] against a two-level
//! concurrency gate (spec §4.1 step 5, `performDial`).
//!
//! The per-dial [`Semaphore`] bounds `maxParallelDialsPerPeer`; every dial shares one global
//! [`Semaphore`] bounding `maxParallelDials`. A candidate must acquire both, in that order,
//! before it may call the transport driver -- "two-level queuing prevents one peer with many
//! addresses from starving others" (spec §4.1).

use super::pending::DialStatus;
use crate::{
    address::Address, connection::Connection, error::Error, transport::TransportDriver,
    upgrade::{UpgradeOptions, Upgrader},
};

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use std::sync::Arc;

/// Logging target for the file.
const LOG_TARGET: &str = "dial-queue::race";

/// Runs `future` to completion unless `token` is cancelled first, in which case the race
/// yields [`Error::Abort`] without waiting for `future` to unwind.
async fn cancellable<F, T>(token: &CancellationToken, future: F) -> Result<T, Error>
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        _ = token.cancelled() => Err(Error::Abort),
        value = future => Ok(value),
    }
}

/// Races `candidates` against each other, returning the first successfully-upgraded
/// [`Connection`] and cancelling the rest (spec §4.1 step 5, testable property 2).
///
/// `transport_for` resolves the driver for one candidate; by the time addresses reach here
/// [`super::DialQueue::calculate_multiaddrs`] has already dropped any address no driver
/// supports, so a `None` here would be a bug in that filtering step, not a normal outcome.
pub(crate) async fn perform_dial(
    candidates: Vec<Address>,
    max_parallel_dials_per_peer: usize,
    global_semaphore: Arc<Semaphore>,
    transport_for: impl Fn(&Address) -> Option<Arc<dyn TransportDriver>>,
    upgrader: Arc<Upgrader>,
    status: Arc<Mutex<DialStatus>>,
    shutdown: CancellationToken,
) -> Result<Connection, Error> {
    let per_dial_semaphore = Arc::new(Semaphore::new(max_parallel_dials_per_peer.max(1)));
    let tokens: Vec<CancellationToken> = candidates.iter().map(|_| shutdown.child_token()).collect();
    let tokens = Arc::new(tokens);

    let mut attempts = FuturesUnordered::new();
    for (index, candidate) in candidates.into_iter().enumerate() {
        let Some(driver) = transport_for(&candidate) else {
            tracing::warn!(
                target: LOG_TARGET,
                address = %candidate,
                "no transport driver claims this address; skipping"
            );
            continue;
        };

        attempts.push(attempt(
            candidate,
            index,
            tokens.clone(),
            per_dial_semaphore.clone(),
            global_semaphore.clone(),
            driver,
            upgrader.clone(),
            status.clone(),
        ));
    }

    let attempted = attempts.len();
    let mut errors = Vec::with_capacity(attempted);
    while let Some((address, result)) = attempts.next().await {
        match result {
            Ok(connection) => return Ok(connection),
            Err(error) => errors.push((address, error)),
        }
    }

    // Every candidate failed: unwrap a single error (spec §7), otherwise aggregate.
    if errors.len() == 1 {
        let (_, error) = errors.into_iter().next().expect("length checked above");
        Err(error)
    } else {
        Err(Error::Dial(crate::error::DialError::Aggregate(
            errors.into_iter().map(|(address, error)| (address.into_multiaddr(), error)).collect(),
        )))
    }
}

/// One candidate's attempt: acquire both concurrency slots, dial, and -- if nobody else has
/// already won -- upgrade the resulting raw connection and declare victory by cancelling every
/// sibling token.
#[allow(clippy::too_many_arguments)]
async fn attempt(
    candidate: Address,
    index: usize,
    tokens: Arc<Vec<CancellationToken>>,
    per_dial_semaphore: Arc<Semaphore>,
    global_semaphore: Arc<Semaphore>,
    driver: Arc<dyn TransportDriver>,
    upgrader: Arc<Upgrader>,
    status: Arc<Mutex<DialStatus>>,
) -> (Address, Result<Connection, Error>) {
    let token = tokens[index].clone();
    let result = attempt_inner(
        &candidate,
        &token,
        &tokens,
        index,
        &per_dial_semaphore,
        &global_semaphore,
        &driver,
        &upgrader,
        &status,
    )
    .await;
    (candidate, result)
}

#[allow(clippy::too_many_arguments)]
async fn attempt_inner(
    candidate: &Address,
    token: &CancellationToken,
    all_tokens: &[CancellationToken],
    index: usize,
    per_dial_semaphore: &Arc<Semaphore>,
    global_semaphore: &Arc<Semaphore>,
    driver: &Arc<dyn TransportDriver>,
    upgrader: &Arc<Upgrader>,
    status: &Arc<Mutex<DialStatus>>,
) -> Result<Connection, Error> {
    let _per_peer_permit = cancellable(token, per_dial_semaphore.clone().acquire_owned())
        .await?
        .map_err(|_| Error::Abort)?;
    let _global_permit = cancellable(token, global_semaphore.clone().acquire_owned())
        .await?
        .map_err(|_| Error::Abort)?;

    *status.lock() = DialStatus::Active;

    let raw = cancellable(token, driver.dial(candidate.multiaddr())).await??;

    // A sibling may have won while this candidate was still dialing; if so the raw connection
    // just established is redundant and must be dropped, not upgraded (spec §4.1 step 5).
    if token.is_cancelled() {
        tracing::trace!(target: LOG_TARGET, address = %candidate, "lost the race after connecting; discarding");
        drop(raw);
        return Err(Error::Abort);
    }

    for (other_index, other_token) in all_tokens.iter().enumerate() {
        if other_index != index {
            other_token.cancel();
        }
    }

    upgrader.upgrade_outbound(raw, candidate.clone(), UpgradeOptions::default()).await
}
