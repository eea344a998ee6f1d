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

//! Capability negotiation: `handle` (responder) / `select` (initiator) over multistream-select.
//!
//! Generalizes the teacher's `transport::tcp::negotiate_protocol` (which only drove the dialer
//! side via `dialer_select_proto`) to cover both directions, since the encrypter phase, the
//! muxer phase and per-stream protocol negotiation (spec §6) all need both.

use crate::error::NegotiationError;

use futures::io::{AsyncRead, AsyncWrite};
use multistream_select::{dialer_select_proto, listener_select_proto, Negotiated, Version};

/// Logging target for the file.
const LOG_TARGET: &str = "negotiate";

/// Outcome of a capability negotiation: the agreed capability string and a stream whose
/// source may carry bytes the remote sent immediately after agreeing (spec §6: "must leave a
/// stream whose source may carry early data").
pub struct NegotiationOutcome<S> {
    pub protocol: String,
    pub stream: Negotiated<S>,
}

/// Initiator side: offer `protocols` in priority order and agree on the first the remote
/// supports.
pub async fn select<S>(
    io: S,
    protocols: Vec<String>,
) -> Result<NegotiationOutcome<S>, NegotiationError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    tracing::trace!(target: LOG_TARGET, ?protocols, "selecting capability (initiator)");

    let (protocol, stream) = dialer_select_proto(io, protocols, Version::V1).await?;

    tracing::trace!(target: LOG_TARGET, %protocol, "capability selected");

    Ok(NegotiationOutcome { protocol, stream })
}

/// Responder side: wait for the remote to offer a capability and accept the first one present
/// in `protocols`.
pub async fn handle<S>(
    io: S,
    protocols: Vec<String>,
) -> Result<NegotiationOutcome<S>, NegotiationError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    tracing::trace!(target: LOG_TARGET, ?protocols, "handling capability negotiation (responder)");

    let (protocol, stream) = listener_select_proto(io, protocols).await?;

    tracing::trace!(target: LOG_TARGET, %protocol, "capability accepted");

    Ok(NegotiationOutcome { protocol, stream })
}
