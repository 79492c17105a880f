//! Chunked send: split one logical buffer into capacity-bounded fragments.
//!
//! ```text
//!  300 B payload, capacity 120
//!  ┌─────────────┐ pause ┌─────────────┐ pause ┌────────┐
//!  │ frag 0: 120 │──────▶│ frag 1: 120 │──────▶│ 2: 60  │
//!  └─────────────┘       └─────────────┘       └────────┘
//! ```
//!
//! Fragments go out strictly in order with the transport's pause between
//! them (never after the last). The first failure aborts the send;
//! fragments already handed to the transport stay sent.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use super::{Target, Transport};
use crate::error::TransportError;

/// Number of fragments a payload of `len` bytes needs.
pub fn fragment_count(len: usize, capacity: usize) -> usize {
    if capacity == 0 {
        return 0;
    }
    len.div_ceil(capacity)
}

/// Send `data` as ordered fragments. Returns the number of fragments sent.
pub fn send_chunked<T: Transport + ?Sized>(
    transport: &mut T,
    delay: &mut impl DelayNs,
    target: Target,
    data: &[u8],
) -> Result<usize, TransportError> {
    if data.is_empty() {
        return Err(TransportError::InvalidArgument);
    }
    let capacity = transport.capacity();
    if capacity == 0 {
        return Err(TransportError::NotReady);
    }
    let pause_ms = transport.fragment_pause_ms();
    let total = fragment_count(data.len(), capacity);

    for (idx, fragment) in data.chunks(capacity).enumerate() {
        if idx > 0 && pause_ms > 0 {
            delay.delay_ms(pause_ms);
        }
        if let Err(e) = transport.send(target, fragment) {
            warn!("LINK: fragment {}/{} failed: {}", idx + 1, total, e);
            return Err(e);
        }
    }

    debug!("LINK: sent {} bytes in {} fragment(s)", data.len(), total);
    Ok(total)
}
