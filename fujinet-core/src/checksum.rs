//! FujiBus checksum algorithm
//!
//! 1. Take the complete frame with the checksum byte set to 0x00
//! 2. Add every byte to an accumulator
//! 3. After each addition fold the carry back in: `s = (s >> 8) + (s & 0xFF)`
//! 4. The low 8 bits are the checksum

use tracing::trace;

use crate::packet::CHECKSUM_OFFSET;

/// Calculate the carry-folding sum of `data`
///
/// # Algorithm
///
/// ```text
/// s = 0
/// for b in data:
///     s = s + b
///     s = (s >> 8) + (s & 0xFF)
/// return s as u8
/// ```
///
/// # Examples
///
/// ```
/// use fujinet_core::checksum;
///
/// assert_eq!(checksum::calculate(&[0xFF, 0x02]), 0x02);
/// ```
pub fn calculate(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u16, |acc, &b| {
        let s = acc + b as u16;
        (s >> 8) + (s & 0xFF)
    });
    sum as u8
}

/// Checksum of a complete frame, treating the checksum byte as zero
///
/// Frames shorter than the header are summed as they are.
pub fn frame_checksum(frame: &[u8]) -> u8 {
    if frame.len() <= CHECKSUM_OFFSET {
        return calculate(frame);
    }

    let head = calculate(&frame[..CHECKSUM_OFFSET]);
    let tail = calculate(&frame[CHECKSUM_OFFSET + 1..]);

    // Folding is associative over concatenation, so the two halves combine
    // like two more bytes.
    let checksum = calculate(&[head, tail]);

    trace!(
        frame_len = frame.len(),
        checksum = format!("0x{:02X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify the checksum stored in a complete frame
pub fn verify(frame: &[u8]) -> bool {
    match frame.get(CHECKSUM_OFFSET) {
        Some(&stored) => frame_checksum(frame) == stored,
        None => false,
    }
}
