//! Socket frame header
//!
//! Every message exchanged over the API socket is preceded by a 16 byte
//! header: an unused queue pointer (`u64`), the body length (`u32`, big
//! endian) and a garbage-collection timestamp (`u32`) that clients leave at
//! zero.

use crate::{CodecError, Result};

/// Size of the frame header in bytes
pub const HEADER_LEN: usize = 16;

/// Largest body accepted from a peer
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Build the header for a body of `len` bytes
#[must_use]
pub fn encode_header(len: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[8..12].copy_from_slice(&len.to_be_bytes());
    header
}

/// Extract the body length from a header
///
/// # Errors
///
/// Returns [`CodecError::TooLarge`] when the announced body exceeds
/// [`MAX_MESSAGE_SIZE`]
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<u32> {
    let len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
    if len > MAX_MESSAGE_SIZE {
        return Err(CodecError::TooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_places_length_after_queue_pointer() {
        let header = encode_header(0x0102_0304);
        assert_eq!(&header[..8], &[0; 8]);
        assert_eq!(&header[8..12], &[1, 2, 3, 4]);
        assert_eq!(&header[12..], &[0; 4]);
        assert_eq!(decode_header(&header), Ok(0x0102_0304));
    }

    #[test]
    fn oversized_body_is_rejected() {
        let header = encode_header(MAX_MESSAGE_SIZE + 1);
        assert!(matches!(
            decode_header(&header),
            Err(CodecError::TooLarge { .. })
        ));
    }
}
