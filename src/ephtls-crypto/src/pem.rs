//! Strict single-block PEM framing.
//!
//! Everything exchanged during the bootstrap carries exactly one PEM block.
//! Data after the post-encapsulation boundary (other than whitespace) is an
//! error rather than something to skip.

use crate::{CryptoError, Result};
use pem_rfc7468::LineEnding;

pub const CERTIFICATE: &str = "CERTIFICATE";
pub const PRIVATE_KEY: &str = "PRIVATE KEY";
pub const ENCRYPTED_PRIVATE_KEY: &str = "ENCRYPTED PRIVATE KEY";

const POST_BOUNDARY: &[u8] = b"-----END ";

/// Encode DER bytes as a PEM block with LF line endings.
pub fn encode(label: &str, der: &[u8]) -> Result<String> {
    Ok(pem_rfc7468::encode_string(label, LineEnding::LF, der)?)
}

/// Decode exactly one PEM block, returning its label and DER contents.
pub fn decode_single(input: &[u8]) -> Result<(String, Vec<u8>)> {
    let (block, rest) = split_block(input);
    let (label, der) = pem_rfc7468::decode_vec(block)?;
    if !rest.iter().all(u8::is_ascii_whitespace) {
        return Err(CryptoError::TrailingData("after the PEM block"));
    }
    Ok((label.to_string(), der))
}

/// Decode exactly one PEM block and require a specific label.
pub fn decode_labeled(input: &[u8], expected: &str) -> Result<Vec<u8>> {
    let (label, der) = decode_single(input)?;
    if label != expected {
        return Err(CryptoError::Pem(format!(
            "expected {expected} block, found {label}"
        )));
    }
    Ok(der)
}

/// Split after the first post-encapsulation boundary line. RFC 7468 puts
/// that boundary on a line of its own; the decoder validates the block.
fn split_block(input: &[u8]) -> (&[u8], &[u8]) {
    let mut end = 0;
    for line in input.split_inclusive(|&b| b == b'\n') {
        end += line.len();
        if line.starts_with(POST_BOUNDARY) {
            return input.split_at(end);
        }
    }
    (input, &[])
}
