use thiserror::Error;

/// All errors produced by the WireStream wire codec.
///
/// The endpoint state machines themselves never return errors: stream faults
/// are one-way flags (`has_error`) and out-of-window input is dropped
/// silently. Only decoding bytes off the wire can fail.
#[derive(Debug, Error)]
pub enum WireStreamError {
    #[error("message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort { expected: usize, actual: usize },

    #[error("unknown flag bits: 0x{0:02x}")]
    UnknownFlags(u8),

    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, WireStreamError>;
