use thiserror::Error;

use crate::Tick;

/// Number of bytes the clock trailer adds to every payload
pub const CLOCK_TRAILER_BYTES: usize = std::mem::size_of::<Tick>();

/// Errors that can occur while packing or unpacking an envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The received buffer is too short to carry a clock trailer
    #[error("Envelope of {len} bytes is shorter than the {CLOCK_TRAILER_BYTES}-byte clock trailer. The message was not sent through an instrumented send")]
    Truncated { len: usize },

    /// The envelope buffer could not be allocated
    #[error("Failed to allocate a {requested}-byte envelope buffer")]
    Allocation { requested: usize },
}

/// A user payload together with the sender's logical clock.
///
/// On the wire the envelope is the payload bytes followed by the clock as a
/// little-endian `u64`, forwarded as one opaque message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub payload: Vec<u8>,
    pub clock: Tick,
}

impl Envelope {
    /// Packs `payload` and `clock` into a single buffer
    pub fn encode(payload: &[u8], clock: Tick) -> Result<Vec<u8>, EnvelopeError> {
        let requested = payload.len() + CLOCK_TRAILER_BYTES;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(requested)
            .map_err(|_| EnvelopeError::Allocation { requested })?;

        buffer.extend_from_slice(payload);
        buffer.extend_from_slice(&clock.to_le_bytes());
        Ok(buffer)
    }

    /// Splits a received buffer back into payload and sender clock
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let (payload, clock) = Self::split(bytes)?;
        Ok(Self {
            payload: payload.to_vec(),
            clock,
        })
    }

    /// Borrowing variant of [`Envelope::decode`]
    pub fn split(bytes: &[u8]) -> Result<(&[u8], Tick), EnvelopeError> {
        if bytes.len() < CLOCK_TRAILER_BYTES {
            return Err(EnvelopeError::Truncated { len: bytes.len() });
        }

        let (payload, trailer) = bytes.split_at(bytes.len() - CLOCK_TRAILER_BYTES);
        let mut clock_bytes = [0u8; CLOCK_TRAILER_BYTES];
        clock_bytes.copy_from_slice(trailer);
        Ok((payload, Tick::from_le_bytes(clock_bytes)))
    }
}
