//! Shared audio buffer
//!
//! The engine exposes its linear memory as a flat `f32` slice and hands out
//! byte addresses into it. [`SharedAudioBuffer`] turns one such allocation
//! into a bounds-checked view: every access goes through [`view`] or
//! [`view_mut`], which re-check the region against the memory slice handed
//! in, so a grown or shrunk engine memory can never be over-read.
//!
//! [`view`]: SharedAudioBuffer::view
//! [`view_mut`]: SharedAudioBuffer::view_mut

use std::fmt;
use std::mem::size_of;

use crate::types::Sample;

use super::error::BufferError;

/// Byte address of an allocation inside the engine's linear memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferAddress(pub usize);

impl BufferAddress {
    /// Index of the first sample at this address, if it is sample-aligned
    pub fn sample_offset(self) -> Option<usize> {
        (self.0 % size_of::<Sample>() == 0).then(|| self.0 / size_of::<Sample>())
    }
}

impl fmt::Display for BufferAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Quantum-sized region of the engine's memory shared with the render bridge
///
/// Created once on successful engine initialization and consumed by the
/// engine handle's teardown, so it cannot outlive the allocation it names.
#[derive(Debug, PartialEq, Eq)]
pub struct SharedAudioBuffer {
    address: BufferAddress,
    offset: usize,
    len: usize,
}

impl SharedAudioBuffer {
    /// Validate an engine allocation of `len` samples at `address`
    pub fn new(address: BufferAddress, len: usize, memory_len: usize) -> Result<Self, BufferError> {
        let offset = address
            .sample_offset()
            .ok_or(BufferError::Misaligned(address))?;
        let buffer = Self {
            address,
            offset,
            len,
        };
        buffer.check(memory_len)?;
        Ok(buffer)
    }

    /// Byte address handed back to the engine on every call
    #[inline]
    pub fn address(&self) -> BufferAddress {
        self.address
    }

    /// Length in samples (always the quantum length)
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the allocation in bytes
    #[inline]
    pub fn byte_length(&self) -> usize {
        self.len * size_of::<Sample>()
    }

    #[inline]
    fn check(&self, memory_len: usize) -> Result<(), BufferError> {
        let end = self.offset + self.len;
        if end > memory_len {
            return Err(BufferError::OutOfBounds {
                offset: self.offset,
                end,
                memory_len,
            });
        }
        Ok(())
    }

    /// Read-only view of the region inside `memory`
    #[inline]
    pub fn view<'a>(&self, memory: &'a [Sample]) -> Result<&'a [Sample], BufferError> {
        self.check(memory.len())?;
        Ok(&memory[self.offset..self.offset + self.len])
    }

    /// Writable view of the region inside `memory`
    #[inline]
    pub fn view_mut<'a>(&self, memory: &'a mut [Sample]) -> Result<&'a mut [Sample], BufferError> {
        self.check(memory.len())?;
        Ok(&mut memory[self.offset..self.offset + self.len])
    }
}
