// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hal::ByteSource;
use crate::ConfigError;

/// Why a line read stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    /// A terminator byte was consumed. It is not stored.
    Terminator,
    /// The source reported end of stream or a channel error.
    EndOfStream,
    /// The buffer filled up; anything after it is still unread.
    CapacityReached,
}

/// Fixed-storage line buffer with an explicit cursor.
///
/// `N` is the storage size; `limit` is the declared capacity and may be
/// smaller. Appends past `limit` are refused, so the buffer cannot overrun.
/// The storage is wiped when the buffer is dropped.
pub struct InputBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
    limit: usize,
}

impl<const N: usize> InputBuffer<N> {
    pub fn new() -> Self {
        Self {
            bytes: [0; N],
            len: 0,
            limit: N,
        }
    }

    pub fn with_limit(limit: usize) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if limit > N {
            return Err(ConfigError::CapacityExceedsStorage {
                capacity: limit,
                storage: N,
            });
        }
        Ok(Self {
            bytes: [0; N],
            len: 0,
            limit,
        })
    }

    /// For limits already validated by the caller; clamps rather than fails.
    pub(crate) fn with_checked_limit(limit: usize) -> Self {
        Self {
            bytes: [0; N],
            len: 0,
            limit: limit.min(N),
        }
    }

    /// Appends one byte, or returns it back if the buffer is full.
    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        if self.len >= self.limit {
            return Err(byte);
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.limit
    }

    pub fn capacity(&self) -> usize {
        self.limit
    }
}

impl<const N: usize> Default for InputBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Drop for InputBuffer<N> {
    fn drop(&mut self) {
        for byte in self.bytes.iter_mut() {
            // SAFETY: `byte` is a valid, aligned reference into our own storage.
            unsafe { core::ptr::write_volatile(byte, 0) };
        }
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
    }
}

/// Reads one line from `source` into `buf`.
///
/// Stops on the first byte contained in `terminators`, on end of stream, or
/// once `buf` is full. A full buffer stops the read *before* pulling another
/// byte, so nothing is consumed that cannot be stored.
pub fn read_line<S, const N: usize>(
    source: &mut S,
    buf: &mut InputBuffer<N>,
    terminators: &[u8],
) -> LineEnd
where
    S: ByteSource + ?Sized,
{
    LineReader::new(terminators).read(source, buf)
}

/// Consumes the rest of an over-long line so that a retry starts clean.
/// Returns the number of bytes thrown away.
pub fn discard_line<S>(source: &mut S, terminators: &[u8]) -> usize
where
    S: ByteSource + ?Sized,
{
    LineReader::new(terminators).discard(source)
}

/// Reads consecutive lines from one source.
///
/// Remembers the terminator that ended the previous line. When the next line
/// opens with a *different* terminator byte, that byte is the second half of
/// a pair such as `\r\n` and is skipped once. A repeated terminator still
/// ends an empty line.
#[derive(Debug, Clone, Copy)]
pub struct LineReader<'t> {
    terminators: &'t [u8],
    previous: Option<u8>,
}

impl<'t> LineReader<'t> {
    pub fn new(terminators: &'t [u8]) -> Self {
        Self {
            terminators,
            previous: None,
        }
    }

    pub fn read<S, const N: usize>(&mut self, source: &mut S, buf: &mut InputBuffer<N>) -> LineEnd
    where
        S: ByteSource + ?Sized,
    {
        let mut pair = self.previous.take();
        loop {
            if buf.is_full() {
                return LineEnd::CapacityReached;
            }
            let Some(byte) = source.read_byte() else {
                return LineEnd::EndOfStream;
            };
            if self.terminators.contains(&byte) {
                if pair.take().is_some_and(|prev| prev != byte) {
                    continue;
                }
                self.previous = Some(byte);
                return LineEnd::Terminator;
            }
            pair = None;
            // Cannot fail: fullness was checked above.
            let _ = buf.push(byte);
        }
    }

    pub fn discard<S>(&mut self, source: &mut S) -> usize
    where
        S: ByteSource + ?Sized,
    {
        self.previous = None;
        let mut dropped = 0;
        while let Some(byte) = source.read_byte() {
            if self.terminators.contains(&byte) {
                self.previous = Some(byte);
                break;
            }
            dropped += 1;
        }
        dropped
    }
}
