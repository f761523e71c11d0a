// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::ConfigError;
use core::fmt;

/// The reference value a line must match.
///
/// Borrowed, immutable and non-empty. There is no way to obtain a mutable view
/// of the bytes, and `Debug` only prints the length.
#[derive(Clone, Copy)]
pub struct Secret<'a> {
    bytes: &'a [u8],
}

impl<'a> Secret<'a> {
    /// Usable in `const` items, so a firmware image with an empty secret fails
    /// to compile instead of failing at boot.
    pub const fn new(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        if bytes.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        Ok(Self { bytes })
    }

    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; present for API symmetry with slices.
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl fmt::Debug for Secret<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
