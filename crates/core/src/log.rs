// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

// Thin wrappers so call sites stay identical with and without `std`.
// Without `std` every event compiles to nothing.

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::info!($($arg)*);
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::debug!($($arg)*);
    }};
}

macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::warn!($($arg)*);
    }};
}
