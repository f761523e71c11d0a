// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Glitch resistance for the authorization branch.
//!
//! A voltage or clock glitch can skip a single compare or branch instruction.
//! [`critical_if`] re-evaluates the condition at several points, latches the
//! first answer in a volatile local and checks every later evaluation against
//! it, with memory barriers between stages. [`FaultGuard`] adds a random delay
//! in front so an attacker cannot time the glitch to a fixed cycle.

use core::hint::black_box;
use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{compiler_fence, Ordering};
use embedded_hal::delay::DelayNs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("fault injection detected")]
pub struct FaultDetected;

/// DSB fenced on both sides against compiler reordering.
// https://github.com/rust-embedded/cortex-m/issues/308
#[inline(always)]
fn barrier() {
    compiler_fence(Ordering::SeqCst);
    #[cfg(target_arch = "arm")]
    cortex_m::asm::dsb();
    compiler_fence(Ordering::SeqCst);
}

/// Runs `success` if `condition` holds and `failure` otherwise, unless the
/// condition gives different answers across evaluations, in which case
/// neither branch runs.
///
/// `condition` must be pure; it is called between three and four times.
#[inline(never)]
pub fn critical_if<R>(
    mut condition: impl FnMut() -> bool,
    success: impl FnOnce() -> R,
    failure: impl FnOnce() -> R,
) -> Result<R, FaultDetected> {
    let mut latched = false;

    // Default to false; the volatile write keeps the store in the binary.
    // SAFETY: `latched` is a live local, so the pointer is valid and aligned.
    unsafe { write_volatile(&mut latched as *mut bool, false) };

    if black_box(!black_box(condition())) {
        // SAFETY: as above.
        unsafe { write_volatile(&mut latched as *mut bool, false) };
    } else {
        if black_box(!black_box(condition())) {
            return Err(FaultDetected);
        }
        // SAFETY: as above.
        unsafe { write_volatile(&mut latched as *mut bool, true) };
    }

    barrier();

    let result = if black_box(!black_box(condition())) {
        if black_box(condition()) {
            return Err(FaultDetected);
        }
        // SAFETY: `latched` is live, aligned and initialized.
        if unsafe { read_volatile(&latched as *const bool) } {
            return Err(FaultDetected);
        }
        black_box(failure())
    } else {
        if black_box(!black_box(condition())) {
            return Err(FaultDetected);
        }
        // SAFETY: `latched` is live, aligned and initialized.
        if unsafe { !read_volatile(&latched as *const bool) } {
            return Err(FaultDetected);
        }
        black_box(success())
    };

    barrier();

    Ok(result)
}

/// Randomized delay plus redundant evaluation around the authorization
/// decision. `entropy` fills a slice with random bytes and should come from a
/// reasonably unpredictable source.
pub struct FaultGuard<'a> {
    entropy: &'a mut dyn FnMut(&mut [u8]),
    max_jitter_us: u32,
}

impl<'a> FaultGuard<'a> {
    pub fn new(entropy: &'a mut dyn FnMut(&mut [u8]), max_jitter_us: u32) -> Self {
        Self {
            entropy,
            max_jitter_us,
        }
    }

    /// Sleeps for a random duration in `0..=max_jitter_us` microseconds and
    /// returns it.
    fn jitter<D: DelayNs + ?Sized>(&mut self, delay: &mut D) -> u32 {
        if self.max_jitter_us == 0 {
            return 0;
        }
        let mut raw = [0u8; 4];
        (self.entropy)(&mut raw);
        let us = u32::from_le_bytes(raw) % self.max_jitter_us.saturating_add(1);
        delay.delay_us(us);
        us
    }

    /// Waits out a random jitter on `delay`, then makes the decision through
    /// [`critical_if`].
    pub fn decide<D, R>(
        &mut self,
        delay: &mut D,
        condition: impl FnMut() -> bool,
        success: impl FnOnce() -> R,
        failure: impl FnOnce() -> R,
    ) -> Result<R, FaultDetected>
    where
        D: DelayNs + ?Sized,
    {
        let _waited = self.jitter(delay);
        debug!("fault guard jitter {} us", _waited);
        critical_if(condition, success, failure)
    }
}
