// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Collaborator seams. Delays and pins use the `embedded-hal` 1.0 traits
//! directly; the text channel and the light bank are small local traits.

use embedded_hal::digital::{PinState, StatefulOutputPin};

/// Output half of the text channel. Best effort, no acknowledgement.
pub trait ByteSink {
    fn write(&mut self, bytes: &[u8]);
}

/// Input half of the text channel. `None` means end of stream or a fault.
pub trait ByteSource {
    fn read_byte(&mut self) -> Option<u8>;
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Light {
    Success,
    Failure,
}

/// A bank of indicator lights addressed by [`Light`].
pub trait Indicators {
    fn toggle(&mut self, light: Light);
}

/// Two LEDs, one per outcome.
#[derive(Debug)]
pub struct LightPair<S, F> {
    pub success: S,
    pub failure: F,
}

impl<S, F> LightPair<S, F> {
    pub fn new(success: S, failure: F) -> Self {
        Self { success, failure }
    }
}

impl<S, F> Indicators for LightPair<S, F>
where
    S: StatefulOutputPin,
    F: StatefulOutputPin,
{
    fn toggle(&mut self, light: Light) {
        let ok = match light {
            Light::Success => self.success.toggle().is_ok(),
            Light::Failure => self.failure.toggle().is_ok(),
        };
        if !ok {
            warn!("failed to toggle {:?} light", light);
        }
    }
}

/// Pin level written for each outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLevels {
    pub granted: PinState,
    pub denied: PinState,
}

impl Default for PinLevels {
    fn default() -> Self {
        Self {
            granted: PinState::High,
            denied: PinState::Low,
        }
    }
}
