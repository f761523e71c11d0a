// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use embedded_hal::digital::{ErrorType, OutputPin, PinState, StatefulOutputPin};
use std::convert::Infallible;

/// Output pin that remembers every level it was driven to.
#[derive(Debug, Default, Clone)]
pub struct SimPin {
    /// `None` until the first write: the undefined startup state.
    level: Option<PinState>,
    history: Vec<PinState>,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> Option<PinState> {
        self.level
    }

    pub fn writes(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[PinState] {
        &self.history
    }

    /// Lit means driven high; an untouched LED is dark.
    pub fn is_lit(&self) -> bool {
        self.level == Some(PinState::High)
    }

    fn drive(&mut self, state: PinState) {
        self.level = Some(state);
        self.history.push(state);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::High);
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.is_lit())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.is_lit())
    }
}
