// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host-side stand-ins for the board peripherals. They record everything the
//! sequencer does so tests and the `passgate test` runner can assert on it.

pub mod delay;
pub mod gpio;
pub mod uart;

pub use delay::SimDelay;
pub use gpio::SimPin;
pub use uart::SimUart;

use crate::hal::LightPair;
use crate::sequencer::Board;

pub type SimLights = LightPair<SimPin, SimPin>;
pub type SimBoard = Board<SimUart, SimDelay, SimPin, SimLights>;

/// A board with all outputs in their undefined startup state.
pub fn board(uart: SimUart) -> SimBoard {
    Board {
        console: uart,
        delay: SimDelay::new(),
        pin: SimPin::new(),
        lights: LightPair::new(SimPin::new(), SimPin::new()),
    }
}
