#![no_std]
// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_main]

use core::convert::Infallible;
use cortex_m::peripheral::DWT;
use cortex_m_rt::entry;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use panic_halt as _;
use passgate_core::{
    Board, ByteSink, ByteSource, FaultGuard, LightPair, Secret, Sequencer, SequencerConfig,
    DEFAULT_STORAGE,
};

// Reset clock: HSI, no PLL.
const SYSCLK_HZ: u32 = 8_000_000;
const BAUD: u32 = 115_200;
const MAX_JITTER_US: u32 = 200;

// RCC
const RCC_BASE: u32 = 0x4002_1000;
const RCC_APB2ENR: *mut u32 = (RCC_BASE + 0x18) as *mut u32;
const RCC_APB2ENR_IOPAEN: u32 = 1 << 2;
const RCC_APB2ENR_USART1EN: u32 = 1 << 14;

// GPIOA
const GPIOA_BASE: u32 = 0x4001_0800;
const GPIOA_CRL: *mut u32 = GPIOA_BASE as *mut u32;
const GPIOA_CRH: *mut u32 = (GPIOA_BASE + 0x04) as *mut u32;
const GPIOA_ODR: *mut u32 = (GPIOA_BASE + 0x0C) as *mut u32;
const GPIOA_BSRR: *mut u32 = (GPIOA_BASE + 0x10) as *mut u32;
const GPIOA_BRR: *mut u32 = (GPIOA_BASE + 0x14) as *mut u32;

// USART1
const USART1_BASE: u32 = 0x4001_3800;
const USART1_SR: *mut u32 = USART1_BASE as *mut u32;
const USART1_DR: *mut u32 = (USART1_BASE + 0x04) as *mut u32;
const USART1_BRR: *mut u32 = (USART1_BASE + 0x08) as *mut u32;
const USART1_CR1: *mut u32 = (USART1_BASE + 0x0C) as *mut u32;
const USART_SR_RXNE: u32 = 1 << 5;
const USART_SR_TXE: u32 = 1 << 7;
// PE | FE | NE | ORE
const USART_SR_ERRORS: u32 = 0b1111;
const USART_CR1_UE: u32 = 1 << 13;
const USART_CR1_TE: u32 = 1 << 3;
const USART_CR1_RE: u32 = 1 << 2;

const TERMINATORS: &[u8] = b"\r\n";

const GATE_PIN: u8 = 0;
const SUCCESS_LED: u8 = 5;
const FAILURE_LED: u8 = 6;

const fn secret_bytes() -> &'static [u8] {
    match option_env!("PASSGATE_SECRET") {
        Some(secret) => secret.as_bytes(),
        None => b"h0px3",
    }
}

const SECRET: Secret<'static> = match Secret::new(secret_bytes()) {
    Ok(secret) => secret,
    Err(_) => panic!("PASSGATE_SECRET must not be empty"),
};

const _: () = assert!(
    SECRET.len() < DEFAULT_STORAGE,
    "PASSGATE_SECRET does not fit the input buffer"
);

const fn free_of(bytes: &[u8], excluded: &[u8]) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        let mut j = 0;
        while j < excluded.len() {
            if bytes[i] == excluded[j] {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    free_of(secret_bytes(), TERMINATORS),
    "PASSGATE_SECRET contains a line terminator and could never be entered"
);

/// USART1 on PA9 (TX) / PA10 (RX), 8N1.
struct Usart1;

impl Usart1 {
    fn init() -> Self {
        unsafe {
            let apb2 = core::ptr::read_volatile(RCC_APB2ENR);
            core::ptr::write_volatile(
                RCC_APB2ENR,
                apb2 | RCC_APB2ENR_IOPAEN | RCC_APB2ENR_USART1EN,
            );

            // PA9: AF push-pull 50 MHz (0xB), PA10: floating input (0x4)
            let crh = core::ptr::read_volatile(GPIOA_CRH);
            let crh = (crh & !(0xFF << 4)) | (0xB << 4) | (0x4 << 8);
            core::ptr::write_volatile(GPIOA_CRH, crh);

            core::ptr::write_volatile(USART1_BRR, SYSCLK_HZ / BAUD);
            core::ptr::write_volatile(USART1_CR1, USART_CR1_UE | USART_CR1_TE | USART_CR1_RE);
        }
        Self
    }
}

impl ByteSink for Usart1 {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            unsafe {
                while core::ptr::read_volatile(USART1_SR) & USART_SR_TXE == 0 {}
                core::ptr::write_volatile(USART1_DR, byte as u32);
            }
        }
    }
}

impl ByteSource for Usart1 {
    fn read_byte(&mut self) -> Option<u8> {
        loop {
            let sr = unsafe { core::ptr::read_volatile(USART1_SR) };
            if sr & USART_SR_ERRORS != 0 {
                // SR then DR read clears the error flags.
                let _ = unsafe { core::ptr::read_volatile(USART1_DR) };
                return None;
            }
            if sr & USART_SR_RXNE != 0 {
                return Some(unsafe { core::ptr::read_volatile(USART1_DR) } as u8);
            }
        }
    }
}

/// One push-pull output on port A.
struct PortA<const PIN: u8>;

impl<const PIN: u8> PortA<PIN> {
    // CRL only covers pins 0..=7.
    const IN_CRL: () = assert!(PIN < 8);

    fn output() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::IN_CRL;
        let shift = u32::from(PIN) * 4;
        unsafe {
            // Output push-pull, 2 MHz
            let crl = core::ptr::read_volatile(GPIOA_CRL);
            core::ptr::write_volatile(GPIOA_CRL, (crl & !(0xF << shift)) | (0x2 << shift));
            core::ptr::write_volatile(GPIOA_BRR, 1 << PIN);
        }
        Self
    }
}

impl<const PIN: u8> ErrorType for PortA<PIN> {
    type Error = Infallible;
}

impl<const PIN: u8> OutputPin for PortA<PIN> {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        unsafe { core::ptr::write_volatile(GPIOA_BSRR, 1 << PIN) };
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        unsafe { core::ptr::write_volatile(GPIOA_BRR, 1 << PIN) };
        Ok(())
    }
}

impl<const PIN: u8> StatefulOutputPin for PortA<PIN> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(unsafe { core::ptr::read_volatile(GPIOA_ODR) } & (1 << PIN) != 0)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.is_set_high().map(|high| !high)
    }
}

/// Busy-wait delay calibrated to `SYSCLK_HZ`.
struct CycleDelay;

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = (u64::from(ns) * u64::from(SYSCLK_HZ) / 1_000_000_000) as u32;
        cortex_m::asm::delay(cycles.max(1));
    }
}

fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

#[entry]
fn main() -> ! {
    let Some(mut cp) = cortex_m::Peripherals::take() else {
        halt();
    };
    cp.DCB.enable_trace();
    cp.DWT.enable_cycle_counter();

    let board = Board {
        console: Usart1::init(),
        delay: CycleDelay,
        pin: PortA::<GATE_PIN>::output(),
        lights: LightPair::new(
            PortA::<SUCCESS_LED>::output(),
            PortA::<FAILURE_LED>::output(),
        ),
    };

    // Cycle counter sampled when the jitter is drawn; input timing perturbs it.
    let mut state = DWT::cycle_count() | 1;
    let mut entropy = move |buf: &mut [u8]| {
        for byte in buf.iter_mut() {
            state ^= DWT::cycle_count();
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *byte = state as u8;
        }
    };

    let config = SequencerConfig {
        terminators: TERMINATORS,
        ..SequencerConfig::default()
    };
    let Ok(sequencer) = Sequencer::new(board, SECRET, config) else {
        halt();
    };
    sequencer
        .with_guard(FaultGuard::new(&mut entropy, MAX_JITTER_US))
        .run()
}
