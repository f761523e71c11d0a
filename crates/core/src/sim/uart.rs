// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hal::{ByteSink, ByteSource};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Scripted UART: RX comes from a queue, TX goes to an optional shared sink.
#[derive(Debug, Default)]
pub struct SimUart {
    rx: VecDeque<u8>,
    /// Report a line fault once this many bytes have been delivered.
    fail_after: Option<usize>,
    delivered: usize,
    read_calls: usize,
    sink: Option<Arc<Mutex<Vec<u8>>>>,
    echo_stdout: bool,
}

impl SimUart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: &[u8]) -> Self {
        Self {
            rx: input.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn push_input(&mut self, input: &[u8]) {
        self.rx.extend(input.iter().copied());
    }

    /// Injects a stream error after `n` bytes have been read.
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    pub fn set_sink(&mut self, sink: Option<Arc<Mutex<Vec<u8>>>>, echo_stdout: bool) {
        self.sink = sink;
        self.echo_stdout = echo_stdout;
    }

    /// Bytes still queued for reception.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Number of `read_byte` calls, including ones that returned `None`.
    pub fn read_calls(&self) -> usize {
        self.read_calls
    }
}

impl ByteSink for SimUart {
    fn write(&mut self, bytes: &[u8]) {
        if let Some(sink) = &self.sink {
            if let Ok(mut guard) = sink.lock() {
                guard.extend_from_slice(bytes);
            }
        }

        if self.echo_stdout {
            let mut out = io::stdout().lock();
            let _ = out.write_all(bytes);
            let _ = out.flush();
        }
    }
}

impl ByteSource for SimUart {
    fn read_byte(&mut self) -> Option<u8> {
        self.read_calls += 1;
        if self.fail_after.is_some_and(|limit| self.delivered >= limit) {
            return None;
        }
        let byte = self.rx.pop_front()?;
        self.delivered += 1;
        Some(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::SimUart;
    use crate::hal::{ByteSink, ByteSource};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_uart_transmit_to_sink() {
        let mut uart = SimUart::new();
        let sink = Arc::new(Mutex::new(Vec::new()));
        uart.set_sink(Some(sink.clone()), false);

        uart.write(b"AB");
        uart.write(b"C");

        let data = sink.lock().unwrap().clone();
        assert_eq!(data, b"ABC".to_vec());
    }

    #[test]
    fn test_uart_injected_fault() {
        let mut uart = SimUart::with_input(b"h0px3\n");
        uart.fail_after(2);

        assert_eq!(uart.read_byte(), Some(b'h'));
        assert_eq!(uart.read_byte(), Some(b'0'));
        assert_eq!(uart.read_byte(), None);
        assert_eq!(uart.pending(), 4);
        assert_eq!(uart.read_calls(), 3);
    }
}
