// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use passgate_core::{ByteSink, ByteSource};
use std::io::{self, Bytes, Read, StdinLock, Stdout, Write};

/// The terminal standing in for the board UART.
pub struct StdioConsole {
    input: Bytes<StdinLock<'static>>,
    output: Stdout,
}

impl StdioConsole {
    pub fn new() -> Self {
        Self {
            input: io::stdin().lock().bytes(),
            output: io::stdout(),
        }
    }
}

impl ByteSource for StdioConsole {
    fn read_byte(&mut self) -> Option<u8> {
        match self.input.next()? {
            Ok(byte) => Some(byte),
            Err(e) => {
                tracing::warn!("stdin read failed: {}", e);
                None
            }
        }
    }
}

impl ByteSink for StdioConsole {
    fn write(&mut self, bytes: &[u8]) {
        let mut out = self.output.lock();
        if let Err(e) = out.write_all(bytes).and_then(|_| out.flush()) {
            tracing::debug!("stdout write failed: {}", e);
        }
    }
}
