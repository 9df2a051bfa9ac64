use std::io::{self, Write};

use log::*;

use crate::memory::Handler;

/// Output-only character device. Every byte written to it goes straight to the sink; reads
/// return 0.
pub struct Console<W: Write> {
    sink: W,
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Console::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(sink: W) -> Self {
        Console { sink }
    }
}

impl<W: Write> Handler for Console<W> {
    fn read(&mut self, addr: u16) -> u8 {
        debug!("Console read {:#06x?}", addr);
        0
    }

    fn write(&mut self, _addr: u16, val: u8) {
        if let Err(e) = self.sink.write_all(&[val]).and_then(|_| self.sink.flush()) {
            warn!("Console output failed: {}", e);
        }
    }
}
