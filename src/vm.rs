use log::*;

use crate::compiler::NativeEntry;
use crate::cpu_state::CpuState;
use crate::executor::Executor;
use crate::memory::TargetMemory;
use crate::Error;

/// Address of the little-endian pointer execution starts from.
pub const RESET_VECTOR: u16 = 0xfffc;

#[derive(Debug, Clone, Copy)]
pub struct VmOptions {
    /// Bytes of address space reserved for generated code
    pub region_size: usize,
    /// Stop after this many blocks have run
    pub max_blocks: Option<u64>,
    pub trace_blocks: bool,
}

impl Default for VmOptions {
    fn default() -> Self {
        VmOptions {
            region_size: 16 << 20,
            max_blocks: None,
            trace_blocks: false,
        }
    }
}

/// A target machine: its memory, its registers and the code translated from it.
pub struct Vm {
    memory: TargetMemory,
    cpu: CpuState,
    executor: Executor,
    options: VmOptions,
}

impl Vm {
    pub fn new(memory: TargetMemory, options: VmOptions) -> Result<Self, Error> {
        let executor = Executor::new(options.region_size, options.trace_blocks)?;
        Ok(Vm {
            memory,
            cpu: CpuState::new(),
            executor,
            options,
        })
    }

    /// Translates (or finds the cached translation of) the block at `addr`.
    pub fn translate(&mut self, addr: u16) -> Result<NativeEntry, Error> {
        Ok(self.executor.block(&mut self.memory, addr)?.entry())
    }

    /// Starts execution from the reset vector.
    pub fn boot(&mut self) -> Result<(), Error> {
        let start = self.memory.read_word(RESET_VECTOR);
        info!("Booting from {:#06x?}", start);
        self.cpu = CpuState::at(start);

        let result = self.run();
        if let Err(Error::Trap(trap)) = &result {
            error!("{}", trap);
        }
        result
    }

    /// Runs blocks from the current pc until a trap, or until the block limit is reached.
    pub fn run(&mut self) -> Result<(), Error> {
        let mut blocks = 0u64;
        while self.options.max_blocks.map_or(true, |max| blocks < max) {
            let trap = self.executor.step(&mut self.memory, &mut self.cpu)?;
            blocks += 1;
            if let Some(trap) = trap {
                return Err(Error::Trap(trap));
            }
        }

        debug!("Stopped after {} blocks at {:#06x?}", blocks, self.cpu.pc);
        Ok(())
    }

    pub fn cpu(&self) -> &CpuState {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CpuState {
        &mut self.cpu
    }

    pub fn read_byte(&mut self, addr: u16) -> u8 {
        self.memory.read_byte(addr)
    }

    /// Listing of every cached block, in address order.
    pub fn disassemble(&self) -> Result<Vec<String>, capstone::Error> {
        let region = self.executor.translator().region();
        let mut lines = Vec::new();
        for block in self.executor.blocks() {
            lines.push(format!(
                "; block {:#06x?}..{:#06x?}",
                block.base_addr(),
                block.end_addr()
            ));
            lines.extend(block.disassemble(region)?);
        }
        Ok(lines)
    }
}
