use std::collections::{hash_map::Entry as HmEntry, HashMap};

use log::*;

use crate::compiler::{CodeBlock, Context, Error, Translator, Trap};
use crate::cpu_state::CpuState;
use crate::memory::TargetMemory;

struct CacheEntry {
    /// Page versions at translation time, in the order of `block.pages()`
    versions: Vec<u64>,
    block: CodeBlock,
}

impl CacheEntry {
    fn is_current(&self, memory: &TargetMemory) -> bool {
        self.block
            .pages()
            .iter()
            .zip(self.versions.iter())
            .all(|(page, version)| memory.page_version(*page) == *version)
    }
}

/// Translates blocks on demand and keeps them until the code they came from changes.
pub struct Executor {
    translator: Translator,
    cache: HashMap<u16, CacheEntry>,
    trace_blocks: bool,
}

impl Executor {
    pub fn new(region_size: usize, trace_blocks: bool) -> Result<Self, Error> {
        Ok(Executor {
            translator: Translator::new(region_size)?,
            cache: HashMap::new(),
            trace_blocks,
        })
    }

    /// The block starting at `addr`, translated afresh if it was never seen or its pages have
    /// been written since.
    pub fn block(&mut self, memory: &mut TargetMemory, addr: u16) -> Result<&CodeBlock, Error> {
        let translator = &mut self.translator;
        let mut create_entry = |memory: &mut TargetMemory| -> Result<CacheEntry, Error> {
            let block = translator.translate(memory, addr)?;
            let versions = block
                .pages()
                .iter()
                .map(|page| memory.page_version(*page))
                .collect();
            Ok(CacheEntry { versions, block })
        };

        match self.cache.entry(addr) {
            HmEntry::Occupied(e) => {
                let e = e.into_mut();
                if !e.is_current(memory) {
                    debug!("Block at {:#06x?} is stale, retranslating", addr);
                    *e = create_entry(memory)?;
                }
                Ok(&e.block)
            }
            HmEntry::Vacant(v) => {
                let e = v.insert(create_entry(memory)?);
                Ok(&e.block)
            }
        }
    }

    /// Runs the block at `cpu.pc`, translating it first if needed. Returns the trap raised by the
    /// block, if any.
    pub fn step(
        &mut self,
        memory: &mut TargetMemory,
        cpu: &mut CpuState,
    ) -> Result<Option<Trap>, Error> {
        let entry = self.block(memory, cpu.pc)?.entry();

        if self.trace_blocks {
            trace!(
                "Running {:#06x?}: a={:02x} x={:02x} y={:02x} p={:02x}",
                cpu.pc,
                cpu.a,
                cpu.x,
                cpu.y,
                cpu.status()
            );
        }

        let mut ctx = Context::new(*cpu, memory);
        unsafe { self.translator.entry().enter(&mut ctx, entry) };
        *cpu = ctx.cpu;
        Ok(ctx.take_trap())
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Cached blocks in address order.
    pub fn blocks(&self) -> Vec<&CodeBlock> {
        let mut blocks: Vec<&CodeBlock> = self.cache.values().map(|e| &e.block).collect();
        blocks.sort_by_key(|b| b.base_addr());
        blocks
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ram_program(code: &[u8]) -> TargetMemory {
        let mut memory = TargetMemory::new();
        memory.install_ram(0x0000, 0x800).unwrap();
        for (i, b) in code.iter().enumerate() {
            memory.write_byte(0x0200 + i as u16, *b);
        }
        memory
    }

    #[test]
    fn cached_block_is_reused() {
        let mut memory = ram_program(&[0xa9, 0x01, 0x4c, 0x00, 0x02]);
        let mut executor = Executor::new(0x10000, false).unwrap();

        let first = executor.block(&mut memory, 0x0200).unwrap().entry();
        let second = executor.block(&mut memory, 0x0200).unwrap().entry();
        assert_eq!(first, second);

        // A write outside the block's pages changes nothing
        memory.write_byte(0x0310, 0xff);
        let third = executor.block(&mut memory, 0x0200).unwrap().entry();
        assert_eq!(first, third);
    }

    #[test]
    fn written_block_is_retranslated() {
        let mut memory = ram_program(&[0xa9, 0x01, 0x4c, 0x00, 0x02]);
        let mut executor = Executor::new(0x10000, false).unwrap();

        let first = executor.block(&mut memory, 0x0200).unwrap().entry();
        memory.write_byte(0x0201, 0x02);
        let second = executor.block(&mut memory, 0x0200).unwrap().entry();
        assert_ne!(first, second);
        assert_eq!(executor.blocks().len(), 1);
    }

    #[test]
    fn step_runs_one_block() {
        let mut memory = ram_program(&[0xa9, 0x05, 0x8d, 0x00, 0x03, 0x4c, 0x10, 0x02]);
        let mut executor = Executor::new(0x10000, false).unwrap();
        let mut cpu = CpuState::at(0x0200);

        let trap = executor.step(&mut memory, &mut cpu).unwrap();
        assert!(trap.is_none());
        assert_eq!(cpu.pc, 0x0210);
        assert_eq!(cpu.a, 0x05);
        assert_eq!(memory.read_byte(0x0300), 0x05);
    }

    #[test]
    fn self_modifying_code_seen_by_next_block() {
        // LDA #$03; LDX #$09; STX $0201; JMP $0200
        let mut memory = ram_program(&[
            0xa9, 0x03, 0xa2, 0x09, 0x8e, 0x01, 0x02, 0x4c, 0x00, 0x02,
        ]);
        let mut executor = Executor::new(0x10000, false).unwrap();
        let mut cpu = CpuState::at(0x0200);

        executor.step(&mut memory, &mut cpu).unwrap();
        assert_eq!((cpu.a, cpu.x, cpu.pc), (0x03, 0x09, 0x0200));

        executor.step(&mut memory, &mut cpu).unwrap();
        assert_eq!(cpu.a, 0x09);
    }

    #[test]
    fn step_reports_trap() {
        let mut memory = ram_program(&[0xa2, 0x01, 0x02]);
        let mut executor = Executor::new(0x10000, false).unwrap();
        let mut cpu = CpuState::at(0x0200);

        let trap = executor.step(&mut memory, &mut cpu).unwrap();
        assert_eq!(trap, Some(Trap::InvalidOpcode { address: 0x0202 }));
        assert_eq!(cpu.pc, 0x0202);
        assert_eq!(cpu.x, 0x01);
    }
}
