use std::collections::BTreeSet;

use log::*;

use crate::memory::{page_of, TargetMemory};

use super::code_block::{CodeBlock, TargetInstruction};
use super::code_region::CodeRegion;
use super::trampoline::{EntryStub, Trampolines};
use super::Error;

mod util;

mod incdec;
mod invalid;
mod jump;
mod load;
mod logic;
mod store;
mod transfer;

use util::*;

/// The most target instructions translated into a single block.
pub const MAX_BLOCK_INSTRUCTIONS: usize = 256;

/// Emits host code for one target instruction. Called with `pc` just past the opcode byte and
/// advances it past any operands. Returns whether the block continues after the instruction.
pub type Generator = fn(&mut Codegen<'_>, &mut u16) -> Result<bool, Error>;

#[derive(Clone, Copy)]
pub enum Translation {
    Invalid,
    Routine {
        mnemonic: &'static str,
        generate: Generator,
    },
}

pub struct DispatchTable {
    entries: [Translation; 256],
}

impl DispatchTable {
    pub fn new() -> Self {
        DispatchTable {
            entries: [Translation::Invalid; 256],
        }
    }

    pub fn get(&self, opcode: u8) -> Translation {
        self.entries[opcode as usize]
    }

    fn set(&mut self, opcode: u8, translation: Translation) {
        self.entries[opcode as usize] = translation;
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by the generators while a block is emitted.
pub struct Codegen<'a> {
    pub ops: &'a mut CodeRegion,
    memory: &'a mut TargetMemory,
    trampolines: &'a Trampolines,
    instructions: Vec<TargetInstruction>,
    pages: BTreeSet<usize>,
}

impl<'a> Codegen<'a> {
    fn new(
        ops: &'a mut CodeRegion,
        memory: &'a mut TargetMemory,
        trampolines: &'a Trampolines,
    ) -> Self {
        Codegen {
            ops,
            memory,
            trampolines,
            instructions: Vec::new(),
            pages: BTreeSet::new(),
        }
    }

    pub fn trampolines(&self) -> &Trampolines {
        self.trampolines
    }

    pub fn fetch(&mut self, pc: &mut u16) -> u8 {
        let byte = self.memory.read_byte(*pc);
        self.pages.insert(page_of(*pc));
        *pc = pc.wrapping_add(1);
        byte
    }

    pub fn fetch_word(&mut self, pc: &mut u16) -> u16 {
        let lo = self.fetch(pc);
        let hi = self.fetch(pc);
        u16::from(hi) << 8 | u16::from(lo)
    }

    /// Emits the block starting at `start`, returning the address following its last
    /// instruction.
    fn generate_block(&mut self, table: &DispatchTable, start: u16) -> Result<u16, Error> {
        load_state(self.ops)?;

        let mut pc = start;
        for _ in 0..MAX_BLOCK_INSTRUCTIONS {
            let address = pc;
            let opcode = self.fetch(&mut pc);
            let (mnemonic, generate): (&'static str, Generator) = match table.get(opcode) {
                Translation::Invalid => ("???", invalid::generate),
                Translation::Routine { mnemonic, generate } => (mnemonic, generate),
            };

            self.instructions.push(TargetInstruction {
                pc: address,
                host_offset: self.ops.len(),
                mnemonic,
            });

            if !generate(self, &mut pc)? {
                return Ok(pc);
            }
        }

        exit_to(self, pc)?;
        Ok(pc)
    }

    fn finish(self) -> (Vec<TargetInstruction>, Vec<usize>) {
        (self.instructions, self.pages.into_iter().collect())
    }
}

/// Turns blocks of target code into host code inside a single code region.
pub struct Translator {
    region: CodeRegion,
    trampolines: Trampolines,
    table: DispatchTable,
}

impl Translator {
    pub fn new(region_size: usize) -> Result<Self, Error> {
        let mut region = CodeRegion::new(region_size)?;
        let trampolines = Trampolines::generate(&mut region)?;

        let mut translator = Translator {
            region,
            trampolines,
            table: DispatchTable::new(),
        };

        load::register(&mut translator);
        store::register(&mut translator);
        transfer::register(&mut translator);
        logic::register(&mut translator);
        incdec::register(&mut translator);
        jump::register(&mut translator);
        translator.register(0xea, "NOP", nop);

        Ok(translator)
    }

    pub fn register(&mut self, opcode: u8, mnemonic: &'static str, generate: Generator) {
        self.table
            .set(opcode, Translation::Routine { mnemonic, generate });
    }

    pub fn translate(&mut self, memory: &mut TargetMemory, start: u16) -> Result<CodeBlock, Error> {
        self.region.begin_fragment();
        let host_start = self.region.len();

        let mut cg = Codegen::new(&mut self.region, memory, &self.trampolines);
        let result = cg.generate_block(&self.table, start);
        let (instructions, pages) = cg.finish();

        match result {
            Ok(end) => {
                let entry = self.region.end_fragment();
                debug!(
                    "Translated {:#06x?}..{:#06x?}: {} instructions, {:#x} bytes",
                    start,
                    end,
                    instructions.len(),
                    self.region.len() - host_start
                );
                Ok(CodeBlock::new(
                    start,
                    end,
                    entry,
                    host_start..self.region.len(),
                    instructions,
                    pages,
                ))
            }
            Err(e) => {
                self.region.abandon_fragment();
                Err(e)
            }
        }
    }

    pub fn entry(&self) -> EntryStub {
        self.trampolines.entry()
    }

    pub fn region(&self) -> &CodeRegion {
        &self.region
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }
}

fn nop(_cg: &mut Codegen<'_>, _pc: &mut u16) -> Result<bool, Error> {
    Ok(true)
}
