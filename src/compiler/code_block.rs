use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;

use capstone::Capstone;
use capstone::Error as CsError;

use super::code_region::{CodeRegion, NativeEntry};
use super::host::HostMemory;

/// Where a target instruction starts in the generated code.
#[derive(Debug, Clone, Copy)]
pub struct TargetInstruction {
    pub pc: u16,
    /// Offset into the code region
    pub host_offset: usize,
    pub mnemonic: &'static str,
}

/// A translated block of target code.
#[derive(Debug)]
pub struct CodeBlock {
    base_addr: u16,
    end_addr: u16,
    entry: NativeEntry,
    host: Range<usize>,
    instructions: Vec<TargetInstruction>,
    pages: Vec<usize>,
}

impl CodeBlock {
    pub(super) fn new(
        base_addr: u16,
        end_addr: u16,
        entry: NativeEntry,
        host: Range<usize>,
        instructions: Vec<TargetInstruction>,
        pages: Vec<usize>,
    ) -> Self {
        CodeBlock {
            base_addr,
            end_addr,
            entry,
            host,
            instructions,
            pages,
        }
    }

    pub fn base_addr(&self) -> u16 {
        self.base_addr
    }

    /// Address following the last translated instruction.
    pub fn end_addr(&self) -> u16 {
        self.end_addr
    }

    pub fn entry(&self) -> NativeEntry {
        self.entry
    }

    /// Offsets of the block's code within its region.
    pub fn host_range(&self) -> Range<usize> {
        self.host.clone()
    }

    pub fn instructions(&self) -> &[TargetInstruction] {
        self.instructions.as_slice()
    }

    /// Target pages the block was translated from, in ascending order.
    pub fn pages(&self) -> &[usize] {
        self.pages.as_slice()
    }

    /// Host listing of the block with each target instruction interleaved before its code.
    pub fn disassemble<H: HostMemory>(
        &self,
        region: &CodeRegion<H>,
    ) -> Result<Vec<String>, CsError> {
        use capstone::arch::x86;
        use capstone::arch::{BuildsCapstone, BuildsCapstoneSyntax};

        let cs = Capstone::new()
            .x86()
            .mode(x86::ArchMode::Mode64)
            .syntax(x86::ArchSyntax::Intel)
            .detail(false)
            .build()?;

        let base = region.base_address() as u64;
        let code = region.code(self.host_range());
        let instructions = cs.disasm_all(code, base + self.host.start as u64)?;

        enum Entry {
            Target {
                pc: u16,
                host_pc: u64,
                mnemonic: &'static str,
            },
            Host {
                host_pc: u64,
                repr: String,
            },
        }

        impl Entry {
            fn sort_idx(&self) -> u64 {
                match self {
                    Entry::Target { host_pc, .. } => 2 * *host_pc,
                    Entry::Host { host_pc, .. } => 2 * *host_pc + 1,
                }
            }
        }

        impl fmt::Display for Entry {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                match self {
                    Entry::Target { pc, mnemonic, .. } => write!(f, "{:#06x?}: {}", pc, mnemonic),
                    Entry::Host { repr, .. } => write!(f, "    {}", repr),
                }
            }
        }

        impl PartialEq for Entry {
            fn eq(&self, other: &Entry) -> bool {
                self.sort_idx() == other.sort_idx()
            }
        }

        impl PartialOrd for Entry {
            fn partial_cmp(&self, other: &Entry) -> Option<Ordering> {
                Some(self.sort_idx().cmp(&other.sort_idx()))
            }
        }

        let target = self.instructions.iter().map(|i| Entry::Target {
            pc: i.pc,
            host_pc: base + i.host_offset as u64,
            mnemonic: i.mnemonic,
        });
        let host = instructions.iter().map(|x| Entry::Host {
            host_pc: x.address(),
            repr: x.to_string(),
        });

        Ok(itertools::merge(target, host)
            .map(|x| x.to_string())
            .collect())
    }
}

#[cfg(test)]
mod test {
    use crate::compiler::Translator;
    use crate::memory::TargetMemory;

    #[test]
    fn disassembly_interleaves_target_instructions() {
        let mut memory = TargetMemory::new();
        memory
            .install_rom(0x8000, &[0xa2, 0x05, 0xe8, 0x4c, 0x00, 0x80])
            .unwrap();
        let mut translator = Translator::new(0x10000).unwrap();
        let block = translator.translate(&mut memory, 0x8000).unwrap();

        let lines = block.disassemble(translator.region()).unwrap();
        let targets: Vec<&String> = lines.iter().filter(|l| !l.starts_with(' ')).collect();
        assert_eq!(targets, vec!["0x8000: LDX", "0x8002: INX", "0x8003: JMP"]);

        let inx = lines.iter().position(|l| l == "0x8002: INX").unwrap();
        assert!(lines[inx + 1].contains("inc cl"));
        assert!(lines[inx + 2].contains("lahf"));
        assert!(lines.last().unwrap().contains("jmp"));
    }

    #[test]
    fn debug_lists_instructions() {
        let mut memory = TargetMemory::new();
        memory.install_rom(0xff00, &[0xe8, 0x4c, 0x00, 0xff]).unwrap();
        let mut translator = Translator::new(0x10000).unwrap();
        let block = translator.translate(&mut memory, 0xff00).unwrap();

        let repr = format!("{:?}", block);
        assert!(repr.starts_with("CodeBlock { base_addr: 65280, end_addr: 65284"));
        assert!(repr.contains("mnemonic: \"INX\""));
        assert!(repr.contains("pages: [255]"));
    }
}
