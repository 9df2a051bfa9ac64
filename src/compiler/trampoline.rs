use std::mem;

use super::code_region::{CodeRegion, NativeEntry};
use super::context::{self, Context};
use super::host::HostMemory;
use super::x86::{self, Reg};
use super::Error;

/// Frame slot the entry stub spills the context pointer to.
pub const CONTEXT_SLOT: i32 = -0x10;
/// Frame slot the entry stub spills the block address to.
pub const BLOCK_SLOT: i32 = -0x08;

type RawEntry = extern "sysv64" fn(*mut Context, usize);

/// Callable handle to the generated entry stub.
#[derive(Clone, Copy)]
pub struct EntryStub {
    entry: RawEntry,
}

impl EntryStub {
    /// Run the block at `block` against `ctx` until it leaves through the exit stub.
    ///
    /// # Safety
    /// The stub and `block` must come from the same live code region, and `block` must have been
    /// generated for the memory `ctx` refers to.
    pub unsafe fn enter(&self, ctx: &mut Context, block: NativeEntry) {
        (self.entry)(ctx as *mut Context, block.address())
    }
}

/// The fixed code every block relies on: the way in, the way out, and veneers to the host
/// helpers so a rel32 call from anywhere in the region can reach them.
#[derive(Clone, Copy)]
pub struct Trampolines {
    entry: EntryStub,
    exit: NativeEntry,
    read: NativeEntry,
    write: NativeEntry,
    trap: NativeEntry,
}

impl Trampolines {
    pub fn generate<H: HostMemory>(ops: &mut CodeRegion<H>) -> Result<Self, Error> {
        let entry = fragment(ops, generate_entry)?;
        let exit = fragment(ops, generate_exit)?;
        let read = fragment(ops, |ops| {
            generate_veneer(ops, context::read_byte as *const () as usize)
        })?;
        let write = fragment(ops, |ops| {
            generate_veneer(ops, context::write_byte as *const () as usize)
        })?;
        let trap = fragment(ops, |ops| {
            generate_veneer(ops, context::invalid_opcode as *const () as usize)
        })?;

        let entry = EntryStub {
            entry: unsafe { mem::transmute::<usize, RawEntry>(entry.address()) },
        };

        Ok(Trampolines {
            entry,
            exit,
            read,
            write,
            trap,
        })
    }

    pub fn entry(&self) -> EntryStub {
        self.entry
    }

    /// Every block leaves by jumping here.
    pub fn exit(&self) -> usize {
        self.exit.address()
    }

    pub fn read(&self) -> usize {
        self.read.address()
    }

    pub fn write(&self) -> usize {
        self.write.address()
    }

    pub fn trap(&self) -> usize {
        self.trap.address()
    }
}

/// Emits one fragment with `f`, rolling it back if emission fails.
pub(super) fn fragment<H, F>(ops: &mut CodeRegion<H>, f: F) -> Result<NativeEntry, Error>
where
    H: HostMemory,
    F: FnOnce(&mut CodeRegion<H>) -> Result<(), Error>,
{
    ops.begin_fragment();
    match f(ops) {
        Ok(()) => Ok(ops.end_fragment()),
        Err(e) => {
            ops.abandon_fragment();
            Err(e)
        }
    }
}

// Entered as fn(ctx: *mut Context, block: usize). Leaves rsp 8 mod 16 for the block body.
fn generate_entry<H: HostMemory>(ops: &mut CodeRegion<H>) -> Result<(), Error> {
    x86::push(ops, Reg::Rbx)?;
    x86::push(ops, Reg::Rbp)?;
    x86::mov_reg_reg(ops, Reg::Rbp, Reg::Rsp)?;
    x86::push(ops, Reg::Rsi)?;
    x86::push(ops, Reg::Rdi)?;
    x86::mov_reg_ptr(ops, Reg::Rbx, Reg::Rbp, CONTEXT_SLOT)?;
    x86::jump_indirect(ops, Reg::Rbp, BLOCK_SLOT)
}

fn generate_exit<H: HostMemory>(ops: &mut CodeRegion<H>) -> Result<(), Error> {
    x86::mov_reg_reg(ops, Reg::Rsp, Reg::Rbp)?;
    x86::pop(ops, Reg::Rbp)?;
    x86::pop(ops, Reg::Rbx)?;
    x86::ret(ops)
}

fn generate_veneer<H: HostMemory>(ops: &mut CodeRegion<H>, target: usize) -> Result<(), Error> {
    x86::mov_reg_imm64(ops, Reg::Rax, target as u64)?;
    x86::jump_reg(ops, Reg::Rax)
}

#[cfg(test)]
mod test {
    use capstone::arch::x86 as cs_x86;
    use capstone::prelude::*;

    use super::super::code_region::test::HeapHost;
    use super::*;

    fn stubs() -> (CodeRegion<HeapHost>, Trampolines) {
        let mut region = CodeRegion::with_host(HeapHost::new(0x1000), 0x1000).unwrap();
        let trampolines = Trampolines::generate(&mut region).unwrap();
        (region, trampolines)
    }

    #[test]
    fn entry_stub_bytes() {
        let (region, _) = stubs();
        assert_eq!(
            region.code(0..14),
            &[
                0x53, 0x55, 0x48, 0x8b, 0xec, 0x56, 0x57, 0x48, 0x8b, 0x5d, 0xf0, 0xff, 0x65,
                0xf8
            ]
        );
    }

    #[test]
    fn exit_stub_bytes() {
        let (region, trampolines) = stubs();
        let start = trampolines.exit() - region.base_address();
        assert_eq!(start, 14);
        assert_eq!(
            region.code(start..start + 6),
            &[0x48, 0x8b, 0xe5, 0x5d, 0x5b, 0xc3]
        );
    }

    #[test]
    fn veneers_jump_to_helpers() {
        let (region, trampolines) = stubs();
        let start = trampolines.trap() - region.base_address();
        let code = region.code(start..start + 12);

        let mut target = [0u8; 8];
        target.copy_from_slice(&code[2..10]);
        assert_eq!(&code[..2], &[0x48, 0xb8]);
        assert_eq!(
            u64::from_le_bytes(target),
            context::invalid_opcode as *const () as usize as u64
        );
        assert_eq!(&code[10..], &[0xff, 0xe0]);
    }

    #[test]
    fn stubs_disassemble() {
        let (region, trampolines) = stubs();
        let cs = Capstone::new()
            .x86()
            .mode(cs_x86::ArchMode::Mode64)
            .syntax(cs_x86::ArchSyntax::Intel)
            .build()
            .unwrap();

        let exit = trampolines.exit() - region.base_address();
        let insns = cs.disasm_all(region.code(0..exit + 6), 0).unwrap();
        let mnemonics: Vec<String> = insns
            .iter()
            .map(|i| i.mnemonic().unwrap_or("").to_string())
            .collect();
        assert_eq!(
            mnemonics,
            vec!["push", "push", "mov", "push", "push", "mov", "jmp", "mov", "pop", "pop", "ret"]
        );
    }
}
