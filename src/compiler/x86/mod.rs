//! Encoder for the handful of x86-64 instructions the translator emits.
//!
//! Every operation appends its bytes to an [`Emitter`] and keeps no state of its own.

use std::convert::TryFrom;

use super::code_region::CodeRegion;
use super::host::{AllocationError, HostMemory};
use super::Error;

mod reg;

pub use reg::{Reg, Reg8};

const REX_W: u8 = 0x48;
const OPERAND_SIZE_16: u8 = 0x66;
const SIB_RSP_BASE: u8 = 0x24;

/// Something instructions can be appended to.
pub trait Emitter {
    fn emit(&mut self, byte: u8) -> Result<(), AllocationError>;

    /// Address the next emitted byte will live at, used to resolve relative branches.
    fn current_address(&self) -> usize;

    fn emit_all(&mut self, bytes: &[u8]) -> Result<(), AllocationError> {
        for b in bytes {
            self.emit(*b)?;
        }
        Ok(())
    }
}

impl<H: HostMemory> Emitter for CodeRegion<H> {
    fn emit(&mut self, byte: u8) -> Result<(), AllocationError> {
        self.append_byte(byte)
    }

    fn current_address(&self) -> usize {
        CodeRegion::current_address(self)
    }
}

/// A plain buffer is treated as code placed at address zero.
impl Emitter for Vec<u8> {
    fn emit(&mut self, byte: u8) -> Result<(), AllocationError> {
        self.push(byte);
        Ok(())
    }

    fn current_address(&self) -> usize {
        self.len()
    }
}

/// The `mod` field of a ModRM byte.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Mode {
    Indirect = 0b00,
    Disp8 = 0b01,
    Disp32 = 0b10,
    Direct = 0b11,
}

impl Mode {
    /// Number of displacement bytes that follow the ModRM (and SIB) byte.
    pub fn displacement_size(self) -> usize {
        match self {
            Mode::Indirect | Mode::Direct => 0,
            Mode::Disp8 => 1,
            Mode::Disp32 => 4,
        }
    }
}

pub fn modrm(mode: Mode, reg: u8, rm: u8) -> u8 {
    assert!(reg < 8, "ModRM reg field out of range: {}", reg);
    assert!(rm < 8, "ModRM rm field out of range: {}", rm);
    (mode as u8) << 6 | reg << 3 | rm
}

/// Smallest displacement encoding that can hold `offset`, read as a sign extended 32-bit value.
pub fn displacement_mode(offset: u32) -> Mode {
    if offset == 0 {
        Mode::Indirect
    } else if offset < 0x80 || offset >= 0xffff_ff80 {
        Mode::Disp8
    } else {
        Mode::Disp32
    }
}

fn memory_operand<E: Emitter + ?Sized>(
    ops: &mut E,
    reg: u8,
    base: Reg,
    offset: i32,
) -> Result<(), AllocationError> {
    let offset = offset as u32;
    let mode = match displacement_mode(offset) {
        // mod=00 rm=101 is rip-relative
        Mode::Indirect if base == Reg::Rbp => Mode::Disp8,
        mode => mode,
    };

    ops.emit(modrm(mode, reg, base.code()))?;
    if base == Reg::Rsp {
        ops.emit(SIB_RSP_BASE)?;
    }

    match mode {
        Mode::Disp8 => ops.emit(offset as u8),
        Mode::Disp32 => ops.emit_all(&offset.to_le_bytes()),
        _ => Ok(()),
    }
}

fn direct<E: Emitter + ?Sized>(
    ops: &mut E,
    opcode: &[u8],
    reg: u8,
    rm: u8,
) -> Result<(), Error> {
    ops.emit_all(opcode)?;
    ops.emit(modrm(Mode::Direct, reg, rm))?;
    Ok(())
}

fn relative<E: Emitter + ?Sized>(ops: &mut E, opcode: u8, target: usize) -> Result<(), Error> {
    let from = ops.current_address() + 5;
    let rel = i32::try_from(target as i64 - from as i64)
        .map_err(|_| Error::BranchOutOfRange { from, target })?;

    ops.emit(opcode)?;
    ops.emit_all(&rel.to_le_bytes())?;
    Ok(())
}

/// `mov dst, src` on the full 64-bit registers.
pub fn mov_reg_reg<E: Emitter + ?Sized>(ops: &mut E, dst: Reg, src: Reg) -> Result<(), Error> {
    direct(ops, &[REX_W, 0x8b], dst.code(), src.code())
}

pub fn mov_reg8_reg8<E: Emitter + ?Sized>(ops: &mut E, dst: Reg8, src: Reg8) -> Result<(), Error> {
    direct(ops, &[0x8a], dst.code(), src.code())
}

/// `mov dst, qword [base + offset]`
pub fn mov_reg_ptr<E: Emitter + ?Sized>(
    ops: &mut E,
    dst: Reg,
    base: Reg,
    offset: i32,
) -> Result<(), Error> {
    ops.emit_all(&[REX_W, 0x8b])?;
    memory_operand(ops, dst.code(), base, offset)?;
    Ok(())
}

/// `mov dst, byte [base + offset]`
pub fn mov_reg8_ptr<E: Emitter + ?Sized>(
    ops: &mut E,
    dst: Reg8,
    base: Reg,
    offset: i32,
) -> Result<(), Error> {
    ops.emit(0x8a)?;
    memory_operand(ops, dst.code(), base, offset)?;
    Ok(())
}

/// `mov byte [base + offset], src`
pub fn mov_ptr_reg8<E: Emitter + ?Sized>(
    ops: &mut E,
    base: Reg,
    offset: i32,
    src: Reg8,
) -> Result<(), Error> {
    ops.emit(0x88)?;
    memory_operand(ops, src.code(), base, offset)?;
    Ok(())
}

/// `mov word [base + offset], src`, storing the low 16 bits of `src`.
pub fn mov_ptr_reg16<E: Emitter + ?Sized>(
    ops: &mut E,
    base: Reg,
    offset: i32,
    src: Reg,
) -> Result<(), Error> {
    ops.emit_all(&[OPERAND_SIZE_16, 0x89])?;
    memory_operand(ops, src.code(), base, offset)?;
    Ok(())
}

/// Loads the 32-bit register, zeroing the upper half of `dst`.
pub fn mov_reg_imm32<E: Emitter + ?Sized>(ops: &mut E, dst: Reg, imm: u32) -> Result<(), Error> {
    ops.emit(0xb8 + dst.code())?;
    ops.emit_all(&imm.to_le_bytes())?;
    Ok(())
}

pub fn mov_reg_imm64<E: Emitter + ?Sized>(ops: &mut E, dst: Reg, imm: u64) -> Result<(), Error> {
    ops.emit_all(&[REX_W, 0xb8 + dst.code()])?;
    ops.emit_all(&imm.to_le_bytes())?;
    Ok(())
}

pub fn mov_reg8_imm8<E: Emitter + ?Sized>(ops: &mut E, dst: Reg8, imm: u8) -> Result<(), Error> {
    ops.emit_all(&[0xb0 + dst.code(), imm])?;
    Ok(())
}

pub fn push<E: Emitter + ?Sized>(ops: &mut E, r: Reg) -> Result<(), Error> {
    ops.emit(0x50 + r.code())?;
    Ok(())
}

pub fn pop<E: Emitter + ?Sized>(ops: &mut E, r: Reg) -> Result<(), Error> {
    ops.emit(0x58 + r.code())?;
    Ok(())
}

pub fn ret<E: Emitter + ?Sized>(ops: &mut E) -> Result<(), Error> {
    ops.emit(0xc3)?;
    Ok(())
}

/// Copies SF, ZF, AF, PF and CF into AH.
pub fn lahf<E: Emitter + ?Sized>(ops: &mut E) -> Result<(), Error> {
    ops.emit(0x9f)?;
    Ok(())
}

pub fn call_relative<E: Emitter + ?Sized>(ops: &mut E, target: usize) -> Result<(), Error> {
    relative(ops, 0xe8, target)
}

pub fn jump_relative<E: Emitter + ?Sized>(ops: &mut E, target: usize) -> Result<(), Error> {
    relative(ops, 0xe9, target)
}

/// `jmp qword [base + offset]`
pub fn jump_indirect<E: Emitter + ?Sized>(
    ops: &mut E,
    base: Reg,
    offset: i32,
) -> Result<(), Error> {
    ops.emit(0xff)?;
    memory_operand(ops, 4, base, offset)?;
    Ok(())
}

pub fn jump_reg<E: Emitter + ?Sized>(ops: &mut E, target: Reg) -> Result<(), Error> {
    direct(ops, &[0xff], 4, target.code())
}

pub fn and_reg_reg<E: Emitter + ?Sized>(ops: &mut E, dst: Reg, src: Reg) -> Result<(), Error> {
    direct(ops, &[0x21], src.code(), dst.code())
}

pub fn or_reg_reg<E: Emitter + ?Sized>(ops: &mut E, dst: Reg, src: Reg) -> Result<(), Error> {
    direct(ops, &[0x09], src.code(), dst.code())
}

pub fn xor_reg_reg<E: Emitter + ?Sized>(ops: &mut E, dst: Reg, src: Reg) -> Result<(), Error> {
    direct(ops, &[0x31], src.code(), dst.code())
}

pub fn and_reg8_reg8<E: Emitter + ?Sized>(ops: &mut E, dst: Reg8, src: Reg8) -> Result<(), Error> {
    direct(ops, &[0x20], src.code(), dst.code())
}

pub fn or_reg8_reg8<E: Emitter + ?Sized>(ops: &mut E, dst: Reg8, src: Reg8) -> Result<(), Error> {
    direct(ops, &[0x08], src.code(), dst.code())
}

pub fn xor_reg8_reg8<E: Emitter + ?Sized>(ops: &mut E, dst: Reg8, src: Reg8) -> Result<(), Error> {
    direct(ops, &[0x30], src.code(), dst.code())
}

pub fn and_reg8_imm8<E: Emitter + ?Sized>(ops: &mut E, dst: Reg8, imm: u8) -> Result<(), Error> {
    if dst == Reg8::Al {
        ops.emit_all(&[0x24, imm])?;
    } else {
        direct(ops, &[0x80], 4, dst.code())?;
        ops.emit(imm)?;
    }
    Ok(())
}

pub fn xchg_reg8<E: Emitter + ?Sized>(ops: &mut E, a: Reg8, b: Reg8) -> Result<(), Error> {
    direct(ops, &[0x86], a.code(), b.code())
}

/// Logical right shift of the 32-bit register.
pub fn shr_reg_imm<E: Emitter + ?Sized>(ops: &mut E, r: Reg, amount: u8) -> Result<(), Error> {
    direct(ops, &[0xc1], 5, r.code())?;
    ops.emit(amount)?;
    Ok(())
}

pub fn inc_reg8<E: Emitter + ?Sized>(ops: &mut E, r: Reg8) -> Result<(), Error> {
    direct(ops, &[0xfe], 0, r.code())
}

pub fn dec_reg8<E: Emitter + ?Sized>(ops: &mut E, r: Reg8) -> Result<(), Error> {
    direct(ops, &[0xfe], 1, r.code())
}
