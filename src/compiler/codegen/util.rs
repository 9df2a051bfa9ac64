pub(super) use crate::compiler::x86::{self, Reg, Reg8};
pub(super) use crate::compiler::Error;
pub(super) use crate::cpu_state::offset;

pub(super) use super::{Codegen, Translator};

/// Guest register mapping. The context pointer stays in RBX for the whole block.
pub const A: Reg8 = Reg8::Al;
pub const X: Reg8 = Reg8::Cl;
pub const Y: Reg8 = Reg8::Dl;
/// Host flags, refreshed with `lahf` after each flag-setting instruction
pub const FLAGS: Reg8 = Reg8::Ah;
pub const SCRATCH: Reg8 = Reg8::Ch;
pub const CONTEXT: Reg = Reg::Rbx;

const STATE: [(Reg8, i32); 4] = [
    (A, offset::A),
    (FLAGS, offset::FLAGS),
    (X, offset::X),
    (Y, offset::Y),
];

pub fn load_state<E: x86::Emitter + ?Sized>(ops: &mut E) -> Result<(), Error> {
    for (r, off) in STATE.iter() {
        x86::mov_reg8_ptr(ops, *r, CONTEXT, *off)?;
    }
    Ok(())
}

pub fn store_state<E: x86::Emitter + ?Sized>(ops: &mut E) -> Result<(), Error> {
    for (r, off) in STATE.iter() {
        x86::mov_ptr_reg8(ops, CONTEXT, *off, *r)?;
    }
    Ok(())
}

/// Sets the guest N and Z flags from the value in `r`.
pub fn set_nz<E: x86::Emitter + ?Sized>(ops: &mut E, r: Reg8) -> Result<(), Error> {
    x86::or_reg8_reg8(ops, r, r)?;
    x86::lahf(ops)
}

/// Leaves the block with execution set to resume at `pc`.
pub fn exit_to(cg: &mut Codegen, pc: u16) -> Result<(), Error> {
    let exit = cg.trampolines().exit();
    store_state(cg.ops)?;
    x86::mov_reg_imm32(cg.ops, Reg::Rsi, pc.into())?;
    x86::mov_ptr_reg16(cg.ops, CONTEXT, offset::PC, Reg::Rsi)?;
    x86::jump_relative(cg.ops, exit)
}

/// Reads the byte at `address` into the guest register `dst`, setting N and Z.
pub fn call_read(cg: &mut Codegen, address: u16, dst: Reg8) -> Result<(), Error> {
    let read = cg.trampolines().read();
    let ops = &mut *cg.ops;

    x86::push(ops, Reg::Rax)?;
    x86::push(ops, Reg::Rcx)?;
    x86::push(ops, Reg::Rdx)?;
    x86::mov_reg_imm32(ops, Reg::Rsi, address.into())?;
    x86::mov_reg_reg(ops, Reg::Rdi, CONTEXT)?;
    x86::call_relative(ops, read)?;
    x86::pop(ops, Reg::Rdx)?;
    x86::pop(ops, Reg::Rcx)?;

    match dst {
        A => {
            x86::mov_reg8_reg8(ops, SCRATCH, Reg8::Al)?;
            x86::pop(ops, Reg::Rax)?;
            x86::mov_reg8_reg8(ops, A, SCRATCH)?;
        }
        X | Y => {
            x86::mov_reg8_reg8(ops, dst, Reg8::Al)?;
            x86::pop(ops, Reg::Rax)?;
        }
        _ => panic!("{:?} is not a guest register", dst),
    }

    set_nz(ops, dst)
}

/// Writes the guest register `src` to `address`. Guest flags are preserved.
pub fn call_write(cg: &mut Codegen, address: u16, src: Reg8) -> Result<(), Error> {
    let write = cg.trampolines().write();
    let ops = &mut *cg.ops;

    x86::push(ops, Reg::Rax)?;
    x86::push(ops, Reg::Rcx)?;
    x86::push(ops, Reg::Rdx)?;
    if src != Reg8::Dl {
        x86::mov_reg8_reg8(ops, Reg8::Dl, src)?;
    }
    x86::mov_reg_imm32(ops, Reg::Rsi, address.into())?;
    x86::mov_reg_reg(ops, Reg::Rdi, CONTEXT)?;
    x86::call_relative(ops, write)?;
    x86::pop(ops, Reg::Rdx)?;
    x86::pop(ops, Reg::Rcx)?;
    x86::pop(ops, Reg::Rax)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn state_round_trip_bytes() {
        let mut ops = Vec::new();
        load_state(&mut ops).unwrap();
        store_state(&mut ops).unwrap();
        assert_eq!(
            ops,
            [
                0x8a, 0x03, 0x8a, 0x63, 0x03, 0x8a, 0x4b, 0x01, 0x8a, 0x53, 0x02, 0x88, 0x03,
                0x88, 0x63, 0x03, 0x88, 0x4b, 0x01, 0x88, 0x53, 0x02
            ]
        );
    }

    #[test]
    fn nz_uses_lahf() {
        let mut ops = Vec::new();
        set_nz(&mut ops, X).unwrap();
        assert_eq!(ops, [0x08, 0xc9, 0x9f]);
    }
}
