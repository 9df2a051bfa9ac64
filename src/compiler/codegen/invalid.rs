use log::*;

use super::util::*;

/// Raises an invalid opcode trap for the instruction just fetched and leaves the block.
pub(super) fn generate(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    let address = pc.wrapping_sub(1);
    warn!("Invalid opcode translated at {:#06x?}", address);

    let trap = cg.trampolines().trap();
    let exit = cg.trampolines().exit();
    let ops = &mut *cg.ops;

    store_state(ops)?;
    x86::mov_reg_imm32(ops, Reg::Rax, address.into())?;
    x86::push(ops, Reg::Rax)?;
    x86::mov_reg_reg(ops, Reg::Rdi, CONTEXT)?;
    x86::mov_reg_reg(ops, Reg::Rsi, Reg::Rax)?;
    x86::call_relative(ops, trap)?;
    x86::jump_relative(ops, exit)?;
    Ok(false)
}
