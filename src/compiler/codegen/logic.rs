use super::util::*;

pub(super) fn register(t: &mut Translator) {
    t.register(0x29, "AND", and_immediate);
    t.register(0x09, "ORA", ora_immediate);
    t.register(0x49, "EOR", eor_immediate);
}

fn and_immediate(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    let val = cg.fetch(pc);
    x86::and_reg8_imm8(cg.ops, A, val)?;
    x86::lahf(cg.ops)?;
    Ok(true)
}

fn ora_immediate(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    let val = cg.fetch(pc);
    x86::mov_reg8_imm8(cg.ops, SCRATCH, val)?;
    x86::or_reg8_reg8(cg.ops, A, SCRATCH)?;
    x86::lahf(cg.ops)?;
    Ok(true)
}

fn eor_immediate(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    let val = cg.fetch(pc);
    x86::mov_reg8_imm8(cg.ops, SCRATCH, val)?;
    x86::xor_reg8_reg8(cg.ops, A, SCRATCH)?;
    x86::lahf(cg.ops)?;
    Ok(true)
}
