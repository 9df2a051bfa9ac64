use super::util::*;

pub(super) fn register(t: &mut Translator) {
    t.register(0xa9, "LDA", lda_immediate);
    t.register(0xa2, "LDX", ldx_immediate);
    t.register(0xa0, "LDY", ldy_immediate);
    t.register(0xad, "LDA", lda_absolute);
    t.register(0xae, "LDX", ldx_absolute);
    t.register(0xac, "LDY", ldy_absolute);
}

fn immediate(cg: &mut Codegen, pc: &mut u16, dst: Reg8) -> Result<bool, Error> {
    let val = cg.fetch(pc);
    x86::mov_reg8_imm8(cg.ops, dst, val)?;
    set_nz(cg.ops, dst)?;
    Ok(true)
}

fn absolute(cg: &mut Codegen, pc: &mut u16, dst: Reg8) -> Result<bool, Error> {
    let address = cg.fetch_word(pc);
    call_read(cg, address, dst)?;
    Ok(true)
}

fn lda_immediate(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    immediate(cg, pc, A)
}

fn ldx_immediate(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    immediate(cg, pc, X)
}

fn ldy_immediate(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    immediate(cg, pc, Y)
}

fn lda_absolute(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    absolute(cg, pc, A)
}

fn ldx_absolute(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    absolute(cg, pc, X)
}

fn ldy_absolute(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    absolute(cg, pc, Y)
}
