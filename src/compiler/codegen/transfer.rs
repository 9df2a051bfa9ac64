use super::util::*;

pub(super) fn register(t: &mut Translator) {
    t.register(0xaa, "TAX", tax);
    t.register(0xa8, "TAY", tay);
    t.register(0x8a, "TXA", txa);
    t.register(0x98, "TYA", tya);
}

fn transfer(cg: &mut Codegen, dst: Reg8, src: Reg8) -> Result<bool, Error> {
    x86::mov_reg8_reg8(cg.ops, dst, src)?;
    set_nz(cg.ops, dst)?;
    Ok(true)
}

fn tax(cg: &mut Codegen, _pc: &mut u16) -> Result<bool, Error> {
    transfer(cg, X, A)
}

fn tay(cg: &mut Codegen, _pc: &mut u16) -> Result<bool, Error> {
    transfer(cg, Y, A)
}

fn txa(cg: &mut Codegen, _pc: &mut u16) -> Result<bool, Error> {
    transfer(cg, A, X)
}

fn tya(cg: &mut Codegen, _pc: &mut u16) -> Result<bool, Error> {
    transfer(cg, A, Y)
}
