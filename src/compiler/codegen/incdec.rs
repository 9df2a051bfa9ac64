use super::util::*;

pub(super) fn register(t: &mut Translator) {
    t.register(0xe8, "INX", inx);
    t.register(0xc8, "INY", iny);
    t.register(0xca, "DEX", dex);
    t.register(0x88, "DEY", dey);
}

// inc and dec leave CF alone, lahf picks up the new SF and ZF
fn inx(cg: &mut Codegen, _pc: &mut u16) -> Result<bool, Error> {
    x86::inc_reg8(cg.ops, X)?;
    x86::lahf(cg.ops)?;
    Ok(true)
}

fn iny(cg: &mut Codegen, _pc: &mut u16) -> Result<bool, Error> {
    x86::inc_reg8(cg.ops, Y)?;
    x86::lahf(cg.ops)?;
    Ok(true)
}

fn dex(cg: &mut Codegen, _pc: &mut u16) -> Result<bool, Error> {
    x86::dec_reg8(cg.ops, X)?;
    x86::lahf(cg.ops)?;
    Ok(true)
}

fn dey(cg: &mut Codegen, _pc: &mut u16) -> Result<bool, Error> {
    x86::dec_reg8(cg.ops, Y)?;
    x86::lahf(cg.ops)?;
    Ok(true)
}
