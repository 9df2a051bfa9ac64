use super::util::*;

pub(super) fn register(t: &mut Translator) {
    t.register(0x8d, "STA", sta_absolute);
    t.register(0x8e, "STX", stx_absolute);
    t.register(0x8c, "STY", sty_absolute);
}

fn absolute(cg: &mut Codegen, pc: &mut u16, src: Reg8) -> Result<bool, Error> {
    let address = cg.fetch_word(pc);
    call_write(cg, address, src)?;
    Ok(true)
}

fn sta_absolute(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    absolute(cg, pc, A)
}

fn stx_absolute(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    absolute(cg, pc, X)
}

fn sty_absolute(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    absolute(cg, pc, Y)
}
