use super::util::*;

pub(super) fn register(t: &mut Translator) {
    t.register(0x4c, "JMP", jmp_absolute);
}

fn jmp_absolute(cg: &mut Codegen, pc: &mut u16) -> Result<bool, Error> {
    let target = cg.fetch_word(pc);
    exit_to(cg, target)?;
    Ok(false)
}
