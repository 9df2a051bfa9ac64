/// General purpose registers, in encoding order. 64-bit operations use the full register,
/// 32-bit ones (immediate moves, logic, shifts) the low half.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[repr(u8)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
}

/// Byte registers addressable without a REX prefix, in encoding order.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[repr(u8)]
pub enum Reg8 {
    Al = 0,
    Cl = 1,
    Dl = 2,
    Bl = 3,
    Ah = 4,
    Ch = 5,
    Dh = 6,
    Bh = 7,
}

impl Reg {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl Reg8 {
    pub fn code(self) -> u8 {
        self as u8
    }
}
