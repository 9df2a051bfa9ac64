/// Guest registers as generated code sees them. Field offsets are relied upon by the block
/// prologue and epilogue, see [`offset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    /// Host flags as captured by `lahf`
    pub flags: u8,
    pub pc: u16,
}

/// Byte offsets of each [`CpuState`] field.
pub mod offset {
    pub const A: i32 = 0;
    pub const X: i32 = 1;
    pub const Y: i32 = 2;
    pub const FLAGS: i32 = 3;
    pub const PC: i32 = 4;
}

const HOST_SIGN: u8 = 0x80;
const HOST_ZERO: u8 = 0x40;

const STATUS_NEGATIVE: u8 = 0x80;
const STATUS_UNUSED: u8 = 0x20;
const STATUS_ZERO: u8 = 0x02;

impl CpuState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn at(pc: u16) -> Self {
        CpuState {
            pc,
            ..Default::default()
        }
    }

    pub fn negative(&self) -> bool {
        self.flags & HOST_SIGN != 0
    }

    pub fn zero(&self) -> bool {
        self.flags & HOST_ZERO != 0
    }

    /// The 6502 processor status byte. Only N and Z are tracked.
    pub fn status(&self) -> u8 {
        let mut p = STATUS_UNUSED;
        if self.negative() {
            p |= STATUS_NEGATIVE;
        }
        if self.zero() {
            p |= STATUS_ZERO;
        }
        p
    }
}
