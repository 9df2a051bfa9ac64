use std::marker::PhantomData;

use log::*;
use thiserror::Error;

use crate::cpu_state::CpuState;
use crate::memory::TargetMemory;

/// Conditions that stop execution from inside generated code.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    #[error("execution terminated at {address:04x}; invalid opcode")]
    InvalidOpcode { address: u16 },
}

/// Everything a running block can reach. Lives in RBX for the duration of a block.
///
/// The CPU state must stay the first field: generated code addresses guest registers relative to
/// the context pointer.
#[repr(C)]
pub struct Context<'a> {
    pub cpu: CpuState,
    memory: *mut TargetMemory,
    trap: Option<Trap>,
    _memory: PhantomData<&'a mut TargetMemory>,
}

impl<'a> Context<'a> {
    pub fn new(cpu: CpuState, memory: &'a mut TargetMemory) -> Self {
        Context {
            cpu,
            memory,
            trap: None,
            _memory: PhantomData,
        }
    }

    pub fn take_trap(&mut self) -> Option<Trap> {
        self.trap.take()
    }

    fn memory(&mut self) -> &mut TargetMemory {
        unsafe { &mut *self.memory }
    }
}

/// Called from generated code. `ctx` is the context the block was entered with.
pub(super) unsafe extern "sysv64" fn read_byte(ctx: *mut Context, address: u32) -> u8 {
    let ctx = &mut *ctx;
    ctx.memory().read_byte(address as u16)
}

pub(super) unsafe extern "sysv64" fn write_byte(ctx: *mut Context, address: u32, val: u32) {
    let ctx = &mut *ctx;
    ctx.memory().write_byte(address as u16, val as u8)
}

pub(super) unsafe extern "sysv64" fn invalid_opcode(ctx: *mut Context, address: u32) {
    let ctx = &mut *ctx;
    let address = address as u16;
    debug!("Invalid opcode trap at {:#06x?}", address);
    ctx.cpu.pc = address;
    ctx.trap = Some(Trap::InvalidOpcode { address });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cpu_state_is_first() {
        let mut memory = TargetMemory::new();
        let ctx = Context::new(CpuState::new(), &mut memory);
        let base = &ctx as *const Context as usize;
        assert_eq!(&ctx.cpu as *const CpuState as usize, base);
    }

    #[test]
    fn helpers_reach_memory() {
        let mut memory = TargetMemory::new();
        memory.install_ram(0x0200, 0x100).unwrap();
        let mut ctx = Context::new(CpuState::new(), &mut memory);

        unsafe {
            write_byte(&mut ctx, 0x0210, 0x1ab);
            assert_eq!(read_byte(&mut ctx, 0x0210), 0xab);
            invalid_opcode(&mut ctx, 0xf000);
        }

        assert_eq!(ctx.cpu.pc, 0xf000);
        let trap = ctx.take_trap().unwrap();
        assert_eq!(trap, Trap::InvalidOpcode { address: 0xf000 });
        assert_eq!(
            trap.to_string(),
            "execution terminated at f000; invalid opcode"
        );
        assert!(ctx.take_trap().is_none());
    }
}
