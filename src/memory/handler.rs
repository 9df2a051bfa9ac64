use log::*;

/// Something that answers reads and writes for part of the target address space. Addresses are
/// always absolute target addresses.
pub trait Handler {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, val: u8);
}

/// Identifies the handler serving one byte of a mixed page.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub(super) enum HandlerId {
    Rom,
    Ram,
    Device(usize),
}

/// Read-only view of the backing store. Only consulted for mixed pages; uniform ROM pages are read
/// directly.
pub(super) struct Rom<'a>(pub &'a [u8]);

/// Read-write view of the backing store for mixed pages.
pub(super) struct Ram<'a>(pub &'a mut [u8]);

impl<'a> Handler for Rom<'a> {
    fn read(&mut self, addr: u16) -> u8 {
        self.0[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        warn!("Attempted to write to ROM {:#06x?} <- {:02x?}", addr, val);
    }
}

impl<'a> Handler for Ram<'a> {
    fn read(&mut self, addr: u16) -> u8 {
        self.0[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.0[addr as usize] = val;
    }
}
