use log::*;

use crate::memory::Handler;

/// Stand-in for hardware that isn't emulated. Behaves like RAM over its range and logs every
/// access.
pub struct Dummy {
    base: u16,
    data: Box<[u8]>,
}

impl Dummy {
    pub fn new(base: u16, length: usize) -> Self {
        Dummy {
            base,
            data: vec![0; length].into_boxed_slice(),
        }
    }

    fn index(&self, addr: u16) -> usize {
        addr.wrapping_sub(self.base) as usize % self.data.len()
    }
}

impl Handler for Dummy {
    fn read(&mut self, addr: u16) -> u8 {
        let val = self.data[self.index(addr)];
        debug!("Read  {:#06x?} -> {:#04x}", addr, val);
        val
    }

    fn write(&mut self, addr: u16, val: u8) {
        debug!("Write {:#06x?} <- {:#04x}", addr, val);
        let idx = self.index(addr);
        self.data[idx] = val;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn remembers_writes() {
        let mut dummy = Dummy::new(0xc000, 0x10);
        assert_eq!(dummy.read(0xc004), 0);
        dummy.write(0xc004, 0x99);
        assert_eq!(dummy.read(0xc004), 0x99);
        assert_eq!(dummy.read(0xc005), 0);
    }
}
