use std::collections::HashMap;

use log::*;

mod error;
mod handler;
mod kind;
mod page;

pub use error::Error;
pub use handler::Handler;
pub use kind::Kind;
pub use page::{offset_of, page_of, PageFlags, MEMORY_SIZE, PAGES, PAGE_SIZE};

use handler::{HandlerId, Ram, Rom};
use page::{page_spans, PageSpan};

/// Value returned for reads that hit no installed hardware.
pub const UNMAPPED: u8 = 0xFF;

type MixedPage = Box<[Option<HandlerId>; PAGE_SIZE]>;

/// The 64KB address space of the target machine.
///
/// Contains any loaded ROM images (writes to which are ignored), installed RAM and device IO
/// regions. All hardware is installed up front; once execution begins the layout never changes.
pub struct TargetMemory {
    store: Box<[u8]>,
    flags: [PageFlags; PAGES],
    mixed: HashMap<usize, MixedPage>,
    devices: Vec<Box<dyn Handler>>,
    /// Bumped whenever the contents of a page change through a RAM write
    versions: [u64; PAGES],
}

impl Default for TargetMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetMemory {
    pub fn new() -> Self {
        TargetMemory {
            store: vec![0u8; MEMORY_SIZE].into_boxed_slice(),
            flags: [PageFlags::EMPTY; PAGES],
            mixed: HashMap::new(),
            devices: Vec::new(),
            versions: [0; PAGES],
        }
    }

    pub fn install_rom(&mut self, base: u16, contents: &[u8]) -> Result<(), Error> {
        self.install_range(base, contents.len(), Kind::Rom, HandlerId::Rom)?;
        let start = base as usize;
        self.store[start..start + contents.len()].copy_from_slice(contents);
        Ok(())
    }

    pub fn install_ram(&mut self, base: u16, length: usize) -> Result<(), Error> {
        self.install_range(base, length, Kind::Ram, HandlerId::Ram)
    }

    pub fn install_io<H: Handler + 'static>(
        &mut self,
        base: u16,
        length: usize,
        handler: H,
    ) -> Result<(), Error> {
        let id = HandlerId::Device(self.devices.len());
        self.install_range(base, length, Kind::Io, id)?;
        self.devices.push(Box::new(handler));
        Ok(())
    }

    pub fn read_byte(&mut self, addr: u16) -> u8 {
        let flags = self.flags[page_of(addr)];

        if flags.readable() {
            return self.store[addr as usize];
        }

        if flags.mixed() {
            if let Some(id) = self.handler_at(addr) {
                return self.dispatch_read(id, addr);
            }
        }

        // TODO: decide whether reads of unmapped addresses should trap instead
        UNMAPPED
    }

    pub fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read_byte(addr);
        let hi = self.read_byte(addr.wrapping_add(1));
        u16::from(hi) << 8 | u16::from(lo)
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        let page = page_of(addr);
        let flags = self.flags[page];

        if flags.writable() {
            self.store_ram(addr, val);
        } else if flags.mixed() {
            match self.handler_at(addr) {
                Some(id) => self.dispatch_write(id, addr, val),
                None => trace!("Write to unmapped {:#06x?} <- {:02x?}", addr, val),
            }
        } else if flags.readable() {
            Rom(&self.store).write(addr, val);
        } else {
            trace!("Write to unmapped {:#06x?} <- {:02x?}", addr, val);
        }
    }

    pub fn page_flags(&self, page: usize) -> PageFlags {
        self.flags[page]
    }

    /// Changes every time the data in the page changes and code translated from it is stale.
    pub fn page_version(&self, page: usize) -> u64 {
        self.versions[page]
    }

    fn handler_at(&self, addr: u16) -> Option<HandlerId> {
        self.mixed
            .get(&page_of(addr))
            .and_then(|handlers| handlers[offset_of(addr)])
    }

    fn dispatch_read(&mut self, id: HandlerId, addr: u16) -> u8 {
        match id {
            HandlerId::Rom => Rom(&self.store).read(addr),
            HandlerId::Ram => Ram(&mut self.store).read(addr),
            HandlerId::Device(idx) => self.devices[idx].read(addr),
        }
    }

    fn dispatch_write(&mut self, id: HandlerId, addr: u16, val: u8) {
        match id {
            HandlerId::Rom => Rom(&self.store).write(addr, val),
            HandlerId::Ram => self.store_ram(addr, val),
            HandlerId::Device(idx) => self.devices[idx].write(addr, val),
        }
    }

    fn store_ram(&mut self, addr: u16, val: u8) {
        if self.store[addr as usize] != val {
            self.versions[page_of(addr)] += 1;
            Ram(&mut self.store).write(addr, val);
        }
    }

    /// Validates the whole range before touching any page, so a rejected installation leaves the
    /// memory map exactly as it was.
    fn install_range(
        &mut self,
        base: u16,
        length: usize,
        kind: Kind,
        handler: HandlerId,
    ) -> Result<(), Error> {
        if length == 0 {
            return Err(Error::Empty { kind, base });
        }
        if length > MEMORY_SIZE {
            return Err(Error::TooLarge { kind, base, length });
        }
        if base as usize + length > MEMORY_SIZE {
            return Err(Error::RunsOffEnd { kind, base, length });
        }

        let spans: Vec<PageSpan> = page_spans(base as usize, length).collect();
        if !spans.iter().all(|span| self.is_free(span)) {
            return Err(Error::Overlap { kind, base });
        }

        for span in spans {
            self.claim(&span, kind, handler);
        }

        debug!("Installed {} at {:#06x?}, {:#x} bytes", kind, base, length);
        Ok(())
    }

    fn is_free(&self, span: &PageSpan) -> bool {
        let flags = self.flags[span.page];
        if flags.is_empty() {
            return true;
        }
        if !flags.mixed() {
            // A uniform page is owned entirely by whatever was installed there
            return false;
        }
        self.mixed.get(&span.page).map_or(true, |handlers| {
            handlers[span.start..span.end].iter().all(Option::is_none)
        })
    }

    fn claim(&mut self, span: &PageSpan, kind: Kind, handler: HandlerId) {
        let flags = PageFlags::from(kind);
        if span.is_full() && self.flags[span.page].is_empty() && !flags.mixed() {
            self.flags[span.page] = flags;
            return;
        }

        self.flags[span.page] = PageFlags::MIXED;
        let handlers = self
            .mixed
            .entry(span.page)
            .or_insert_with(|| Box::new([None; PAGE_SIZE]));
        for entry in handlers[span.start..span.end].iter_mut() {
            *entry = Some(handler);
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Latch {
        writes: Rc<RefCell<Vec<(u16, u8)>>>,
    }

    impl Handler for Latch {
        fn read(&mut self, addr: u16) -> u8 {
            addr as u8 ^ 0x5a
        }

        fn write(&mut self, addr: u16, val: u8) {
            self.writes.borrow_mut().push((addr, val));
        }
    }

    fn rom_image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7) as u8).collect()
    }

    #[test]
    fn simple_install() {
        let mut memory = TargetMemory::new();
        memory.install_rom(0xa000, &vec![0u8; 512]).unwrap();
        assert_eq!(memory.page_flags(0xa0), PageFlags::READABLE);
        assert_eq!(memory.page_flags(0xa1), PageFlags::READABLE);
        assert_eq!(memory.page_flags(0xa2), PageFlags::EMPTY);
    }

    #[test]
    fn adjacent_installs() {
        let mut memory = TargetMemory::new();
        memory.install_rom(0xa000, &vec![0u8; 512]).unwrap();
        memory.install_ram(0xa200, 512).unwrap();
        assert_eq!(memory.page_flags(0xa2), PageFlags::READ_WRITE);
    }

    #[test]
    fn overlapping_install_leaves_rom_untouched() {
        let mut memory = TargetMemory::new();
        let rom = rom_image(512);
        memory.install_rom(0xa000, &rom).unwrap();

        let err = memory.install_ram(0xa100, 512).unwrap_err();
        assert!(matches!(err, Error::Overlap { kind: Kind::Ram, base: 0xa100 }));

        for (i, byte) in rom.iter().enumerate() {
            assert_eq!(memory.read_byte(0xa000 + i as u16), *byte);
        }
        assert_eq!(memory.page_flags(0xa2), PageFlags::EMPTY);
    }

    #[test]
    fn partial_overlap_on_later_page_has_no_partial_effect() {
        let mut memory = TargetMemory::new();
        memory.install_ram(0x2380, 0x10).unwrap();

        // Pages 0x21 and 0x22 are free, the overlap is only discovered on page 0x23
        let err = memory.install_rom(0x2100, &rom_image(0x300)).unwrap_err();
        assert!(matches!(err, Error::Overlap { .. }));
        assert_eq!(memory.page_flags(0x21), PageFlags::EMPTY);
        assert_eq!(memory.page_flags(0x22), PageFlags::EMPTY);
        assert_eq!(memory.read_byte(0x2100), UNMAPPED);
        memory.install_ram(0x2100, 0x200).unwrap();
    }

    #[test]
    fn degenerate_installs_rejected() {
        let mut memory = TargetMemory::new();

        assert!(matches!(
            memory.install_ram(0x1000, 0),
            Err(Error::Empty { .. })
        ));
        assert!(matches!(
            memory.install_ram(0, MEMORY_SIZE + 1),
            Err(Error::TooLarge { .. })
        ));
        assert!(matches!(
            memory.install_ram(0xff00, 0x101),
            Err(Error::RunsOffEnd { .. })
        ));
        assert!(matches!(
            memory.install_rom(0xfff0, &[0u8; 0x20]),
            Err(Error::RunsOffEnd { .. })
        ));

        assert!((0..PAGES).all(|p| memory.page_flags(p).is_empty()));
        assert_eq!(memory.read_byte(0xfff0), UNMAPPED);

        // The whole address space still fits exactly
        memory.install_ram(0, MEMORY_SIZE).unwrap();
    }

    #[test]
    fn word_read_composition() {
        let mut memory = TargetMemory::new();
        memory.install_ram(0x0200, 0x100).unwrap();
        memory.write_byte(0x0210, 0x34);
        memory.write_byte(0x0211, 0x12);
        assert_eq!(memory.read_word(0x0210), 0x1234);
    }

    #[test]
    fn rom_writes_are_ignored() {
        let mut memory = TargetMemory::new();
        memory.install_rom(0xf000, &rom_image(0x1000)).unwrap();
        let before = memory.read_byte(0xf123);
        memory.write_byte(0xf123, before.wrapping_add(1));
        assert_eq!(memory.read_byte(0xf123), before);
        assert_eq!(memory.page_version(0xf1), 0);
    }

    #[test]
    fn rom_writes_are_ignored_on_mixed_page() {
        let mut memory = TargetMemory::new();
        memory.install_rom(0x3000, &[0xaa; 0x80]).unwrap();
        memory.install_ram(0x3080, 0x80).unwrap();
        assert_eq!(memory.page_flags(0x30), PageFlags::MIXED);

        memory.write_byte(0x3010, 0x11);
        memory.write_byte(0x3090, 0x22);
        assert_eq!(memory.read_byte(0x3010), 0xaa);
        assert_eq!(memory.read_byte(0x3090), 0x22);
    }

    #[test]
    fn unmapped_reads_return_sentinel() {
        let mut memory = TargetMemory::new();
        memory.install_ram(0x4000, 0x10).unwrap();
        assert_eq!(memory.read_byte(0x0000), UNMAPPED);
        // Same page as the RAM but past the installed bytes
        assert_eq!(memory.read_byte(0x4010), UNMAPPED);
        memory.write_byte(0x4010, 0x00);
        assert_eq!(memory.read_byte(0x4010), UNMAPPED);
    }

    #[test]
    fn io_dispatches_per_byte() {
        let latch = Latch::default();
        let writes = latch.writes.clone();

        let mut memory = TargetMemory::new();
        memory.install_ram(0xd000, 0x10).unwrap();
        memory.install_io(0xd010, 0x4, latch).unwrap();
        assert_eq!(memory.page_flags(0xd0), PageFlags::MIXED);

        memory.write_byte(0xd011, 0x42);
        memory.write_byte(0xd001, 0x43);
        assert_eq!(*writes.borrow(), vec![(0xd011, 0x42)]);
        assert_eq!(memory.read_byte(0xd012), 0x12 ^ 0x5a);
        assert_eq!(memory.read_byte(0xd001), 0x43);
        assert_eq!(memory.read_byte(0xd014), UNMAPPED);

        assert!(matches!(
            memory.install_ram(0xd00c, 0x8),
            Err(Error::Overlap { .. })
        ));
    }

    #[test]
    fn full_io_page_is_mixed() {
        let mut memory = TargetMemory::new();
        memory.install_io(0xc000, 0x100, Latch::default()).unwrap();
        assert_eq!(memory.page_flags(0xc0), PageFlags::MIXED);
        assert_eq!(memory.read_byte(0xc0ff), 0xff ^ 0x5a);
        assert!(matches!(
            memory.install_rom(0xc080, &[0]),
            Err(Error::Overlap { .. })
        ));
    }

    #[test]
    fn ram_writes_bump_page_version() {
        let mut memory = TargetMemory::new();
        memory.install_ram(0x0000, 0x800).unwrap();
        memory.write_byte(0x0123, 0x00);
        assert_eq!(memory.page_version(0x01), 0);
        memory.write_byte(0x0123, 0x01);
        assert_eq!(memory.page_version(0x01), 1);
        assert_eq!(memory.page_version(0x00), 0);
    }
}
