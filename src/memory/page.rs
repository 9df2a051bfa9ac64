use super::Kind;

pub const MEMORY_SIZE: usize = 0x10000;
pub const PAGE_SIZE: usize = 0x100;
pub const PAGES: usize = MEMORY_SIZE / PAGE_SIZE;

/// Access flags of a single page.
///
/// Uniform pages (readable and/or writable) are served straight from the backing store. A mixed
/// page is partially occupied or hosts devices, and every access goes through the per-byte handler
/// array kept for it.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct PageFlags(u8);

impl PageFlags {
    pub const EMPTY: PageFlags = PageFlags(0x00);
    pub const WRITABLE: PageFlags = PageFlags(0x01);
    pub const READABLE: PageFlags = PageFlags(0x02);
    pub const READ_WRITE: PageFlags = PageFlags(0x03);
    pub const MIXED: PageFlags = PageFlags(0x04);

    pub fn is_empty(self) -> bool {
        self == PageFlags::EMPTY
    }

    pub fn readable(self) -> bool {
        self.0 & PageFlags::READABLE.0 != 0
    }

    pub fn writable(self) -> bool {
        self.0 & PageFlags::WRITABLE.0 != 0
    }

    pub fn mixed(self) -> bool {
        self.0 & PageFlags::MIXED.0 != 0
    }
}

impl From<Kind> for PageFlags {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Rom => PageFlags::READABLE,
            Kind::Ram => PageFlags::READ_WRITE,
            Kind::Io => PageFlags::MIXED,
        }
    }
}

pub fn page_of(addr: u16) -> usize {
    addr as usize / PAGE_SIZE
}

pub fn offset_of(addr: u16) -> usize {
    addr as usize % PAGE_SIZE
}

/// The part of one page covered by an installation, as offsets `[start, end)` into the page.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub(super) struct PageSpan {
    pub page: usize,
    pub start: usize,
    pub end: usize,
}

impl PageSpan {
    pub fn is_full(&self) -> bool {
        self.start == 0 && self.end == PAGE_SIZE
    }
}

/// Split `[base, base + length)` into per-page spans. The range must be non-empty and lie inside
/// the address space.
pub(super) fn page_spans(base: usize, length: usize) -> impl Iterator<Item = PageSpan> {
    let end = base + length;
    (base / PAGE_SIZE..=(end - 1) / PAGE_SIZE).map(move |page| {
        let page_base = page * PAGE_SIZE;
        PageSpan {
            page,
            start: base.max(page_base) - page_base,
            end: end.min(page_base + PAGE_SIZE) - page_base,
        }
    })
}
