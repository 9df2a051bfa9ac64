use std::ops::Range;
use std::slice;

use log::*;

use super::host::{AllocationError, HostMemory, Mmap, Reservation};

/// Memory is committed in chunks of this many bytes as code is appended.
pub const COMMIT_INCREMENT: usize = 0x1000;

/// Handle to the first byte of a closed fragment. Only produced by [`CodeRegion::end_fragment`],
/// so it always points at flushed code inside a live region.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct NativeEntry {
    offset: usize,
    address: usize,
}

impl NativeEntry {
    /// Offset of the entry from the start of the region.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn address(&self) -> usize {
        self.address
    }
}

/// A reserved area of executable memory that generated code is appended to.
///
/// Code is written one fragment at a time: `begin_fragment` opens a fragment at the write cursor,
/// bytes are appended, and `end_fragment` flushes the fragment and hands back its entry point.
/// Closed fragments are never modified again.
pub struct CodeRegion<H: HostMemory = Mmap> {
    host: H,
    reservation: Reservation,
    committed: usize,
    len: usize,
    /// Start offset of the open fragment
    fragment: Option<usize>,
}

impl CodeRegion<Mmap> {
    pub fn new(size: usize) -> Result<Self, AllocationError> {
        CodeRegion::with_host(Mmap, size)
    }
}

impl<H: HostMemory> CodeRegion<H> {
    pub fn with_host(mut host: H, size: usize) -> Result<Self, AllocationError> {
        let size = round_up(size, COMMIT_INCREMENT);
        let reservation = host.reserve(size)?;
        debug!(
            "Reserved {:#x} bytes for generated code at {:#x}",
            size,
            reservation.address()
        );

        Ok(CodeRegion {
            host,
            reservation,
            committed: 0,
            len: 0,
            fragment: None,
        })
    }

    pub fn begin_fragment(&mut self) {
        assert!(
            self.fragment.is_none(),
            "A code fragment is already open at offset {:#x}",
            self.fragment.unwrap_or_default()
        );
        self.fragment = Some(self.len);
    }

    pub fn end_fragment(&mut self) -> NativeEntry {
        let start = self.fragment.take().expect("No code fragment is open");
        let base = self.reservation.address();

        self.host
            .flush_instruction_cache(base + start..base + self.len);

        NativeEntry {
            offset: start,
            address: base + start,
        }
    }

    /// Close the open fragment without keeping any of its bytes.
    pub fn abandon_fragment(&mut self) {
        if let Some(start) = self.fragment.take() {
            debug!("Abandoning code fragment at offset {:#x}", start);
            self.len = start;
        }
    }

    pub fn append_byte(&mut self, byte: u8) -> Result<(), AllocationError> {
        assert!(
            self.fragment.is_some(),
            "Code can only be appended to an open fragment"
        );
        debug_assert!(self.len <= self.committed);

        if self.len == self.committed {
            self.expand()?;
        }

        unsafe {
            *self.reservation.base().as_ptr().add(self.len) = byte;
        }
        self.len += 1;
        Ok(())
    }

    /// Host address of the next byte to be appended.
    pub fn current_address(&self) -> usize {
        self.reservation.address() + self.len
    }

    pub fn is_open(&self) -> bool {
        self.fragment.is_some()
    }

    /// Number of bytes of code written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    pub fn reserved(&self) -> usize {
        self.reservation.size()
    }

    pub fn base_address(&self) -> usize {
        self.reservation.address()
    }

    /// The bytes written at `range`, given as offsets into the region.
    pub fn code(&self, range: Range<usize>) -> &[u8] {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "Range {:x?} is outside the written code",
            range
        );
        unsafe {
            slice::from_raw_parts(
                self.reservation.base().as_ptr().add(range.start),
                range.len(),
            )
        }
    }

    fn expand(&mut self) -> Result<(), AllocationError> {
        let reserved = self.reservation.size();
        if self.committed + COMMIT_INCREMENT > reserved {
            return Err(AllocationError::Exhausted { reserved });
        }

        self.host.commit(
            &self.reservation,
            self.committed..self.committed + COMMIT_INCREMENT,
        )?;
        self.committed += COMMIT_INCREMENT;
        trace!("Committed {:#x} bytes of generated code memory", self.committed);
        Ok(())
    }
}

impl<H: HostMemory> Drop for CodeRegion<H> {
    fn drop(&mut self) {
        self.host.release(&self.reservation);
    }
}

fn round_up(val: usize, align: usize) -> usize {
    (val + align - 1) / align * align
}
