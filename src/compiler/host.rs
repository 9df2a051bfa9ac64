use std::io;
use std::ops::Range;
use std::ptr::{self, NonNull};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("failed to reserve {size:#x} bytes of address space for generated code")]
    Reserve {
        size: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to commit {len:#x} bytes of generated code memory at offset {offset:#x}")]
    Commit {
        offset: usize,
        len: usize,
        #[source]
        source: io::Error,
    },
    #[error("code region exhausted, all {reserved:#x} reserved bytes are in use")]
    Exhausted { reserved: usize },
}

/// A range of host address space handed out by [`HostMemory::reserve`]. Nothing in it is usable
/// until committed.
#[derive(Debug)]
pub struct Reservation {
    base: NonNull<u8>,
    size: usize,
}

impl Reservation {
    pub fn new(base: NonNull<u8>, size: usize) -> Self {
        Reservation { base, size }
    }

    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub fn address(&self) -> usize {
        self.base.as_ptr() as usize
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// The virtual memory services the code region needs from the host.
pub trait HostMemory {
    fn reserve(&mut self, size: usize) -> Result<Reservation, AllocationError>;

    /// Make `range`, given as offsets into the reservation, readable, writable and executable.
    fn commit(
        &mut self,
        reservation: &Reservation,
        range: Range<usize>,
    ) -> Result<(), AllocationError>;

    fn release(&mut self, reservation: &Reservation);

    /// Must be called over freshly written code, given as host addresses, before it is executed.
    fn flush_instruction_cache(&self, range: Range<usize>);
}

/// Host memory backed by anonymous `mmap` mappings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mmap;

impl HostMemory for Mmap {
    fn reserve(&mut self, size: usize) -> Result<Reservation, AllocationError> {
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };

        if addr == libc::MAP_FAILED {
            return Err(AllocationError::Reserve {
                size,
                source: io::Error::last_os_error(),
            });
        }

        NonNull::new(addr as *mut u8)
            .map(|base| Reservation::new(base, size))
            .ok_or_else(|| AllocationError::Reserve {
                size,
                source: io::Error::new(io::ErrorKind::Other, "mmap returned null"),
            })
    }

    fn commit(
        &mut self,
        reservation: &Reservation,
        range: Range<usize>,
    ) -> Result<(), AllocationError> {
        assert!(range.end <= reservation.size(), "Commit past end of reservation");

        let result = unsafe {
            libc::mprotect(
                reservation.base().as_ptr().add(range.start) as *mut libc::c_void,
                range.len(),
                libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
            )
        };

        if result != 0 {
            return Err(AllocationError::Commit {
                offset: range.start,
                len: range.len(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    fn release(&mut self, reservation: &Reservation) {
        unsafe {
            libc::munmap(
                reservation.base().as_ptr() as *mut libc::c_void,
                reservation.size(),
            );
        }
    }

    fn flush_instruction_cache(&self, _range: Range<usize>) {
        // x86 keeps instruction fetch coherent with data writes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mmap_round_trip() {
        let mut host = Mmap;
        let reservation = host.reserve(0x10000).unwrap();
        assert_eq!(reservation.size(), 0x10000);
        host.commit(&reservation, 0..0x1000).unwrap();

        unsafe {
            let base = reservation.base().as_ptr();
            *base = 0xc3;
            *base.add(0xfff) = 0x90;
            assert_eq!(*base, 0xc3);
        }

        host.flush_instruction_cache(reservation.address()..reservation.address() + 0x1000);
        host.release(&reservation);
    }
}
