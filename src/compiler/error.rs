use thiserror::Error;

use super::host::AllocationError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("relative branch from {from:#x} to {target:#x} does not fit in 32 bits")]
    BranchOutOfRange { from: usize, target: usize },
}
