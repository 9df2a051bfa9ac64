use thiserror::Error;

use crate::compiler::{self, Trap};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] compiler::Error),
    #[error(transparent)]
    Trap(Trap),
}
