mod code_block;
mod code_region;
mod codegen;
mod context;
mod error;
mod host;
mod trampoline;
pub mod x86;

pub use code_block::{CodeBlock, TargetInstruction};
pub use code_region::{CodeRegion, NativeEntry, COMMIT_INCREMENT};
pub use codegen::{
    Codegen, DispatchTable, Generator, Translation, Translator, MAX_BLOCK_INSTRUCTIONS,
};
pub use context::{Context, Trap};
pub use error::Error;
pub use host::{AllocationError, HostMemory, Mmap, Reservation};
pub use trampoline::{EntryStub, Trampolines, BLOCK_SLOT, CONTEXT_SLOT};
