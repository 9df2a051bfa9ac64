use quick_error::quick_error;

use super::Kind;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        Empty { kind: Kind, base: u16 } {
            display("{} at address {:04x} is empty", kind, base)
        }
        TooLarge { kind: Kind, base: u16, length: usize } {
            display("{} at address {:04x} is too large for memory ({:#x} bytes)", kind, base, length)
        }
        RunsOffEnd { kind: Kind, base: u16, length: usize } {
            display("{} at address {:04x} runs off end of memory ({:#x} bytes)", kind, base, length)
        }
        Overlap { kind: Kind, base: u16 } {
            display("{} at address {:04x} overlaps already installed virtual hardware", kind, base)
        }
    }
}
