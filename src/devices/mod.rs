mod console;
mod dummy;

pub use console::Console;
pub use dummy::Dummy;
