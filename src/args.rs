use std::convert::TryFrom;

use structopt::StructOpt;

use jit6502::memory::MEMORY_SIZE;

#[derive(StructOpt)]
#[structopt(name = "jit6502")]
#[structopt(about = r#"
A just-in-time translator for 6502 machine code.

Loads a ROM image, boots from its reset vector and runs it natively on x86-64.
"#)]
pub struct Args {
    /// ROM image to run
    pub rom: String,

    /// Address to load the ROM at. Defaults to the top of memory
    #[structopt(long, parse(try_from_str = parse_address))]
    pub rom_base: Option<u16>,

    /// RAM to install, as base,length. May be repeated
    #[structopt(
        long,
        number_of_values = 1,
        default_value = "0x0000,0x8000",
        parse(try_from_str = parse_range)
    )]
    pub ram: Vec<(u16, usize)>,

    /// Address of a console output port
    #[structopt(short, long, parse(try_from_str = parse_address))]
    pub console: Option<u16>,

    /// Range of logged dummy IO, as base,length
    #[structopt(long, number_of_values = 1, parse(try_from_str = parse_range))]
    pub log_io: Vec<(u16, usize)>,

    /// Stop after running this many blocks
    #[structopt(short, long)]
    pub max_blocks: Option<u64>,

    /// Bytes of address space to reserve for generated code
    #[structopt(long, default_value = "0x1000000", parse(try_from_str = parse_size))]
    pub region_size: usize,

    /// Logfile to write 6502 and x86 disassembly of every translated block to
    #[structopt(short, long)]
    pub disassembly_logfile: Option<String>,

    /// Whether to generate log traces for each block executed
    #[structopt(short, long)]
    pub trace_blocks: bool,
}

#[derive(thiserror::Error, Debug)]
#[error("Failed to parse {src}")]
pub struct ParseError {
    src: String,
}

impl From<&str> for ParseError {
    fn from(s: &str) -> Self {
        ParseError {
            src: String::from(s),
        }
    }
}

/// Decimal, or hex with a `0x` or `$` prefix.
fn parse_number(src: &str) -> Result<u64, ParseError> {
    let trimmed = src.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix('$'))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| src.into())
}

fn parse_address(src: &str) -> Result<u16, ParseError> {
    u16::try_from(parse_number(src)?).map_err(|_| src.into())
}

fn parse_size(src: &str) -> Result<usize, ParseError> {
    usize::try_from(parse_number(src)?).map_err(|_| src.into())
}

/// `base,length` with the base inside the address space and the length no larger than it.
fn parse_range(src: &str) -> Result<(u16, usize), ParseError> {
    match *src.split(',').collect::<Vec<&str>>() {
        [base, len] => {
            let base = parse_address(base).map_err(|_| ParseError::from(src))?;
            let len = parse_size(len).map_err(|_| ParseError::from(src))?;
            if len > MEMORY_SIZE {
                return Err(src.into());
            }
            Ok((base, len))
        }
        _ => Err(src.into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_address("0xfffc").unwrap(), 0xfffc);
        assert_eq!(parse_address("$d000").unwrap(), 0xd000);
        assert_eq!(parse_address("512").unwrap(), 512);
        assert!(parse_address("0x10000").is_err());
        assert!(parse_address("zz").is_err());
        assert_eq!(parse_size("0x1000000").unwrap(), 0x100_0000);
    }

    #[test]
    fn ranges() {
        assert_eq!(parse_range("0x0000,0x800").unwrap(), (0, 0x800));
        assert_eq!(parse_range("$ff00,256").unwrap(), (0xff00, 0x100));
        assert_eq!(parse_range("0,0x10000").unwrap(), (0, 0x10000));
        assert!(parse_range("0x0000").is_err());
        assert!(parse_range("1,2,3").is_err());
        assert!(parse_range("0x10000,0x100").is_err());
        assert!(parse_range("0,0x10001").is_err());
    }

    #[test]
    fn out_of_range_base_is_rejected() {
        let ram = Args::from_iter_safe(vec!["jit6502", "--ram", "0x10000,0x100", "rom.bin"]);
        assert!(ram.is_err());
        let log_io = Args::from_iter_safe(vec!["jit6502", "--log-io", "0x1d000,1", "rom.bin"]);
        assert!(log_io.is_err());
    }

    #[test]
    fn defaults() {
        let args = Args::from_iter(vec!["jit6502", "rom.bin"]);
        assert_eq!(args.rom, "rom.bin");
        assert_eq!(args.ram, vec![(0, 0x8000)]);
        assert_eq!(args.region_size, 0x100_0000);
        assert!(args.console.is_none());
        assert!(args.log_io.is_empty());
    }

    #[test]
    fn repeated_ram() {
        let args = Args::from_iter(vec![
            "jit6502",
            "--ram",
            "0,0x800",
            "--ram",
            "0x6000,0x2000",
            "--console",
            "0xd012",
            "rom.bin",
        ]);
        assert_eq!(args.ram, vec![(0, 0x800), (0x6000, 0x2000)]);
        assert_eq!(args.console, Some(0xd012));
    }
}
