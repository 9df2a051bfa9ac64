use std::fs::{self, File};
use std::io::{BufWriter, Write};

use anyhow::{Context as _, Result};
use log::*;
use structopt::StructOpt;

use jit6502::devices::{Console, Dummy};
use jit6502::memory::{TargetMemory, MEMORY_SIZE};
use jit6502::{Error, Vm, VmOptions};

mod args;

use args::Args;

fn build_memory(args: &Args) -> Result<TargetMemory> {
    let rom = fs::read(&args.rom).with_context(|| format!("Failed to read ROM {}", args.rom))?;
    let rom_base = match args.rom_base {
        Some(base) => base,
        None => MEMORY_SIZE
            .checked_sub(rom.len())
            .filter(|_| !rom.is_empty())
            .map(|base| base as u16)
            .with_context(|| format!("ROM {} does not fit in memory", args.rom))?,
    };

    let mut memory = TargetMemory::new();
    memory.install_rom(rom_base, &rom)?;

    for (base, len) in &args.ram {
        memory.install_ram(*base, *len)?;
    }
    if let Some(addr) = args.console {
        memory.install_io(addr, 1, Console::stdout())?;
    }
    for (base, len) in &args.log_io {
        memory.install_io(*base, *len, Dummy::new(*base, *len))?;
    }

    Ok(memory)
}

fn write_disassembly(vm: &Vm, path: &str) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    for line in vm.disassemble()? {
        writeln!(file, "{}", line)?;
    }
    file.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::from_args();

    let memory = build_memory(&args)?;
    let mut vm = Vm::new(
        memory,
        VmOptions {
            region_size: args.region_size,
            max_blocks: args.max_blocks,
            trace_blocks: args.trace_blocks,
        },
    )?;

    let result = vm.boot();

    if let Some(path) = &args.disassembly_logfile {
        write_disassembly(&vm, path)
            .with_context(|| format!("Failed to write disassembly to {}", path))?;
    }

    let cpu = vm.cpu();
    info!(
        "Final state: pc={:04x} a={:02x} x={:02x} y={:02x} p={:02x}",
        cpu.pc,
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.status()
    );

    match result {
        Err(Error::Trap(trap)) => {
            eprintln!("{}", trap);
            std::process::exit(1);
        }
        other => Ok(other?),
    }
}
