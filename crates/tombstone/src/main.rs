use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use tombstone_core::{dump_memory_and_code_with, dump_registers_with, DumpConfig, ReportLog, ScopeFlags, ThreadId};
use tombstone_core::memory::WindowDumper;
use tombstone_core::regset::PtraceRegisterSource;
use tombstone_utils::{info, init_logging, init_logging_with_level, warn, LogFormat, LogLevel, LoggingError, LoggingGuard};

mod attach;

use attach::ThreadAttachment;

#[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
compile_error!("the tombstone tool supports aarch64 and x86_64 targets only");

/// Dump the registers and memory context of a thread as tombstone sections.
#[derive(Parser, Debug)]
#[command(name = "tombstone")]
#[command(version)]
#[command(about = "Dump the registers and memory context of a thread as tombstone sections", long_about = None)]
struct Cli
{
    /// Diagnostic log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print every register of the thread
    Registers(DumpArgs),
    /// Print memory around pointer-like registers, pc and sp
    Memory(DumpArgs),
    /// Print the register section followed by the memory section
    Dump(DumpArgs),
}

#[derive(Args, Debug)]
struct DumpArgs
{
    /// Thread ID to attach to
    tid: libc::pid_t,
    /// Treat the thread as the one that crashed
    #[arg(long, default_value_t = false)]
    at_fault: bool,
    /// Only dump memory around pc and sp
    #[arg(long, default_value_t = false)]
    no_all_registers: bool,
    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Also write at-fault, non-sensitive lines to FILE
    #[arg(long, value_name = "FILE")]
    collector: Option<PathBuf>,
    /// Do not mirror at-fault lines to the diagnostic log
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

impl DumpArgs
{
    fn scope(&self) -> ScopeFlags
    {
        if self.at_fault {
            ScopeFlags::AT_FAULT
        } else {
            ScopeFlags::BYSTANDER
        }
    }

    fn config(&self) -> DumpConfig
    {
        let config = DumpConfig::from_env();
        if self.no_all_registers {
            config.with_all_registers(false)
        } else {
            config
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sections
{
    Registers,
    Memory,
    Both,
}

fn main()
{
    let cli = Cli::parse();

    let _logging = match start_logging(cli.log_level.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn start_logging(level: Option<&str>) -> Result<LoggingGuard, LoggingError>
{
    let Some(level) = level else {
        return init_logging();
    };
    let level = LogLevel::from_str(level).map_err(LoggingError::InvalidLevel)?;
    let format = match std::env::var(tombstone_utils::logging::LOG_FORMAT_ENV) {
        Ok(value) => LogFormat::from_str(&value).map_err(LoggingError::InvalidFormat)?,
        Err(_) => LogFormat::Pretty,
    };
    init_logging_with_level(level, format)
}

fn run_command(command: Commands) -> Result<(), Box<dyn std::error::Error>>
{
    match command {
        Commands::Registers(args) => run_dump(&args, Sections::Registers),
        Commands::Memory(args) => run_dump(&args, Sections::Memory),
        Commands::Dump(args) => run_dump(&args, Sections::Both),
    }
}

fn run_dump(args: &DumpArgs, sections: Sections) -> Result<(), Box<dyn std::error::Error>>
{
    let tid = ThreadId(args.tid);
    let scope = args.scope();
    let config = args.config();

    let tombstone = open_output(args.output.as_deref())?;
    let collector: Box<dyn Write> = match &args.collector {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::sink()),
    };
    let mut log = ReportLog::new(tombstone).with_collector(collector).quiet(args.quiet);

    info!(tid = tid.raw(), ?scope, ?sections, "dumping thread");
    let attachment = ThreadAttachment::attach(tid)?;

    let source = PtraceRegisterSource::native();
    if matches!(sections, Sections::Registers | Sections::Both) {
        dump_registers_with(&source, &mut log, attachment.tid(), scope);
    }
    if matches!(sections, Sections::Memory | Sections::Both) {
        let mut dumper = WindowDumper::ptrace();
        dump_memory_and_code_with(&source, &mut dumper, &mut log, attachment.tid(), scope, &config);
    }

    // The report is flushed whatever the detach does.
    let detached = attachment.detach();
    finish_report(&mut log);
    detached?;
    Ok(())
}

/// Flush the report and return how many writes failed.
fn finish_report<W: Write, C: Write>(log: &mut ReportLog<W, C>) -> usize
{
    log.flush();
    let failures = log.write_failures();
    if failures > 0 {
        warn!(failures, "some report lines could not be written");
    }
    failures
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>>
{
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    })
}
