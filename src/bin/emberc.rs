//! The `emberc` driver: a thin CLI wrapper over the `ember` library.
//! Clap-derived subcommands plus a `LogLevel` feeding `simple_logger`.
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::cell::RefCell;

use clap::{Parser, Subcommand, ValueEnum};
use log::error;

#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Specify the log level of the driver.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    verbosity: LogLevel,
}

#[derive(ValueEnum, Clone, Default, Debug)]
enum LogLevel {
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interpret a source file and print its `main` return value's exit code.
    Run { file: PathBuf },

    /// Emit a source file as Java-like target text.
    Emit { file: PathBuf },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    simple_logger::init_with_level((&args.verbosity).into())?;

    match args.command {
        Commands::Run { file } => run(&file),
        Commands::Emit { file } => emit(&file),
    }
}

fn run(file: &PathBuf) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(file)?;
    let stdout: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(io::stdout()));
    match ember::run_source(&source, stdout) {
        Ok(value) => {
            let code = value.as_integer_index().unwrap_or(0) as i32;
            std::process::exit(code);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

fn emit(file: &PathBuf) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(file)?;
    match ember::emit_source(&source) {
        Ok(text) => {
            print!("{text}");
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
