use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use plum::compiler;
use plum::config::{self, Options, TraceFormat};

const DEFAULT_OUTPUT: &str = "plum.out";

// Wrapper type for clap ValueEnum support
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum TraceFormatArg {
    #[default]
    Human,
    Json,
}

impl From<TraceFormatArg> for TraceFormat {
    fn from(arg: TraceFormatArg) -> Self {
        match arg {
            TraceFormatArg::Human => TraceFormat::Human,
            TraceFormatArg::Json => TraceFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(name = "plum")]
#[command(about = "A PL/0 compiler and virtual machine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a source file into a lexeme file
    Scan {
        /// The source file to scan
        file: PathBuf,

        /// Output lexeme file
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        #[command(flatten)]
        scan: ScanFlags,

        #[command(flatten)]
        common: CommonFlags,
    },
    /// Compile a lexeme file into a bytecode file
    Compile {
        /// The lexeme file to compile
        file: PathBuf,

        /// Output bytecode file
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        #[command(flatten)]
        compile: CompileFlags,

        #[command(flatten)]
        common: CommonFlags,
    },
    /// Execute a bytecode file
    Execute {
        /// The bytecode file to execute
        file: PathBuf,

        #[command(flatten)]
        execute: ExecuteFlags,

        #[command(flatten)]
        common: CommonFlags,
    },
    /// Scan, compile and execute a source file
    Run {
        /// The source file to run
        file: PathBuf,

        /// Also write the bytecode to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        scan: ScanFlags,

        #[command(flatten)]
        compile: CompileFlags,

        #[command(flatten)]
        execute: ExecuteFlags,

        #[command(flatten)]
        common: CommonFlags,
    },
}

#[derive(Args, Debug, Default)]
struct ScanFlags {
    /// Keep scanning after lexical errors
    #[arg(long)]
    skip_errors: bool,

    /// Print the source program
    #[arg(long)]
    print_source: bool,

    /// Print the lexeme table
    #[arg(long)]
    print_lexeme_table: bool,

    /// Print the encoded lexeme list
    #[arg(long)]
    print_lexeme_list: bool,

    /// Print the source, lexeme table and lexeme list
    #[arg(long)]
    print_all: bool,
}

#[derive(Args, Debug, Default)]
struct CompileFlags {
    /// Print the symbol table
    #[arg(long)]
    print_symbol_table: bool,

    /// Print the generated bytecode
    #[arg(long)]
    print_bytecode: bool,
}

#[derive(Args, Debug, Default)]
struct ExecuteFlags {
    /// Trace each executed instruction
    #[arg(long)]
    trace_cpu: bool,

    /// Trace the activation records after each step
    #[arg(long)]
    trace_records: bool,

    /// Trace the registers after each step
    #[arg(long)]
    trace_registers: bool,

    /// Enable every trace
    #[arg(long)]
    trace_all: bool,

    /// Trace output format (human or json)
    #[arg(long, value_enum)]
    trace_format: Option<TraceFormatArg>,

    /// Verify the bytecode before executing it
    #[arg(long)]
    verify: bool,
}

#[derive(Args, Debug, Default)]
struct CommonFlags {
    /// Options file (defaults to plum.toml in the working directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl ScanFlags {
    fn apply(&self, options: &mut Options) {
        options.skip_errors |= self.skip_errors;
        options.print_source |= self.print_source || self.print_all;
        options.print_lexeme_table |= self.print_lexeme_table || self.print_all;
        options.print_lexeme_list |= self.print_lexeme_list || self.print_all;
    }
}

impl CompileFlags {
    fn apply(&self, options: &mut Options) {
        options.print_symbol_table |= self.print_symbol_table;
        options.print_bytecode |= self.print_bytecode;
    }
}

impl ExecuteFlags {
    fn apply(&self, options: &mut Options) {
        options.trace_cpu |= self.trace_cpu || self.trace_all;
        options.trace_records |= self.trace_records || self.trace_all;
        options.trace_registers |= self.trace_registers || self.trace_all;
        options.verify |= self.verify;
        if let Some(format) = self.trace_format {
            options.trace_format = format.into();
        }
    }
}

fn load_options(common: &CommonFlags) -> Result<Options, plum::Error> {
    let options = match &common.config {
        Some(path) => config::load(path)?,
        None => config::load_default(Path::new("."))?,
    };
    Ok(options)
}

fn dispatch(command: Commands) -> Result<(), plum::Error> {
    match command {
        Commands::Scan {
            file,
            output,
            scan,
            common,
        } => {
            let mut options = load_options(&common)?;
            scan.apply(&mut options);
            compiler::scan_file(&file, &output, &options)
        }
        Commands::Compile {
            file,
            output,
            compile,
            common,
        } => {
            let mut options = load_options(&common)?;
            compile.apply(&mut options);
            compiler::compile_file(&file, &output, &options)
        }
        Commands::Execute {
            file,
            execute,
            common,
        } => {
            let mut options = load_options(&common)?;
            execute.apply(&mut options);
            compiler::execute_file(&file, &options)
        }
        Commands::Run {
            file,
            output,
            scan,
            compile,
            execute,
            common,
        } => {
            let mut options = load_options(&common)?;
            scan.apply(&mut options);
            compile.apply(&mut options);
            execute.apply(&mut options);
            compiler::run_file(&file, &options, output.as_deref())
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli.command) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
