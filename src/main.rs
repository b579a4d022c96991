use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use stackvm::assembler;
use stackvm::config::{DEFAULT_MAX_STEPS, DiagnosticFormat, RunConfig};
use stackvm::diagnostic::{self, Diagnostic, registry};
use stackvm::driver::{self, Outcome};
use stackvm::logging;
use stackvm::program::{Opcode, OperandKind};
use stackvm::protocol;
use stackvm::session::Session;

#[derive(Parser)]
#[command(name = "stackvm", version, about = "Assemble and single-step stack machine programs")]
struct Cli {
    /// Diagnostics as JSON objects, one per line
    #[arg(long, global = true)]
    json: bool,
    /// Plain text diagnostics
    #[arg(long, global = true)]
    text: bool,
    /// Colored diagnostics (default when stderr is a terminal)
    #[arg(long, global = true)]
    ansi: bool,
    /// off, error, warn, info, debug or trace
    #[arg(long, global = true, env = logging::ENV_VAR, default_value = "warn", value_parser = logging::parse_level)]
    log_level: LevelFilter,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a program and step it until it halts
    Run {
        /// Source file, or `-` for stdin
        file: PathBuf,
        #[arg(long, env = "STACKVM_MAX_STEPS", default_value_t = DEFAULT_MAX_STEPS)]
        max_steps: u64,
        /// Print the final snapshot as JSON instead of the program output
        #[arg(long)]
        snapshot: bool,
        /// Print a JSON snapshot after every step
        #[arg(long)]
        trace: bool,
    },
    /// Assemble only and print the normalized source
    Check {
        /// Source file, or `-` for stdin
        file: PathBuf,
    },
    /// Answer JSON-lines requests on stdin
    Serve,
    /// Explain a diagnostic code
    Explain {
        code: Option<String>,
        /// List every code
        #[arg(long)]
        list: bool,
    },
    /// List the instruction set
    Opcodes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = DiagnosticFormat::resolve(cli.json, cli.text, cli.ansi);
    logging::init(cli.log_level, format == DiagnosticFormat::Ansi);

    match cli.command {
        Command::Run { file, max_steps, snapshot, trace } => {
            let config = RunConfig { max_steps, trace, snapshot, format };
            run(&file, &config)
        }
        Command::Check { file } => check(&file, format),
        Command::Serve => serve(format),
        Command::Explain { code, list } => explain(code.as_deref(), list, format),
        Command::Opcodes => {
            opcodes();
            ExitCode::SUCCESS
        }
    }
}

fn report(format: DiagnosticFormat, d: &Diagnostic) {
    let rendered = format.render(d);
    if rendered.ends_with('\n') {
        eprint!("{rendered}");
    } else {
        eprintln!("{rendered}");
    }
}

fn read_source(path: &Path, format: DiagnosticFormat) -> Option<String> {
    let result = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map(|_| buf)
    } else {
        std::fs::read_to_string(path)
    };
    match result {
        Ok(source) => Some(source),
        Err(e) => {
            report(format, &Diagnostic::error(format!("cannot read {}: {e}", path.display())));
            None
        }
    }
}

/// Assemble `source`, reporting every error found.
fn assemble(source: &str, format: DiagnosticFormat) -> Option<stackvm::program::Program> {
    match assembler::assemble_all(source) {
        Ok(program) => Some(program),
        Err(errors) => {
            for e in &errors {
                report(format, &Diagnostic::from(e).with_source(source));
            }
            None
        }
    }
}

fn run(path: &Path, config: &RunConfig) -> ExitCode {
    let Some(source) = read_source(path, config.format) else {
        return ExitCode::FAILURE;
    };
    let Some(program) = assemble(&source, config.format) else {
        return ExitCode::FAILURE;
    };

    let mut session = Session::new();
    session.install(program);

    let stdout = io::stdout();
    let report_run = driver::run(&mut session, config, |snap| {
        if let Ok(line) = serde_json::to_string(snap) {
            let _ = writeln!(stdout.lock(), "{line}");
        }
    });

    let mut out = stdout.lock();
    if config.snapshot {
        if let Ok(line) = serde_json::to_string(&report_run.snapshot) {
            let _ = writeln!(out, "{line}");
        }
    } else if !config.trace {
        if let Some(machine) = session.machine() {
            let _ = write!(out, "{}", machine.output().text());
        }
    }
    let _ = out.flush();

    match report_run.outcome {
        Outcome::Halted => ExitCode::SUCCESS,
        Outcome::Faulted(e) => {
            report(config.format, &Diagnostic::from(&e).with_source(source));
            ExitCode::FAILURE
        }
        Outcome::StepLimit(limit) => {
            let d = Diagnostic::error(format!("step limit of {limit} reached before the program halted"))
                .with_code("SVM-S003")
                .with_note(format!("program counter is {}", report_run.snapshot.program_counter))
                .with_suggestion("raise --max-steps or check for a loop that never exits");
            report(config.format, &d);
            ExitCode::FAILURE
        }
    }
}

fn check(path: &Path, format: DiagnosticFormat) -> ExitCode {
    let Some(source) = read_source(path, format) else {
        return ExitCode::FAILURE;
    };
    let Some(program) = assemble(&source, format) else {
        return ExitCode::FAILURE;
    };
    for warning in diagnostic::lint(&program) {
        report(format, &warning);
    }
    print!("{}", program.disassemble());
    ExitCode::SUCCESS
}

fn serve(format: DiagnosticFormat) -> ExitCode {
    let mut session = Session::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    match protocol::serve(&mut session, stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(format, &Diagnostic::error(format!("i/o error: {e}")));
            ExitCode::FAILURE
        }
    }
}

fn explain(code: Option<&str>, list: bool, format: DiagnosticFormat) -> ExitCode {
    let Some(code) = code.filter(|_| !list) else {
        for entry in registry::REGISTRY {
            println!("{}  {}", entry.code, entry.short);
        }
        return ExitCode::SUCCESS;
    };
    match registry::lookup(code) {
        Some(entry) => {
            print!("{}", entry.long);
            ExitCode::SUCCESS
        }
        None => {
            let d = Diagnostic::error(format!("unknown diagnostic code '{code}'"))
                .with_suggestion("run `stackvm explain --list`");
            report(format, &d);
            ExitCode::FAILURE
        }
    }
}

fn opcodes() {
    for op in Opcode::ALL {
        let operand = match op.operand_kind() {
            OperandKind::None => "-".to_string(),
            kind => kind.to_string(),
        };
        println!("{:<10} {:<28} {}", op.mnemonic(), operand, op.summary());
    }
}
