use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use tal_asm::{Listing, NestedAssembly, assemble_source, assemble_source_with};
use tal_isa::Opcode;
use tal_unit::CompileUnit;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(target_env = "msvc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "tal", about = "Assembler for the stack bytecode interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a source file and print the result
    Assemble {
        /// Path to the assembly source
        input: PathBuf,
        /// YAML file describing the enclosing compile unit
        #[arg(short, long)]
        env: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Listing)]
        format: Format,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Compile eval/expr operands as nested assembly
        #[arg(long)]
        nested: bool,
    },
    /// Assemble a source file and report only success or the error
    Check {
        /// Path to the assembly source
        input: PathBuf,
        /// YAML file describing the enclosing compile unit
        #[arg(short, long)]
        env: Option<PathBuf>,
        /// Compile eval/expr operands as nested assembly
        #[arg(long)]
        nested: bool,
    },
    /// List every opcode the interpreter knows
    Opcodes,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Listing,
    Yaml,
}

/// The compile unit assembly happens in.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct UnitEnv {
    /// Assemble as a procedure body, with a local variable table.
    procedure: bool,
    /// Locals declared before assembly starts.
    locals: Vec<String>,
    /// Exception ranges already open around the code.
    except_depth: u32,
    /// `nop` bytes already in the code buffer.
    preamble_nops: usize,
}

impl UnitEnv {
    fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        serde_yaml::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
    }

    fn unit(&self) -> CompileUnit {
        let mut unit = if self.procedure || !self.locals.is_empty() {
            CompileUnit::in_procedure(self.locals.iter().map(String::as_str))
        } else {
            CompileUnit::new()
        };
        unit.except_depth = self.except_depth;
        unit.code_mut()
            .extend(std::iter::repeat_n(Opcode::NOP.raw(), self.preamble_nops));
        unit
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assemble {
            input,
            env,
            format,
            output,
            nested,
        } => cmd_assemble(&input, env.as_deref(), format, output.as_deref(), nested),
        Commands::Check { input, env, nested } => cmd_check(&input, env.as_deref(), nested),
        Commands::Opcodes => {
            cmd_opcodes();
            Ok(())
        }
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn build(input: &Path, env: Option<&Path>, nested: bool) -> Result<CompileUnit, String> {
    let source = fs::read_to_string(input).map_err(|e| format!("{}: {e}", input.display()))?;
    let env = match env {
        Some(path) => UnitEnv::load(path)?,
        None => UnitEnv::default(),
    };
    let mut unit = env.unit();
    log::debug!("assembling {} with {env:?}", input.display());

    let result = if nested {
        let mut compiler = NestedAssembly::new();
        assemble_source_with(&mut unit, &mut compiler, &source)
    } else {
        assemble_source(&mut unit, &source)
    };
    result.map_err(|e| format!("{}: {e} [{}]", input.display(), e.tag()))?;
    Ok(unit)
}

fn cmd_assemble(
    input: &Path,
    env: Option<&Path>,
    format: Format,
    output: Option<&Path>,
    nested: bool,
) -> Result<(), String> {
    let unit = build(input, env, nested)?;
    let text = match format {
        Format::Listing => Listing::new(&unit).map_err(|e| e.to_string())?.to_string(),
        Format::Yaml => serde_yaml::to_string(&unit).map_err(|e| e.to_string())?,
    };
    match output {
        Some(path) => fs::write(path, text).map_err(|e| format!("{}: {e}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn cmd_check(input: &Path, env: Option<&Path>, nested: bool) -> Result<(), String> {
    let unit = build(input, env, nested)?;
    println!(
        "{}: ok, {} bytes, max stack depth {}",
        input.display(),
        unit.code_len(),
        unit.max_stack_depth
    );
    Ok(())
}

fn cmd_opcodes() {
    for info in tal_isa::opcode_table() {
        let operands: Vec<String> = info
            .operands()
            .iter()
            .map(|kind| format!("{kind:?}"))
            .collect();
        println!(
            "{:3} {:<24} {:<16} {:?}",
            info.opcode().raw(),
            info.mnemonic(),
            operands.join(","),
            info.flags()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, text: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tal-cli-{}-{name}.tal", std::process::id()));
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn check_accepts_nested_flag() {
        let cli = Cli::try_parse_from(["tal", "check", "--nested", "a.tal"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { nested: true, .. }));
        let cli = Cli::try_parse_from(["tal", "check", "a.tal"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { nested: false, .. }));
    }

    #[test]
    fn nested_check_sees_embedded_errors() {
        let path = source("embedded", "eval {push a; push b}");
        assert!(build(&path, None, false).is_ok());
        assert!(build(&path, None, true).is_err());
        fs::remove_file(&path).unwrap();
    }
}
