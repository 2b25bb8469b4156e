use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smelt_core::ir::Module;
use smelt_core::pipeline::PassConfig;
use smelt_core::transforms::default_pipeline;

#[derive(Parser)]
#[command(name = "smelt", about = "SSA construction and cleanup for slot-based IR")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a JSON-serialized IR module in human-readable form.
    PrintIr {
        /// Path to a JSON IR module file.
        file: PathBuf,
    },
    /// Run the transform pipeline over a module.
    Opt {
        /// Path to a JSON IR module file.
        file: PathBuf,
        /// Transform passes to skip (e.g. "mem2reg", "dead-code-elimination").
        #[arg(long = "skip-pass")]
        skip_passes: Vec<String>,
        /// Repeat the pass sequence until nothing changes.
        #[arg(long)]
        fixpoint: bool,
        /// Write the transformed module as JSON to this path instead of
        /// printing it.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_module(path: &Path) -> Result<Module> {
    let file =
        File::open(path).with_context(|| format!("failed to open IR file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("failed to parse IR file: {}", path.display()))
}

fn cmd_print_ir(file: &Path) -> Result<()> {
    let module = load_module(file)?;
    println!("{module}");
    Ok(())
}

fn cmd_opt(
    file: &Path,
    skip_passes: &[String],
    fixpoint: bool,
    output: Option<&Path>,
) -> Result<()> {
    let module = load_module(file)?;

    let skip_refs: Vec<&str> = skip_passes.iter().map(|s| s.as_str()).collect();
    let mut config = PassConfig::from_skip_list(&skip_refs);
    config.fixpoint = fixpoint;
    let pipeline = default_pipeline(&config);

    eprintln!("[opt] transforming module: {}", module.name);
    let module = pipeline.run(module).map_err(|e| anyhow::anyhow!("{e}"))?;

    match output {
        Some(path) => {
            let out = File::create(path)
                .with_context(|| format!("failed to create output file: {}", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(out), &module)
                .with_context(|| format!("failed to write IR to {}", path.display()))?;
            eprintln!("[opt] wrote {}", path.display());
        }
        None => println!("{module}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::PrintIr { file } => cmd_print_ir(file),
        Command::Opt {
            file,
            skip_passes,
            fixpoint,
            output,
        } => cmd_opt(file, skip_passes, *fixpoint, output.as_deref()),
    }
}
