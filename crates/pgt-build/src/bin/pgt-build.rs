/// pgt build CLI

use std::path::PathBuf;
use std::process;

use clap::Parser;
use pgt_build::{BuildConfig, BuildError, Orchestrator};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pgt-build")]
#[command(about = "Compile, link and publish the pgt executable")]
#[command(version)]
struct Args {
    /// Source units to compile, in order (defaults to the manifest or the stock pgt sources)
    #[arg(value_name = "SOURCE")]
    sources: Vec<PathBuf>,

    /// JSON manifest describing the build
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Directory the build runs in
    #[arg(short = 'C', long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Directory the executable is copied into
    #[arg(short, long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// File name of the linked executable
    #[arg(short, long, value_name = "NAME")]
    output: Option<String>,

    /// Compiler driver used for compiling and linking
    #[arg(long, value_name = "PROG")]
    compiler: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    let output = config.output.clone();
    let mut orchestrator = Orchestrator::new(config);

    match orchestrator.run() {
        Ok(report) => {
            println!("Compilation successful. Executable '{}' created.", output);
            println!("Executable copied to '{}'.", report.published.display());
            if args.verbose {
                println!("  Objects linked: {}", report.compiled);
                println!("  Files cleaned up: {}", report.cleanup.removed.len());
            }
        }
        Err(e) => fail(&e),
    }
}

fn fail(error: &BuildError) -> ! {
    eprintln!("{}", error.report());
    process::exit(1);
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> pgt_build::Result<BuildConfig> {
    let mut config = match &args.manifest {
        Some(path) => BuildConfig::from_manifest(path)?,
        None => BuildConfig::default(),
    };

    if !args.sources.is_empty() {
        config = config.sources(args.sources.iter().cloned());
    }
    if let Some(dir) = &args.work_dir {
        config = config.work_dir(dir.clone());
    }
    if let Some(dest) = &args.dest {
        config = config.dest_dir(dest.clone());
    }
    if let Some(output) = &args.output {
        config = config.output(output.clone());
    }
    if let Some(compiler) = &args.compiler {
        config = config.compiler(compiler.clone());
    }

    Ok(config)
}
