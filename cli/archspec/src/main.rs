//! archspec CLI: query the microarchitecture database from the shell.

mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::LoadedConfig;

#[derive(Parser)]
#[command(name = "archspec", version, about = "CPU microarchitecture database")]
struct Cli {
    /// Configuration file (default: ./archspec.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List known microarchitectures by family
    List,
    /// Show details of a microarchitecture
    Describe {
        /// Microarchitecture name
        name: String,
        /// Print the descriptor as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print optimization flags for a compiler
    Flags {
        /// Microarchitecture name
        name: String,
        /// Compiler (default: defaults.compiler, else gcc)
        #[arg(long)]
        compiler: Option<String>,
        /// Compiler version (default: defaults.compiler-version)
        #[arg(long = "version", value_name = "VERSION")]
        compiler_version: Option<String>,
    },
    /// Check features, including aliases and family-wide features
    HasFeature {
        /// Microarchitecture name
        name: String,
        /// Features to check
        #[arg(required = true)]
        features: Vec<String>,
    },
    /// Detect the host microarchitecture
    Host,
    /// Resolve an LLVM CPU name and print its feature string
    Llvm {
        /// LLVM CPU name (e.g. znver3, apple-m1)
        cpu: String,
        /// Architecture family (default: the host's)
        #[arg(long)]
        family: Option<String>,
    },
    /// Check the database for graph inconsistencies
    Validate,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let loaded = LoadedConfig::resolve(cli.config.as_deref(), &cwd)?;
    let db = loaded.database()?;

    match cli.command {
        Commands::List => commands::list::run(&db),

        Commands::Describe { name, json } => commands::describe::run(&db, &name, json),

        Commands::Flags {
            name,
            compiler,
            compiler_version,
        } => {
            let (compiler, version) = loaded
                .config
                .compiler(compiler.as_deref(), compiler_version.as_deref());
            commands::flags::run(&db, &name, compiler, version)
        }

        Commands::HasFeature { name, features } => commands::features::run(&db, &name, &features),

        Commands::Host => {
            let compiler = match loaded.config.compiler(None, None) {
                (compiler, Some(version)) => Some((compiler, version)),
                (_, None) => None,
            };
            commands::host::run(&db, loaded.machine(), compiler)
        }

        Commands::Llvm { cpu, family } => {
            let family = family.as_deref().unwrap_or_else(|| loaded.machine());
            commands::llvm::run(&db, &cpu, family)
        }

        Commands::Validate => commands::validate::run(&db),
    }
}
