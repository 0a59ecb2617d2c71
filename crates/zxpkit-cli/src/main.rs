//! zxpkit CLI - Build tool for extension packages
//!
//! Commands:
//! - `zxpkit build` - Assemble the package described by `zxpkit.toml`
//! - `zxpkit watch` - Mirror edited sources into an installed copy
//! - `zxpkit check` - Dry-run the project without writing a package
//! - `zxpkit list` - Show the manifest and entries of a built package

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod build;
mod check;
mod list;
mod logging;
mod project;
mod watch;

#[derive(Parser)]
#[command(name = "zxpkit")]
#[command(author, version, about = "Build tool for .zxp/.mxp extension packages", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the extension package
    Build {
        /// Path to the project file
        #[arg(short, long, default_value = project::PROJECT_FILE)]
        config: PathBuf,

        /// Write the package here instead of the project's output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Copy edited source files into the installed extension until Ctrl+C
    Watch {
        /// Path to the project file
        #[arg(short, long, default_value = project::PROJECT_FILE)]
        config: PathBuf,

        /// Host configuration directory that replaces the destination token
        #[arg(long, env = "FLASH_CONFIG_DIR")]
        config_dir: PathBuf,

        /// Symbolic destination root
        #[arg(long, default_value = zxpkit_bundle::DEFAULT_ROOT_TOKEN)]
        token: String,

        /// Directory observed for changes
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Validate the project and its manifest without writing a package
    Check {
        /// Path to the project file
        #[arg(short, long, default_value = project::PROJECT_FILE)]
        config: PathBuf,
    },

    /// List the contents of a built package
    List {
        /// Path to the package
        package: PathBuf,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose)?;

    match cli.command {
        Commands::Build { config, output } => {
            build::run(&config, output)?;
        }
        Commands::Watch {
            config,
            config_dir,
            token,
            root,
        } => {
            watch::run(&config, config_dir, &token, &root)?;
        }
        Commands::Check { config } => {
            check::run(&config)?;
        }
        Commands::List { package, json } => {
            list::run(&package, json)?;
        }
    }

    Ok(())
}
