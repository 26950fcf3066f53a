// minipack CLI entry point

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use minipack::config::{BundlerConfig, OutputConfig};
use minipack::plugins::{self, Plugin};
use minipack::Compiler;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "minipack",
    version,
    about = "A plugin-driven JavaScript module bundler"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle an entry file and its dependency graph into one asset
    Build {
        /// TOML config file (entry, output, plugins)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Entry source file (overrides the config file)
        #[arg(short, long)]
        entry: Option<PathBuf>,

        /// Output directory (default: dist)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Bundle filename (default: bundle.js)
        #[arg(short, long)]
        filename: Option<String>,

        /// Built-in plugin to apply, in order (logger, banner, analyzer)
        #[arg(short, long = "plugin")]
        plugins: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "build failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            config,
            entry,
            out_dir,
            filename,
            plugins: plugin_names,
        } => {
            let mut config = match config {
                Some(path) => BundlerConfig::load(&path)?,
                None => {
                    let Some(entry) = entry.clone() else {
                        bail!("either --config or --entry is required");
                    };
                    BundlerConfig {
                        entry,
                        output: OutputConfig {
                            path: PathBuf::from("dist"),
                            filename: "bundle.js".to_string(),
                        },
                        plugins: Vec::new(),
                    }
                }
            };

            // CLI flags override the config file.
            if let Some(entry) = entry {
                config.entry = entry;
            }
            if let Some(out_dir) = out_dir {
                config.output.path = out_dir;
            }
            if let Some(filename) = filename {
                config.output.filename = filename;
            }
            if !plugin_names.is_empty() {
                config.plugins = plugin_names;
            }

            let mut plugins: Vec<Box<dyn Plugin>> = Vec::new();
            for name in &config.plugins {
                match plugins::builtin(name) {
                    Some(plugin) => plugins.push(plugin),
                    None => bail!("unknown plugin '{name}'"),
                }
            }

            let compiler = Compiler::new(config, &plugins)?;
            let stats = compiler.run().await?;
            tracing::info!(
                modules = stats.module_count,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "bundle written"
            );
            Ok(())
        }
    }
}
