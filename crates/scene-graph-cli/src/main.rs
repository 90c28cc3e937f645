//! Scene Graph CLI - analyze images and inspect their scene graphs.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;

use commands::{analyze, config as config_cmd, diagram};
use scene_graph_client::Config;

/// Scene Graph CLI - Send images to the analysis service and explore the result.
#[derive(Parser, Debug)]
#[command(
    name = "sg",
    author,
    version,
    about = "Scene Graph: analyze images and explore their scene graphs",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload an image to the analysis service and print the result.
    Analyze {
        /// Image file to analyze.
        image: PathBuf,

        /// Analysis endpoint (overrides configuration).
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Write the processed image to this path.
        #[arg(long)]
        save_image: Option<PathBuf>,
    },

    /// Print the diagram derived from a saved analysis response.
    Diagram {
        /// Analysis response JSON (as printed by `sg analyze --format json`).
        result: PathBuf,

        /// Output format: text, json or dot.
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Include the overview pane.
        #[arg(long)]
        overview: bool,
    },

    /// Open the native viewer.
    #[cfg(feature = "native-viz")]
    View {
        /// Image to preselect.
        image: Option<PathBuf>,
    },

    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Get a configuration value.
    Get {
        /// Configuration key.
        key: String,
    },

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN // Default to less noise
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Configuration is loaded per command so a broken file can still be reset
    match cli.command {
        Commands::Analyze {
            image,
            endpoint,
            format,
            save_image,
        } => {
            let format: analyze::OutputFormat = format.parse()?;
            let mut config = Config::load()?;
            if let Some(endpoint) = endpoint {
                config.set("endpoint", &endpoint)?;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(analyze::execute(&config, &image, format, save_image.as_deref()))?;
        }

        Commands::Diagram {
            result,
            format,
            overview,
        } => {
            let format: diagram::OutputFormat = format.parse()?;
            diagram::execute(&result, format, overview)?;
        }

        #[cfg(feature = "native-viz")]
        Commands::View { image } => {
            commands::view::execute(&Config::load()?, image.as_deref())?;
        }

        Commands::Config(config_cmd_inner) => {
            match config_cmd_inner {
                ConfigCommands::Show => {
                    config_cmd::show(&Config::load()?)?;
                }
                ConfigCommands::Set { key, value } => {
                    config_cmd::set(&mut Config::load()?, &key, &value)?;
                }
                ConfigCommands::Get { key } => {
                    config_cmd::get(&Config::load()?, &key)?;
                }
                ConfigCommands::Reset => {
                    config_cmd::reset()?;
                }
                ConfigCommands::Path => {
                    if let Some(path) = Config::config_file_path() {
                        println!("{}", path.display());
                    } else {
                        println!("(no config file path available)");
                    }
                }
            }
        }
    }

    Ok(())
}
