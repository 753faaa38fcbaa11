//! `snag` CLI - classify, probe, expand and resolve stream links

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use snag::ResolverConfig;

#[derive(Parser)]
#[command(name = "snag")]
#[command(about = "Resolve, validate and rank video stream links")]
#[command(version)]
struct Cli {
    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ~/.config/snag/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a quality tier from the available hints
    Classify {
        /// Free-text signals to classify one by one (labels, file names, URLs)
        texts: Vec<String>,

        /// Vertical resolution in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Declared bandwidth in bits per second
        #[arg(long)]
        bandwidth: Option<u64>,

        /// Free-text label (e.g. "Server 2 - 1080p")
        #[arg(long)]
        label: Option<String>,

        /// Stream URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Check whether URLs are reachable
    Probe {
        /// URLs to probe
        #[arg(required = true)]
        urls: Vec<String>,

        /// Extra request header ("Name: value"), repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },

    /// Expand an HLS master playlist into its quality variants
    Manifest {
        /// Manifest URL
        url: String,

        /// Extra request header ("Name: value"), repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },

    /// Run the full pipeline over direct links
    Resolve {
        /// Candidate links (plain files or HLS manifests)
        #[arg(required = true)]
        links: Vec<String>,

        /// Title the links belong to
        #[arg(short, long)]
        title: String,

        /// Release year
        #[arg(short, long)]
        year: Option<i32>,

        /// Media id (defaults to the title)
        #[arg(long)]
        id: Option<String>,

        /// Season number (series only)
        #[arg(long, requires = "episode")]
        season: Option<u32>,

        /// Episode number (series only)
        #[arg(long, requires = "season")]
        episode: Option<u32>,

        /// Extra request header ("Name: value"), repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Print streams as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "snag=info",
        1 => "snag=debug",
        _ => "snag=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ResolverConfig> {
    let config = match path {
        Some(path) => ResolverConfig::load_from(path)?,
        None => ResolverConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Classify {
            texts,
            height,
            bandwidth,
            label,
            url,
        } => {
            if texts.is_empty() {
                cmd::classify::cmd_classify(height, bandwidth, label.as_deref(), url.as_deref());
            } else {
                cmd::classify::cmd_classify_texts(&texts);
            }
        }
        Commands::Probe { urls, headers } => {
            let config = load_config(cli.config.as_ref())?;
            cmd::probe::cmd_probe(&config, &urls, &headers).await?;
        }
        Commands::Manifest { url, headers } => {
            let config = load_config(cli.config.as_ref())?;
            cmd::manifest::cmd_manifest(&config, &url, &headers).await?;
        }
        Commands::Resolve {
            links,
            title,
            year,
            id,
            season,
            episode,
            headers,
            json,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let target = cmd::resolve::Target {
                title,
                year,
                id,
                season,
                episode,
            };
            cmd::resolve::cmd_resolve(config, links, target, &headers, json).await?;
        }
    }

    Ok(())
}
