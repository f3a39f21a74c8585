//! augur: build the sample architecture workspace and publish it.

mod demo;

use std::path::{Path, PathBuf};

use anyhow::Context;
use augur_core::{outline, store, Document};
use augur_publish::config::{self, Config};
use augur_publish::{HttpTransport, Publisher};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "augur", about = "Architecture model builder and publisher")]
struct Cli {
    /// Config file (default: ~/.augur/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the sample workspace and publish it
    Publish {
        /// Publish a saved document instead of the sample workspace
        #[arg(long)]
        document: Option<PathBuf>,
    },
    /// Fetch the published workspace and print its outline
    Fetch {
        /// Also save the fetched document here
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write the sample workspace document as JSON
    Dump {
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a compact outline of the sample workspace
    Outline,
    /// Print the JSON schema of the workspace document
    Schema,
    /// Write a config template, keeping existing values
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "augur=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);

    match cli.command {
        Commands::Publish { document } => {
            let config = load_config(&config_path)?;
            let document = match document {
                Some(path) => {
                    let document = store::load_document(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    // Reject documents that would not rebuild before sending them.
                    document
                        .clone()
                        .into_workspace()
                        .with_context(|| format!("validating {}", path.display()))?;
                    document
                }
                None => demo::build().context("building the sample workspace")?.to_document(),
            };
            publisher(&config)
                .publish_document(&document, &config.credentials)
                .await?;
        }
        Commands::Fetch { out } => {
            let config = load_config(&config_path)?;
            let document = publisher(&config).fetch_document(&config.credentials).await?;
            let workspace = document.clone().into_workspace()?;
            if let Some(path) = out {
                store::save_document(&path, &document)?;
                info!(path = %path.display(), "document saved");
            }
            print!("{}", outline::render(&workspace));
        }
        Commands::Dump { out } => {
            let document = demo::build()?.to_document();
            match out {
                Some(path) => {
                    store::save_document(&path, &document)?;
                    info!(path = %path.display(), "document saved");
                }
                None => println!("{}", serde_json::to_string_pretty(&document)?),
            }
        }
        Commands::Outline => {
            print!("{}", outline::render(&demo::build()?));
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&Document::json_schema()?)?);
        }
        Commands::Init => {
            if config::write_template(&config_path)? {
                eprintln!("Wrote {}", config_path.display());
            } else {
                eprintln!("{} is already complete", config_path.display());
            }
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| {
        format!(
            "loading {} (run `augur init` to create it)",
            path.display()
        )
    })
}

fn publisher(config: &Config) -> Publisher<HttpTransport> {
    Publisher::new(HttpTransport::new().with_base_url(config.api_url.clone()))
}
