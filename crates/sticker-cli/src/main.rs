//! Sticker CLI - Command-line interface for the sticker pack pipeline

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{normalize, providers, run};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sticker")]
#[command(about = "Generate themed sticker packs with your own provider keys", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the selectable providers and their models
    Providers {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Run a project end to end and write the export archive
    Run {
        /// Pack title
        #[arg(long, default_value = "Sticker pack")]
        title: String,

        /// Theme the drafts are built around
        #[arg(long)]
        theme: String,

        /// Number of stickers
        #[arg(long, default_value = "8")]
        count: usize,

        /// Character description
        #[arg(long)]
        character: Option<String>,

        /// Provider id (omit for the offline generator)
        #[arg(long)]
        provider: Option<String>,

        /// Model id for the provider
        #[arg(long)]
        model: Option<String>,

        /// Provider API key (defaults to STICKER_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Provider endpoint override
        #[arg(long)]
        api_base: Option<String>,

        /// Skip background removal
        #[arg(long)]
        no_background: bool,

        /// Archive directory (overrides configuration)
        #[arg(long)]
        output_dir: Option<String>,
    },

    /// Fit an image onto the sticker canvas
    Normalize {
        /// Source image
        input: String,

        /// Output PNG path
        #[arg(short, long, default_value = "sticker.png")]
        output: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sticker_gen=info,sticker_pack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Providers { format } => providers::run(&format),
        Commands::Run {
            title,
            theme,
            count,
            character,
            provider,
            model,
            api_key,
            api_base,
            no_background,
            output_dir,
        } => run::run(run::RunArgs {
            title,
            theme,
            count,
            character,
            provider,
            model,
            api_key,
            api_base,
            no_background,
            output_dir,
        }),
        Commands::Normalize { input, output } => normalize::run(&input, &output),
    }
}
