use clap::{Parser, Subcommand};
use std::path::PathBuf;

use healthmap::config::AppConfig;
use healthmap::{data, render, server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a map artifact from a local CSV file
    Generate {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the map generation API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { input, config } => {
            let app_config = AppConfig::load_or_default(config)?;
            app_config.storage.ensure_dirs()?;

            // 1. Load and validate the table
            println!("Reading records from {:?}", input);
            let records = data::load_table(input)?;
            println!("Loaded {} records", records.len());

            // 2. Render and persist the artifact
            let html = render::render_map(&app_config.map, &records)?;
            let filename = render::save_artifact(&app_config.storage.maps_dir, &html)?;
            println!(
                "Map written to {:?}",
                app_config.storage.maps_dir.join(filename)
            );
        }
        Commands::Serve { config } => {
            let app_config = AppConfig::load_or_default(config)?;
            server::start_server(app_config).await?;
        }
    }

    Ok(())
}
