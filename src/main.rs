use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use seoul_district_analyzer::analysis::merge::{read_merged, write_merged};
use seoul_district_analyzer::analysis::{aggregate_districts, merge_datasets, OpenDataSet};
use seoul_district_analyzer::visual::{compute_quadrant_index, render_scatter_svg, MapRenderer};
use seoul_district_analyzer::{CollectionPipeline, Config, YouTubeClient};

#[derive(Parser)]
#[command(name = "district-analyzer")]
#[command(version, author = "TigreRoll")]
#[command(about = "Seoul commercial-district collection and ranking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to district-analyzer.toml or config/district-analyzer.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search YouTube for each keyword, filter the videos and save JSON/CSV
    Collect {
        /// Keywords to search instead of the configured ones
        #[arg(short, long)]
        keyword: Vec<String>,
        /// Results to collect per keyword
        #[arg(long)]
        total_count: Option<u32>,
    },
    /// Join the open-data extracts into the merged dataset
    Merge {
        /// Directory holding the extracts
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Score and rank districts with the configured models
    Rank {
        /// Only run this model (`name` or `name@version`)
        #[arg(short, long)]
        model: Option<String>,
        /// Merged dataset to read (defaults to the configured merged file)
        #[arg(long)]
        merged: Option<PathBuf>,
    },
    /// Render the quadrant map and scatter plot from an analysis table
    Map {
        /// CSV table with the district name, x component and y columns
        input: PathBuf,
        /// Skip the SVG scatter plot
        #[arg(long)]
        no_scatter: bool,
    },
    /// Write the default configuration to a file
    InitConfig {
        #[arg(default_value = "district-analyzer.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.output.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("seoul_district_analyzer={},district_analyzer={},warn", level, level)));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    init_logging(&config, cli.verbose);
    if cli.verbose {
        info!("Verbose logging enabled");
    }

    match cli.command {
        Commands::Collect { keyword, total_count } => {
            if !keyword.is_empty() {
                config.collection.keywords = keyword;
            }
            if let Some(total) = total_count {
                config.collection.total_count = total;
            }
            config.validate()?;
            if config.collection.keywords.is_empty() {
                return Err(anyhow!("no keywords configured; set collection.keywords or pass --keyword"));
            }

            info!("🚀 Seoul District Analyzer starting...");
            info!("{}", config.summary());

            let client = YouTubeClient::new(&config.youtube, config.api_key()?)?;
            let summary = CollectionPipeline::new(&client, &config).run().await?;
            summary.stats.log_summary();
        }

        Commands::Merge { data_dir } => {
            if let Some(dir) = data_dir {
                config.analysis.data_dir = dir;
            }
            config.validate()?;

            let data = OpenDataSet::load(&config.analysis)?;
            let (rows, report) = merge_datasets(&data);
            report.log_summary();

            let path = config.output.base_dir.join(&config.analysis.merged_file);
            write_merged(&path, &rows)?;
        }

        Commands::Rank { model, merged } => {
            config.validate()?;
            let path = merged.unwrap_or_else(|| config.output.base_dir.join(&config.analysis.merged_file));
            let rows = read_merged(&path)?;
            let records = aggregate_districts(
                &rows,
                &config.analysis.district_aliases,
                config.analysis.population_aggregation,
            );
            info!("📊 {} merged rows folded into {} district-quarters", rows.len(), records.len());

            let models: Vec<_> = match &model {
                Some(name) => vec![config
                    .scoring
                    .model(name)
                    .ok_or_else(|| anyhow!("unknown scoring model: {}", name))?],
                None => config.scoring.models.iter().collect(),
            };
            if models.is_empty() {
                warn!("No scoring models configured");
            }

            for scoring_model in models {
                let ranking = scoring_model.rank(&records);
                ranking.log_summary();
                let output = config.output.base_dir.join(format!(
                    "ranking_{}_v{}.csv",
                    scoring_model.name, scoring_model.version
                ));
                ranking.write_csv(&output)?;
            }
        }

        Commands::Map { input, no_scatter } => {
            config.validate()?;
            let points = compute_quadrant_index(&input, &config.quadrant)?;

            let map_path = config.output.base_dir.join(&config.map.output_file);
            let report = MapRenderer::new(&config.map).write(&map_path, &points)?;
            info!("🗺️ {} of {} districts placed on the map", report.rendered, points.len());

            if !no_scatter {
                let svg = render_scatter_svg(&points, &config.map.emphasized_districts);
                let svg_path = config.output.base_dir.join(&config.map.scatter_file);
                tokio::fs::write(&svg_path, svg)
                    .await
                    .with_context(|| format!("writing {}", svg_path.display()))?;
                info!("💾 Scatter plot saved to: {}", svg_path.display());
            }
        }

        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(anyhow!("{} already exists (use --force to overwrite)", path.display()));
            }
            Config::default().save(&path)?;
            info!("✅ Default configuration written to {}", path.display());
        }
    }

    Ok(())
}
