//! Itinera - LLM-driven travel itinerary planner
//!
//! CLI entry point for planning and healing trips.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use itinera::cli::{Cli, Command};
use itinera::config::Config;
use itinera::domain::{ActivityNode, PlanRequest};
use itinera::llm;
use itinera::planner::Planner;
use itinera::services::{GoogleMapsClient, OpenWeatherClient, SupabaseStore};

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_ref())?;
    config.validate()?;

    let llm = llm::create_client(&config.llm).context("Failed to create LLM client")?;
    let geo = Arc::new(GoogleMapsClient::from_config(&config.geo).context("Failed to create geo client")?);
    let weather =
        Arc::new(OpenWeatherClient::from_config(&config.weather).context("Failed to create weather client")?);
    let store = Arc::new(SupabaseStore::from_config(&config.store).context("Failed to create journey store")?);

    let planner = Planner::new(llm, geo, weather, store, &config);

    match cli.command {
        Command::Plan {
            destination,
            days,
            budget,
            persona,
            interest,
            accommodation,
            religious_sites,
            start_time,
            end_time,
        } => {
            let request = PlanRequest {
                destination,
                start_date: String::new(),
                end_date: String::new(),
                start_time,
                end_time,
                time_period: String::new(),
                budget_max: budget,
                persona,
                religious_sites_ok: religious_sites,
                accommodation,
                interests: interest,
                duration_days: days,
            };

            let outcome = planner.plan_trip(request).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::Heal {
            itinerary,
            reached,
            message,
        } => {
            let content = fs::read_to_string(&itinerary)
                .context(format!("Failed to read itinerary from {}", itinerary.display()))?;
            let plan: Vec<ActivityNode> =
                serde_json::from_str(&content).context("Failed to parse itinerary JSON")?;

            let healed = planner.heal_plan(&plan, reached, &message).await?;
            println!("{}", serde_json::to_string_pretty(&healed)?);
        }
    }

    Ok(())
}
