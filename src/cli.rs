//! Command-line interface definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Itinera - LLM-driven travel itinerary planner
#[derive(Debug, Parser)]
#[command(name = "itinera", version, about)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan a multi-day trip and print the itinerary as JSON
    Plan {
        /// Destination city
        #[arg(long)]
        destination: String,

        /// Trip length in days
        #[arg(long, default_value_t = 3)]
        days: u32,

        /// Maximum budget in USD
        #[arg(long, default_value_t = 1500)]
        budget: i64,

        /// Traveler persona, e.g. "Art lover" or "Foodie"
        #[arg(long, default_value = "Explorer")]
        persona: String,

        /// Interest tags (repeatable)
        #[arg(long)]
        interest: Vec<String>,

        /// Accommodation class
        #[arg(long, default_value = "Boutique Hotel")]
        accommodation: String,

        /// Include religious sites in the plan
        #[arg(long)]
        religious_sites: bool,

        /// Day start time
        #[arg(long, default_value = "09:00")]
        start_time: String,

        /// Day end time
        #[arg(long, default_value = "21:00")]
        end_time: String,
    },

    /// Repair an in-flight plan after a disruption
    Heal {
        /// Path to the current itinerary JSON (array of activity nodes)
        #[arg(long)]
        itinerary: PathBuf,

        /// Index of the last itinerary position already completed
        #[arg(long)]
        reached: usize,

        /// Disruption message, e.g. "It started raining"
        #[arg(long)]
        message: String,
    },
}
