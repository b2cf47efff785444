use crate::core::facets::{taxonomy, FacetDimension};
use crate::domain::model::{FilterState, GroupSize, ModeFilter, TargetKind};
use chrono::NaiveDate;
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "catalog")]
#[command(about = "Browse the course catalog, filter listings and inspect ratings")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Catalog API base URL (overrides the config file)")]
    pub api_base_url: Option<String>,

    #[arg(long, global = true)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, global = true)]
    pub auth_token: Option<String>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List listings matching the given filters
    List {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show a listing with its own and its organizer's ratings
    Show { listing_id: String },
    /// Rate a listing or a user
    Rate {
        #[arg(value_enum)]
        kind: TargetKind,
        id: String,

        #[arg(long)]
        stars: u8,

        #[arg(long)]
        feedback: Option<String>,

        #[arg(long, help = "Show the feedback publicly")]
        public: bool,

        #[arg(long, help = "Listing to re-aggregate afterwards (defaults to the rated listing)")]
        listing: Option<String>,
    },
    /// Report a listing or a user to the moderators
    Report {
        #[arg(value_enum)]
        kind: TargetKind,
        id: String,

        #[arg(long)]
        reason: String,

        #[arg(long)]
        details: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[arg(long, short)]
    pub query: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long = "type")]
    pub service_type: Option<String>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeFilter>,

    #[arg(long, help = "Earliest date, YYYY-MM-DD (UTC)")]
    pub from: Option<NaiveDate>,

    #[arg(long, help = "Latest date, YYYY-MM-DD (UTC, inclusive)")]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub max_price: Option<f64>,

    #[arg(long = "group-size", value_enum, value_delimiter = ',')]
    pub group_sizes: Vec<GroupSize>,

    #[arg(long = "theme", value_delimiter = ',', value_parser = facet_values(FacetDimension::Theme))]
    pub themes: Vec<String>,

    #[arg(long = "cuisine", value_delimiter = ',', value_parser = facet_values(FacetDimension::Cuisine))]
    pub cuisines: Vec<String>,

    #[arg(long = "diet", value_delimiter = ',', value_parser = facet_values(FacetDimension::Diet))]
    pub diets: Vec<String>,
}

/// Facet flags only accept values the taxonomy can derive.
fn facet_values(dimension: FacetDimension) -> PossibleValuesParser {
    PossibleValuesParser::new(taxonomy(dimension))
}

impl FilterArgs {
    /// Layers the flags that were given over `preset`.
    pub fn apply_to(&self, mut preset: FilterState) -> FilterState {
        if let Some(query) = &self.query {
            preset.query = query.clone();
        }
        if self.category.is_some() {
            preset.category = self.category.clone();
        }
        if self.service_type.is_some() {
            preset.service_type = self.service_type.clone();
        }
        if let Some(mode) = self.mode {
            preset.mode = mode;
        }
        if self.from.is_some() {
            preset.date_from = self.from;
        }
        if self.to.is_some() {
            preset.date_to = self.to;
        }
        if self.max_price.is_some() {
            preset.max_price = self.max_price;
        }
        if !self.group_sizes.is_empty() {
            preset.group_sizes = self.group_sizes.iter().copied().collect();
        }
        if !self.themes.is_empty() {
            preset.themes = self.themes.iter().cloned().collect();
        }
        if !self.cuisines.is_empty() {
            preset.cuisines = self.cuisines.iter().cloned().collect();
        }
        if !self.diets.is_empty() {
            preset.diets = self.diets.iter().cloned().collect();
        }
        preset
    }
}
