//! Food Import Shock CLI
//!
//! Runs the shock engine over a prepared JSON dataset and prints JSON reports.
//!
//! Usage:
//!   foodshock --data balances.json top --shock 35% --n 20 --commodity Wheat
//!   foodshock --data balances.json drilldown Malta --shock 0.2
//!   foodshock --data balances.json compare --shock-a 0.2 --shock-b 0.5 --region africa
//!   foodshock --data balances.json shocks
//!   foodshock --data balances.json top --shock 0.35 --cached
//!
//! Environment:
//!   FOODSHOCK_DATA   - Dataset path (JSON array of balance rows)
//!   FOODSHOCK_CONFIG - Engine config path (TOML, optional)
//!   FOODSHOCK_CACHE  - Snapshot directory for cached shocks (default: cache)
//!   RUST_LOG         - Log filter (default: foodshock_engine=info)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use foodshock_engine::prep::{
    list_commodities, parse_shock, search_countries, RecordFilter, RecordSet, Region,
};
use foodshock_engine::report::Report;
use foodshock_engine::{
    compare_with, drilldown_with, rank_with, BalanceRecord, DeltaOrder, DirectShock,
    EngineConfig, RecordFailure, RiskScorer, ShockCache, ShockFraction, ShockModel,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "foodshock")]
#[command(about = "Import-shock shortfalls and structural risk by country and commodity")]
struct Cli {
    /// Prepared dataset (JSON array of balance rows)
    #[arg(short, long, env = "FOODSHOCK_DATA")]
    data: PathBuf,

    /// Engine config (TOML); defaults apply when omitted
    #[arg(short, long, env = "FOODSHOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding shock snapshots written by `shocks`
    #[arg(long, env = "FOODSHOCK_CACHE", default_value = "cache")]
    cache_dir: PathBuf,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank country-commodity pairs by shortfall under one shock
    Top {
        /// Shock as a fraction (0.35) or percentage (35, 35%)
        #[arg(short, long)]
        shock: Option<String>,

        /// Number of entries to keep
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..=200))]
        n: Option<u16>,

        #[command(flatten)]
        scope: Scope,

        /// Serve from the snapshot written by `shocks`; the shock must be a configured cached shock
        #[arg(long)]
        cached: bool,
    },

    /// All commodities of one country with shock and risk results
    Drilldown {
        /// Country name (case-insensitive exact match)
        country: String,

        #[arg(short, long)]
        shock: Option<String>,
    },

    /// Compare two shocks over the same records
    Compare {
        #[arg(long)]
        shock_a: String,

        #[arg(long)]
        shock_b: String,

        /// Row ordering
        #[arg(long, value_enum, default_value = "magnitude")]
        order: OrderArg,

        /// Keep only the first N rows
        #[arg(short, long)]
        n: Option<usize>,

        #[command(flatten)]
        scope: Scope,
    },

    /// Precompute the configured cached shocks and write one snapshot per shock
    Shocks,

    /// List commodities in the dataset
    Commodities,

    /// Search country names
    Countries {
        /// Case-insensitive substring
        #[arg(short, long)]
        q: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct Scope {
    /// Restrict to one commodity (case-insensitive)
    #[arg(long)]
    commodity: Option<String>,

    /// Region preset: All, Africa, EU
    #[arg(long, default_value = "All")]
    region: Region,
}

impl Scope {
    fn filter(&self) -> RecordFilter {
        let filter = RecordFilter::new().with_region(self.region);
        match &self.commodity {
            Some(c) => filter.with_commodity(c),
            None => filter,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    Magnitude,
    Signed,
}

impl From<OrderArg> for DeltaOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Magnitude => DeltaOrder::Magnitude,
            OrderArg::Signed => DeltaOrder::Signed,
        }
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => EngineConfig::from_env()?,
    };
    let scorer = RiskScorer::new(config.risk).context("Invalid risk configuration")?;
    let dataset = RecordSet::load(&cli.data)?;

    let output = run(&cli, &config, &scorer, &dataset)?;
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);
    Ok(())
}

fn run(
    cli: &Cli,
    config: &EngineConfig,
    scorer: &RiskScorer,
    dataset: &RecordSet,
) -> Result<Value> {
    let default_shock = ShockFraction::new(config.default_shock)?;
    let shock_or_default = |text: &Option<String>| -> Result<ShockFraction> {
        match text {
            Some(t) => Ok(parse_shock(t)?),
            None => Ok(default_shock),
        }
    };

    let value = match &cli.command {
        Commands::Top {
            shock,
            n,
            scope,
            cached,
        } => {
            let shock = shock_or_default(shock)?;
            let top_n = n.map(usize::from).unwrap_or(config.default_top_n);
            if top_n > config.max_top_n {
                bail!("--n {} exceeds max_top_n {}", top_n, config.max_top_n);
            }
            let records = scoped(dataset, &scope.filter())?;

            let cache = ShockCache::new();
            let model: &dyn ShockModel = if *cached {
                let available = config.cached_shock_fractions()?;
                if !available.contains(&shock) {
                    let listed: Vec<f64> = available.iter().map(|s| s.value()).collect();
                    bail!(
                        "No cached results for shock {}; cached shocks: {:?}",
                        shock.value(),
                        listed
                    );
                }
                cache.load_snapshot(&cli.cache_dir, shock).with_context(|| {
                    format!(
                        "No snapshot for shock {} in {:?}; run `foodshock shocks` first",
                        shock.value(),
                        cli.cache_dir
                    )
                })?;
                &cache
            } else {
                &DirectShock
            };

            let ranking = rank_with(model, &records, shock.value(), Some(top_n))?;
            info!(shock = %shock, entries = ranking.entries.len(), "ranking ready");
            let mut risk_failures = Vec::new();
            let entries: Vec<Value> = ranking
                .entries
                .iter()
                .map(|e| -> Result<Value> {
                    let risk = match scorer.score(e.record) {
                        Ok(risk) => serde_json::to_value(risk)?,
                        Err(error) => {
                            risk_failures.push(RecordFailure {
                                key: e.record.key(),
                                error,
                            });
                            Value::Null
                        }
                    };
                    Ok(json!({
                        "rank": e.rank,
                        "record": e.record,
                        "shock": e.shock,
                        "risk": risk,
                    }))
                })
                .collect::<Result<_>>()?;
            Report::new(
                "top",
                entries.len(),
                json!({
                    "shock_fraction": ranking.shock_fraction,
                    "region": scope.region,
                    "commodity": scope.commodity,
                    "cached": cached,
                    "evaluated": ranking.evaluated,
                    "entries": entries,
                    "failures": ranking.failures,
                    "risk_failures": risk_failures,
                    "cache": cached.then(|| cache.stats()),
                    "rejected_rows": dataset.rejected,
                }),
            )
            .to_value()?
        }

        Commands::Drilldown { country, shock } => {
            let shock = shock_or_default(shock)?;
            let records = RecordFilter::new().apply(&dataset.records);
            let view = drilldown_with(&DirectShock, scorer, &records, country, shock.value())?;
            Report::new("drilldown", view.commodities.len(), &view).to_value()?
        }

        Commands::Compare {
            shock_a,
            shock_b,
            order,
            n,
            scope,
        } => {
            let a = parse_shock(shock_a)?;
            let b = parse_shock(shock_b)?;
            let records = scoped(dataset, &scope.filter())?;
            let mut comparison =
                compare_with(&DirectShock, &records, a.value(), b.value(), (*order).into())?;
            if let Some(n) = n {
                comparison.rows.truncate(*n);
            }
            Report::new("compare", comparison.rows.len(), &comparison).to_value()?
        }

        Commands::Shocks => {
            let shocks = config.cached_shock_fractions()?;
            let cache = ShockCache::new();
            let failures = cache.precompute(&dataset.records, &shocks);
            let snapshots = shocks
                .iter()
                .map(|&s| cache.save_snapshot(&cli.cache_dir, s))
                .collect::<Result<Vec<_>>>()?;
            Report::new(
                "shocks",
                shocks.len(),
                json!({
                    "shocks": cache.cached_shocks(),
                    "snapshots": snapshots,
                    "stats": cache.stats(),
                    "failures": failures
                        .iter()
                        .map(|(key, error)| json!({"record": key, "error": error}))
                        .collect::<Vec<_>>(),
                }),
            )
            .to_value()?
        }

        Commands::Commodities => {
            let items = list_commodities(&dataset.records);
            Report::new("commodities", items.len(), json!({ "commodities": items })).to_value()?
        }

        Commands::Countries { q } => {
            let items = search_countries(&dataset.records, q.as_deref());
            Report::new("countries", items.len(), json!({ "countries": items })).to_value()?
        }
    };
    Ok(value)
}

/// Records passing `filter`; an empty result is an error, as nothing can be ranked.
fn scoped(dataset: &RecordSet, filter: &RecordFilter) -> Result<Vec<BalanceRecord>> {
    let records = filter.apply(&dataset.records);
    if records.is_empty() {
        bail!("No records match the requested region/commodity filters");
    }
    Ok(records)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodshock_engine=info,foodshock=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
