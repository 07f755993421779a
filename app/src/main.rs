// In app/src/main.rs

use anyhow::{Context, Result};
use app_config::Settings;
use backtester::{WalkForwardOptions, run_backtest, sweep, walk_forward};
use clap::{Parser, Subcommand, ValueEnum};
use core_types::StrategyConfig;
use core_types::strategy::parse_param;
use options::{OptionType, PayoffRange, PricingContext, Scenario};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tokio::task;
use tracing_subscriber::prelude::*;

mod input;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "Strategy backtesting and options analytics.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replays a CSV of bars through one strategy and prints the report.
    Backtest {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Ranks every combination of a parameter grid by Sharpe ratio.
    Sweep {
        #[command(flatten)]
        run: RunArgs,

        /// Grid entry as `key=v1,v2,...`; repeat for more keys.
        #[arg(short, long = "grid")]
        grid: Vec<String>,

        /// Only print the best N runs.
        #[arg(long)]
        top: Option<usize>,
    },

    /// Rolling in-sample optimisation with out-of-sample checks.
    WalkForward {
        #[command(flatten)]
        run: RunArgs,

        #[arg(short, long = "grid")]
        grid: Vec<String>,

        #[arg(long, default_value_t = 5)]
        folds: usize,

        #[arg(long, default_value_t = 0.7)]
        in_sample_ratio: f64,
    },

    /// Risk statistics of a JSON array of periodic returns.
    Risk {
        #[arg(long)]
        returns: PathBuf,

        #[arg(long)]
        capital: Option<Decimal>,

        /// Per-period risk-free rate.
        #[arg(long)]
        risk_free_rate: Option<f64>,
    },

    /// Prices one option, or solves its implied volatility when `--price` is given.
    Greeks {
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        strike: f64,
        /// Calendar days to expiry.
        #[arg(long)]
        days: f64,
        #[arg(long, value_enum)]
        kind: Kind,
        #[arg(long)]
        volatility: Option<f64>,
        #[arg(long)]
        rate: Option<f64>,
        /// Observed option price to invert.
        #[arg(long)]
        price: Option<f64>,
    },

    /// Payoff table, aggregate Greeks and scenarios for a JSON leg set.
    Strategy {
        #[arg(long)]
        legs: PathBuf,
        #[arg(long)]
        spot: f64,
        #[arg(long, default_value_t = 30.0)]
        days: f64,
        #[arg(long)]
        volatility: Option<f64>,
        #[arg(long)]
        rate: Option<f64>,
        /// JSON array of `{spotChangePct, ivChangePct, daysElapsed}`.
        #[arg(long)]
        scenarios: Option<PathBuf>,
    },

    /// Max-pain strike of a JSON option chain `[{strike, callOi, putOi}]`.
    MaxPain {
        #[arg(long)]
        chain: PathBuf,
    },

    /// Volatility surface, skew, term structure and anomalies of a JSON chain
    /// `[{strike, expiryDays, callPrice?, putPrice?, callIv?, putIv?}]`.
    IvSurface {
        #[arg(long)]
        quotes: PathBuf,
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        rate: Option<f64>,
    },

    /// Where the current implied volatility sits in its history, 0 to 100.
    IvPercentile {
        #[arg(long)]
        current: f64,
        #[arg(long, value_delimiter = ',')]
        history: Vec<f64>,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// CSV file with `timestamp,open,high,low,close,volume` rows.
    #[arg(short, long)]
    bars: PathBuf,

    /// Strategy id; defaults to the configured strategy.
    #[arg(short, long)]
    strategy: Option<String>,

    /// Parameter override as `key=value`; repeat for more.
    #[arg(short, long = "param")]
    param: Vec<String>,

    #[arg(long)]
    capital: Option<Decimal>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Call,
    Put,
}

impl From<Kind> for OptionType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Call => OptionType::Call,
            Kind::Put => OptionType::Put,
        }
    }
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();
    let settings = app_config::load_settings().context("Failed to load configuration")?;
    init_tracing(&settings.app.log_level);

    let cli = Cli::parse();
    tracing::debug!(environment = %settings.app.environment, "Configuration loaded.");

    match cli.command {
        Commands::Backtest { run } => handle_backtest(&settings, run)?,
        Commands::Sweep { run, grid, top } => handle_sweep(&settings, run, grid, top).await?,
        Commands::WalkForward {
            run,
            grid,
            folds,
            in_sample_ratio,
        } => {
            let options = WalkForwardOptions {
                folds,
                in_sample_ratio,
            };
            handle_walk_forward(&settings, run, grid, options).await?
        }
        Commands::Risk {
            returns,
            capital,
            risk_free_rate,
        } => {
            let returns: Vec<f64> = input::load_json(&returns)?;
            let capital = capital.unwrap_or(settings.backtest.initial_capital);
            let capital = f64::try_from(capital).context("Capital is out of range")?;
            print_json(&analytics::risk_report(&returns, capital, risk_free_rate))?;
        }
        Commands::Greeks {
            spot,
            strike,
            days,
            kind,
            volatility,
            rate,
            price,
        } => handle_greeks(&settings, spot, strike, days, kind.into(), volatility, rate, price)?,
        Commands::Strategy {
            legs,
            spot,
            days,
            volatility,
            rate,
            scenarios,
        } => {
            let ctx = PricingContext {
                time_to_expiry: days / 365.0,
                volatility: volatility.unwrap_or(settings.options.volatility),
                risk_free_rate: rate.unwrap_or(settings.options.risk_free_rate),
            };
            handle_strategy(&settings, &legs, spot, ctx, scenarios)?
        }
        Commands::MaxPain { chain } => {
            let rows: Vec<input::ChainRow> = input::load_json(&chain)?;
            let oi = input::open_interest(&rows)?;
            print_json(&options::max_pain(&oi.strikes, &oi.calls, &oi.puts))?;
        }
        Commands::IvSurface { quotes, spot, rate } => {
            let quotes: Vec<options::StrikeQuote> = input::load_json(&quotes)?;
            let rate = rate.unwrap_or(settings.options.risk_free_rate);
            print_json(&options::iv_surface(&quotes, spot, rate)?)?;
        }
        Commands::IvPercentile { current, history } => {
            #[derive(Serialize)]
            struct Percentile {
                current: f64,
                percentile: f64,
            }
            print_json(&Percentile {
                current,
                percentile: options::iv_percentile(current, &history),
            })?;
        }
    }

    Ok(())
}

/// Human-readable logs go to stderr so stdout carries only JSON.
fn init_tracing(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            tracing_subscriber::filter::Targets::new()
                .with_target("rayon", tracing::Level::WARN)
                .with_default(level),
        );
    tracing_subscriber::registry().with(fmt_layer).init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The configured strategy, replaced by `--strategy` and overlaid with `--param`.
fn strategy_config(settings: &Settings, run: &RunArgs) -> Result<StrategyConfig> {
    let mut config = match &run.strategy {
        Some(name) => StrategyConfig::with_defaults(name.clone()),
        None => settings.backtest.strategy.clone(),
    };
    for raw in &run.param {
        let (key, value) = parse_param(raw).with_context(|| format!("Parameter '{raw}' is not of the form key=value"))?;
        config.set(key, value);
    }
    Ok(config)
}

fn handle_backtest(settings: &Settings, run: RunArgs) -> Result<()> {
    let bars = input::load_bars(&run.bars)?;
    let config = strategy_config(settings, &run)?;
    let capital = run.capital.unwrap_or(settings.backtest.initial_capital);
    let report = run_backtest(&config, &bars, capital)?;
    print_json(&report)
}

/// Runs `job` on a dedicated rayon pool sized from `app.sweep_cores`, off the async runtime.
async fn on_sweep_pool<T, F>(settings: &Settings, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> backtester::Result<T> + Send + 'static,
{
    let cores = settings.app.sweep_cores;
    tracing::info!(cores, "Configuring Rayon thread pool.");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cores)
        .build()
        .context("Failed to build Rayon thread pool")?;
    let result = task::spawn_blocking(move || pool.install(job)).await??;
    Ok(result)
}

async fn handle_sweep(settings: &Settings, run: RunArgs, grid: Vec<String>, top: Option<usize>) -> Result<()> {
    let bars = input::load_bars(&run.bars)?;
    let config = strategy_config(settings, &run)?;
    let grid = input::parse_grid(&grid)?;
    let capital = run.capital.unwrap_or(settings.backtest.initial_capital);

    let mut outcome = on_sweep_pool(settings, move || sweep(&config, &grid, &bars, capital)).await?;
    if let Some(top) = top {
        outcome.runs.truncate(top);
    }
    print_json(&outcome)
}

async fn handle_walk_forward(
    settings: &Settings,
    run: RunArgs,
    grid: Vec<String>,
    options: WalkForwardOptions,
) -> Result<()> {
    let bars = input::load_bars(&run.bars)?;
    let config = strategy_config(settings, &run)?;
    let grid = input::parse_grid(&grid)?;
    let capital = run.capital.unwrap_or(settings.backtest.initial_capital);

    let report = on_sweep_pool(settings, move || walk_forward(&config, &grid, &bars, capital, options)).await?;
    print_json(&report)
}

#[allow(clippy::too_many_arguments)]
fn handle_greeks(
    settings: &Settings,
    spot: f64,
    strike: f64,
    days: f64,
    option_type: OptionType,
    volatility: Option<f64>,
    rate: Option<f64>,
    observed_price: Option<f64>,
) -> Result<()> {
    #[derive(Serialize)]
    struct Quote {
        price: f64,
        volatility: f64,
        #[serde(flatten)]
        greeks: options::Greeks,
    }

    anyhow::ensure!(spot > 0.0 && strike > 0.0, "Spot and strike must be positive");
    let t = days / 365.0;
    let r = rate.unwrap_or(settings.options.risk_free_rate);
    let vol = match observed_price {
        Some(p) => options::implied_volatility(p, spot, strike, t, r, option_type)?,
        None => volatility.unwrap_or(settings.options.volatility),
    };

    print_json(&Quote {
        price: options::price(spot, strike, t, vol, r, option_type),
        volatility: vol,
        greeks: options::greeks(spot, strike, t, vol, r, option_type),
    })
}

fn handle_strategy(
    settings: &Settings,
    legs: &std::path::Path,
    spot: f64,
    ctx: PricingContext,
    scenarios: Option<PathBuf>,
) -> Result<()> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct StrategyAnalysis {
        summary: options::StrategyGreeks,
        payoff: Vec<options::PayoffPoint>,
        scenarios: Vec<options::ScenarioResult>,
    }

    anyhow::ensure!(spot > 0.0, "Spot must be positive");
    let legs = input::load_legs(legs)?;
    let scenarios: Vec<Scenario> = match scenarios {
        Some(path) => input::load_json(&path)?,
        None => [-10.0, -5.0, 0.0, 5.0, 10.0]
            .into_iter()
            .map(|spot_change_pct| Scenario {
                spot_change_pct,
                ..Scenario::default()
            })
            .collect(),
    };

    let range = Some(PayoffRange::around(spot, settings.options.payoff_range_percent));
    print_json(&StrategyAnalysis {
        summary: options::strategy_greeks(
            &legs,
            spot,
            ctx.time_to_expiry,
            ctx.volatility,
            ctx.risk_free_rate,
            range,
        ),
        payoff: options::payoff_curve(&legs, spot, range),
        scenarios: options::scenario_simulation(&legs, spot, ctx, &scenarios),
    })
}
