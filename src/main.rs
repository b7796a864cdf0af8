//! tripwire command-line tool.
//!
//! # Commands
//! - `validate`: load a TOML config, report every violation, print the result
//! - `simulate`: drive a synthetic flaky dependency through a breaker and
//!   print the exported metrics
//!
//! ```text
//!   config.toml ──▶ loader ──▶ validation ──▶ CircuitBreaker
//!                                                  │
//!              FlakyDependency ◀── simulate loop ──┘
//!                                                  │
//!                         stdout (metrics JSON) ◀──┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tripwire::config::loader::load_config;
use tripwire::config::AppConfig;
use tripwire::observability::{logging, metrics};
use tripwire::simulation::{self, FlakyDependency};
use tripwire::CircuitBreaker;

#[derive(Parser)]
#[command(name = "tripwire")]
#[command(about = "Circuit breaker toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the TOML configuration
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run a simulated flaky dependency through a breaker
    Simulate {
        /// Path to the TOML configuration (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the number of calls
        #[arg(long)]
        calls: Option<u64>,

        /// Override the failure probability (0.0 to 1.0)
        #[arg(long)]
        failure_probability: Option<f64>,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => {
            let app = load_config(&config)?;
            println!("{}", toml::to_string_pretty(&app)?);
        }
        Commands::Simulate {
            config,
            calls,
            failure_probability,
            seed,
        } => {
            let mut app = match config {
                Some(path) => load_config(&path)?,
                None => AppConfig::default(),
            };
            if let Some(calls) = calls {
                app.simulation.calls = calls;
            }
            if let Some(p) = failure_probability {
                app.simulation.failure_probability = p;
            }
            tripwire::config::validation::validate_config(&app)
                .map_err(tripwire::ConfigError::Validation)?;

            simulate(app, seed).await?;
        }
    }

    Ok(())
}

async fn simulate(app: AppConfig, seed: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&app.observability)?;

    tracing::info!(
        failure_count_threshold = app.breaker.failure_count_threshold,
        failure_rate_threshold = app.breaker.failure_rate_threshold,
        operation_timeout_ms = app.breaker.operation_timeout_ms,
        open_to_probe_delay_ms = app.breaker.open_to_probe_delay_ms,
        calls = app.simulation.calls,
        failure_probability = app.simulation.failure_probability,
        "Configuration loaded"
    );

    if app.observability.metrics_enabled {
        match app.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %app.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let breaker = CircuitBreaker::new("simulated", app.breaker.clone())?;
    let mut dependency = match seed {
        Some(seed) => FlakyDependency::with_seed(&app.simulation, seed),
        None => FlakyDependency::new(&app.simulation),
    };

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        tracing::info!("Interrupt received, stopping simulation");
    };

    let report = simulation::run(&breaker, &mut dependency, &app.simulation, shutdown).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", breaker.export_metrics()?);
    Ok(())
}
