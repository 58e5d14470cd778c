//! Cryopod bootstrap: assemble the freezer by constructor injection, pick
//! the greeting capability among candidates by its component key, run one
//! freeze cycle, and shut the scheduler down on the way out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use cryopod_core::freezer::Freezer;
use cryopod_core::task::{BoxFuture, Greeter, RoutineFactory, TaskContext, WorkerRoutine, WELCOME};
use cryopod_core::types::WorkerName;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cryopod")]
#[command(about = "Freeze suspendable workers into checkpoints and wake them back up", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Freeze the named workers, resume them, and report the outcome.
    Freeze {
        /// Comma-separated worker names.
        #[arg(long, value_delimiter = ',', default_value = "alpha,bravo,charlie")]
        workers: Vec<String>,
        /// Per-worker harvest bound in seconds.
        #[arg(long, default_value_t = 30)]
        harvest_timeout_secs: u64,
        /// Nap each worker takes after waking, in milliseconds.
        #[arg(long, default_value_t = 100)]
        nap_ms: u64,
    },
}

/// The stock greeting workers hear when they wake up.
struct WelcomeGreeter;

impl Greeter for WelcomeGreeter {
    fn greet(&self, worker: &str) -> String {
        format!("good morning, {worker}")
    }
}

/// A terser candidate nobody selects by default.
struct CurtGreeter;

impl Greeter for CurtGreeter {
    fn greet(&self, worker: &str) -> String {
        worker.to_string()
    }
}

/// Pick a greeter among the registered candidates by its component key.
fn select_greeter(key: &str) -> Result<Arc<dyn Greeter>> {
    let mut candidates: HashMap<&str, Arc<dyn Greeter>> = HashMap::new();
    candidates.insert(WELCOME, Arc::new(WelcomeGreeter));
    candidates.insert("curt", Arc::new(CurtGreeter));
    candidates
        .remove(key)
        .ok_or_else(|| anyhow!("no greeter registered under {}", key))
}

#[derive(Serialize, Deserialize)]
struct SleeperState {
    worker: String,
    greeting: String,
}

/// The demo worker: greets, suspends, naps, reports back.
struct Sleeper {
    nap: Duration,
}

impl WorkerRoutine for Sleeper {
    fn kind(&self) -> &'static str {
        "sleeper"
    }

    fn run_to_suspension(&self, worker: WorkerName, ctx: TaskContext) -> BoxFuture<Result<Vec<u8>>> {
        Box::pin(async move {
            let greeting = ctx.greeter.greet(&worker);
            tracing::debug!("{} tucked in", worker);
            let state = SleeperState { worker, greeting };
            Ok(bincode::serialize(&state)?)
        })
    }

    fn resume(
        &self,
        _worker: WorkerName,
        _ctx: TaskContext,
        state: Vec<u8>,
    ) -> BoxFuture<Result<String>> {
        let nap = self.nap;
        Box::pin(async move {
            tokio::time::sleep(nap).await;
            let state: SleeperState = bincode::deserialize(&state)?;
            Ok(format!("{} reports: {}", state.worker, state.greeting))
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Freeze {
            workers,
            harvest_timeout_secs,
            nap_ms,
        } => {
            let greeter = select_greeter(WELCOME)?;
            let routine = Arc::new(Sleeper {
                nap: Duration::from_millis(nap_ms),
            });
            let freezer = Freezer::new(Arc::new(RoutineFactory::new(routine)), greeter)?
                .with_harvest_timeout(Duration::from_secs(harvest_timeout_secs));

            let result = freezer.freeze(&workers);
            // Deactivation must run whether or not the freeze succeeded.
            freezer.shutdown();

            let report = result?;
            for (worker, value) in &report.harvested {
                println!("{worker}: {value}");
            }
        }
    }
    Ok(())
}
