//! Freeze three workers, wake them back up, print the report.
//!
//! Run with: `cargo run --example freeze_resume`

use std::sync::Arc;

use anyhow::Result;
use cryopod_core::freezer::Freezer;
use cryopod_core::task::{BoxFuture, Greeter, RoutineFactory, TaskContext, WorkerRoutine};
use cryopod_core::types::WorkerName;
use serde::{Deserialize, Serialize};

struct Welcome;

impl Greeter for Welcome {
    fn greet(&self, worker: &str) -> String {
        format!("welcome back, {worker}")
    }
}

#[derive(Serialize, Deserialize)]
struct NapState {
    worker: String,
    greeting: String,
}

struct Napper;

impl WorkerRoutine for Napper {
    fn kind(&self) -> &'static str {
        "napper"
    }

    fn run_to_suspension(&self, worker: WorkerName, ctx: TaskContext) -> BoxFuture<Result<Vec<u8>>> {
        Box::pin(async move {
            let greeting = ctx.greeter.greet(&worker);
            let state = NapState { worker, greeting };
            Ok(bincode::serialize(&state)?)
        })
    }

    fn resume(
        &self,
        _worker: WorkerName,
        _ctx: TaskContext,
        state: Vec<u8>,
    ) -> BoxFuture<Result<String>> {
        Box::pin(async move {
            let state: NapState = bincode::deserialize(&state)?;
            Ok(format!("{} woke up: {}", state.worker, state.greeting))
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let freezer = Freezer::new(
        Arc::new(RoutineFactory::new(Arc::new(Napper))),
        Arc::new(Welcome),
    )?;
    let workers: Vec<WorkerName> = ["mercury", "venus", "earth"]
        .iter()
        .map(|name| name.to_string())
        .collect();

    let report = freezer.freeze(&workers)?;
    for (worker, value) in &report.harvested {
        println!("{worker}: {value}");
    }
    freezer.shutdown();
    Ok(())
}
