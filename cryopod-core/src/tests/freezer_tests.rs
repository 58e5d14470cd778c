use super::*;
use crate::task::{BoxFuture, RoutineFactory, WorkerRoutine};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::time::Instant;

struct TestGreeter;

impl Greeter for TestGreeter {
    fn greet(&self, worker: &str) -> String {
        format!("hello {worker}")
    }
}

#[derive(Serialize, Deserialize)]
struct EchoState {
    worker: String,
}

/// Suspends immediately, resumes returning its own name uppercased.
/// Misbehavior is keyed off the worker name.
struct EchoRoutine {
    fail_on: Option<&'static str>,
    sleep_on: Option<(&'static str, Duration)>,
}

impl EchoRoutine {
    fn plain() -> Self {
        Self {
            fail_on: None,
            sleep_on: None,
        }
    }
}

impl WorkerRoutine for EchoRoutine {
    fn kind(&self) -> &'static str {
        "echo"
    }

    fn run_to_suspension(
        &self,
        worker: WorkerName,
        _ctx: TaskContext,
    ) -> BoxFuture<Result<Vec<u8>>> {
        Box::pin(async move {
            let state = EchoState { worker };
            Ok(bincode::serialize(&state)?)
        })
    }

    fn resume(
        &self,
        worker: WorkerName,
        _ctx: TaskContext,
        state: Vec<u8>,
    ) -> BoxFuture<Result<String>> {
        let fail = self.fail_on.map(|name| worker == name).unwrap_or(false);
        let nap = self
            .sleep_on
            .and_then(|(name, nap)| (worker == name).then_some(nap));
        Box::pin(async move {
            if let Some(nap) = nap {
                tokio::time::sleep(nap).await;
            }
            if fail {
                anyhow::bail!("worker {} refused to wake", worker);
            }
            let state: EchoState = bincode::deserialize(&state)?;
            Ok(state.worker.to_uppercase())
        })
    }
}

fn freezer_with(routine: Arc<dyn WorkerRoutine>, timeout: Duration) -> Freezer {
    Freezer::new(
        Arc::new(RoutineFactory::new(routine)),
        Arc::new(TestGreeter),
    )
    .unwrap()
    .with_harvest_timeout(timeout)
}

fn names(list: &[&str]) -> Vec<WorkerName> {
    list.iter().map(|name| name.to_string()).collect()
}

#[test]
fn test_freeze_all_workers_come_back_in_order() {
    let freezer = freezer_with(Arc::new(EchoRoutine::plain()), Duration::from_secs(5));

    let report = freezer.freeze(&names(&["a", "b", "c"])).unwrap();
    assert!(report.is_clean());
    assert_eq!(
        report.harvested,
        vec![
            ("a".to_string(), "A".to_string()),
            ("b".to_string(), "B".to_string()),
            ("c".to_string(), "C".to_string()),
        ]
    );
    freezer.shutdown();
}

#[test]
fn test_freeze_round_trip_matches_straight_through() {
    // Straight through: both phases back to back, no freeze machinery.
    let routine = EchoRoutine::plain();
    let ctx = TaskContext::new(Arc::new(TestGreeter));
    let straight = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(async {
            let state = routine
                .run_to_suspension("deep".to_string(), ctx.clone())
                .await
                .unwrap();
            routine.resume("deep".to_string(), ctx, state).await.unwrap()
        });

    let freezer = freezer_with(Arc::new(EchoRoutine::plain()), Duration::from_secs(5));
    let report = freezer.freeze(&names(&["deep"])).unwrap();
    assert_eq!(report.harvested, vec![("deep".to_string(), straight)]);
    freezer.shutdown();
}

#[test]
fn test_freeze_reports_failing_worker() {
    let freezer = freezer_with(
        Arc::new(EchoRoutine {
            fail_on: Some("b"),
            sleep_on: None,
        }),
        Duration::from_secs(5),
    );

    let err = freezer.freeze(&names(&["a", "b"])).unwrap_err();
    match err.downcast_ref::<FreezeError>() {
        Some(FreezeError::Lost { names }) => {
            assert_eq!(
                names.iter().cloned().collect::<Vec<_>>(),
                vec!["b".to_string()]
            );
        }
        other => panic!("expected Lost error, got {:?}", other),
    }
    freezer.shutdown();
}

#[test]
fn test_freeze_reports_over_sleeping_worker() {
    let bound = Duration::from_millis(100);
    let freezer = freezer_with(
        Arc::new(EchoRoutine {
            fail_on: None,
            sleep_on: Some(("b", Duration::from_millis(500))),
        }),
        bound,
    );

    let started = Instant::now();
    let err = freezer.freeze(&names(&["a", "b", "c"])).unwrap_err();
    let elapsed = started.elapsed();

    match err.downcast_ref::<FreezeError>() {
        Some(FreezeError::Lost { names }) => {
            assert_eq!(
                names.iter().cloned().collect::<Vec<_>>(),
                vec!["b".to_string()]
            );
        }
        other => panic!("expected Lost error, got {:?}", other),
    }
    // Harvesting is sequential: worker b sits second in the queue, so its
    // full bound must have elapsed before the report came back.
    assert!(elapsed >= bound, "harvest returned after {:?}", elapsed);
    freezer.shutdown();
}

#[test]
fn test_freeze_barrier_blocks_on_never_suspending_worker() {
    struct StuckRoutine;

    impl WorkerRoutine for StuckRoutine {
        fn kind(&self) -> &'static str {
            "stuck"
        }

        fn run_to_suspension(
            &self,
            _worker: WorkerName,
            _ctx: TaskContext,
        ) -> BoxFuture<Result<Vec<u8>>> {
            Box::pin(std::future::pending::<Result<Vec<u8>>>())
        }

        fn resume(
            &self,
            _worker: WorkerName,
            _ctx: TaskContext,
            _state: Vec<u8>,
        ) -> BoxFuture<Result<String>> {
            Box::pin(async { anyhow::bail!("stuck workers never checkpoint") })
        }
    }

    let freezer = freezer_with(Arc::new(StuckRoutine), Duration::from_secs(1));
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(freezer.freeze(&names(&["a"])).map(|report| report.lost));
    });

    // The barrier has no timeout; the call must make no progress.
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn test_freeze_twice_reuses_registrations() {
    let freezer = freezer_with(Arc::new(EchoRoutine::plain()), Duration::from_secs(5));

    let first = freezer.freeze(&names(&["a"])).unwrap();
    let second = freezer.freeze(&names(&["a", "b"])).unwrap();
    assert_eq!(first.harvested, vec![("a".to_string(), "A".to_string())]);
    assert_eq!(
        second.harvested,
        vec![
            ("a".to_string(), "A".to_string()),
            ("b".to_string(), "B".to_string()),
        ]
    );
    freezer.shutdown();
}

#[test]
fn test_shutdown_before_freeze_is_safe_and_refuses_work() {
    let freezer = freezer_with(Arc::new(EchoRoutine::plain()), Duration::from_secs(5));
    freezer.shutdown();

    let err = freezer.freeze(&names(&["a"])).unwrap_err();
    assert!(
        err.to_string().contains("shut down"),
        "unexpected error: {err}"
    );
}
