//! Background validation with a real linter
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use kalix_lint::executor::DEFAULT_TIMEOUT;
use kalix_lint::{
    ExecutorConfig, Linter, Schema, ValidationCallback, ValidationExecutor, ValidationResult,
};

#[derive(Debug, PartialEq)]
enum Seen {
    Completed(String, usize),
    Cancelled(String),
    Failed(String),
}

struct Collect {
    label: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl ValidationCallback for Collect {
    fn on_completed(&mut self, result: ValidationResult) {
        let errors = result.errors().count();
        self.seen
            .lock()
            .unwrap()
            .push(Seen::Completed(self.label.clone(), errors));
    }

    fn on_cancelled(&mut self) {
        self.seen.lock().unwrap().push(Seen::Cancelled(self.label.clone()));
    }

    fn on_error(&mut self, error: anyhow::Error) {
        self.seen.lock().unwrap().push(Seen::Failed(error.to_string()));
    }
}

fn linter_task(
    linter: &Arc<Linter>,
    delay: Duration,
) -> impl Fn(&str) -> anyhow::Result<ValidationResult> + Send + 'static {
    let linter = Arc::clone(linter);
    move |content: &str| -> anyhow::Result<ValidationResult> {
        thread::sleep(delay);
        Ok(linter.validate(content, None))
    }
}

#[test]
fn back_to_back_submissions_complete_only_the_latest() {
    let linter = Arc::new(Linter::new(Arc::new(
        Schema::embedded_default().expect("embedded schema"),
    )));
    let (executor, deliveries) =
        ValidationExecutor::new(ExecutorConfig::with_timeout(DEFAULT_TIMEOUT)).expect("executor");
    let seen = Arc::new(Mutex::new(Vec::new()));

    executor.submit_validation(
        "[node.a]\n".to_string(),
        linter_task(&linter, Duration::from_millis(200)),
        Collect {
            label: "first".into(),
            seen: seen.clone(),
        },
    );
    executor.submit_validation(
        "[attributes]\nini_version = 1.2.3\n[inputs]\n[outputs]\n".to_string(),
        linter_task(&linter, Duration::ZERO),
        Collect {
            label: "second".into(),
            seen: seen.clone(),
        },
    );

    for _ in 0..2 {
        assert!(deliveries.dispatch_next(Duration::from_secs(5)));
    }

    let seen = seen.lock().unwrap();
    let completed: Vec<_> = seen
        .iter()
        .filter(|s| matches!(s, Seen::Completed(..)))
        .collect();
    assert_eq!(completed, vec![&Seen::Completed("second".into(), 0)]);
    assert!(seen.contains(&Seen::Cancelled("first".into())));
}

#[test]
fn debounced_edits_validate_once() {
    let linter = Arc::new(Linter::new(Arc::new(
        Schema::embedded_default().expect("embedded schema"),
    )));
    let (executor, deliveries) =
        ValidationExecutor::new(ExecutorConfig::default()).expect("executor");
    let seen = Arc::new(Mutex::new(Vec::new()));

    for edit in 0..5 {
        executor.submit_validation_with_debounce(
            "[node.a]\n".repeat(edit + 1),
            linter_task(&linter, Duration::ZERO),
            Collect {
                label: format!("edit {edit}"),
                seen: seen.clone(),
            },
            Duration::from_millis(100),
        );
    }

    assert!(deliveries.dispatch_next(Duration::from_secs(5)));
    assert!(!deliveries.dispatch_next(Duration::from_millis(300)));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(matches!(&seen[0], Seen::Completed(label, _) if label == "edit 4"));
}

#[test]
fn dropping_the_executor_shuts_it_down() {
    let (executor, deliveries) =
        ValidationExecutor::new(ExecutorConfig::default()).expect("executor");
    let seen = Arc::new(Mutex::new(Vec::new()));

    executor.submit_validation(
        String::new(),
        |_: &str| -> anyhow::Result<ValidationResult> {
            thread::sleep(Duration::from_millis(100));
            Ok(ValidationResult::new())
        },
        Collect {
            label: "dropped".into(),
            seen: seen.clone(),
        },
    );
    drop(executor);

    // Whatever was queued before shutdown is still dispatchable
    deliveries.dispatch_pending();
    assert!(seen
        .lock()
        .unwrap()
        .iter()
        .all(|s| !matches!(s, Seen::Completed(..) | Seen::Failed(_))));
}

#[test]
fn deeply_nested_expression_completes_with_one_error() {
    let linter = Arc::new(Linter::new(Arc::new(
        Schema::embedded_default().expect("embedded schema"),
    )));
    let (executor, deliveries) =
        ValidationExecutor::new(ExecutorConfig::default()).expect("executor");
    let seen = Arc::new(Mutex::new(Vec::new()));

    let model = |observed: &str| format!("[node.g]\ntype = gauge\nloc = 1, 2\nobserved = {observed}\n");
    let depth = 10_000;
    let nested = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));

    for (label, observed) in [("plain", "1".to_string()), ("nested", nested)] {
        executor.submit_validation(
            model(&observed),
            linter_task(&linter, Duration::ZERO),
            Collect {
                label: label.into(),
                seen: seen.clone(),
            },
        );
        assert!(deliveries.dispatch_next(Duration::from_secs(5)));
    }

    let seen = seen.lock().unwrap();
    let (Seen::Completed(_, plain), Seen::Completed(_, nested)) = (&seen[0], &seen[1]) else {
        panic!("expected two completions, got {:?}", *seen);
    };
    assert_eq!(*nested, plain + 1);
}
