// Deadline enforcement and isolation between concurrent invocations

use std::thread;
use std::time::{Duration, Instant};

use snipbox::output;
use snipbox::{DiagnosticKind, Engine, EngineConfig, ExecutionOutcome, OutcomeKind};

fn timed(code: &str, timeout: Duration) -> (ExecutionOutcome, Duration) {
    let started = Instant::now();
    let outcome = Engine::default().run_with_timeout(code, timeout);
    (outcome, started.elapsed())
}

fn assert_timeout(outcome: &ExecutionOutcome) -> usize {
    match outcome {
        ExecutionOutcome::Error(diagnostic) => {
            assert_eq!(diagnostic.kind, DiagnosticKind::Timeout, "{}", diagnostic.report);
            assert_eq!(diagnostic.exception, "TimeoutError");
            diagnostic.line.unwrap_or(0)
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
}

#[test]
fn test_infinite_loop_times_out() {
    let started = Instant::now();
    let outcome = snipbox::run("while True: pass", 1.0);
    let elapsed = started.elapsed();

    assert_eq!(assert_timeout(&outcome), 1);
    assert!(elapsed >= Duration::from_millis(900), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "returned after {:?}", elapsed);
    assert!(outcome.text().contains("deadline"));
}

#[test]
fn test_timeout_names_the_running_line() {
    let code = "n = 0\ndef spin():\n    global n\n    while True:\n        n += 1\nspin()";
    let (outcome, elapsed) = timed(code, Duration::from_millis(300));
    let line = assert_timeout(&outcome);
    assert!(line == 4 || line == 5, "attributed to line {}", line);
    assert!(elapsed < Duration::from_secs(2));

    let report = &outcome.diagnostic().unwrap().report;
    assert!(report.contains("line 6, in <module>"));
    assert!(report.contains("in spin"));
}

#[test]
fn test_sleep_is_interrupted() {
    let (outcome, elapsed) = timed("import time\ntime.sleep(30)", Duration::from_millis(300));
    assert_eq!(assert_timeout(&outcome), 2);
    assert!(elapsed < Duration::from_secs(2), "returned after {:?}", elapsed);
}

#[test]
fn test_short_sleep_completes() {
    let (outcome, _) = timed("import time\ntime.sleep(0.05)\n'done'", Duration::from_secs(2));
    assert_eq!(outcome.text(), "'done'");
}

#[test]
fn test_timeout_cannot_be_caught() {
    let code = "\
try:
    while True:
        pass
except Exception:
    print('caught')
finally:
    print('cleanup')";
    let (outcome, _) = timed(code, Duration::from_millis(200));
    assert_timeout(&outcome);
    assert!(!outcome.text().contains("caught"));
}

#[test]
fn test_partial_output_is_discarded_on_timeout() {
    let (outcome, _) = timed("print('started')\nwhile True:\n    pass", Duration::from_millis(200));
    assert_timeout(&outcome);
    assert!(!outcome.text().contains("started"));
    assert!(output::is_process_stdout());
}

#[test]
fn test_partial_output_kept_on_timeout_when_configured() {
    let engine = Engine::new(
        EngineConfig::builder()
            .timeout(Duration::from_millis(200))
            .keep_partial_output(true)
            .build(),
    );
    let outcome = engine.run("print('started')\nwhile True:\n    pass");
    let diagnostic = outcome.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, DiagnosticKind::Timeout);
    assert_eq!(diagnostic.partial_output.as_deref(), Some("started\n"));
}

#[test]
fn test_zero_timeout_means_no_deadline() {
    let outcome = snipbox::run("total = 0\nfor i in range(20000):\n    total += i\ntotal", 0.0);
    assert_eq!(outcome.text(), "199990000");
}

#[test]
fn test_fast_snippet_returns_before_deadline() {
    let (outcome, elapsed) = timed("sum(range(1000))", Duration::from_secs(5));
    assert_eq!(outcome.text(), "499500");
    assert!(elapsed < Duration::from_secs(1));
}

#[test]
fn test_engine_recovers_after_timeout() {
    let engine = Engine::new(EngineConfig::builder().timeout(Duration::from_millis(200)).build());
    assert_eq!(engine.run("while True:\n    pass").kind(), OutcomeKind::Error);
    assert_eq!(engine.run("print('next')").text(), "next");
}

#[test]
fn test_concurrent_invocations_are_isolated() {
    let engine = Engine::new(EngineConfig::builder().timeout(Duration::from_secs(5)).build());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                let code = format!("for _ in range(50):\n    print('worker {}')", i);
                let outcome = engine.run(&code);
                (i, outcome.kind(), outcome.text())
            })
        })
        .collect();

    for handle in handles {
        let (i, kind, text) = handle.join().unwrap();
        assert_eq!(kind, OutcomeKind::Output);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 50);
        let expected = format!("worker {}", i);
        assert!(lines.iter().all(|line| *line == expected), "worker {} saw foreign output", i);
    }
}

#[test]
fn test_timeout_in_one_thread_does_not_affect_another() {
    let engine = Engine::default();

    let slow = {
        let engine = engine.clone();
        thread::spawn(move || {
            engine
                .run_with_timeout("while True:\n    pass", Duration::from_millis(300))
                .kind()
        })
    };
    let fast = {
        let engine = engine.clone();
        thread::spawn(move || {
            engine
                .run("import time\ntime.sleep(0.5)\n'survived'")
                .text()
        })
    };

    assert_eq!(slow.join().unwrap(), OutcomeKind::Error);
    assert_eq!(fast.join().unwrap(), "'survived'");
}

#[test]
fn test_max_over_huge_range_runs_into_the_deadline() {
    for code in ["max(range(10 ** 12))", "sum(range(10 ** 12))", "all(range(1, 10 ** 12))"] {
        let (outcome, elapsed) = timed(code, Duration::from_millis(300));
        assert_timeout(&outcome);
        assert!(elapsed < Duration::from_secs(2), "{} returned after {:?}", code, elapsed);
    }
}
