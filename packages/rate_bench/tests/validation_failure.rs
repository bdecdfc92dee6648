//! A task that detects a wrong result must take the whole process down without producing a
//! rate. Aborting cannot be observed from inside the test process, so each scenario re-executes
//! this test binary, running only the matching child test, and inspects how the child exited.
#![cfg(not(miri))]

use std::env;
use std::process::{Command, Output};
use std::sync::atomic::{self, AtomicU64};
use std::time::Duration;

use rate_bench::{Task, TaskOps, ValidationFailure};

const CHILD_ENV: &str = "RATE_BENCH_VALIDATION_CHILD";
const RATE_MARKER: &str = "measured rate:";

fn prime_count(limit: u32) -> u32 {
    let mut count = 0;

    for candidate in 2..=limit {
        if (2..candidate)
            .take_while(|divisor| divisor * divisor <= candidate)
            .all(|divisor| candidate % divisor != 0)
        {
            count += 1;
        }
    }

    count
}

fn run_child(test_name: &str) -> Output {
    let exe = env::current_exe().expect("test binary path must be known to re-execute it");

    Command::new(exe)
        .args(["--exact", test_name, "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .output()
        .expect("re-executing the test binary must succeed")
}

fn is_child() -> bool {
    env::var_os(CHILD_ENV).is_some()
}

fn assert_aborted_without_rate(output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success(), "child exited successfully: {stdout}");
    assert!(!stdout.contains(RATE_MARKER), "child reported a rate: {stdout}");
}

fn run_and_print(task: &TaskOps<'_, (), ()>, workers: usize) {
    let report = rate_bench::run(task, workers, Duration::from_millis(200), ())
        .expect("the configuration is valid");

    println!("{RATE_MARKER} {:.2}", report.rate());
}

#[test]
fn wrong_warmup_result_aborts_process() {
    let output = run_child("child_wrong_warmup_result");

    assert_aborted_without_rate(&output);
}

#[test]
fn wrong_result_after_measurement_started_aborts_process() {
    let output = run_child("child_wrong_result_during_run");

    assert_aborted_without_rate(&output);
}

#[test]
fn wrong_result_on_one_of_four_workers_aborts_process() {
    let output = run_child("child_wrong_result_on_four_workers");

    assert_aborted_without_rate(&output);
}

#[test]
fn panicking_hook_aborts_process() {
    let output = run_child("child_panicking_run");

    assert_aborted_without_rate(&output);
}

#[test]
fn correct_task_reports_rate() {
    let output = run_child("child_correct_task");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "child failed: {stdout}");
    assert!(stdout.contains(RATE_MARKER), "child reported no rate: {stdout}");
}

#[test]
fn child_wrong_warmup_result() {
    if !is_child() {
        return;
    }

    // There are 25 primes below 100, not 26.
    let task = Task::new()
        .run_with_warmup(|()| {
            ValidationFailure::check_eq("prime_count(100)", 26, prime_count(100))
        })
        .build();

    run_and_print(&task, 2);
}

#[test]
fn child_wrong_result_during_run() {
    if !is_child() {
        return;
    }

    let invocations = AtomicU64::new(0);

    let task = Task::new()
        .warmup(|()| ValidationFailure::check_eq("prime_count(100)", 25, prime_count(100)))
        .run(|()| {
            // Simulates a result that goes bad after a while, e.g. due to faulty hardware.
            let limit = if invocations.fetch_add(1, atomic::Ordering::Relaxed) < 10 {
                100
            } else {
                101
            };

            ValidationFailure::check_eq("prime_count(100)", 25, prime_count(limit))
        })
        .build();

    run_and_print(&task, 2);
}

#[test]
fn child_panicking_run() {
    if !is_child() {
        return;
    }

    let task = Task::new()
        .run(|()| panic!("the task encountered an impossible state"))
        .build();

    run_and_print(&task, 2);
}

#[test]
fn child_correct_task() {
    if !is_child() {
        return;
    }

    let task = Task::new()
        .run_with_warmup(|()| {
            ValidationFailure::check_eq("prime_count(100)", 25, prime_count(100))
        })
        .build();

    run_and_print(&task, 2);
}

#[test]
fn child_wrong_result_on_four_workers() {
    if !is_child() {
        return;
    }

    let invocations = AtomicU64::new(0);

    let task = Task::new()
        .warmup(|()| {
            ValidationFailure::check_eq("prime_count(100000)", 9592, prime_count(100_000))
        })
        .run(|()| {
            // 99 991 is prime, so stopping just short of it loses one prime.
            let limit = if invocations.fetch_add(1, atomic::Ordering::Relaxed) < 20 {
                100_000
            } else {
                99_990
            };

            ValidationFailure::check_eq("prime_count(100000)", 9592, prime_count(limit))
        })
        .build();

    run_and_print(&task, 4);
}
