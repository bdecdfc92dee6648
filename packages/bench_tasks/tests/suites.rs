//! Exercises the payload suites the way a driver program does: resolve case names, run each
//! case briefly and convert the results into the units that are reported.
#![cfg(not(miri))]

use std::time::Duration;

use bench_tasks::{BenchCase, CpuCase, Error, HashCase, MemCase, MemoryPlan};

const SHORT: Duration = Duration::from_millis(30);

#[test]
fn cpu_cases_selected_by_name() {
    let cases = CpuCase::select(&["prime", "Circle", "FPMAT-CONV"]).unwrap();

    for case in cases {
        let report = case.run(2, SHORT).unwrap();

        assert_eq!(report.worker_count(), 2, "{case}");
        assert_eq!(
            report.worker_ops().iter().sum::<u64>(),
            report.total_ops(),
            "{case}"
        );
    }
}

#[test]
fn unknown_case_rejected_before_running() {
    let result = HashCase::select(&["SHA256-8K", "WHIRLPOOL"]);

    assert!(matches!(result, Err(Error::UnknownCase { name }) if name == "WHIRLPOOL"));
}

#[test]
fn memory_rate_converts_to_bandwidth() {
    let plan = MemoryPlan::new(4 * 1024 * 1024, 2, true).unwrap();

    let report = MemCase::Store.run(plan, SHORT).unwrap();

    let mib_per_second = plan.mib_per_second(&report);
    let chunk_mib = plan.chunk_bytes() as f64 / (1024.0 * 1024.0);

    assert!((mib_per_second - report.rate() * chunk_mib).abs() < 1e-6 * mib_per_second.max(1.0));
}

#[test]
fn zero_filled_memory_runs() {
    let plan = MemoryPlan::new(1024 * 1024, 1, false).unwrap();

    for case in MemCase::DEFAULT {
        let report = case.run(plan, SHORT).unwrap();

        assert_eq!(report.worker_count(), 1, "{case}");
    }
}

#[test]
fn standalone_prime_runs() {
    let task = bench_tasks::standalone_prime_task();

    let report = rate_bench::run(&task, 2, SHORT, ()).unwrap();

    assert_eq!(report.worker_count(), 2);
}
