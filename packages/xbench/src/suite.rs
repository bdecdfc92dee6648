use std::fmt;
use std::num::NonZero;
use std::time::Duration;

use bench_tasks::{BenchCase, CpuCase, HashCase, MemCase, MemoryPlan};
use new_zealand::nz;
use toml::{Table, Value};
use tracing::{debug, info};

use crate::{Error, Result, SystemInfo};

/// Thread counts every suite reports individually, besides "all".
pub const REPORTED_THREADS: [NonZero<usize>; 3] = [nz!(1), nz!(2), nz!(4)];

const DIGEST_CASES: &[HashCase] = &[
    HashCase::Sha1,
    HashCase::Sha256,
    HashCase::Sha512,
    HashCase::Md5,
    HashCase::Sm3,
];

const MEMORY_CASES: &[MemCase] = &[MemCase::Copy, MemCase::Load, MemCase::Store];

/// A group of payloads that is measured and scored as a unit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Suite {
    /// The default CPU cases.
    Cpu,

    /// The cryptographic digest cases.
    Digest,

    /// The `COPY`, `LOAD` and `STORE` memory cases.
    Memory,
}

impl Suite {
    /// Every suite, in report order.
    pub const ALL: &'static [Self] = &[Self::Cpu, Self::Digest, Self::Memory];

    /// The name of the suite in the report.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cputest",
            Self::Digest => "digest",
            Self::Memory => "memtest",
        }
    }

    /// The group the suite is listed under in the report.
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Cpu | Self::Digest => "cpu",
            Self::Memory => "mem",
        }
    }

    /// Scales the weighted average rate of the suite into its score, bringing the scores of
    /// the different suites into a similar range.
    #[must_use]
    pub fn score_factor(self) -> f64 {
        match self {
            Self::Cpu => 4.0,
            Self::Digest => 0.003,
            Self::Memory => 0.052,
        }
    }

    /// The names of the cases of the suite, in measurement order.
    #[must_use]
    pub fn subtests(self) -> Vec<&'static str> {
        match self {
            Self::Cpu => names(CpuCase::DEFAULT),
            Self::Digest => names(DIGEST_CASES),
            Self::Memory => names(MEMORY_CASES),
        }
    }

    /// Measures every case of the suite on `threads` workers, returning one rate per entry of
    /// [`subtests()`](Self::subtests).
    ///
    /// Memory rates are in MiB/s over a total of `memory_gib` GiB shared by the workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemoryBudget`] if the memory budget does not fit in the address space
    /// and [`Error::Bench`] if a case cannot be executed.
    pub fn measure(
        self,
        threads: NonZero<usize>,
        duration: Duration,
        memory_gib: NonZero<usize>,
    ) -> Result<Vec<f64>> {
        debug!(suite = %self, threads = threads.get(), ?duration, "measuring suite");

        let workers = threads.get();

        match self {
            Self::Cpu => CpuCase::DEFAULT
                .iter()
                .map(|case| Ok(case.run(workers, duration)?.rate()))
                .collect(),
            Self::Digest => DIGEST_CASES
                .iter()
                .map(|case| Ok(case.run(workers, duration)?.rate()))
                .collect(),
            Self::Memory => {
                let plan = MemoryPlan::new(gib_to_bytes(memory_gib)?, workers, true)?;

                MEMORY_CASES
                    .iter()
                    .map(|case| {
                        let report = case.run(plan, duration)?;
                        Ok(plan.mib_per_second(&report))
                    })
                    .collect()
            }
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn names<C: BenchCase>(cases: &[C]) -> Vec<&'static str> {
    cases.iter().map(|case| case.name()).collect()
}

/// Converts a memory budget in GiB to bytes.
///
/// # Errors
///
/// Returns [`Error::MemoryBudget`] if the result does not fit in `usize`.
pub fn gib_to_bytes(gib: NonZero<usize>) -> Result<usize> {
    gib.get()
        .checked_mul(1024 * 1024 * 1024)
        .ok_or(Error::MemoryBudget { gib: gib.get() })
}

/// The thread counts a suite is measured with on a machine with `cpus` processors: 1, 2 and 4
/// plus all and half of the processors, without duplicates, in ascending order.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// let counts = xbench::thread_counts(NonZero::new(12).unwrap());
/// let counts = counts.iter().map(|n| n.get()).collect::<Vec<_>>();
///
/// assert_eq!(counts, [1, 2, 4, 6, 12]);
/// ```
#[must_use]
pub fn thread_counts(cpus: NonZero<usize>) -> Vec<NonZero<usize>> {
    let mut counts = REPORTED_THREADS.to_vec();

    counts.push(cpus);
    counts.extend(half_of(cpus));

    counts.sort_unstable();
    counts.dedup();
    counts
}

fn half_of(cpus: NonZero<usize>) -> Option<NonZero<usize>> {
    #[expect(clippy::integer_division, reason = "odd counts round down")]
    let half = cpus.get() / 2;

    NonZero::new(half)
}

/// The thread count a value of the report was measured with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Threads {
    /// Exactly this many threads.
    Count(NonZero<usize>),

    /// The better of half and all of the processors.
    All,
}

impl Threads {
    /// The contribution of values measured with this thread count to the score.
    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            Self::Count(n) => match n.get() {
                1 => 4.0,
                2 => 3.0,
                _ => 2.0,
            },
            Self::All => 2.0,
        }
    }

    fn to_value(self) -> Value {
        match self {
            Self::Count(n) => Value::Integer(i64::try_from(n.get()).unwrap_or(i64::MAX)),
            Self::All => Value::from("all"),
        }
    }
}

impl fmt::Display for Threads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// The rates of every case of a suite, measured with one thread count.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreadRates {
    threads: NonZero<usize>,
    rates: Vec<f64>,
}

impl ThreadRates {
    /// Rates measured with `threads` workers, one per subtest of the suite.
    #[must_use]
    pub fn new(threads: NonZero<usize>, rates: Vec<f64>) -> Self {
        Self { threads, rates }
    }
}

/// The reported values of one case of a suite.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtestResult {
    name: &'static str,
    values: Vec<(Threads, f64)>,
}

impl SubtestResult {
    /// The case name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The reported values, ordered by thread count with "all" last.
    #[must_use]
    pub fn values(&self) -> &[(Threads, f64)] {
        &self.values
    }

    /// The thread-weighted average of the values.
    #[must_use]
    pub fn weighted_average(&self) -> f64 {
        let (sum, weights) = self
            .values
            .iter()
            .fold((0.0, 0.0), |(sum, weights), (threads, value)| {
                (sum + value * threads.weight(), weights + threads.weight())
            });

        if weights > 0.0 { sum / weights } else { 0.0 }
    }

    fn to_table(&self) -> Table {
        let values = self
            .values
            .iter()
            .map(|(threads, value)| {
                let mut entry = Table::new();
                entry.insert("thread".to_string(), threads.to_value());
                entry.insert("value".to_string(), Value::Float(*value));
                Value::Table(entry)
            })
            .collect();

        let mut table = Table::new();
        table.insert("name".to_string(), Value::from(self.name));
        table.insert("values".to_string(), Value::Array(values));
        table
    }
}

/// Reorganizes per-thread-count measurements into per-case values.
///
/// Each case reports the values measured with 1, 2 and 4 threads, as far as they were measured,
/// followed by an "all" value: the better of the rates with half and with all of the `cpus`
/// processors.
#[must_use]
pub fn convert(
    measurements: &[ThreadRates],
    subtests: &[&'static str],
    cpus: NonZero<usize>,
) -> Vec<SubtestResult> {
    let half = half_of(cpus);

    subtests
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let rate_with = |threads: NonZero<usize>| {
                measurements
                    .iter()
                    .find(|m| m.threads == threads)
                    .and_then(|m| m.rates.get(index).copied())
            };

            let mut values = REPORTED_THREADS
                .iter()
                .filter_map(|threads| Some((Threads::Count(*threads), rate_with(*threads)?)))
                .collect::<Vec<_>>();

            let all = match (half.and_then(rate_with), rate_with(cpus)) {
                (Some(half), Some(all)) => Some(half.max(all)),
                (half, all) => all.or(half),
            };

            values.extend(all.map(|value| (Threads::All, value)));

            SubtestResult { name, values }
        })
        .collect()
}

/// The outcome of measuring one suite.
#[derive(Clone, Debug, PartialEq)]
pub struct SuiteResult {
    suite: Suite,
    score: i64,
    subtests: Vec<SubtestResult>,
}

impl SuiteResult {
    /// Scores the converted results of `suite`: the average over all cases of their
    /// thread-weighted averages, multiplied by the score factor of the suite and rounded.
    #[must_use]
    pub fn new(suite: Suite, subtests: Vec<SubtestResult>) -> Self {
        let average = if subtests.is_empty() {
            0.0
        } else {
            subtests
                .iter()
                .map(SubtestResult::weighted_average)
                .sum::<f64>()
                / f64::from(u32::try_from(subtests.len()).unwrap_or(u32::MAX))
        };

        #[expect(
            clippy::cast_possible_truncation,
            reason = "scores are far below the i64 range"
        )]
        let score = (average * suite.score_factor()).round() as i64;

        Self {
            suite,
            score,
            subtests,
        }
    }

    /// The suite that was measured.
    #[must_use]
    pub fn suite(&self) -> Suite {
        self.suite
    }

    /// The score of the suite.
    #[must_use]
    pub fn score(&self) -> i64 {
        self.score
    }

    /// The per-case values the score was computed from.
    #[must_use]
    pub fn subtests(&self) -> &[SubtestResult] {
        &self.subtests
    }

    fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.insert("name".to_string(), Value::from(self.suite.name()));
        table.insert("score".to_string(), Value::Integer(self.score));
        table.insert(
            "subtests".to_string(),
            Value::Array(
                self.subtests
                    .iter()
                    .map(|subtest| Value::Table(subtest.to_table()))
                    .collect(),
            ),
        );
        table
    }
}

/// Measures `suite` with each of `thread_counts` and scores the results for a machine with
/// `cpus` processors.
///
/// `measure` executes the suite with the given number of threads and returns one rate per
/// subtest.
///
/// # Errors
///
/// Returns the first error `measure` returns.
pub fn run_suite<M>(
    suite: Suite,
    thread_counts: &[NonZero<usize>],
    cpus: NonZero<usize>,
    mut measure: M,
) -> Result<SuiteResult>
where
    M: FnMut(NonZero<usize>) -> Result<Vec<f64>>,
{
    let measurements = thread_counts
        .iter()
        .map(|threads| Ok(ThreadRates::new(*threads, measure(*threads)?)))
        .collect::<Result<Vec<_>>>()?;

    let result = SuiteResult::new(suite, convert(&measurements, &suite.subtests(), cpus));

    info!(%suite, score = result.score, "suite complete");

    Ok(result)
}

/// The complete output of the suite runner.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    system: SystemInfo,
    results: Vec<SuiteResult>,
}

impl Report {
    /// Combines the machine description with the results of the suites that were measured.
    #[must_use]
    pub fn new(system: SystemInfo, results: Vec<SuiteResult>) -> Self {
        Self { system, results }
    }

    /// The report as a TOML document: a `system` table followed by an `all_tests` array with
    /// one entry per suite group, each listing the results of its suites.
    #[must_use]
    pub fn to_toml(&self) -> Table {
        let groups = ["cpu", "mem"]
            .into_iter()
            .map(|kind| {
                let tests = self
                    .results
                    .iter()
                    .filter(|result| result.suite.kind() == kind)
                    .map(|result| Value::Table(result.to_table()))
                    .collect();

                let mut group = Table::new();
                group.insert("type".to_string(), Value::from(kind));
                group.insert("tests".to_string(), Value::Array(tests));
                Value::Table(group)
            })
            .collect();

        let mut document = Table::new();
        document.insert("system".to_string(), Value::Table(self.system.to_table()));
        document.insert("all_tests".to_string(), Value::Array(groups));
        document
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_toml())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp, reason = "test values are exactly representable")]
    #![allow(clippy::indexing_slicing, reason = "test code with known bounds")]

    use super::*;

    fn counts(values: &[usize]) -> Vec<NonZero<usize>> {
        values.iter().filter_map(|n| NonZero::new(*n)).collect()
    }

    fn raw(counts: &[NonZero<usize>]) -> Vec<usize> {
        counts.iter().map(|n| n.get()).collect()
    }

    #[test]
    fn thread_counts_for_various_machines() {
        assert_eq!(raw(&thread_counts(nz!(1))), [1, 2, 4]);
        assert_eq!(raw(&thread_counts(nz!(2))), [1, 2, 4]);
        assert_eq!(raw(&thread_counts(nz!(3))), [1, 2, 3, 4]);
        assert_eq!(raw(&thread_counts(nz!(8))), [1, 2, 4, 8]);
        assert_eq!(raw(&thread_counts(nz!(64))), [1, 2, 4, 32, 64]);
    }

    #[test]
    fn thread_weights() {
        assert_eq!(Threads::Count(nz!(1)).weight(), 4.0);
        assert_eq!(Threads::Count(nz!(2)).weight(), 3.0);
        assert_eq!(Threads::Count(nz!(4)).weight(), 2.0);
        assert_eq!(Threads::All.weight(), 2.0);
        assert_eq!(Threads::All.to_string(), "all");
        assert_eq!(Threads::Count(nz!(4)).to_string(), "4");
    }

    #[test]
    fn subtests_of_each_suite() {
        assert_eq!(Suite::Cpu.subtests().len(), 8);
        assert_eq!(
            Suite::Digest.subtests(),
            ["SHA1-8K", "SHA256-8K", "SHA512-8K", "MD5-8K", "SM3-8K"]
        );
        assert_eq!(Suite::Memory.subtests(), ["COPY", "LOAD", "STORE"]);
        assert_eq!(Suite::Memory.kind(), "mem");
        assert_eq!(Suite::Digest.kind(), "cpu");
    }

    #[test]
    fn convert_picks_best_of_half_and_all() {
        let measurements = [
            ThreadRates::new(nz!(1), vec![10.0, 1.0]),
            ThreadRates::new(nz!(2), vec![20.0, 2.0]),
            ThreadRates::new(nz!(4), vec![40.0, 4.0]),
            ThreadRates::new(nz!(8), vec![90.0, 5.0]),
            ThreadRates::new(nz!(16), vec![80.0, 6.0]),
        ];

        let result = convert(&measurements, &["A", "B"], nz!(16));

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name(), "A");
        assert_eq!(
            result[0].values(),
            [
                (Threads::Count(nz!(1)), 10.0),
                (Threads::Count(nz!(2)), 20.0),
                (Threads::Count(nz!(4)), 40.0),
                (Threads::All, 90.0),
            ]
        );
        assert_eq!(result[1].values().last(), Some(&(Threads::All, 6.0)));
    }

    #[test]
    fn convert_on_single_processor_uses_all_only() {
        let measurements = [
            ThreadRates::new(nz!(1), vec![10.0]),
            ThreadRates::new(nz!(2), vec![9.0]),
            ThreadRates::new(nz!(4), vec![8.0]),
        ];

        let result = convert(&measurements, &["A"], nz!(1));

        assert_eq!(result[0].values().len(), 4);
        assert_eq!(result[0].values()[3], (Threads::All, 10.0));
    }

    #[test]
    fn weighted_average_of_subtest() {
        let subtest = SubtestResult {
            name: "A",
            values: vec![
                (Threads::Count(nz!(1)), 10.0),
                (Threads::Count(nz!(2)), 20.0),
                (Threads::Count(nz!(4)), 40.0),
                (Threads::All, 80.0),
            ],
        };

        // (40 + 60 + 80 + 160) / 11
        assert_eq!(subtest.weighted_average(), 340.0 / 11.0);
    }

    #[test]
    fn score_is_scaled_and_rounded() {
        let subtests = vec![
            SubtestResult {
                name: "A",
                values: vec![(Threads::Count(nz!(1)), 100.0)],
            },
            SubtestResult {
                name: "B",
                values: vec![(Threads::Count(nz!(1)), 300.0)],
            },
        ];

        // Average 200, factor 4.
        assert_eq!(SuiteResult::new(Suite::Cpu, subtests.clone()).score(), 800);

        // Average 200, factor 0.052 gives 10.4.
        assert_eq!(SuiteResult::new(Suite::Memory, subtests).score(), 10);
    }

    #[test]
    fn empty_suite_scores_zero() {
        assert_eq!(SuiteResult::new(Suite::Digest, Vec::new()).score(), 0);
    }

    #[test]
    fn run_suite_measures_every_thread_count_once() {
        let mut seen = Vec::new();
        let thread_counts = counts(&[1, 2, 4]);

        let result = run_suite(Suite::Memory, &thread_counts, nz!(4), |threads| {
            seen.push(threads.get());
            let rate = f64::from(u32::try_from(threads.get()).unwrap());
            Ok(vec![rate, rate, rate])
        })
        .unwrap();

        assert_eq!(seen, [1, 2, 4]);
        assert_eq!(result.suite(), Suite::Memory);
        assert_eq!(result.subtests().len(), 3);
        assert_eq!(result.subtests()[0].values().last(), Some(&(Threads::All, 4.0)));
    }

    #[test]
    fn run_suite_propagates_errors() {
        let result = run_suite(Suite::Cpu, &counts(&[1, 2]), nz!(2), |threads| {
            if threads.get() == 2 {
                Err(Error::MemoryBudget { gib: 1 })
            } else {
                Ok(vec![1.0; 8])
            }
        });

        assert!(matches!(result, Err(Error::MemoryBudget { gib: 1 })));
    }

    #[test]
    fn gib_conversion() {
        assert_eq!(gib_to_bytes(nz!(2)).unwrap(), 2 << 30);
        assert!(matches!(
            gib_to_bytes(NonZero::<usize>::MAX),
            Err(Error::MemoryBudget { .. })
        ));
    }

    #[test]
    fn report_groups_suites_by_kind() {
        let system = SystemInfo::from_sources(None, None, Some("6.1"), nz!(4));

        let results = vec![
            SuiteResult::new(Suite::Cpu, Vec::new()),
            SuiteResult::new(Suite::Memory, Vec::new()),
            SuiteResult::new(Suite::Digest, Vec::new()),
        ];

        let document = Report::new(system, results).to_toml();

        let Some(Value::Array(groups)) = document.get("all_tests") else {
            panic!("all_tests missing: {document}");
        };

        let names = |group: &Value| {
            group["tests"]
                .as_array()
                .unwrap()
                .iter()
                .map(|test| test["name"].as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["type"].as_str(), Some("cpu"));
        assert_eq!(names(&groups[0]), ["cputest", "digest"]);
        assert_eq!(groups[1]["type"].as_str(), Some("mem"));
        assert_eq!(names(&groups[1]), ["memtest"]);
    }

    #[test]
    fn report_renders_as_toml() {
        let system = SystemInfo::from_sources(None, None, Some("6.1"), nz!(4));
        let subtests = convert(
            &[ThreadRates::new(nz!(1), vec![1.5, 2.5, 3.5])],
            &Suite::Memory.subtests(),
            nz!(1),
        );

        let rendered = Report::new(system, vec![SuiteResult::new(Suite::Memory, subtests)])
            .to_string();

        assert!(rendered.contains("kernel = \"6.1\""), "{rendered}");
        assert!(rendered.contains("name = \"memtest\""), "{rendered}");
        assert!(rendered.contains("thread = \"all\""), "{rendered}");
        assert!(rendered.contains("value = 1.5"), "{rendered}");
    }

    #[cfg(not(miri))] // Real threads and sleeps make this impractical under Miri.
    #[test]
    fn digest_suite_measures_on_real_threads() {
        let rates = Suite::Digest
            .measure(nz!(1), Duration::from_millis(20), nz!(1))
            .unwrap();

        assert_eq!(rates.len(), Suite::Digest.subtests().len());
        assert!(rates.iter().all(|rate| *rate >= 0.0));
    }
}
