#![allow(
    clippy::arithmetic_side_effects,
    clippy::integer_division,
    reason = "region and chunk sizes are non-zero multiples of the word size"
)]

use std::fmt;
use std::hint::black_box;
use std::str::FromStr;
use std::time::Duration;

use rate_bench::{ConfigError, MAX_CHUNK_BYTES, RunReport, Task, TaskOps, ValidationFailure};
use tracing::debug;

use crate::{BenchCase, Error, Result};

/// The word every memory region is filled with before it is scanned, unless zero filling is
/// requested. A non-zero pattern keeps the kernel from benefiting from zero-page tricks.
pub const MAGIC: u64 = 8_675_728_858_075_378_228;

/// Regions and chunks are multiples of this many bytes.
pub const REGION_ALIGNMENT: usize = 256;

const WORD_BYTES: usize = size_of::<u64>();

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// A memory bandwidth payload.
///
/// Each worker scans its own region chunk by chunk. Every completed chunk counts as one
/// operation, which [`MemoryPlan::mib_per_second()`] converts into bandwidth.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum MemCase {
    /// Copies the first half of each chunk into the second half with a plain loop.
    Copy,

    /// Writes the fill word to every word of the chunk.
    Store,

    /// Reads every word of the chunk, folding them together.
    Load,

    /// Clears the chunk with the platform's optimized fill routine.
    Memset,

    /// Copies the first half of each chunk into the second half with the platform's optimized
    /// copy routine.
    Memcpy,
}

impl BenchCase for MemCase {
    const ALL: &'static [Self] = &[
        Self::Copy,
        Self::Store,
        Self::Load,
        Self::Memset,
        Self::Memcpy,
    ];

    const DEFAULT: &'static [Self] = Self::ALL;

    fn name(self) -> &'static str {
        match self {
            Self::Copy => "COPY",
            Self::Store => "STORE",
            Self::Load => "LOAD",
            Self::Memset => "MEMSET",
            Self::Memcpy => "MEMCPY",
        }
    }
}

impl MemCase {
    /// Executes the case on the workers of `plan` for `duration`.
    ///
    /// The rate of the returned report is in chunks per second; pass the report to
    /// [`MemoryPlan::mib_per_second()`] to obtain the bandwidth.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Run`] if the harness rejects the run parameters or cannot start the
    /// worker threads.
    pub fn run(self, plan: MemoryPlan, duration: Duration) -> Result<RunReport> {
        debug!(
            case = %self,
            workers = plan.workers,
            region_bytes = plan.region_bytes(),
            chunk_bytes = plan.chunk_bytes,
            ?duration,
            "running memory case"
        );

        Ok(rate_bench::run(
            &memory_task(),
            plan.workers,
            duration,
            MemoryConfig { case: self, plan },
        )?)
    }

    fn scan(self, chunk: &mut [u64], fill: u64) -> u64 {
        match self {
            Self::Copy => {
                let (source, target) = chunk.split_at_mut(chunk.len() / 2);

                for (to, from) in target.iter_mut().zip(source.iter()) {
                    *to = *from;
                }

                0
            }
            Self::Store => {
                for word in chunk.iter_mut() {
                    *word = fill;
                }

                0
            }
            Self::Load => chunk.iter().fold(0, |sum, word| sum ^ word),
            Self::Memset => {
                chunk.fill(0);
                0
            }
            Self::Memcpy => {
                let (source, target) = chunk.split_at_mut(chunk.len() / 2);
                target.copy_from_slice(source);
                0
            }
        }
    }

    /// The value every word of a region holds after a full pass.
    fn expected_word(self, fill: u64) -> u64 {
        match self {
            Self::Memset => 0,
            Self::Copy | Self::Store | Self::Load | Self::Memcpy => fill,
        }
    }
}

impl fmt::Display for MemCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MemCase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::find(s)
    }
}

/// How a memory budget is divided between workers and into chunks.
///
/// # Examples
///
/// ```
/// use bench_tasks::MemoryPlan;
///
/// let plan = MemoryPlan::new(1 << 30, 3, true).unwrap();
///
/// assert_eq!(plan.workers(), 3);
/// assert!(plan.chunk_bytes() <= rate_bench::MAX_CHUNK_BYTES);
/// assert!(plan.region_bytes() * 3 <= 1 << 30);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemoryPlan {
    workers: usize,
    chunk_bytes: usize,
    chunks_per_worker: usize,
    fill: u64,
}

impl MemoryPlan {
    /// Divides `total_bytes` evenly between `workers` regions, each split into equally sized
    /// chunks of at most [`MAX_CHUNK_BYTES`]. Regions are filled with [`MAGIC`] if
    /// `magic_fill` is set and with zero otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Run`] if `workers` is zero and [`Error::RegionTooSmall`] if a region
    /// would be smaller than [`REGION_ALIGNMENT`] bytes.
    pub fn new(total_bytes: usize, workers: usize, magic_fill: bool) -> Result<Self> {
        let Some(per_worker) = total_bytes.checked_div(workers) else {
            return Err(rate_bench::Error::from(ConfigError::ZeroWorkers).into());
        };

        let region_bytes = align_down(per_worker);

        if region_bytes == 0 {
            return Err(Error::RegionTooSmall {
                total_bytes,
                workers,
                min_region_bytes: REGION_ALIGNMENT,
            });
        }

        let chunks_per_worker = region_bytes.div_ceil(MAX_CHUNK_BYTES);

        let chunk_bytes = align_down(
            region_bytes
                .checked_div(chunks_per_worker)
                .expect("a non-empty region has at least one chunk"),
        );

        Ok(Self {
            workers,
            chunk_bytes,
            chunks_per_worker,
            fill: if magic_fill { MAGIC } else { 0 },
        })
    }

    /// The number of workers, each scanning a region of its own.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The bytes processed by one operation.
    #[must_use]
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    /// The number of chunks in each region.
    #[must_use]
    pub fn chunks_per_worker(&self) -> usize {
        self.chunks_per_worker
    }

    /// The bytes each worker allocates and scans.
    #[must_use]
    pub fn region_bytes(&self) -> usize {
        self.chunk_bytes
            .checked_mul(self.chunks_per_worker)
            .expect("the region was derived from a budget that fit in usize")
    }

    /// The word regions are filled with before scanning.
    #[must_use]
    pub fn fill(&self) -> u64 {
        self.fill
    }

    /// Converts the rate of a run executed with this plan into MiB per second.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "chunk sizes are far below the 2^52 bytes where f64 loses integer precision"
    )]
    pub fn mib_per_second(&self, report: &RunReport) -> f64 {
        report.rate() * self.chunk_bytes as f64 / BYTES_PER_MIB
    }
}

fn align_down(bytes: usize) -> usize {
    bytes & !(REGION_ALIGNMENT - 1)
}

#[derive(Debug)]
struct MemoryConfig {
    case: MemCase,
    plan: MemoryPlan,
}

#[derive(Debug)]
struct MemoryState {
    case: MemCase,
    fill: u64,
    region: Vec<u64>,
    chunk_words: usize,
    next_chunk: usize,
}

impl MemoryState {
    fn new(config: &MemoryConfig) -> Self {
        let words = config.plan.region_bytes() / WORD_BYTES;

        Self {
            case: config.case,
            fill: config.plan.fill,
            region: vec![config.plan.fill; words],
            chunk_words: config.plan.chunk_bytes / WORD_BYTES,
            next_chunk: 0,
        }
    }

    /// Scans the next chunk, wrapping around at the end of the region.
    fn scan_next(&mut self) -> u64 {
        let chunk = self
            .region
            .chunks_exact_mut(self.chunk_words)
            .nth(self.next_chunk)
            .expect("next_chunk always indexes a chunk inside the region");

        let folded = self.case.scan(chunk, self.fill);

        self.next_chunk += 1;

        if self.next_chunk == self.region.len() / self.chunk_words {
            self.next_chunk = 0;
        }

        folded
    }

    /// Scans the whole region once and checks that it holds what the case must leave behind.
    fn full_pass(&mut self) -> std::result::Result<(), ValidationFailure> {
        let mut folded = 0;

        for chunk in self.region.chunks_exact_mut(self.chunk_words) {
            folded ^= self.case.scan(chunk, self.fill);
        }

        // Chunks hold an even number of identical words, so the folded value cancels out.
        ValidationFailure::check_eq("folded region", 0, folded)?;

        let expected = self.case.expected_word(self.fill);

        match self.region.iter().position(|word| *word != expected) {
            None => Ok(()),
            Some(index) => Err(ValidationFailure::new(format!(
                "{} left word {index} of the region at {:#x} instead of {expected:#x}",
                self.case, self.region[index]
            ))),
        }
    }
}

fn memory_task() -> TaskOps<'static, MemoryConfig, MemoryState> {
    Task::with_config::<MemoryConfig>()
        .prepare(|args| MemoryState::new(args.config()))
        .warmup(MemoryState::full_pass)
        .run(|state| {
            black_box(state.scan_next());
            Ok(())
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    #[test]
    fn plan_splits_budget_evenly() {
        let plan = MemoryPlan::new(64 * MIB, 4, true).unwrap();

        assert_eq!(plan.workers(), 4);
        assert_eq!(plan.region_bytes(), 16 * MIB);
        assert_eq!(plan.chunks_per_worker(), 1);
        assert_eq!(plan.chunk_bytes(), 16 * MIB);
        assert_eq!(plan.fill(), MAGIC);
    }

    #[test]
    fn plan_chunks_large_regions() {
        let plan = MemoryPlan::new(8 * 1024 * MIB, 1, true).unwrap();

        assert_eq!(plan.chunks_per_worker(), 256);
        assert_eq!(plan.chunk_bytes(), MAX_CHUNK_BYTES);
        assert_eq!(plan.region_bytes(), 8 * 1024 * MIB);
    }

    #[test]
    fn plan_chunks_are_equal_and_aligned() {
        let plan = MemoryPlan::new(100 * MIB + 1000, 1, false).unwrap();

        assert_eq!(plan.chunks_per_worker(), 4);
        assert!(plan.chunk_bytes() <= MAX_CHUNK_BYTES);
        assert_eq!(plan.chunk_bytes() % REGION_ALIGNMENT, 0);
        assert!(plan.region_bytes() <= 100 * MIB + 1000);
        assert_eq!(plan.fill(), 0);
    }

    #[test]
    fn plan_rounds_regions_down_to_alignment() {
        let plan = MemoryPlan::new(3 * 1000, 3, true).unwrap();

        assert_eq!(plan.region_bytes(), 768);
    }

    #[test]
    fn plan_rejects_tiny_budget() {
        let result = MemoryPlan::new(1000, 8, true);

        assert!(matches!(
            result,
            Err(Error::RegionTooSmall {
                total_bytes: 1000,
                workers: 8,
                min_region_bytes: REGION_ALIGNMENT,
            })
        ));
    }

    #[test]
    fn plan_rejects_zero_workers() {
        let result = MemoryPlan::new(MIB, 0, true);

        assert!(matches!(
            result,
            Err(Error::Run(rate_bench::Error::Config(ConfigError::ZeroWorkers)))
        ));
    }

    fn state(case: MemCase, fill: u64) -> MemoryState {
        let plan = MemoryPlan::new(4 * REGION_ALIGNMENT, 1, true).unwrap();

        MemoryState {
            case,
            fill,
            region: vec![fill; plan.region_bytes() / WORD_BYTES],
            chunk_words: REGION_ALIGNMENT / WORD_BYTES,
            next_chunk: 0,
        }
    }

    #[test]
    fn full_pass_validates_every_case() {
        for case in MemCase::ALL {
            for fill in [MAGIC, 0] {
                let mut state = state(*case, fill);

                state.full_pass().unwrap();
            }
        }
    }

    #[test]
    fn full_pass_detects_corrupted_word() {
        let mut state = state(MemCase::Load, MAGIC);

        if let Some(word) = state.region.get_mut(5) {
            *word = 1;
        }

        let failure = state.full_pass().unwrap_err();

        assert!(failure.message().contains("folded region"), "{failure}");
    }

    #[test]
    fn memset_clears_region() {
        let mut state = state(MemCase::Memset, MAGIC);

        state.full_pass().unwrap();

        assert!(state.region.iter().all(|word| *word == 0));
    }

    #[test]
    fn scan_next_wraps_around() {
        let mut state = state(MemCase::Store, MAGIC);

        for expected_next in [1, 2, 3, 0, 1] {
            _ = state.scan_next();
            assert_eq!(state.next_chunk, expected_next);
        }
    }

    #[test]
    fn copy_moves_first_half_into_second() {
        let mut chunk = [1, 2, 3, 4, 0, 0, 0, 0];

        MemCase::Copy.scan(&mut chunk, MAGIC);
        assert_eq!(chunk, [1, 2, 3, 4, 1, 2, 3, 4]);

        let mut chunk = [5, 6, 0, 0];

        MemCase::Memcpy.scan(&mut chunk, MAGIC);
        assert_eq!(chunk, [5, 6, 5, 6]);
    }

    #[test]
    fn load_folds_words() {
        let mut chunk = [0b0011, 0b0101, 0b1000];

        assert_eq!(MemCase::Load.scan(&mut chunk, MAGIC), 0b1110);
    }

    #[cfg(not(miri))] // Real threads and sleeps make this impractical under Miri.
    #[test]
    fn every_case_reports_bandwidth() {
        let plan = MemoryPlan::new(8 * MIB, 2, true).unwrap();

        for case in MemCase::ALL {
            let report = case.run(plan, Duration::from_millis(50)).unwrap();

            assert_eq!(report.worker_count(), 2, "{case}");
            assert!(plan.mib_per_second(&report) >= 0.0, "{case}");
        }
    }
}
