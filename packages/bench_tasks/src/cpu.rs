use std::fmt;
use std::hint::black_box;
use std::str::FromStr;
use std::time::Duration;

use rate_bench::{RunReport, Task, TaskOps, ValidationFailure};
use tracing::debug;

use crate::{
    BenchCase, Error, Matrix, MatrixOp, Result, Shape, XORSHIFT_SEED, fib_value, prime_count,
    render_circle, xorshift_next, xorshift_nstep,
};

const PRIME_LIMIT: u32 = 29_000;
const PRIME_COUNT: u32 = 3_153;

/// Upper bound of the prime counting performed by [`standalone_prime_task()`].
pub const STANDALONE_PRIME_LIMIT: u32 = 100_000;

/// The number of primes up to [`STANDALONE_PRIME_LIMIT`].
pub const STANDALONE_PRIME_COUNT: u32 = 9_592;

const FIB_INDEX: u64 = 1_650_000;
const FIB_VALUE: u64 = 17_024_848_350_435_039_168;

const XORSHIFT_STEPS: u64 = 700_000;
const XORSHIFT_RESULT: u64 = 7_971_562_545_477_045_910;

const SORT_ELEMENTS: usize = 14 * 1024;

const CIRCLE_WIDTH: u32 = 250;
const CIRCLE_HEIGHT: u32 = 180;
const CIRCLE_RADIUS: u32 = 100;
const CIRCLE_CENTER: (u32, u32) = (CIRCLE_WIDTH / 2, CIRCLE_HEIGHT / 2);

/// A CPU-bound payload.
///
/// Every case keeps its working set small enough to stay in the per-core caches, so the rate
/// reflects the execution resources of the cores rather than the memory subsystem.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CpuCase {
    /// Counts the primes up to 29 000 by trial division. Integer division heavy.
    Prime,

    /// Computes the 1 650 000th Fibonacci number modulo 2^64. A dependency chain of additions.
    Fib,

    /// Advances a xorshift generator 700 000 steps. A dependency chain of shifts and XORs.
    Xorshift,

    /// Sorts 14 336 pseudo-random `i32` values.
    SortI32,

    /// Sorts 14 336 pseudo-random `u64` values.
    SortU64,

    /// Renders a shaded circle into a 250x180 pixel buffer. Mixes integer and `f32` math.
    Circle,

    /// Multiplies a 125x80 matrix with an 80x125 matrix.
    FpmatMul,

    /// Convolves a 90x60 matrix with an 11x13 kernel.
    FpmatConv,

    /// Adds two 2000x2000 matrices. Mostly measures memory bandwidth, so it is not part of
    /// the default selection.
    FpmatAdd,
}

impl BenchCase for CpuCase {
    const ALL: &'static [Self] = &[
        Self::Prime,
        Self::Fib,
        Self::Xorshift,
        Self::SortI32,
        Self::SortU64,
        Self::Circle,
        Self::FpmatMul,
        Self::FpmatConv,
        Self::FpmatAdd,
    ];

    const DEFAULT: &'static [Self] = &[
        Self::Prime,
        Self::Fib,
        Self::Xorshift,
        Self::SortI32,
        Self::SortU64,
        Self::Circle,
        Self::FpmatMul,
        Self::FpmatConv,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Prime => "PRIME",
            Self::Fib => "FIB",
            Self::Xorshift => "XORSHIFT",
            Self::SortI32 => "SORT-I32",
            Self::SortU64 => "SORT-U64",
            Self::Circle => "CIRCLE",
            Self::FpmatMul => "FPMAT-MUL",
            Self::FpmatConv => "FPMAT-CONV",
            Self::FpmatAdd => "FPMAT-ADD",
        }
    }
}

impl CpuCase {
    /// Executes the case on `workers` threads for `duration`.
    ///
    /// The rate of the returned report is in completed payload invocations per second.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Run`] if the harness rejects the run parameters or cannot start the
    /// worker threads.
    pub fn run(self, workers: usize, duration: Duration) -> Result<RunReport> {
        debug!(case = %self, workers, ?duration, "running CPU case");

        let report = match self {
            Self::Prime => rate_bench::run(
                &prime_task(PRIME_LIMIT, PRIME_COUNT),
                workers,
                duration,
                (),
            )?,
            Self::Fib => rate_bench::run(&fib_task(), workers, duration, ())?,
            Self::Xorshift => rate_bench::run(&xorshift_task(), workers, duration, ())?,
            Self::SortI32 => rate_bench::run(
                &sort_task(low_i32),
                workers,
                duration,
                (),
            )?,
            Self::SortU64 => rate_bench::run(&sort_task(|x| x), workers, duration, ())?,
            Self::Circle => rate_bench::run(&circle_task(), workers, duration, ())?,
            Self::FpmatMul => {
                rate_bench::run(&matrix_task(), workers, duration, MatrixConfig::MUL)?
            }
            Self::FpmatConv => {
                rate_bench::run(&matrix_task(), workers, duration, MatrixConfig::CONV)?
            }
            Self::FpmatAdd => {
                rate_bench::run(&matrix_task(), workers, duration, MatrixConfig::ADD)?
            }
        };

        Ok(report)
    }
}

impl fmt::Display for CpuCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CpuCase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::find(s)
    }
}

/// The prime counting payload of the standalone prime benchmark: counts the primes up to
/// [`STANDALONE_PRIME_LIMIT`] and checks the result on every invocation.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// let task = bench_tasks::standalone_prime_task();
/// let report = rate_bench::run(&task, 1, Duration::from_millis(50), ()).unwrap();
///
/// assert_eq!(report.worker_count(), 1);
/// ```
pub fn standalone_prime_task() -> TaskOps<'static, (), ()> {
    prime_task(STANDALONE_PRIME_LIMIT, STANDALONE_PRIME_COUNT)
}

fn prime_task(limit: u32, expected: u32) -> TaskOps<'static, (), ()> {
    let what = format!("prime_count({limit})");

    Task::new()
        .run_with_warmup(move |()| {
            ValidationFailure::check_eq(&what, expected, prime_count(black_box(limit)))
        })
        .build()
}

fn fib_task() -> TaskOps<'static, (), ()> {
    Task::new()
        .run_with_warmup(|()| {
            ValidationFailure::check_eq(
                "fib_value(1650000)",
                FIB_VALUE,
                fib_value(black_box(FIB_INDEX)),
            )
        })
        .build()
}

fn xorshift_task() -> TaskOps<'static, (), ()> {
    Task::new()
        .run_with_warmup(|()| {
            ValidationFailure::check_eq(
                "xorshift_nstep(XORSHIFT_SEED, 700000)",
                XORSHIFT_RESULT,
                xorshift_nstep(black_box(XORSHIFT_SEED), black_box(XORSHIFT_STEPS)),
            )
        })
        .build()
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the low 32 bits of the generator output are the value"
)]
fn low_i32(x: u64) -> i32 {
    i32::from_ne_bytes((x as u32).to_ne_bytes())
}

#[derive(Debug)]
struct SortState<T> {
    unsorted: Box<[T]>,
    scratch: Box<[T]>,
}

impl<T: Copy + Ord> SortState<T> {
    fn new(generate: fn(u64) -> T) -> Self {
        let mut x = XORSHIFT_SEED;

        let unsorted = (0..SORT_ELEMENTS)
            .map(|_| {
                x = xorshift_next(x);
                generate(x)
            })
            .collect::<Box<[_]>>();

        let scratch = unsorted.clone();

        Self { unsorted, scratch }
    }

    fn sort(&mut self) {
        self.scratch.copy_from_slice(&self.unsorted);
        self.scratch.sort_unstable();
    }
}

fn sort_task<T>(generate: fn(u64) -> T) -> TaskOps<'static, (), SortState<T>>
where
    T: Copy + Ord + 'static,
{
    Task::new()
        .prepare(move |_| SortState::new(generate))
        .warmup(|state| {
            state.sort();

            if state.scratch.is_sorted() {
                Ok(())
            } else {
                Err(ValidationFailure::new("sort produced out-of-order output"))
            }
        })
        .run(|state| {
            state.sort();
            Ok(())
        })
        .build()
}

#[derive(Debug)]
struct CircleState {
    buffer: Box<[u32]>,
    expected_checksum: u64,
}

impl CircleState {
    fn render(&mut self) {
        render_circle(
            &mut self.buffer,
            CIRCLE_WIDTH,
            CIRCLE_HEIGHT,
            CIRCLE_CENTER,
            CIRCLE_RADIUS,
        );
    }
}

fn checksum(pixels: &[u32]) -> u64 {
    pixels
        .iter()
        .fold(0, |sum, pixel| sum.rotate_left(5) ^ u64::from(*pixel))
}

fn circle_task() -> TaskOps<'static, (), CircleState> {
    Task::new()
        .prepare(|_| {
            let pixels = CIRCLE_WIDTH as usize * CIRCLE_HEIGHT as usize;

            let mut state = CircleState {
                buffer: vec![0; pixels].into_boxed_slice(),
                expected_checksum: 0,
            };

            state.render();
            state.expected_checksum = checksum(&state.buffer);

            // The next render must rewrite every pixel, not just leave the reference in place.
            state.buffer.fill(u32::MAX);
            state
        })
        .warmup(|state| {
            state.render();

            ValidationFailure::check_eq(
                "circle checksum",
                state.expected_checksum,
                checksum(&state.buffer),
            )
        })
        .run(|state| {
            state.render();
            Ok(())
        })
        .build()
}

/// Parameters of a floating point matrix payload, shared by all workers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct MatrixConfig {
    op: MatrixOp,
    left: Shape,
    right: Shape,
}

impl MatrixConfig {
    const MUL: Self = Self {
        op: MatrixOp::Mul,
        left: Shape::new(125, 80),
        right: Shape::new(80, 125),
    };

    const CONV: Self = Self {
        op: MatrixOp::Conv,
        left: Shape::new(90, 60),
        right: Shape::new(11, 13),
    };

    const ADD: Self = Self {
        op: MatrixOp::Add,
        left: Shape::new(2000, 2000),
        right: Shape::new(2000, 2000),
    };
}

#[derive(Debug)]
struct MatrixState {
    op: MatrixOp,
    left: Matrix,
    right: Matrix,
    output: Matrix,
}

impl MatrixState {
    fn apply(&mut self) -> std::result::Result<(), ValidationFailure> {
        self.op
            .apply(&self.left, &self.right, &mut self.output)
            .map_err(|e| ValidationFailure::new(e.to_string()))
    }
}

fn matrix_task() -> TaskOps<'static, MatrixConfig, MatrixState> {
    Task::with_config::<MatrixConfig>()
        .prepare(|args| {
            let config = args.config();
            let mut x = XORSHIFT_SEED;

            MatrixState {
                op: config.op,
                left: Matrix::from_xorshift(config.left, &mut x),
                right: Matrix::from_xorshift(config.right, &mut x),
                output: Matrix::zeroed(Shape::new(0, 0)),
            }
        })
        .warmup(|state| {
            state.apply()?;

            if state.output.as_slice().iter().all(|value| value.is_finite()) {
                Ok(())
            } else {
                Err(ValidationFailure::new(format!(
                    "matrix operation {} produced a non-finite element",
                    state.op
                )))
            }
        })
        .run(MatrixState::apply)
        .build()
}
