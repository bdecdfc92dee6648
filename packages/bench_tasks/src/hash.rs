use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use digest::DynDigest;
use rate_bench::{RunReport, Task, TaskOps, ValidationFailure};
use tracing::debug;

use crate::{BenchCase, Error, Result};

/// The size of the block hashed by one operation.
pub const HASH_BLOCK_BYTES: usize = 8 * 1024;

/// A cryptographic digest payload over a [`HASH_BLOCK_BYTES`] block.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum HashCase {
    /// MD5.
    Md5,

    /// SM3.
    Sm3,

    /// SHA-1.
    Sha1,

    /// SHA-256.
    Sha256,

    /// SHA-512.
    Sha512,
}

impl BenchCase for HashCase {
    const ALL: &'static [Self] = &[
        Self::Md5,
        Self::Sm3,
        Self::Sha1,
        Self::Sha256,
        Self::Sha512,
    ];

    const DEFAULT: &'static [Self] = Self::ALL;

    fn name(self) -> &'static str {
        match self {
            Self::Md5 => "MD5-8K",
            Self::Sm3 => "SM3-8K",
            Self::Sha1 => "SHA1-8K",
            Self::Sha256 => "SHA256-8K",
            Self::Sha512 => "SHA512-8K",
        }
    }
}

impl HashCase {
    /// Executes the case on `workers` threads for `duration`.
    ///
    /// The rate of the returned report is in hashed blocks per second.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Run`] if the harness rejects the run parameters or cannot start the
    /// worker threads.
    pub fn run(self, workers: usize, duration: Duration) -> Result<RunReport> {
        debug!(case = %self, workers, ?duration, "running digest case");

        Ok(rate_bench::run(&hash_task(), workers, duration, self)?)
    }

    /// A fresh hasher for the algorithm of this case.
    #[must_use]
    pub fn hasher(self) -> Box<dyn DynDigest> {
        match self {
            Self::Md5 => Box::new(md5::Md5::default()),
            Self::Sm3 => Box::new(sm3::Sm3::default()),
            Self::Sha1 => Box::new(sha1::Sha1::default()),
            Self::Sha256 => Box::new(sha2::Sha256::default()),
            Self::Sha512 => Box::new(sha2::Sha512::default()),
        }
    }

    /// The digest of `data`, computed with a hasher that is used once and discarded.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Box<[u8]> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }
}

impl fmt::Display for HashCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashCase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::find(s)
    }
}

/// The block every worker hashes: byte `i` holds the low 8 bits of `i`.
#[must_use]
pub fn hash_block() -> Box<[u8]> {
    (0..HASH_BLOCK_BYTES)
        .map(|i| i.to_le_bytes()[0])
        .collect()
}

#[derive(derive_more::Debug)]
struct HashState {
    case: HashCase,

    #[debug(ignore)]
    hasher: Box<dyn DynDigest>,

    #[debug(ignore)]
    block: Box<[u8]>,

    output: Box<[u8]>,
    expected: Box<[u8]>,
}

impl HashState {
    fn new(case: HashCase) -> Self {
        let block = hash_block();
        let expected = case.digest(&block);
        let hasher = case.hasher();
        let output = vec![0; hasher.output_size()].into_boxed_slice();

        Self {
            case,
            hasher,
            block,
            output,
            expected,
        }
    }

    fn hash(&mut self) -> std::result::Result<(), ValidationFailure> {
        self.hasher.update(&self.block);

        self.hasher
            .finalize_into_reset(&mut self.output)
            .map_err(|error| ValidationFailure::new(format!("{}: {error}", self.case)))
    }
}

fn hash_task() -> TaskOps<'static, HashCase, HashState> {
    Task::with_config::<HashCase>()
        .prepare(|args| HashState::new(*args.config()))
        .warmup(|state| {
            state.hash()?;

            ValidationFailure::check_eq(
                "digest length",
                state.hasher.output_size(),
                state.output.len(),
            )?;

            if state.output == state.expected {
                Ok(())
            } else {
                Err(ValidationFailure::new(format!(
                    "{} of a reused hasher differs from a fresh hasher",
                    state.case
                )))
            }
        })
        .run(HashState::hash)
        .build()
}
