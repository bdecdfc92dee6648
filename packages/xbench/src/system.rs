use std::env::consts::ARCH;
use std::fs;
use std::io;
use std::num::NonZero;
use std::path::Path;
use std::thread;

use new_zealand::nz;
use toml::{Table, Value};
use tracing::{debug, error, warn};

use crate::{Error, Result};

const CPUINFO: &str = "/proc/cpuinfo";
const OS_RELEASE: &str = "/etc/os-release";
const KERNEL_RELEASE: &str = "/proc/sys/kernel/osrelease";
const MEMINFO: &str = "/proc/meminfo";

const CGROUP_V1_LIMIT: &str = "/sys/fs/cgroup/memory/memory.limit_in_bytes";
const CGROUP_V1_USAGE: &str = "/sys/fs/cgroup/memory/memory.usage_in_bytes";
const CGROUP_V2_LIMIT: &str = "/sys/fs/cgroup/memory.max";
const CGROUP_V2_USAGE: &str = "/sys/fs/cgroup/memory.current";

const UNKNOWN: &str = "unknown";

const BYTES_PER_KIB: u64 = 1024;
const BYTES_PER_MIB: u64 = 1024 * BYTES_PER_KIB;
const BYTES_PER_GIB: u64 = 1024 * BYTES_PER_MIB;

/// The largest memory budget ever suggested for the memory suite.
pub const MAX_SUGGESTED_GIB: NonZero<usize> = nz!(16);

/// Below this much available memory the memory suite is skipped entirely.
pub const MIN_AVAILABLE_BYTES: u64 = 1200 * BYTES_PER_MIB;

/// A description of the machine the benchmarks execute on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SystemInfo {
    cpu: String,
    cores: usize,
    kernel: String,
    distro: String,
}

impl SystemInfo {
    /// Describes the current machine.
    ///
    /// Every field falls back to a placeholder if its source is missing or unreadable, so this
    /// never fails.
    #[must_use]
    pub fn collect() -> Self {
        let cpuinfo = read_lossy(CPUINFO);
        let os_release = read_lossy(OS_RELEASE);
        let kernel_release = read_lossy(KERNEL_RELEASE);

        Self::from_sources(
            cpuinfo.as_deref(),
            os_release.as_deref(),
            kernel_release.as_deref(),
            available_cores(),
        )
    }

    /// Builds the description from the contents of `/proc/cpuinfo`, `/etc/os-release` and
    /// `/proc/sys/kernel/osrelease`, any of which may be missing.
    #[must_use]
    pub fn from_sources(
        cpuinfo: Option<&str>,
        os_release: Option<&str>,
        kernel_release: Option<&str>,
        cores: NonZero<usize>,
    ) -> Self {
        let cpu = cpuinfo
            .and_then(parse_cpu_model)
            .map_or_else(|| format!("{UNKNOWN}({ARCH})"), str::to_string);

        let kernel = kernel_release
            .map(str::trim)
            .filter(|release| !release.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string();

        let distro = os_release
            .and_then(parse_pretty_name)
            .unwrap_or(UNKNOWN)
            .to_string();

        Self {
            cpu,
            cores: cores.get(),
            kernel,
            distro,
        }
    }

    /// The CPU model name.
    #[must_use]
    pub fn cpu(&self) -> &str {
        &self.cpu
    }

    /// The number of processors available to this process.
    #[must_use]
    pub fn cores(&self) -> usize {
        self.cores
    }

    /// The kernel release.
    #[must_use]
    pub fn kernel(&self) -> &str {
        &self.kernel
    }

    /// The human-readable name of the operating system distribution.
    #[must_use]
    pub fn distro(&self) -> &str {
        &self.distro
    }

    /// The description as the `system` table of the suite report.
    #[must_use]
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();

        table.insert("cpu".to_string(), Value::from(self.cpu.as_str()));
        table.insert(
            "cores".to_string(),
            Value::Integer(i64::try_from(self.cores).unwrap_or(i64::MAX)),
        );
        table.insert("kernel".to_string(), Value::from(self.kernel.as_str()));
        table.insert("distro".to_string(), Value::from(self.distro.as_str()));

        table
    }
}

/// The number of processors available to this process, at least 1.
#[must_use]
pub fn available_cores() -> NonZero<usize> {
    thread::available_parallelism().unwrap_or(nz!(1))
}

fn read_lossy(path: &str) -> Option<String> {
    fs::read_to_string(path)
        .inspect_err(|e| debug!(path, error = %e, "system description source unavailable"))
        .ok()
}

/// Reads a file that legitimately does not exist on some systems.
fn read_optional(path: &str) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::SystemFile {
            path: Path::new(path).to_path_buf(),
            source,
        }),
    }
}

/// The value of the first `model name` entry of `/proc/cpuinfo`.
fn parse_cpu_model(cpuinfo: &str) -> Option<&str> {
    cpuinfo
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "model name")
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// The `PRETTY_NAME` of `/etc/os-release`, without quotes.
fn parse_pretty_name(os_release: &str) -> Option<&str> {
    os_release
        .lines()
        .find_map(|line| line.trim().strip_prefix("PRETTY_NAME="))
        .map(|value| value.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|value| !value.is_empty())
}

/// `MemAvailable` of `/proc/meminfo`, in bytes.
fn parse_mem_available(meminfo: &str) -> Option<u64> {
    let line = meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemAvailable:"))?;

    let kib = line.split_whitespace().next()?.parse::<u64>().ok()?;

    kib.checked_mul(BYTES_PER_KIB)
}

/// A cgroup memory counter. `max` and unparseable values mean "no limit".
fn parse_cgroup_bytes(contents: &str) -> Option<u64> {
    contents.trim().parse().ok()
}

/// How much memory a cgroup still allows to be allocated, if it is limited at all.
fn cgroup_headroom(limit: Option<&str>, usage: Option<&str>) -> Option<u64> {
    let limit = parse_cgroup_bytes(limit?)?;
    let usage = usage.and_then(parse_cgroup_bytes).unwrap_or(0);

    Some(limit.saturating_sub(usage))
}

/// Combines the system-wide available memory with the headroom of the cgroups of the process.
fn effective_available(mem_available: u64, cgroup_headrooms: &[Option<u64>]) -> u64 {
    cgroup_headrooms
        .iter()
        .flatten()
        .fold(mem_available, |available, headroom| available.min(*headroom))
}

/// The memory this process can allocate without pushing the system into swap, in bytes.
///
/// This is `MemAvailable` of `/proc/meminfo`, further limited by the remaining headroom of a
/// cgroup v1 or v2 memory limit when one applies.
///
/// # Errors
///
/// Returns [`Error::SystemFile`] if `/proc/meminfo` cannot be read or has no `MemAvailable`
/// entry, or if a cgroup file exists but cannot be read.
pub fn available_memory_bytes() -> Result<u64> {
    let meminfo = fs::read_to_string(MEMINFO).map_err(|source| Error::SystemFile {
        path: Path::new(MEMINFO).to_path_buf(),
        source,
    })?;

    let mem_available = parse_mem_available(&meminfo).ok_or_else(|| Error::SystemFile {
        path: Path::new(MEMINFO).to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, "no MemAvailable entry"),
    })?;

    let v1 = cgroup_headroom(
        read_optional(CGROUP_V1_LIMIT)?.as_deref(),
        read_optional(CGROUP_V1_USAGE)?.as_deref(),
    );
    let v2 = cgroup_headroom(
        read_optional(CGROUP_V2_LIMIT)?.as_deref(),
        read_optional(CGROUP_V2_USAGE)?.as_deref(),
    );

    let available = effective_available(mem_available, &[v1, v2]);

    debug!(mem_available, ?v1, ?v2, available, "determined available memory");

    Ok(available)
}

/// The memory budget for the memory suite, in GiB, given how many bytes are available.
///
/// Half of the available memory is used, rounded down to whole GiB and capped at
/// [`MAX_SUGGESTED_GIB`]. If that rounds down to zero, 1 GiB is still used as long as at least
/// [`MIN_AVAILABLE_BYTES`] are available; otherwise there is not enough memory for a meaningful
/// measurement and `None` is returned.
///
/// # Examples
///
/// ```
/// const GIB: u64 = 1024 * 1024 * 1024;
///
/// assert_eq!(xbench::suggest_memory_gib(10 * GIB).map(|g| g.get()), Some(5));
/// assert_eq!(xbench::suggest_memory_gib(64 * GIB).map(|g| g.get()), Some(16));
/// assert_eq!(xbench::suggest_memory_gib(GIB), None);
/// ```
#[must_use]
pub fn suggest_memory_gib(available_bytes: u64) -> Option<NonZero<usize>> {
    #[expect(
        clippy::integer_division,
        reason = "the budget is deliberately rounded down to whole GiB"
    )]
    let half_gib = available_bytes / 2 / BYTES_PER_GIB;

    let suggested = usize::try_from(half_gib)
        .unwrap_or(usize::MAX)
        .min(MAX_SUGGESTED_GIB.get());

    if let Some(gib) = NonZero::new(suggested) {
        return Some(gib);
    }

    if available_bytes >= MIN_AVAILABLE_BYTES {
        warn!(
            available_bytes,
            "too little memory available, be careful using the memory test results"
        );
        return Some(nz!(1));
    }

    error!(
        available_bytes,
        "too little memory available, cannot run the memory test"
    );
    None
}
