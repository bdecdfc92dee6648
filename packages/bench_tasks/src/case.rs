use std::fmt::Display;

use crate::{Error, Result};

/// A named member of a benchmark suite.
///
/// Names are matched case-insensitively, so `sha256-8k` selects the same case as `SHA256-8K`.
pub trait BenchCase: Copy + Display + Sized + 'static {
    /// Every case of the suite, in reporting order.
    const ALL: &'static [Self];

    /// The cases executed when the caller does not name any.
    const DEFAULT: &'static [Self];

    /// The canonical (upper case) name of the case, as used in reports.
    fn name(self) -> &'static str;

    /// Looks up a case by name, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCase`] if no case of the suite has the given name.
    fn find(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|case| case.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownCase {
                name: name.to_string(),
            })
    }

    /// Resolves a list of case names, falling back to [`DEFAULT`](Self::DEFAULT) when the list
    /// is empty.
    ///
    /// Every name is resolved before anything is returned, so a typo in the last name is
    /// reported before the first case runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCase`] for the first name that does not match any case.
    fn select<S>(names: &[S]) -> Result<Vec<Self>>
    where
        S: AsRef<str>,
    {
        if names.is_empty() {
            return Ok(Self::DEFAULT.to_vec());
        }

        names.iter().map(|name| Self::find(name.as_ref())).collect()
    }
}
