//! Startup configuration handed to the coordinator.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Stream indices whose ordinary end-of-stream stops the whole program.
///
/// Parsed from a comma-separated list such as `0,2,5`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KillSet(BTreeSet<usize>);

impl KillSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<usize> for KillSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        KillSet(iter.into_iter().collect())
    }
}

impl FromStr for KillSet {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(|token| {
                token.parse::<usize>().map_err(|source| ParseError::KillSet {
                    token: token.to_owned(),
                    source,
                })
            })
            .collect()
    }
}

impl fmt::Display for KillSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", index)?;
        }
        Ok(())
    }
}
