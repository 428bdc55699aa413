//! Human-readable application index
//!
//! Format `NNNNN-YYYY`: a five digit, zero padded sequence number that
//! restarts every calendar year.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApplicationIndex {
    pub number: u32,
    pub year: i32,
}

impl ApplicationIndex {
    pub fn first(year: i32) -> Self {
        Self { number: 1, year }
    }

    /// Next index for `year`, given the latest index issued in that year.
    ///
    /// An unparsable or foreign-year `last` restarts the sequence.
    pub fn next_after(last: Option<&str>, year: i32) -> Self {
        match last.and_then(|s| s.parse::<ApplicationIndex>().ok()) {
            Some(prev) if prev.year == year => Self {
                number: prev.number.saturating_add(1),
                year,
            },
            _ => Self::first(year),
        }
    }

    /// Suffix shared by every index issued in `year`
    pub fn year_suffix(year: i32) -> String {
        format!("-{}", year)
    }
}

impl fmt::Display for ApplicationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}-{}", self.number, self.year)
    }
}

impl FromStr for ApplicationIndex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, year) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid application index: {}", s))?;
        let number = number
            .parse::<u32>()
            .map_err(|_| format!("invalid application number: {}", s))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| format!("invalid application year: {}", s))?;
        Ok(Self { number, year })
    }
}
