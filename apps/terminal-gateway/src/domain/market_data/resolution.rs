//! Chart resolutions and their bucket arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::DomainError;

/// A bar width the datafeed can serve.
///
/// Month bars use a fixed 30 day bucket so every resolution is a constant
/// number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    /// One minute.
    Minute1,
    /// Five minutes.
    Minute5,
    /// Fifteen minutes.
    Minute15,
    /// Thirty minutes.
    Minute30,
    /// One hour.
    Hour1,
    /// Four hours.
    Hour4,
    /// One day.
    Day,
    /// One week.
    Week,
    /// Thirty days.
    Month,
}

impl Resolution {
    /// Every supported resolution, shortest first.
    pub const ALL: [Self; 9] = [
        Self::Minute1,
        Self::Minute5,
        Self::Minute15,
        Self::Minute30,
        Self::Hour1,
        Self::Hour4,
        Self::Day,
        Self::Week,
        Self::Month,
    ];

    /// Bucket width in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Minute1 => 60,
            Self::Minute5 => 300,
            Self::Minute15 => 900,
            Self::Minute30 => 1_800,
            Self::Hour1 => 3_600,
            Self::Hour4 => 14_400,
            Self::Day => 86_400,
            Self::Week => 604_800,
            Self::Month => 2_592_000,
        }
    }

    /// Chart-side resolution code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Minute1 => "1",
            Self::Minute5 => "5",
            Self::Minute15 => "15",
            Self::Minute30 => "30",
            Self::Hour1 => "60",
            Self::Hour4 => "240",
            Self::Day => "1D",
            Self::Week => "1W",
            Self::Month => "1M",
        }
    }

    /// Timeframe name used by the backend bar store.
    #[must_use]
    pub const fn timeframe(self) -> &'static str {
        match self {
            Self::Minute1 => "1min",
            Self::Minute5 => "5min",
            Self::Minute15 => "15min",
            Self::Minute30 => "30min",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day => "1day",
            Self::Week => "1week",
            Self::Month => "1month",
        }
    }

    /// True for sub-daily resolutions.
    #[must_use]
    pub const fn is_intraday(self) -> bool {
        self.seconds() < 86_400
    }

    /// Start of the bucket containing `unix_seconds`.
    ///
    /// Floors toward negative infinity so pre-epoch times still land in the
    /// bucket that contains them. Saturates at the ends of the `i64` range.
    #[must_use]
    pub const fn bucket_start(self, unix_seconds: i64) -> i64 {
        unix_seconds
            .div_euclid(self.seconds())
            .saturating_mul(self.seconds())
    }

    /// Start of the bucket containing `at`.
    #[must_use]
    pub fn bucket_of(self, at: DateTime<Utc>) -> i64 {
        self.bucket_start(at.timestamp())
    }
}

impl FromStr for Resolution {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1" => Ok(Self::Minute1),
            "5" => Ok(Self::Minute5),
            "15" => Ok(Self::Minute15),
            "30" => Ok(Self::Minute30),
            "60" | "1H" => Ok(Self::Hour1),
            "240" | "4H" => Ok(Self::Hour4),
            "D" | "1D" => Ok(Self::Day),
            "W" | "1W" => Ok(Self::Week),
            "M" | "1M" => Ok(Self::Month),
            other => Err(DomainError::invalid(
                "resolution",
                format!("unsupported resolution '{other}'"),
            )),
        }
    }
}

impl TryFrom<String> for Resolution {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
