use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A calendar month in `YYYY-MM` form, used to filter transactions and to key caches.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> crate::Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("Month must be between 1 and 12, got {month}");
        }
        if !(0..=9999).contains(&year) {
            bail!("Year must have four digits, got {year}");
        }
        Ok(Self { year, month })
    }

    /// The month that `date` falls in.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// True when the ISO form of `date` starts with this key.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The month before this one.
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .with_context(|| format!("A month must look like YYYY-MM, got '{s}'"))?;
        if year.len() != 4 || month.len() != 2 {
            bail!("A month must look like YYYY-MM, got '{s}'");
        }
        let year: i32 = year
            .parse()
            .with_context(|| format!("Invalid year in month '{s}'"))?;
        let month: u32 = month
            .parse()
            .with_context(|| format!("Invalid month in month '{s}'"))?;
        MonthKey::new(year, month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MonthKey::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let m: MonthKey = "2024-03".parse().unwrap();
        assert_eq!(m.year(), 2024);
        assert_eq!(m.month(), 3);
        assert_eq!(m.to_string(), "2024-03");
    }

    #[test]
    fn test_parse_invalid() {
        assert!("2024-3".parse::<MonthKey>().is_err());
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("24-03".parse::<MonthKey>().is_err());
        assert!("2024/03".parse::<MonthKey>().is_err());
        assert!("".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_contains_matches_iso_prefix() {
        let m: MonthKey = "2024-03".parse().unwrap();
        for d in ["2024-03-01", "2024-03-05", "2024-03-31"] {
            assert!(m.contains(date(d)));
            assert!(d.starts_with(&m.to_string()));
        }
        for d in ["2024-04-01", "2023-03-05", "2024-02-29"] {
            assert!(!m.contains(date(d)));
            assert!(!d.starts_with(&m.to_string()));
        }
    }

    #[test]
    fn test_previous() {
        let m: MonthKey = "2024-01".parse().unwrap();
        assert_eq!(m.previous().to_string(), "2023-12");
        let m: MonthKey = "2024-10".parse().unwrap();
        assert_eq!(m.previous().to_string(), "2024-09");
    }

    #[test]
    fn test_serde() {
        let m: MonthKey = serde_json::from_str("\"2024-03\"").unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"2024-03\"");
    }
}
