//! A1-notation ranges such as `Transactions!A2:H` or `Metadata!A1`.

use anyhow::{bail, Context};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A rectangular range on a named sheet. Columns are zero-based, rows are one-based as in A1
/// notation. A missing row means the range is unbounded in that direction.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct A1Range {
    sheet: String,
    first_col: usize,
    first_row: Option<usize>,
    last_col: usize,
    last_row: Option<usize>,
}

impl A1Range {
    /// A single cell, e.g. `Metadata!A1`.
    pub fn cell(sheet: impl Into<String>, col: usize, row: usize) -> Self {
        Self {
            sheet: sheet.into(),
            first_col: col,
            first_row: Some(row),
            last_col: col,
            last_row: Some(row),
        }
    }

    /// Whole columns, e.g. `Transactions!A:H`.
    pub fn columns(sheet: impl Into<String>, first_col: usize, last_col: usize) -> Self {
        Self {
            sheet: sheet.into(),
            first_col,
            first_row: None,
            last_col,
            last_row: None,
        }
    }

    /// Columns starting at `row` and running to the bottom of the sheet, e.g. `Transactions!A2:H`.
    pub fn from_row(
        sheet: impl Into<String>,
        first_col: usize,
        last_col: usize,
        row: usize,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            first_col,
            first_row: Some(row),
            last_col,
            last_row: None,
        }
    }

    /// Exactly one row, e.g. `Transactions!A5:H5`.
    pub fn row(sheet: impl Into<String>, first_col: usize, last_col: usize, row: usize) -> Self {
        Self {
            sheet: sheet.into(),
            first_col,
            first_row: Some(row),
            last_col,
            last_row: Some(row),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn first_col(&self) -> usize {
        self.first_col
    }

    pub fn last_col(&self) -> usize {
        self.last_col
    }

    /// First row, one-based. Unbounded ranges start at row 1.
    pub fn first_row(&self) -> usize {
        self.first_row.unwrap_or(1)
    }

    pub fn last_row(&self) -> Option<usize> {
        self.last_row
    }
}

impl Display for A1Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let cell = |col: usize, row: Option<usize>| match row {
            Some(r) => format!("{}{r}", column_letters(col)),
            None => column_letters(col),
        };
        let start = cell(self.first_col, self.first_row);
        let end = cell(self.last_col, self.last_row);
        if start == end && self.first_row.is_some() {
            write!(f, "{}!{start}", self.sheet)
        } else {
            write!(f, "{}!{start}:{end}", self.sheet)
        }
    }
}

impl FromStr for A1Range {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sheet, cells) = s
            .rsplit_once('!')
            .with_context(|| format!("The range '{s}' has no sheet name"))?;
        let sheet = sheet.trim_matches('\'');
        if sheet.is_empty() {
            bail!("The range '{s}' has an empty sheet name");
        }
        let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
        let (first_col, first_row) = parse_cell(start).with_context(|| format!("Bad range '{s}'"))?;
        let (last_col, last_row) = parse_cell(end).with_context(|| format!("Bad range '{s}'"))?;
        if last_col < first_col {
            bail!("The range '{s}' ends before it starts");
        }
        if let (Some(a), Some(b)) = (first_row, last_row) {
            if b < a {
                bail!("The range '{s}' ends before it starts");
            }
        }
        Ok(Self {
            sheet: sheet.to_string(),
            first_col,
            first_row,
            last_col,
            last_row,
        })
    }
}

/// Zero-based column index to letters: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn parse_cell(s: &str) -> crate::Result<(usize, Option<usize>)> {
    let split = s
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(s.len());
    let (letters, digits) = s.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        bail!("'{s}' does not start with a column letter");
    }
    let col = letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A') as usize + 1)
        - 1;
    let row = if digits.is_empty() {
        None
    } else {
        let row: usize = digits
            .parse()
            .with_context(|| format!("'{digits}' is not a row number"))?;
        if row == 0 {
            bail!("Rows start at 1");
        }
        Some(row)
    };
    Ok((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(A1Range::cell("Metadata", 0, 1).to_string(), "Metadata!A1");
        assert_eq!(A1Range::columns("Transactions", 0, 7).to_string(), "Transactions!A:H");
        assert_eq!(A1Range::columns("Transactions", 0, 0).to_string(), "Transactions!A:A");
        assert_eq!(
            A1Range::from_row("Transactions", 0, 7, 2).to_string(),
            "Transactions!A2:H"
        );
        assert_eq!(
            A1Range::row("Transactions", 0, 7, 5).to_string(),
            "Transactions!A5:H5"
        );
    }

    #[test]
    fn test_parse() {
        let r: A1Range = "Transactions!A2:H".parse().unwrap();
        assert_eq!(r, A1Range::from_row("Transactions", 0, 7, 2));
        let r: A1Range = "Transactions!A:A".parse().unwrap();
        assert_eq!(r.first_row(), 1);
        assert_eq!(r.last_row(), None);
        let r: A1Range = "'My Sheet'!B3".parse().unwrap();
        assert_eq!(r.sheet(), "My Sheet");
        assert_eq!(r, A1Range::cell("My Sheet", 1, 3));
    }

    #[test]
    fn test_parse_errors() {
        assert!("A1".parse::<A1Range>().is_err());
        assert!("Sheet!1".parse::<A1Range>().is_err());
        assert!("Sheet!A0".parse::<A1Range>().is_err());
        assert!("Sheet!H:A".parse::<A1Range>().is_err());
        assert!("Sheet!A5:A2".parse::<A1Range>().is_err());
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(7), "H");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
        let r: A1Range = "S!ZZ1".parse().unwrap();
        assert_eq!(r.first_col(), 701);
    }
}
