//! Grid slot addressing: bijective base-26 row labels + 1-based columns.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use verdant_core::DomainError;

/// Bijective base-26 label for a 1-based row number.
///
/// 1 -> "A", 26 -> "Z", 27 -> "AA", 52 -> "AZ", 53 -> "BA". Bijective means
/// there is no zero digit; this is the spreadsheet column scheme, not
/// modulo-26 arithmetic.
pub fn row_label(row: u32) -> String {
    debug_assert!(row >= 1, "rows are 1-based");
    let mut n = row;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    // Only ASCII uppercase bytes were pushed.
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`row_label`]. `None` for anything but non-empty uppercase
/// ASCII.
pub fn parse_row_label(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for c in label.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        n = n.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    Some(n)
}

/// One slot address within a grid map. Row and column are both 1-based.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: u32,
    pub column: u32,
}

impl GridPosition {
    pub fn new(row: u32, column: u32) -> Self {
        debug_assert!(row >= 1 && column >= 1, "rows and columns are 1-based");
        Self { row, column }
    }
}

impl core::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", row_label(self.row), self.column)
    }
}

impl FromStr for GridPosition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.find(|c: char| c.is_ascii_digit()).ok_or_else(|| {
            DomainError::validation(format!("grid position has no column number: {s:?}"))
        })?;
        let (letters, digits) = s.split_at(split);
        let row = parse_row_label(letters)
            .ok_or_else(|| DomainError::validation(format!("bad row label: {s:?}")))?;
        let column: u32 = digits
            .parse()
            .map_err(|_| DomainError::validation(format!("bad column number: {s:?}")))?;
        if column == 0 {
            return Err(DomainError::validation("columns are 1-based"));
        }
        Ok(Self { row, column })
    }
}

/// Row-major scan cursor over a bounded grid.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridCursor {
    row: u32,
    column: u32,
}

impl GridCursor {
    pub fn at(start: GridPosition) -> Self {
        Self {
            row: start.row,
            column: start.column,
        }
    }

    /// Next free slot at or after the cursor, skipping `occupied`.
    ///
    /// Advances the cursor past every slot it inspects, so repeated calls
    /// against a growing occupancy set never revisit a slot. Returns `None`
    /// once the rows are exhausted.
    pub fn next_free(
        &mut self,
        occupied: &std::collections::HashSet<GridPosition>,
        rows: u32,
        columns: u32,
    ) -> Option<GridPosition> {
        while self.row <= rows {
            if self.column > columns {
                self.row += 1;
                self.column = 1;
                continue;
            }
            let candidate = GridPosition::new(self.row, self.column);
            self.column += 1;
            if !occupied.contains(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn bijective_labeling_fixed_points() {
        assert_eq!(row_label(1), "A");
        assert_eq!(row_label(26), "Z");
        assert_eq!(row_label(27), "AA");
        assert_eq!(row_label(52), "AZ");
        assert_eq!(row_label(53), "BA");
        assert_eq!(row_label(702), "ZZ");
        assert_eq!(row_label(703), "AAA");
    }

    #[test]
    fn positions_display_and_parse() {
        let pos = GridPosition::new(3, 4);
        assert_eq!(pos.to_string(), "C4");
        assert_eq!("C4".parse::<GridPosition>().unwrap(), pos);
        assert_eq!(
            "AA10".parse::<GridPosition>().unwrap(),
            GridPosition::new(27, 10)
        );
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "1-based")]
    fn zero_coordinates_are_rejected() {
        let _ = GridPosition::new(0, 4);
    }

    #[test]
    fn malformed_positions_are_rejected() {
        for bad in ["", "C", "4", "c4", "C0", "C-1"] {
            assert!(bad.parse::<GridPosition>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn scan_skips_occupied_slots_row_major() {
        let occupied: HashSet<GridPosition> =
            [GridPosition::new(1, 1), GridPosition::new(1, 3)].into();
        let mut cursor = GridCursor::at(GridPosition::new(1, 1));

        assert_eq!(cursor.next_free(&occupied, 2, 3), Some(GridPosition::new(1, 2)));
        assert_eq!(cursor.next_free(&occupied, 2, 3), Some(GridPosition::new(2, 1)));
        assert_eq!(cursor.next_free(&occupied, 2, 3), Some(GridPosition::new(2, 2)));
        assert_eq!(cursor.next_free(&occupied, 2, 3), Some(GridPosition::new(2, 3)));
        assert_eq!(cursor.next_free(&occupied, 2, 3), None);
    }

    #[test]
    fn scan_ends_when_rows_are_exhausted() {
        let occupied = HashSet::new();
        let mut cursor = GridCursor::at(GridPosition::new(3, 1));
        assert_eq!(cursor.next_free(&occupied, 2, 8), None);
    }

    proptest! {
        #[test]
        fn labels_round_trip(row in 1u32..100_000) {
            prop_assert_eq!(parse_row_label(&row_label(row)), Some(row));
        }

        #[test]
        fn positions_round_trip(row in 1u32..5_000, column in 1u32..5_000) {
            let pos = GridPosition::new(row, column);
            let parsed: GridPosition = pos.to_string().parse().unwrap();
            prop_assert_eq!(parsed, pos);
        }
    }
}
