//! A1-style labels for grid addresses.
//!
//! Used for header labels and human-readable log output; the snapshot
//! format uses the numeric ids from [`crate::address`] instead.

use crate::address::{SheetId, SimpleCellAddress};

/// Convert a 0-based column index to letters (A, B, ..., Z, AA, AB, ...)
pub fn col_to_letters(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = u64::from(col) + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + u8::try_from(n % 26).unwrap_or(0));
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Label for an address on its sheet, e.g. `(row 2, col 1)` -> `"B3"`.
pub fn cell_label(address: &SimpleCellAddress) -> String {
    format!("{}{}", col_to_letters(address.col), u64::from(address.row) + 1)
}

/// Parse a label like "B3" (or "$B$3") into (row, col), 0-indexed.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for ch in cell_ref.trim().chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() {
            if saw_row {
                return None;
            }
            let upper = ch.to_ascii_uppercase();
            col = col
                .checked_mul(26)?
                .checked_add(upper as u32 - 'A' as u32 + 1)?;
            saw_col = true;
        } else if let Some(digit) = ch.to_digit(10) {
            row = row.checked_mul(10)?.checked_add(digit)?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }

    Some((row - 1, col - 1))
}

/// Parse a label into an address on `sheet`.
pub fn parse_address(sheet: SheetId, cell_ref: &str) -> Option<SimpleCellAddress> {
    parse_cell_ref(cell_ref).map(|(row, col)| SimpleCellAddress::new(sheet, row, col))
}
