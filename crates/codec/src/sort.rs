//! Deterministic ordering of compound ids
//!
//! A compound id is a list of fields separated by `::` (a single `:` is part
//! of a field). Ids compare by field count first, then field by field with a
//! numeric-aware rule: runs of digits compare by numeric value, so `A2` sorts
//! before `A10`. Ids that are still equal fall back to plain byte order, which
//! keeps the order total.
//!
//! ```
//! use keystone_codec::sort::sort_ids;
//!
//! let mut ids = vec!["BTC::stETH::minter", "BTC::pegged", "BTC"];
//! sort_ids(&mut ids);
//! assert_eq!(ids, vec!["BTC", "BTC::pegged", "BTC::stETH::minter"]);
//! ```

use std::cmp::Ordering;

/// Field separator in compound ids
pub const FIELD_SEPARATOR: &str = "::";

/// Compare two compound ids
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    let fields_a: Vec<&str> = a.split(FIELD_SEPARATOR).collect();
    let fields_b: Vec<&str> = b.split(FIELD_SEPARATOR).collect();

    fields_a
        .len()
        .cmp(&fields_b.len())
        .then_with(|| {
            fields_a
                .iter()
                .zip(&fields_b)
                .map(|(x, y)| natural_cmp(x, y))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.cmp(b))
}

/// Numeric-aware comparison of two fields
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let start_a = i;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            let start_b = j;
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let run_a = trim_leading_zeros(&a[start_a..i]);
            let run_b = trim_leading_zeros(&b[start_b..j]);
            // Longer run without leading zeros is the larger number
            let ord = run_a.len().cmp(&run_b.len()).then_with(|| run_a.cmp(run_b));
            if ord != Ordering::Equal {
                return ord;
            }
        } else {
            let ord = a[i].cmp(&b[j]);
            if ord != Ordering::Equal {
                return ord;
            }
            i += 1;
            j += 1;
        }
    }

    (a.len() - i).cmp(&(b.len() - j))
}

fn trim_leading_zeros(digits: &[u8]) -> &[u8] {
    let first = digits.iter().position(|d| *d != b'0').unwrap_or(digits.len());
    &digits[first..]
}

/// Sort ids in place
pub fn sort_ids<S: AsRef<str>>(ids: &mut [S]) {
    ids.sort_by(|a, b| compare_ids(a.as_ref(), b.as_ref()));
}
