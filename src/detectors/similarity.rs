//! Text similarity for duplicate detection.
//!
//! The measure is the Ratcliff/Obershelp "gestalt pattern matching" ratio:
//! find the longest common substring, recurse on the pieces to its left and
//! right, and report `2 * M / T` where `M` is the number of matched characters
//! and `T` the combined length of both strings.

use std::collections::HashMap;

/// Similarity of two strings in `0.0..=1.0`.
///
/// Two empty strings are identical (`1.0`).
///
/// ```
/// use stressspec::detectors::similarity::ratio;
///
/// assert_eq!(ratio("abcd", "abcd"), 1.0);
/// assert_eq!(ratio("abcd", "bcde"), 0.75);
/// assert_eq!(ratio("abc", "xyz"), 0.0);
/// ```
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    to_ratio(matching_characters(&a, &b), total)
}

/// An upper bound on [`ratio`] computed from the lengths alone.
///
/// Pairs whose bound falls below a threshold cannot reach it and need not be
/// compared.
#[must_use]
pub fn upper_bound(a_len: usize, b_len: usize) -> f64 {
    let total = a_len + b_len;
    if total == 0 {
        return 1.0;
    }
    to_ratio(a_len.min(b_len), total)
}

#[allow(clippy::cast_precision_loss)]
fn to_ratio(matches: usize, total: usize) -> f64 {
    2.0 * matches as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        positions.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &positions, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }
        matched += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }
    matched
}

/// The longest block `a[i..i+size] == b[j..j+size]` within the given
/// windows. Ties go to the block starting earliest in `a`, then in `b`.
fn longest_match(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);
    // run lengths of matches ending at b[j], for the previous row of `a`
    let mut previous: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(a_hi).skip(a_lo) {
        let mut current = HashMap::new();
        for &j in positions.get(c).map_or(&[][..], Vec::as_slice) {
            if j < b_lo {
                continue;
            }
            if j >= b_hi {
                break;
            }
            let run = j
                .checked_sub(1)
                .and_then(|prev| previous.get(&prev))
                .copied()
                .unwrap_or(0)
                + 1;
            current.insert(j, run);
            if run > best_size {
                best_i = i + 1 - run;
                best_j = j + 1 - run;
                best_size = run;
            }
        }
        previous = current;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("", "", 1.0; "both empty")]
    #[test_case("abc", "", 0.0; "one empty")]
    #[test_case("the system shall log in users", "the system shall log in users", 1.0; "identical")]
    #[test_case("abxcd", "abcd", 8.0 / 9.0; "one insertion")]
    #[test_case("private thread", "private volatile thread", 28.0 / 37.0; "split match")]
    fn known_ratios(a: &str, b: &str, expected: f64) {
        assert!((ratio(a, b) - expected).abs() < 1e-9, "{a:?} vs {b:?}");
    }

    #[test]
    fn unrelated_sentences_are_not_identical() {
        let score = ratio(
            "the system shall encrypt stored passwords",
            "reports are exported weekly as pdf files",
        );
        assert!(score < 1.0);
    }

    #[test]
    fn ratio_never_exceeds_upper_bound() {
        let pairs = [
            ("users shall log in", "users shall log in with sso"),
            ("abc", "abcdefghij"),
            ("export reports", "import records"),
        ];
        for (a, b) in pairs {
            assert!(ratio(a, b) <= upper_bound(a.chars().count(), b.chars().count()));
        }
    }
}
