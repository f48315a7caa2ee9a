//! Port/signal name tokenization.
//!
//! `words_from_name` feeds both the `BundleTree` trie (tokens are path
//! edges) and every name-similarity cost term downstream. It has to be
//! cheap and deterministic — no Unicode normalization, no locale handling.

/// Split a port or bus-signal name into lowercase word tokens.
///
/// Rules, applied in order:
/// 1. Insert a separator between a letter and a following uppercase-lowercase
///    run (camelCase boundary), e.g. `fooBar` → `foo_Bar`.
/// 2. Insert a separator between a lowercase letter or digit and a following
///    uppercase letter, e.g. `fooBAR` → `foo_BAR` (an all-caps run like
///    `AWADDR` has no internal lowercase/digit-to-uppercase boundary, so it
///    stays intact).
/// 3. Insert a separator between any letter and a following run of digits,
///    e.g. `bit0` → `bit_0`.
/// 4. Lowercase everything and split on `_`, dropping empty tokens.
pub fn words_from_name(name: &str) -> Vec<String> {
    let s = insert_camel_boundaries(name);
    let s = insert_alnum_to_upper_boundaries(&s);
    let s = insert_letter_to_digit_boundaries(&s);
    s.to_lowercase()
        .split('_')
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}

/// `(.)([A-Z][a-z]+)(.)` → `\1_\2\3`: a run of one uppercase letter followed
/// by one-or-more lowercase letters gets a separator before it, but only
/// when it has both a preceding and a following character (mid-string).
fn insert_camel_boundaries(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(n + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let mut j = i + 1;
            while j < n && chars[j].is_ascii_lowercase() {
                j += 1;
            }
            if j > i + 1 && j < n {
                out.push('_');
            }
        }
        out.push(c);
    }
    out
}

/// `([a-z0-9])([A-Z])` → `\1_\2`: a lowercase letter or digit immediately
/// followed by an uppercase letter gets a separator at the boundary. A
/// preceding uppercase letter does *not* trigger this (otherwise an
/// all-caps run like `AWADDR` would shatter into single characters).
fn insert_alnum_to_upper_boundaries(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 {
            let prev = chars[i - 1];
            if (prev.is_ascii_lowercase() || prev.is_ascii_digit()) && c.is_ascii_uppercase() {
                out.push('_');
            }
        }
        out.push(c);
    }
    out
}

/// `([a-zA-Z])([0-9])` → `\1_\2`, only at the start of a digit run (a digit
/// following another digit does not get re-split).
fn insert_letter_to_digit_boundaries(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 {
            let prev = chars[i - 1];
            if prev.is_ascii_alphabetic() && c.is_ascii_digit() {
                out.push('_');
            }
        }
        out.push(c);
    }
    out
}

/// Longest common character prefix across a list of names. Empty input (or
/// no shared prefix) yields an empty string.
pub fn common_prefix(names: &[String]) -> String {
    let mut iter = names.iter();
    let first = match iter.next() {
        Some(s) => s,
        None => return String::new(),
    };
    let mut prefix_len = first.chars().count();
    let first_chars: Vec<char> = first.chars().collect();
    for name in iter {
        let chars: Vec<char> = name.chars().collect();
        let mut i = 0;
        while i < prefix_len && i < chars.len() && chars[i] == first_chars[i] {
            i += 1;
        }
        prefix_len = i;
        if prefix_len == 0 {
            break;
        }
    }
    first_chars[..prefix_len].iter().collect()
}

/// True iff `values` (once sorted) form a contiguous run of integers with no
/// duplicates: `max - min + 1 == len`.
pub fn is_contiguous_range(values: &[u32]) -> bool {
    if values.is_empty() {
        return false;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != values.len() {
        return false;
    }
    let min = sorted[0];
    let max = *sorted.last().unwrap();
    (max - min + 1) as usize == sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_underscore() {
        assert_eq!(words_from_name("axi0_awaddr"), vec!["axi", "0", "awaddr"]);
    }

    #[test]
    fn splits_letter_digit_boundary() {
        assert_eq!(
            words_from_name("test_bit0_n"),
            vec!["test", "bit", "0", "n"]
        );
        assert_eq!(
            words_from_name("test_bit19_n"),
            vec!["test", "bit", "19", "n"]
        );
    }

    #[test]
    fn splits_camel_case() {
        assert_eq!(words_from_name("fooBar"), vec!["foo", "bar"]);
    }

    #[test]
    fn empty_tokens_are_dropped() {
        assert_eq!(words_from_name("axi0__awaddr"), vec!["axi", "0", "awaddr"]);
    }

    #[test]
    fn all_caps_stays_together() {
        assert_eq!(words_from_name("axi0_AWADDR"), vec!["axi", "0", "awaddr"]);
    }

    #[test]
    fn all_caps_run_is_not_shattered_by_internal_uppercase_pairs() {
        assert_eq!(words_from_name("AWADDR"), vec!["awaddr"]);
        assert_eq!(words_from_name("axi_AWQOS_AWID"), vec!["axi", "awqos", "awid"]);
    }

    #[test]
    fn common_prefix_stops_at_divergence() {
        let names = vec!["axi0_awaddr".to_string(), "axi0_awlen".to_string()];
        assert_eq!(common_prefix(&names), "axi0_aw");
    }

    #[test]
    fn common_prefix_of_empty_is_empty() {
        assert_eq!(common_prefix(&[]), "");
    }

    #[test]
    fn contiguous_range_detects_gaps() {
        assert!(is_contiguous_range(&[0, 1, 2, 3]));
        assert!(!is_contiguous_range(&[0, 1, 3]));
        assert!(!is_contiguous_range(&[]));
    }
}
