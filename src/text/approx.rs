//! Approximate string search
//!
//! Finds the substrings of a text with the smallest edit distance to a
//! pattern, up to an error budget. All offsets are `char` indices.
//!
//! End positions come from a column-wise Sellers DP with Ukkonen's cut-off,
//! so only rows whose value can still be within budget are computed and the
//! expected cost is `O(max_errors * text.len())`. Start positions are then
//! recovered per candidate with a DP anchored at the candidate's end.

/// A candidate occurrence of the pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringMatch {
    /// Start offset of match in text
    pub start: usize,
    /// End offset of match in text
    pub end: usize,
    /// Edit distance between the pattern and `text[start..end]`
    pub errors: usize,
}

/// All non-overlapping-agnostic literal occurrences of `pattern` in `text`
pub fn exact_matches(text: &[char], pattern: &[char]) -> Vec<StringMatch> {
    if pattern.is_empty() || pattern.len() > text.len() {
        return Vec::new();
    }
    text.windows(pattern.len())
        .enumerate()
        .filter(|(_, window)| *window == pattern)
        .map(|(start, _)| StringMatch {
            start,
            end: start + pattern.len(),
            errors: 0,
        })
        .collect()
}

/// Find the best approximate matches for `pattern` in `text` allowing up to
/// `max_errors` errors.
///
/// Only matches with the minimum error count found are returned, in text
/// order. Returns an empty list if either input is empty or nothing is within
/// budget.
pub fn search(text: &[char], pattern: &[char], max_errors: usize) -> Vec<StringMatch> {
    if pattern.is_empty() || text.is_empty() {
        return Vec::new();
    }
    find_match_ends(text, pattern, max_errors)
        .into_iter()
        .map(|(end, errors)| StringMatch {
            start: find_match_start(text, pattern, end, errors),
            end,
            errors,
        })
        .collect()
}

/// `(end, errors)` for every end offset at which the pattern matches with the
/// minimum error count.
fn find_match_ends(text: &[char], pattern: &[char], max_errors: usize) -> Vec<(usize, usize)> {
    let m = pattern.len();
    let mut k = max_errors;

    // col[i] = distance between pattern[..i] and the best suffix of the text
    // consumed so far. Starting anywhere in the text is free, so col[0] = 0.
    let mut col: Vec<usize> = (0..=m).collect();
    let mut last_active = k.min(m);
    let mut ends = Vec::new();

    for (j, &ch) in text.iter().enumerate() {
        let top = (last_active + 1).min(m);
        if top > last_active {
            // Rows past the cut-off are only known to exceed k.
            col[top] = k + 1;
        }

        let mut diagonal = col[0];
        for i in 1..=top {
            let above = col[i];
            let cost = usize::from(pattern[i - 1] != ch);
            col[i] = (diagonal + cost).min(above + 1).min(col[i - 1] + 1);
            diagonal = above;
        }

        last_active = top;
        while last_active > 0 && col[last_active] > k {
            last_active -= 1;
        }

        if last_active == m {
            let errors = col[m];
            if errors < k || ends.is_empty() {
                if errors < k {
                    ends.clear();
                }
                k = errors;
                while last_active > 0 && col[last_active] > k {
                    last_active -= 1;
                }
            }
            if errors == k {
                ends.push((j + 1, errors));
            }
        }
    }

    ends
}

/// Earliest start of a substring ending at `end` whose distance to `pattern`
/// is `errors`.
fn find_match_start(text: &[char], pattern: &[char], end: usize, errors: usize) -> usize {
    let m = pattern.len();
    let min_start = end.saturating_sub(m + errors);
    let window = &text[min_start..end];
    let w = window.len();

    // row[l] = distance between the last i pattern chars and the last l
    // window chars, both anchored at `end`.
    let mut row: Vec<usize> = (0..=w).collect();
    for i in 1..=m {
        let mut diagonal = row[0];
        row[0] = i;
        for l in 1..=w {
            let above = row[l];
            let cost = usize::from(pattern[m - i] != window[w - l]);
            row[l] = (diagonal + cost).min(above + 1).min(row[l - 1] + 1);
            diagonal = above;
        }
    }

    let longest = (0..=w).rev().find(|&l| row[l] == errors).unwrap_or(m.min(w));
    end - longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_exact_matches_overlap() {
        let matches = exact_matches(&chars("aaaa"), &chars("aa"));
        let starts: Vec<usize> = matches.iter().map(|m| m.start).collect();
        assert_eq!(starts, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_single_substitution() {
        let matches = search(&chars("the quick brown fox"), &chars("quack"), 2);
        assert_eq!(
            matches,
            vec![StringMatch {
                start: 4,
                end: 9,
                errors: 1
            }]
        );
    }

    #[test]
    fn test_search_deletion_and_insertion() {
        // "brwn" needs one insertion to become "brown"
        let matches = search(&chars("the quick brown fox"), &chars("brwn"), 2);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].errors, 1);
        assert_eq!(matches[0].end, 15);
        assert_eq!(matches[0].start, 10);

        // "quiick" needs one deletion
        let matches = search(&chars("the quick brown fox"), &chars("quiick"), 3);
        assert_eq!(matches[0].errors, 1);
        assert_eq!((matches[0].start, matches[0].end), (4, 9));
    }

    #[test]
    fn test_search_keeps_only_minimum_errors() {
        let matches = search(&chars("cat cut cat"), &chars("cat"), 1);
        assert!(matches.iter().all(|m| m.errors == 0));
        let starts: Vec<usize> = matches.iter().map(|m| m.start).collect();
        assert_eq!(starts, vec![0, 8]);
    }

    #[test]
    fn test_search_over_budget() {
        assert!(search(&chars("abcdef"), &chars("xyz"), 1).is_empty());
    }

    #[test]
    fn test_search_full_budget_always_matches() {
        let matches = search(&chars("abc"), &chars("xyz"), 3);
        assert!(!matches.is_empty());
        assert!(matches.iter().all(|m| m.errors == 3));
    }

    #[test]
    fn test_search_empty_inputs() {
        assert!(search(&[], &chars("a"), 1).is_empty());
        assert!(search(&chars("a"), &[], 1).is_empty());
    }
}
