//! Approximate matcher
//!
//! Bitap (shift-and with error levels) over case-folded chars. For each error
//! level a binary search bounds how far from the expected location a match may
//! start and still beat the running best score; the text is then scanned right
//! to left with one bitmask per position. The best alignment's score combines:
//!
//! - accuracy: `errors / pattern_len`
//! - proximity: `|start - location| / distance`
//! - a bonus for the longest contiguous run inside the best alignment
//!
//! Lower is better (0 = exact match at the expected location).
//!
//! Offsets are char offsets. Folding is per char, so folded and original text
//! share offsets. Accent folding is not done: "café" and "cafe" differ by one
//! substitution.

use std::collections::HashMap;
use std::ops::Range;

use crate::config::MatcherOptions;

/// Longest pattern the bitmask can hold
pub const MAX_PATTERN_CHARS: usize = 64;

/// Lowercase one char, keeping a 1:1 char mapping
pub(crate) fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

pub(crate) fn fold_chars(text: &str) -> Vec<char> {
    text.chars().map(fold_char).collect()
}

/// 64-bit character-set bloom. Disjoint blooms mean no shared chars.
pub(crate) fn char_bloom(chars: &[char]) -> u64 {
    chars.iter().fold(0u64, |acc, &c| acc | bloom_bit(c))
}

fn bloom_bit(c: char) -> u64 {
    1u64 << ((c as u32).wrapping_mul(0x9E37_79B1) >> 26)
}

/// A compiled query: folded chars plus the per-char position masks.
#[derive(Debug, Clone)]
pub struct Pattern {
    chars: Vec<char>,
    alphabet: HashMap<char, u64>,
    bloom: u64,
}

impl Pattern {
    /// Compile a query. `None` when the trimmed text is empty or longer
    /// than `MAX_PATTERN_CHARS`.
    pub fn new(query: &str) -> Option<Self> {
        let chars = fold_chars(query.trim());
        if chars.is_empty() || chars.len() > MAX_PATTERN_CHARS {
            return None;
        }

        let len = chars.len();
        let mut alphabet: HashMap<char, u64> = HashMap::new();
        for (i, &c) in chars.iter().enumerate() {
            *alphabet.entry(c).or_insert(0) |= 1u64 << (len - i - 1);
        }
        let bloom = char_bloom(&chars);

        Some(Self { chars, alphabet, bloom })
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    fn mask(&self, c: char) -> u64 {
        self.alphabet.get(&c).copied().unwrap_or(0)
    }

    /// Coarse pre-filter: false only if the field shares no char with the pattern
    pub(crate) fn may_match(&self, field_bloom: u64) -> bool {
        self.bloom & field_bloom != 0
    }
}

/// Best approximate occurrence of a pattern inside one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    /// In [0, 1], lower is closer
    pub distance: f64,
    /// Ordered, non-overlapping char ranges that contributed to the match
    pub ranges: Vec<Range<usize>>,
}

/// Stateless approximate matcher. Cheap to copy; safe to share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    options: MatcherOptions,
}

impl Matcher {
    pub fn new(options: MatcherOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    /// Match a raw query against raw field text
    pub fn find_str(&self, query: &str, text: &str, max_distance: f64) -> Option<FieldMatch> {
        let pattern = Pattern::new(query)?;
        self.find(&pattern, text, max_distance)
    }

    pub fn find(&self, pattern: &Pattern, text: &str, max_distance: f64) -> Option<FieldMatch> {
        self.find_folded(pattern, &fold_chars(text), max_distance)
    }

    /// Match against text that is already folded with `fold_chars`.
    /// `None` means no occurrence ends up within `max_distance` once the run
    /// bonus is applied.
    pub(crate) fn find_folded(&self, pattern: &Pattern, text: &[char], max_distance: f64) -> Option<FieldMatch> {
        let pattern_len = pattern.len();
        let text_len = text.len();
        if text_len == 0 || pattern_len == 0 {
            return None;
        }

        let opts = &self.options;
        // The run bonus shaves at most `run_bonus` off a raw score, so prune
        // at the widest raw score that can still land within `max_distance`
        let raw_bound = max_distance / (1.0 - opts.run_bonus.clamp(0.0, 0.99));

        // The length excess alone costs that many deletions
        if pattern_len > text_len && (pattern_len - text_len) as f64 / pattern_len as f64 > raw_bound {
            return None;
        }

        let expected = opts.location.min(text_len);
        let mut current_threshold = raw_bound;
        let mut best: Option<(usize, f64)> = None;
        let mut match_mask = vec![false; text_len];

        // Exact occurrences tighten the threshold before the bitap pass
        let mut from = 0;
        while let Some(index) = find_from(text, &pattern.chars, from) {
            let score = self.alignment_score(pattern_len, 0, index, expected);
            if score <= current_threshold {
                current_threshold = score;
                best = Some((index, score));
            }
            match_mask[index..index + pattern_len].iter_mut().for_each(|m| *m = true);
            from = index + pattern_len;
        }

        let top_bit = 1u64 << (pattern_len - 1);
        let mut last_bits: Vec<u64> = Vec::new();
        let mut bin_max = pattern_len + text_len;

        for errors in 0..pattern_len {
            // Widest displacement at which `errors` edits can still win
            let mut bin_min = 0;
            let mut bin_mid = bin_max;
            while bin_min < bin_mid {
                if self.alignment_score(pattern_len, errors, expected + bin_mid, expected) <= current_threshold {
                    bin_min = bin_mid;
                } else {
                    bin_max = bin_mid;
                }
                bin_mid = (bin_max - bin_min) / 2 + bin_min;
            }
            bin_max = bin_mid;

            let mut start = (expected + 1).saturating_sub(bin_mid).max(1);
            let finish = if opts.find_all_matches {
                text_len
            } else {
                (expected + bin_mid).min(text_len) + pattern_len
            };

            let mut bits = vec![0u64; finish + 2];
            bits[finish + 1] = (1u64 << errors) - 1;

            let mut j = finish;
            while j >= start {
                let location = j - 1;
                let char_match = text.get(location).map_or(0, |&c| pattern.mask(c));
                if char_match != 0 {
                    match_mask[location] = true;
                }

                let mut state = ((bits[j + 1] << 1) | 1) & char_match;
                if errors > 0 {
                    let prev_next = last_bits.get(j + 1).copied().unwrap_or(0);
                    let prev_here = last_bits.get(j).copied().unwrap_or(0);
                    state |= ((prev_next | prev_here) << 1) | 1 | prev_next;
                }
                bits[j] = state;

                if state & top_bit != 0 {
                    let score = self.alignment_score(pattern_len, errors, location, expected);
                    if score <= current_threshold {
                        current_threshold = score;
                        best = Some((location, score));
                        if location <= expected {
                            break;
                        }
                        // Nothing further left can beat this one
                        start = (2 * expected).saturating_sub(location).max(1);
                    }
                }
                j -= 1;
            }

            // One more error at the ideal spot already loses
            if self.alignment_score(pattern_len, errors + 1, expected, expected) > current_threshold {
                break;
            }
            last_bits = bits;
        }

        let (best_location, raw_score) = best?;

        let min_run = opts.min_match_char_len.min(pattern_len).max(1);
        let ranges = mask_to_ranges(&match_mask, min_run);
        if ranges.is_empty() {
            return None;
        }

        let window = best_location..(best_location + pattern_len).min(text_len);
        let longest_run = ranges.iter().map(|r| overlap(r, &window)).max().unwrap_or(0);
        let run_ratio = (longest_run as f64 / pattern_len as f64).min(1.0);
        let distance = (raw_score * (1.0 - opts.run_bonus * run_ratio)).clamp(0.0, 1.0);
        if distance > max_distance {
            return None;
        }

        Some(FieldMatch { distance, ranges })
    }

    fn alignment_score(&self, pattern_len: usize, errors: usize, current: usize, expected: usize) -> f64 {
        let accuracy = errors as f64 / pattern_len as f64;
        if self.options.ignore_location {
            return accuracy;
        }

        let proximity = current.abs_diff(expected);
        if self.options.distance == 0 {
            return if proximity > 0 { 1.0 } else { accuracy };
        }

        accuracy + proximity as f64 / self.options.distance as f64
    }
}

/// First exact occurrence of `needle` in `text` at or after `from`
fn find_from(text: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > text.len() {
        return None;
    }
    (from..=text.len() - needle.len()).find(|&i| text[i..i + needle.len()] == *needle)
}

/// Runs of set positions at least `min_len` long
fn mask_to_ranges(mask: &[bool], min_len: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, &set) in mask.iter().enumerate() {
        match (set, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(s)) => {
                if i - s >= min_len {
                    ranges.push(s..i);
                }
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = run_start {
        if mask.len() - s >= min_len {
            ranges.push(s..mask.len());
        }
    }

    ranges
}

fn overlap(a: &Range<usize>, b: &Range<usize>) -> usize {
    a.end.min(b.end).saturating_sub(a.start.max(b.start))
}
