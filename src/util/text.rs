//! Text utilities: markup stripping, keyword extraction and the lexical
//! similarity ratio used for near-duplicate detection.
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tag pattern"));

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9A-Za-z\p{Hangul}]+").expect("valid word pattern"));

/// Strips HTML-like tags, decodes entities and trims surrounding
/// whitespace. Source feeds embed `<b>` highlights and escaped quotes in
/// titles and summaries.
pub fn strip_markup(text: &str) -> String {
    let without_tags = TAG_RE.replace_all(text, "");
    html_escape::decode_html_entities(without_tags.as_ref())
        .trim()
        .to_string()
}

/// Truncates to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

/// Extracts the comparison keyword set from a title: alphanumeric/Hangul
/// runs of at least three characters, lowercased.
pub fn extract_keywords(title: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(title)
        .map(|word| word.as_str())
        .filter(|word| word.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Ratcliff/Obershelp similarity between two character sequences, in
/// `0.0..=1.0`. Matches the sequence-matcher semantics the duplicate
/// thresholds were tuned against: twice the total matched characters over
/// the combined length, with matches found by recursively taking the
/// longest common substring. Callers fold case before comparing.
#[allow(clippy::cast_precision_loss)]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut b_indices: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        b_indices.entry(*ch).or_default().push(j);
    }

    let mut matched = 0usize;
    let mut regions = vec![(0usize, a.len(), 0usize, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = regions.pop() {
        let (best_i, best_j, best_len) = longest_match(&a, &b_indices, a_lo, a_hi, b_lo, b_hi);
        if best_len > 0 {
            matched += best_len;
            regions.push((a_lo, best_i, b_lo, best_j));
            regions.push((best_i + best_len, a_hi, best_j + best_len, b_hi));
        }
    }

    2.0 * matched as f64 / total as f64
}

/// Longest common substring within the given windows, preferring the
/// earliest occurrence on ties.
fn longest_match(
    a: &[char],
    b_indices: &HashMap<char, Vec<usize>>,
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let mut best_i = a_lo;
    let mut best_j = b_lo;
    let mut best_len = 0usize;
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for (i, ch) in a.iter().enumerate().take(a_hi).skip(a_lo) {
        let mut next_runs: HashMap<usize, usize> = HashMap::new();
        if let Some(indices) = b_indices.get(ch) {
            for &j in indices {
                if j < b_lo {
                    continue;
                }
                if j >= b_hi {
                    break;
                }
                let run = j
                    .checked_sub(1)
                    .and_then(|prev| run_lengths.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_runs.insert(j, run);
                if run > best_len {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_len = run;
                }
            }
        }
        run_lengths = next_runs;
    }

    (best_i, best_j, best_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_removes_tags_and_entities() {
        let raw = "<b>AI</b> 보안 &quot;이슈&quot; &amp; 대응";
        assert_eq!(strip_markup(raw), "AI 보안 \"이슈\" & 대응");
    }

    #[test]
    fn strip_markup_trims_whitespace() {
        assert_eq!(strip_markup("  plain text  "), "plain text");
    }

    #[test]
    fn truncate_chars_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("금융보안", 2), "금융");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn extract_keywords_keeps_long_tokens_only() {
        let keywords = extract_keywords("SK쉴더스, 충전기 해킹 성공");
        assert!(keywords.contains("sk쉴더스"));
        assert!(keywords.contains("충전기"));
        // 해킹/성공 are two-character words and fall below the threshold.
        assert!(!keywords.contains("해킹"));
        assert!(!keywords.contains("성공"));
    }

    #[test]
    fn extract_keywords_lowercases_latin() {
        let keywords = extract_keywords("RANSOMWARE attack on BANK");
        assert!(keywords.contains("ransomware"));
        assert!(keywords.contains("attack"));
        assert!(keywords.contains("bank"));
    }

    #[test]
    fn similarity_ratio_identical_is_one() {
        assert!((similarity_ratio("hello", "hello") - 1.0).abs() < f64::EPSILON);
        assert!((similarity_ratio("", "") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_ratio_disjoint_is_zero() {
        assert!(similarity_ratio("abc", "").abs() < f64::EPSILON);
        assert!(similarity_ratio("abc", "xyz").abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_ratio_matches_reference_values() {
        // Values computed with the reference sequence matcher.
        assert!((similarity_ratio("abcd", "bcde") - 0.75).abs() < 1e-9);

        let a = "sk쉴더스, 충전기 해킹 성공";
        let b = "sk쉴더스, 폰투온서 충전기 해킹";
        assert!((similarity_ratio(a, b) - 0.764_705_882_352_941_2).abs() < 1e-9);

        let a = "금융권 대규모 해킹 사고 발생";
        let b = "금융권 해킹 사고, 대규모 피해 발생 확인";
        assert!((similarity_ratio(a, b) - 0.615_384_615_384_615_4).abs() < 1e-9);
    }

    #[test]
    fn similarity_ratio_unrelated_titles_stay_low() {
        let a = "신한은행 개인정보 유출 정황 포착";
        let b = "우리은행 신규 대출 상품 출시";
        assert!(similarity_ratio(a, b) < 0.60);
    }
}
