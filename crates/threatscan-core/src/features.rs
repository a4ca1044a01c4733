//! Content features feeding the simulated ML score.
//!
//! - Shannon entropy over the first `ENTROPY_WINDOW` characters
//! - Case-insensitive hits from a short list of suspicious n-grams
//! - File name and size hints

use std::collections::HashMap;

/// Characters sampled for the entropy estimate.
pub const ENTROPY_WINDOW: usize = 1000;
/// Entropy (bits per char) above which content looks packed or encrypted.
pub const HIGH_ENTROPY: f64 = 7.5;

pub const SUSPICIOUS_NGRAMS: [&str; 5] = ["cmd", "exe", "dll", "reg", "sys"];

const HIGH_ENTROPY_POINTS: u32 = 20;
const NGRAM_POINTS: u32 = 5;
const TEMP_NAME_POINTS: u32 = 10;
const TINY_FILE_POINTS: u32 = 15;
const TINY_FILE_LIMIT: u64 = 100;
/// Ceiling on the whole ML contribution.
pub const ML_SCORE_CAP: u32 = 50;

/// Shannon entropy (base 2) of the character distribution of `text`.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0u32;
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    let mut entropy = 0.0f64;
    for &c in counts.values() {
        let p = c as f64 / total;
        entropy -= p * p.log2();
    }
    entropy
}

/// Entropy of the sampled prefix of `text`.
pub fn sampled_entropy(text: &str) -> f64 {
    let end = text
        .char_indices()
        .nth(ENTROPY_WINDOW)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    shannon_entropy(&text[..end])
}

/// Suspicious n-grams present in `text`, case-insensitively.
pub fn ngram_hits(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    SUSPICIOUS_NGRAMS
        .iter()
        .copied()
        .filter(|ngram| lowered.contains(ngram))
        .collect()
}

/// Per-signal breakdown of the ML sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MlFeatures {
    pub entropy: f64,
    pub ngram_hits: usize,
    pub temp_name: bool,
    pub tiny_file: bool,
}

impl MlFeatures {
    pub fn extract(file_name: &str, file_size: u64, content: Option<&str>) -> Self {
        let (entropy, ngram_hits) = match content {
            Some(text) => (sampled_entropy(text), ngram_hits(text).len()),
            None => (0.0, 0),
        };
        Self {
            entropy,
            ngram_hits,
            temp_name: file_name.contains("temp") || file_name.contains("tmp"),
            tiny_file: file_size > 0 && file_size < TINY_FILE_LIMIT,
        }
    }

    /// Capped point contribution.
    pub fn score(&self) -> u32 {
        let mut score = 0;
        if self.entropy > HIGH_ENTROPY {
            score += HIGH_ENTROPY_POINTS;
        }
        score += NGRAM_POINTS * self.ngram_hits as u32;
        if self.temp_name {
            score += TEMP_NAME_POINTS;
        }
        if self.tiny_file {
            score += TINY_FILE_POINTS;
        }
        score.min(ML_SCORE_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_of_repeated_char_is_zero() {
        assert_eq!(shannon_entropy("aaaaaaaaaa"), 0.0);
        assert_eq!(shannon_entropy(""), 0.0);
    }

    #[test]
    fn entropy_of_uniform_symbols_is_log2_k() {
        let two: String = (0..1000).map(|i| if i % 2 == 0 { 'a' } else { 'b' }).collect();
        assert!((shannon_entropy(&two) - 1.0).abs() < 1e-9);

        let sixteen: String = "0123456789abcdef".repeat(8);
        assert!((shannon_entropy(&sixteen) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn sampled_entropy_only_reads_the_window() {
        let mut text = "x".repeat(ENTROPY_WINDOW);
        text.push_str("0123456789abcdefghijklmnopqrstuvwxyz");
        assert_eq!(sampled_entropy(&text), 0.0);
    }

    #[test]
    fn wide_alphabet_trips_high_entropy() {
        let text: String = (0x100u32..0x100 + 256)
            .filter_map(char::from_u32)
            .cycle()
            .take(ENTROPY_WINDOW)
            .collect();
        let features = MlFeatures::extract("blob.dat", 4096, Some(&text));
        assert!(features.entropy > HIGH_ENTROPY);
        assert_eq!(features.score(), 20);
    }

    #[test]
    fn ngram_hits_ignore_case() {
        assert_eq!(ngram_hits("Run CMD.EXE then load a DLL"), vec!["cmd", "exe", "dll"]);
        assert!(ngram_hits("hello world").is_empty());
    }

    #[test]
    fn ml_score_is_capped() {
        let text = "cmd exe dll reg sys";
        let features = MlFeatures::extract("tmp_dropper", 50, Some(text));
        // 25 (ngrams) + 10 (temp) + 15 (tiny) = 50
        assert_eq!(features.score(), 50);

        let over = MlFeatures {
            entropy: 8.0,
            ngram_hits: 5,
            temp_name: true,
            tiny_file: true,
        };
        assert_eq!(over.score(), ML_SCORE_CAP);
    }

    #[test]
    fn zero_size_is_not_tiny() {
        let features = MlFeatures::extract("empty", 0, None);
        assert!(!features.tiny_file);
        assert_eq!(features.score(), 0);
    }
}
