//! Pluggable label similarity functions on a [0, 100] scale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::MatchPipelineError;

/// Built-in similarity functions.
///
/// Every variant is deterministic and returns a score in [0, 100].
/// All are symmetric in their arguments except [`Self::JaroWinkler`],
/// which weighs common prefixes and is therefore order-sensitive in
/// principle (the strsim implementation is symmetric, but callers
/// plugging their own function should document any asymmetry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    /// Lowercase, whitespace-tokenize, sort tokens, then normalized
    /// Levenshtein on the rejoined strings. Insensitive to case and
    /// word order, e.g. "Fund Alpha" vs "alpha fund" scores 100.
    #[default]
    TokenSortRatio,
    /// Normalized Levenshtein on the raw strings.
    NormalizedLevenshtein,
    /// Jaro-Winkler on the raw strings.
    JaroWinkler,
}

impl SimilarityKind {
    /// Scores two labels, returning a value in [0, 100].
    #[must_use]
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::TokenSortRatio => token_sort_ratio(a, b),
            Self::NormalizedLevenshtein => strsim::normalized_levenshtein(a, b) * 100.0,
            Self::JaroWinkler => strsim::jaro_winkler(a, b) * 100.0,
        }
    }
}

impl fmt::Display for SimilarityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenSortRatio => write!(f, "token_sort_ratio"),
            Self::NormalizedLevenshtein => write!(f, "normalized_levenshtein"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
        }
    }
}

impl FromStr for SimilarityKind {
    type Err = MatchPipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "token_sort_ratio" => Ok(Self::TokenSortRatio),
            "normalized_levenshtein" => Ok(Self::NormalizedLevenshtein),
            "jaro_winkler" => Ok(Self::JaroWinkler),
            other => Err(MatchPipelineError::Config(format!(
                "unknown similarity function '{other}' \
                 (expected token_sort_ratio, normalized_levenshtein, or jaro_winkler)"
            ))),
        }
    }
}

/// Token-sort ratio: case- and word-order-insensitive edit similarity.
#[must_use]
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&sort_tokens(a), &sort_tokens(b)) * 100.0
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<String> = s.split_whitespace().map(str::to_lowercase).collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_labels_score_100() {
        assert_eq!(SimilarityKind::TokenSortRatio.score("Alpha Fund", "Alpha Fund"), 100.0);
        assert_eq!(
            SimilarityKind::NormalizedLevenshtein.score("Alpha Fund", "Alpha Fund"),
            100.0
        );
        assert_eq!(SimilarityKind::JaroWinkler.score("Alpha Fund", "Alpha Fund"), 100.0);
    }

    #[test]
    fn test_token_sort_ignores_order_and_case() {
        assert_eq!(token_sort_ratio("Fund Alpha", "alpha fund"), 100.0);
        assert_eq!(token_sort_ratio("Global  Growth   Fund", "fund global growth"), 100.0);
    }

    #[test]
    fn test_scores_within_range() {
        let pairs = [
            ("Alpha Fund", "Beta Fund"),
            ("", "anything"),
            ("one", ""),
            ("exact", "exact"),
        ];
        for kind in [
            SimilarityKind::TokenSortRatio,
            SimilarityKind::NormalizedLevenshtein,
            SimilarityKind::JaroWinkler,
        ] {
            for (a, b) in pairs {
                let score = kind.score(a, b);
                assert!((0.0..=100.0).contains(&score), "{kind}({a:?}, {b:?}) = {score}");
            }
        }
    }

    #[test]
    fn test_determinism() {
        let kind = SimilarityKind::TokenSortRatio;
        let first = kind.score("Alpha Growth Fund", "Alpha Grwth Fund");
        let second = kind.score("Alpha Growth Fund", "Alpha Grwth Fund");
        assert_eq!(first, second);
    }

    #[test]
    fn test_dissimilar_labels_score_low() {
        let score = SimilarityKind::TokenSortRatio.score("Alpha Fund", "Zzz Holdings Kft");
        assert!(score < 40.0, "score {score}");
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "token_sort_ratio".parse::<SimilarityKind>().unwrap(),
            SimilarityKind::TokenSortRatio
        );
        assert_eq!(
            "jaro-winkler".parse::<SimilarityKind>().unwrap(),
            SimilarityKind::JaroWinkler
        );
        assert!("soundex".parse::<SimilarityKind>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for kind in [
            SimilarityKind::TokenSortRatio,
            SimilarityKind::NormalizedLevenshtein,
            SimilarityKind::JaroWinkler,
        ] {
            assert_eq!(kind.to_string().parse::<SimilarityKind>().unwrap(), kind);
        }
    }
}
