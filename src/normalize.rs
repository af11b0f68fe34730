//! # Text Normalization Module
//!
//! ## Purpose
//! Canonicalizes text before comparison so that queries and entity fields
//! match regardless of casing, punctuation or locale glyph variants.
//!
//! ## Input/Output Specification
//! - **Input**: Raw query or entity field text
//! - **Output**: Canonical lowercase text with punctuation stripped and
//!   locale variants folded; whitespace structure preserved
//!
//! ## Key Features
//! - Unicode NFC normalization before folding
//! - Fixed punctuation strip set
//! - Configurable locale folding table (default: ё → е)
//! - Pure and idempotent

use crate::config::NormalizeConfig;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Punctuation stripped during normalization. Whitespace is untouched so
/// word boundaries survive for downstream tokenization.
const PUNCTUATION: &[char] = &['.', ',', ':', ';', '!', '?', '"', '\'', '«', '»'];

/// Locale-aware text canonicalizer
#[derive(Debug, Clone)]
pub struct Normalizer {
    fold: HashMap<char, char>,
}

impl Normalizer {
    /// Build a normalizer from the configured folding table
    pub fn new(config: &NormalizeConfig) -> Self {
        let fold = config.fold.iter().map(|p| (p.from, p.to)).collect();
        Self { fold }
    }

    /// Canonicalize text for comparison
    pub fn normalize(&self, text: &str) -> String {
        text.nfc()
            .flat_map(char::to_lowercase)
            .filter(|c| !PUNCTUATION.contains(c))
            .map(|c| self.fold.get(&c).copied().unwrap_or(c))
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Hello, World!"), "hello world");
    }

    #[test]
    fn folds_locale_variants() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Ёлка"), n.normalize("елка"));
        assert_eq!(n.normalize("Ёлка"), "елка");
    }

    #[test]
    fn is_idempotent() {
        let n = Normalizer::default();
        let once = n.normalize("Ёж, «в тумане»: шёл?!");
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn preserves_newlines() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("One.\nTwo."), "one\ntwo");
    }
}
