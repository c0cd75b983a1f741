//! Token encoding for sizing requests.
//!
//! Wraps the GPT-2 byte-pair vocabulary (`r50k_base`). Every chunk size and
//! overlap in the crate is measured in these tokens.

use crate::error::{Result, YoyakuError};
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// A single token id.
pub type TokenId = u32;

/// How many edge tokens [`Tokenizer::decode`] may drop to recover valid UTF-8.
const MAX_EDGE_TRIM: usize = 3;

/// Deterministic text <-> token id codec.
pub struct Tokenizer {
    bpe: CoreBPE,
}

impl Tokenizer {
    /// Load the GPT-2 vocabulary.
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::r50k_base()
            .map_err(|e| YoyakuError::Tokenizer(format!("Failed to load r50k_base: {e}")))?;
        Ok(Self { bpe })
    }

    /// Encode text to token ids. Special-token markup in the text is treated as plain text.
    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        self.bpe.encode_ordinary(text)
    }

    /// Decode token ids back to text.
    ///
    /// A window cut out of a longer sequence can start or end in the middle of a
    /// multi-byte character. When that happens the partial bytes at either edge are
    /// dropped, which loses at most one character per edge. A short window that
    /// holds only pieces of one character decodes to an empty string.
    pub fn decode(&self, tokens: &[TokenId]) -> Result<String> {
        if tokens.is_empty() {
            return Ok(String::new());
        }

        let mut last_err = None;
        for lead in 0..=MAX_EDGE_TRIM.min(tokens.len() - 1) {
            for trail in 0..=MAX_EDGE_TRIM.min(tokens.len() - 1 - lead) {
                let window = &tokens[lead..tokens.len() - trail];
                match self.bpe.decode(window.to_vec()) {
                    Ok(text) => return Ok(text),
                    Err(e) => last_err = Some(e),
                }
            }
        }

        if tokens.len() <= MAX_EDGE_TRIM + 1 {
            debug!(
                "{} tokens hold no complete character, decoding to empty text",
                tokens.len()
            );
            return Ok(String::new());
        }

        Err(YoyakuError::Tokenizer(format!(
            "Failed to decode {} tokens: {}",
            tokens.len(),
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Number of tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_deterministic() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "The quick brown fox jumps over the lazy dog.";
        assert_eq!(tokenizer.encode(text), tokenizer.encode(text));
        assert_eq!(tokenizer.count(text), tokenizer.encode(text).len());
    }

    #[test]
    fn test_decode_reconstructs_text() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "Lecture notes: variables, loops, and functions.";
        let tokens = tokenizer.encode(text);
        assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
    }

    #[test]
    fn test_split_ranges_concatenate_to_original() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "First sentence here. Second sentence follows. Third one closes.";
        let tokens = tokenizer.encode(text);
        let mid = tokens.len() / 2;

        let left = tokenizer.decode(&tokens[..mid]).unwrap();
        let right = tokenizer.decode(&tokens[mid..]).unwrap();
        assert_eq!(format!("{left}{right}"), text);
    }

    #[test]
    fn test_decode_window_inside_multibyte_text() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "今日はプログラミングの基礎について学びます。";
        let tokens = tokenizer.encode(text);

        // Any interior window must decode to some substring of the original
        for start in 0..tokens.len().min(4) {
            let decoded = tokenizer.decode(&tokens[start..]).unwrap();
            assert!(text.contains(&decoded), "{decoded:?} not in original");
        }
    }

    #[test]
    fn test_lone_pieces_of_a_kanji_decode_to_substrings() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "纏繞鬱蔑";
        let tokens = tokenizer.encode(text);
        // Rare kanji are split into several byte-level tokens
        assert!(tokens.len() > text.chars().count());

        for token in &tokens {
            let decoded = tokenizer.decode(&[*token]).unwrap();
            assert!(text.contains(&decoded), "{decoded:?} not in original");
        }
    }

    #[test]
    fn test_empty_input() {
        let tokenizer = Tokenizer::new().unwrap();
        assert!(tokenizer.encode("").is_empty());
        assert_eq!(tokenizer.decode(&[]).unwrap(), "");
        assert_eq!(tokenizer.count(""), 0);
    }
}
