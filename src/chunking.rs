//! Overlapping fixed-size token windows.
//!
//! A transcript is far longer than one completion request allows, so it is cut
//! into windows of at most `chunk_size` tokens. Consecutive windows share
//! `overlap` tokens so a sentence straddling a boundary is seen whole by at
//! least one request.

use crate::error::{Result, YoyakuError};
use crate::layout::RunLayout;
use crate::stage::write_atomic;
use crate::tokenizer::{TokenId, Tokenizer};
use tracing::{debug, info};

/// Validated window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    /// Requires `0 <= overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(YoyakuError::Config(
                "chunk_size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(YoyakuError::Config(format!(
                "chunk_overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive chunks.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// One window of a token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position among all chunks.
    pub index: usize,
    /// Offset of the first token in the source sequence.
    pub offset: usize,
    pub tokens: Vec<TokenId>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Offset one past the last token.
    pub fn end(&self) -> usize {
        self.offset + self.tokens.len()
    }
}

/// Split `tokens` into overlapping windows.
///
/// Stops as soon as a window reaches the end of the input, so no trailing
/// chunk lies entirely inside its predecessor's overlap. Empty input yields no
/// chunks.
pub fn split(tokens: &[TokenId], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut offset = 0;

    while offset < tokens.len() {
        let end = (offset + config.chunk_size).min(tokens.len());
        chunks.push(Chunk {
            index: chunks.len(),
            offset,
            tokens: tokens[offset..end].to_vec(),
        });

        if end == tokens.len() {
            break;
        }
        offset += config.stride();
    }

    chunks
}

/// Persist each chunk's decoded text to `chunks/<base>_<i>.txt`.
///
/// Existing files are left alone unless `overwrite` is set. Returns the number
/// of files written.
pub fn write_chunk_files(
    chunks: &[Chunk],
    tokenizer: &Tokenizer,
    layout: &RunLayout,
    overwrite: bool,
) -> Result<usize> {
    std::fs::create_dir_all(layout.chunks_dir())?;

    let mut written = 0;
    for chunk in chunks {
        let path = layout.chunk_path(chunk.index);
        if path.exists() && !overwrite {
            debug!("Skipping chunk {}, file already exists", chunk.index);
            continue;
        }

        debug!("Writing chunk {}: {} tokens", chunk.index, chunk.len());
        let text = tokenizer.decode(&chunk.tokens)?;
        write_atomic(&path, &text)?;
        written += 1;
    }

    info!(
        "Finished writing chunk files ({} written, {} already present)",
        written,
        chunks.len() - written
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(n: usize) -> Vec<TokenId> {
        (0..n as TokenId).collect()
    }

    #[test]
    fn test_lecture_sized_input() {
        let config = ChunkingConfig::new(2000, 100).unwrap();
        let chunks = split(&seq(4500), &config);

        let offsets: Vec<usize> = chunks.iter().map(|c| c.offset).collect();
        let lengths: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(offsets, vec![0, 1900, 3800]);
        assert_eq!(lengths, vec![2000, 2000, 700]);
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_short_input_is_single_chunk() {
        let config = ChunkingConfig::new(2000, 100).unwrap();
        let tokens = seq(42);
        let chunks = split(&tokens, &config);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].tokens, tokens);
    }

    #[test]
    fn test_exact_chunk_size_is_single_chunk() {
        let config = ChunkingConfig::new(10, 3).unwrap();
        let chunks = split(&seq(10), &config);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let config = ChunkingConfig::new(10, 3).unwrap();
        assert!(split(&[], &config).is_empty());
    }

    #[test]
    fn test_windows_cover_every_token_within_bounds() {
        for (n, size, overlap) in [(1, 5, 0), (37, 10, 3), (100, 10, 9), (101, 25, 0), (64, 8, 4)] {
            let config = ChunkingConfig::new(size, overlap).unwrap();
            let tokens = seq(n);
            let chunks = split(&tokens, &config);

            assert!(chunks.iter().all(|c| c.len() <= size && !c.is_empty()));
            assert_eq!(chunks[0].offset, 0);
            assert_eq!(chunks.last().unwrap().end(), n);

            // Consecutive windows overlap by exactly `overlap` tokens
            for pair in chunks.windows(2) {
                assert_eq!(pair[0].end() - pair[1].offset, overlap);
                assert_eq!(pair[0].tokens[size - overlap..], pair[1].tokens[..overlap]);
            }

            // Dropping each overlap reconstructs the input exactly once
            let mut rebuilt: Vec<TokenId> = chunks[0].tokens.clone();
            for chunk in &chunks[1..] {
                rebuilt.extend_from_slice(&chunk.tokens[overlap..]);
            }
            assert_eq!(rebuilt, tokens, "n={n} size={size} overlap={overlap}");
        }
    }

    #[test]
    fn test_invalid_parameters_are_config_errors() {
        assert!(matches!(ChunkingConfig::new(0, 0), Err(YoyakuError::Config(_))));
        assert!(matches!(ChunkingConfig::new(10, 10), Err(YoyakuError::Config(_))));
        assert!(matches!(ChunkingConfig::new(10, 11), Err(YoyakuError::Config(_))));
        assert_eq!(ChunkingConfig::new(10, 0).unwrap().stride(), 10);
    }

    #[test]
    fn test_single_token_tail_of_a_kanji_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path(), "kanji");
        let tokenizer = Tokenizer::new().unwrap();

        let text = "憂鬱な講義";
        let tokens = tokenizer.encode(text);
        let chunks = split(&tokens, &ChunkingConfig::new(1, 0).unwrap());
        assert_eq!(chunks.len(), tokens.len());

        assert_eq!(write_chunk_files(&chunks, &tokenizer, &layout, false).unwrap(), chunks.len());
        for chunk in &chunks {
            let written = std::fs::read_to_string(layout.chunk_path(chunk.index)).unwrap();
            assert!(text.contains(&written), "{written:?} not in original");
        }
    }

    #[test]
    fn test_write_chunk_files_respects_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path(), "lecture");
        let tokenizer = Tokenizer::new().unwrap();

        let tokens = tokenizer.encode("alpha beta gamma delta epsilon zeta eta theta");
        let chunks = split(&tokens, &ChunkingConfig::new(4, 1).unwrap());
        assert!(chunks.len() > 1);

        assert_eq!(write_chunk_files(&chunks, &tokenizer, &layout, false).unwrap(), chunks.len());
        let first = std::fs::read_to_string(layout.chunk_path(0)).unwrap();
        assert_eq!(first, tokenizer.decode(&chunks[0].tokens).unwrap());

        std::fs::write(layout.chunk_path(0), "edited").unwrap();
        assert_eq!(write_chunk_files(&chunks, &tokenizer, &layout, false).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(layout.chunk_path(0)).unwrap(), "edited");

        assert_eq!(write_chunk_files(&chunks, &tokenizer, &layout, true).unwrap(), chunks.len());
        assert_eq!(std::fs::read_to_string(layout.chunk_path(0)).unwrap(), first);
    }
}
