//! The streaming adapter: chunked, provenance-tagged token emission over a
//! `tokio::sync::mpsc` channel (spec 4.10). The teacher has no streaming
//! precedent of its own — its `OpenAI`/`TokenEncoding` are purely synchronous —
//! so this module follows the spec's cooperative single-producer design
//! directly, using the same `tokio` dependency the teacher already carries for
//! its (unused in this fork) async surface.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core_bpe::Segment;
use crate::errors::TokenizerResult;
use crate::rank_table::Rank;
use crate::special::SpecialTokenPolicy;
use crate::vocab::Encoding;

/// Where a [`StreamChunk`]'s tokens came from in the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provenance {
    /// A slice of an ordinary (non-special) segment's tokens, tagged with that
    /// whole segment's character range — not the sub-range the slice itself
    /// covers (spec 4.10).
    Text { char_start: usize, char_end: usize },
    /// A single accepted special token.
    Special {
        literal: String,
        char_position: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamChunk {
    pub tokens: Vec<Rank>,
    pub provenance: Provenance,
}

fn chunk_segments(segments: Vec<Segment>, chunk_size: usize) -> Vec<StreamChunk> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();

    for segment in segments {
        match segment {
            Segment::Special {
                token,
                literal,
                char_start,
            } => chunks.push(StreamChunk {
                tokens: vec![token],
                provenance: Provenance::Special {
                    literal,
                    char_position: char_start,
                },
            }),
            Segment::Ordinary {
                tokens,
                char_start,
                char_end,
            } => {
                for slice in tokens.chunks(chunk_size) {
                    chunks.push(StreamChunk {
                        tokens: slice.to_vec(),
                        provenance: Provenance::Text {
                            char_start,
                            char_end,
                        },
                    });
                }
            }
        }
    }

    chunks
}

/// Spawns a single producer task that segments `text` and pushes `StreamChunk`s
/// into the returned receiver in source-text order, then closes the channel.
/// The channel is unbounded, matching the spec's "backpressure-free sink"
/// (spec 5).
pub fn stream(
    encoding: Arc<Encoding>,
    text: String,
    allowed: SpecialTokenPolicy,
    disallowed: SpecialTokenPolicy,
    chunk_size: usize,
) -> mpsc::UnboundedReceiver<TokenizerResult<StreamChunk>> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (allowed_resolved, disallowed_resolved) =
            SpecialTokenPolicy::resolve(&allowed, &disallowed, encoding.special_tokens());

        match encoding
            .core()
            .segment_native(&text, &allowed_resolved, &disallowed_resolved)
        {
            Ok(segments) => {
                for chunk in chunk_segments(segments, chunk_size) {
                    if tx.send(Ok(chunk)).is_err() {
                        return;
                    }
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err));
            }
        }
    });

    rx
}
