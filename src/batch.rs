//! Parallel encode/decode over collections of texts, preserving input order
//! (spec 4.9). Grounded on the teacher's `counter.rs` `encode_batch`/
//! `encode_ordinary_batch`, which drive `rayon`'s `par_iter` the same way; here
//! the worker count is additionally bounded by a caller-supplied
//! `max_concurrency` via a scoped thread pool instead of the global one.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::errors::{TokenizerError, TokenizerResult};
use crate::rank_table::Rank;
use crate::special::SpecialTokenPolicy;
use crate::vocab::Encoding;

/// Encodes every text in `texts` against `encoding`, preserving order. Runs on a
/// scoped pool of `min(max_concurrency, texts.len())` workers
/// (`max_concurrency` itself is expected to be `<= available_parallelism`). The
/// first per-item error cancels the operation; remaining results are discarded.
pub fn encode_batch(
    encoding: &Encoding,
    texts: &[&str],
    allowed: &SpecialTokenPolicy,
    disallowed: &SpecialTokenPolicy,
    max_concurrency: usize,
) -> TokenizerResult<Vec<Vec<Rank>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let workers = max_concurrency.max(1).min(texts.len());
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| TokenizerError::ValueError(e.to_string()))?;

    pool.install(|| {
        texts
            .par_iter()
            .map(|text| encoding.encode(text, allowed, disallowed))
            .collect()
    })
}

/// Decodes every token sequence in `token_sequences`, preserving order.
/// Infallible: unresolvable tokens are silently dropped by `decode_bytes`, so no
/// per-item error can occur.
pub fn decode_batch(
    encoding: &Encoding,
    token_sequences: &[&[Rank]],
    max_concurrency: usize,
) -> Vec<Vec<u8>> {
    if token_sequences.is_empty() {
        return Vec::new();
    }

    let workers = max_concurrency.max(1).min(token_sequences.len());
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .expect("thread pool with a positive worker count always builds");

    pool.install(|| {
        token_sequences
            .par_iter()
            .map(|tokens| encoding.decode_bytes(tokens))
            .collect()
    })
}
