//! A byte-pair-encoding tokenizer compatible with the OpenAI tiktoken encoding
//! family (gpt2, r50k_base, p50k_base, p50k_edit, cl100k_base, o200k_base,
//! o200k_harmony).
//!
//! The core pipeline ([`core_bpe`], [`merge`], [`rank_table`], [`special`]) is
//! pure and allocation-light; everything that touches the filesystem or the
//! network ([`loader::fetch`]) is isolated behind a narrow interface so the
//! encoder itself never depends on how its vocabulary got there.

pub mod batch;
pub mod core_bpe;
pub mod errors;
pub mod loader;
pub mod merge;
pub mod plugin;
pub mod rank_table;
pub mod registry;
pub mod special;
pub mod stream;
pub mod utf8;
pub mod vocab;

pub use core_bpe::DecodeErrorHandler;
pub use errors::{TokenizerError, TokenizerResult};
pub use rank_table::Rank;
pub use registry::{Registry, VocabDescriptor, VocabSource};
pub use special::SpecialTokenPolicy;
pub use vocab::Encoding;

/// Looks up a registered encoding by exact name, alias, or prefix and builds it,
/// fetching and parsing its rank map through the descriptor's loader.
pub fn get_encoding(identifier: &str) -> TokenizerResult<Encoding> {
    Registry::global()
        .resolve(identifier)
        .ok_or_else(|| TokenizerError::ModelNotFound(identifier.to_string()))?
        .build()
}
