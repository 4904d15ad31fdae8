//! The public `Encoding` facade: a named vocabulary bundling its [`CoreBpe`] with
//! the declared vocab size validation the teacher's `OpenAI::new` performs.

use rustc_hash::FxHashMap as HashMap;

use crate::core_bpe::{CoreBpe, DecodeErrorHandler};
use crate::errors::{TokenizerError, TokenizerResult};
use crate::rank_table::Rank;
use crate::special::SpecialTokenPolicy;

/// A fully constructed, immutable encoding: name, compiled pipeline, and the
/// declared vocabulary size carried through from its [`VocabDescriptor`].
pub struct Encoding {
    name: String,
    core: CoreBpe,
}

impl Encoding {
    /// Builds an `Encoding`, validating `explicit_n_vocab` against the combined
    /// rank/special count and the max token value when one was declared (spec
    /// 3, "Vocab descriptor").
    pub fn new(
        name: String,
        pattern: &str,
        ranks: HashMap<Vec<u8>, Rank>,
        special_tokens: HashMap<String, Rank>,
        explicit_n_vocab: Option<u32>,
    ) -> TokenizerResult<Self> {
        if ranks.is_empty() {
            return Err(TokenizerError::ValueError(
                "encoding must have at least one rank".to_string(),
            ));
        }

        let total = (ranks.len() + special_tokens.len()) as u32;
        let max_rank = ranks.values().copied().max().unwrap_or(0);
        let max_special = special_tokens.values().copied().max().unwrap_or(0);
        let max_token_value = max_rank.max(max_special);

        if let Some(declared) = explicit_n_vocab {
            if total != declared {
                return Err(TokenizerError::ValueError(format!(
                    "encoding '{}' declares {} vocab entries but rank/special maps total {}",
                    name, declared, total
                )));
            }
            if max_token_value != declared - 1 {
                return Err(TokenizerError::ValueError(format!(
                    "encoding '{}' declares {} vocab entries but max token value is {}",
                    name, declared, max_token_value
                )));
            }
        }

        let core = CoreBpe::new(ranks, special_tokens, pattern)?;
        Ok(Self { name, core })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_token_value(&self) -> Rank {
        self.core.max_token_value()
    }

    pub fn n_vocab(&self) -> Rank {
        self.core.n_vocab()
    }

    pub fn encode_ordinary(&self, text: &str) -> TokenizerResult<Vec<Rank>> {
        self.core.encode_ordinary(text)
    }

    pub fn encode(
        &self,
        text: &str,
        allowed: &SpecialTokenPolicy,
        disallowed: &SpecialTokenPolicy,
    ) -> TokenizerResult<Vec<Rank>> {
        self.core.encode(text, allowed, disallowed)
    }

    pub fn token_count(
        &self,
        text: &str,
        allowed: &SpecialTokenPolicy,
        disallowed: &SpecialTokenPolicy,
    ) -> TokenizerResult<usize> {
        self.core.token_count(text, allowed, disallowed)
    }

    pub fn encode_with_unstable(
        &self,
        text: &str,
        allowed: &SpecialTokenPolicy,
        disallowed: &SpecialTokenPolicy,
    ) -> TokenizerResult<(Vec<Rank>, Vec<Vec<Rank>>)> {
        self.core.encode_with_unstable(text, allowed, disallowed)
    }

    pub fn encode_single_token(&self, piece: &[u8]) -> TokenizerResult<Rank> {
        self.core.encode_single_token(piece)
    }

    pub fn decode_bytes(&self, tokens: &[Rank]) -> Vec<u8> {
        self.core.decode_bytes(tokens)
    }

    pub fn decode(&self, tokens: &[Rank], errors: DecodeErrorHandler) -> TokenizerResult<String> {
        self.core.decode(tokens, errors)
    }

    pub fn decode_single_token_bytes(&self, token: Rank) -> TokenizerResult<Vec<u8>> {
        self.core.decode_single_token_bytes(token)
    }

    pub fn decode_with_offsets(&self, tokens: &[Rank]) -> TokenizerResult<(String, Vec<usize>)> {
        self.core.decode_with_offsets(tokens)
    }

    pub fn token_byte_values(&self) -> Vec<Vec<u8>> {
        self.core.token_byte_values()
    }

    pub fn special_tokens(&self) -> &rustc_hash::FxHashSet<String> {
        self.core.special_tokens_set()
    }

    pub(crate) fn core(&self) -> &CoreBpe {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks() -> HashMap<Vec<u8>, Rank> {
        let mut r = HashMap::default();
        for b in 0u16..256 {
            r.insert(vec![b as u8], b as Rank);
        }
        r
    }

    #[test]
    fn rejects_mismatched_explicit_n_vocab() {
        let err = Encoding::new(
            "toy".to_string(),
            r".",
            ranks(),
            HashMap::default(),
            Some(999),
        )
        .unwrap_err();
        assert!(matches!(err, TokenizerError::ValueError(_)));
    }

    #[test]
    fn accepts_matching_explicit_n_vocab() {
        let encoding = Encoding::new(
            "toy".to_string(),
            r".",
            ranks(),
            HashMap::default(),
            Some(256),
        )
        .unwrap();
        assert_eq!(encoding.n_vocab(), 256);
    }
}
