//! The encoder pipeline (spec 4.5) and decoder (spec 4.6), bound together in one
//! `CoreBpe` the way the teacher bundles encode/decode/misc sections into one
//! `CoreBytePairEncoding`/`CoreBPE` struct (`counter/openai/bpe.rs`,
//! `counter/token.rs`).

use fancy_regex::Regex;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::errors::{TokenizerError, TokenizerResult};
use crate::merge;
use crate::rank_table::{Rank, RankTable};
use crate::special::{SpecialMatcher, SpecialTokenPolicy};
use crate::utf8;

/// How to handle a UTF-8 decode failure when turning tokens back into a `String`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeErrorHandler {
    /// Propagate `InvalidEncoding`.
    Strict,
    /// Standard lossy UTF-8 substitution (`U+FFFD` per invalid run).
    Replace,
    /// Drop invalid byte runs entirely.
    Ignore,
    /// Render each invalid byte as a `\xNN` escape.
    BackslashReplace,
}

/// One piece of an `encode_with_unstable`/`stream` traversal: either a stretch of
/// ordinary text (already BPE-encoded) or an accepted special token, each carrying
/// its character-offset position in the source text.
pub(crate) enum Segment {
    Special {
        token: Rank,
        literal: String,
        char_start: usize,
    },
    Ordinary {
        tokens: Vec<Rank>,
        char_start: usize,
        char_end: usize,
    },
}

/// Immutable, thread-safe encoder/decoder for a single vocabulary: ranks, special
/// tokens, and the compiled segmentation regex. Safe to share across threads via
/// `Arc` since nothing here is ever mutated after construction (spec 3, "Encoder
/// instance").
pub struct CoreBpe {
    rank_table: RankTable,
    special_tokens_encoder: HashMap<String, Rank>,
    special_tokens_decoder: HashMap<Rank, Vec<u8>>,
    all_specials: HashSet<String>,
    special_matcher: SpecialMatcher,
    regex: Regex,
    max_token_value: Rank,
}

impl CoreBpe {
    pub fn new(
        ranks: HashMap<Vec<u8>, Rank>,
        special_tokens: HashMap<String, Rank>,
        pattern: &str,
    ) -> TokenizerResult<Self> {
        let regex =
            Regex::new(pattern).map_err(|e| TokenizerError::InvalidEncoding(e.to_string()))?;

        let rank_table = RankTable::new(ranks);

        let special_tokens_decoder: HashMap<Rank, Vec<u8>> = special_tokens
            .iter()
            .map(|(literal, id)| (*id, literal.as_bytes().to_vec()))
            .collect();

        let all_specials: HashSet<String> = special_tokens.keys().cloned().collect();
        let special_matcher = SpecialMatcher::new(special_tokens.keys().cloned());

        let max_special = special_tokens.values().copied().max().unwrap_or(0);
        let max_token_value = rank_table.max_rank().max(max_special);

        Ok(Self {
            rank_table,
            special_tokens_encoder: special_tokens,
            special_tokens_decoder,
            all_specials,
            special_matcher,
            regex,
            max_token_value,
        })
    }

    // =========
    // Encoding
    // =========

    /// Encodes `text` ignoring special tokens entirely — every special literal is
    /// treated as ordinary text.
    pub fn encode_ordinary(&self, text: &str) -> TokenizerResult<Vec<Rank>> {
        let mut tokens = Vec::new();
        for m in self.regex.find_iter(text) {
            let m = m.map_err(|e| TokenizerError::InvalidEncoding(e.to_string()))?;
            let piece = m.as_str().as_bytes();
            match self.rank_table.lookup(piece) {
                Some(rank) => tokens.push(rank),
                None => tokens.extend(merge::byte_pair_encode(&self.rank_table, piece)),
            }
        }
        Ok(tokens)
    }

    pub fn encode(
        &self,
        text: &str,
        allowed: &SpecialTokenPolicy,
        disallowed: &SpecialTokenPolicy,
    ) -> TokenizerResult<Vec<Rank>> {
        let (allowed, disallowed) = self.resolve_policies(allowed, disallowed);
        Ok(self.encode_native(text, &allowed, &disallowed)?.0)
    }

    /// Token count of `text` without materializing the token array for ordinary
    /// pieces (spec 4.5).
    pub fn token_count(
        &self,
        text: &str,
        allowed: &SpecialTokenPolicy,
        disallowed: &SpecialTokenPolicy,
    ) -> TokenizerResult<usize> {
        let (allowed, disallowed) = self.resolve_policies(allowed, disallowed);
        self.count_native(text, &allowed, &disallowed)
    }

    pub fn encode_with_unstable(
        &self,
        text: &str,
        allowed: &SpecialTokenPolicy,
        disallowed: &SpecialTokenPolicy,
    ) -> TokenizerResult<(Vec<Rank>, Vec<Vec<Rank>>)> {
        let (allowed, disallowed) = self.resolve_policies(allowed, disallowed);
        let (tokens, completions) = self.encode_unstable_native(text, &allowed, &disallowed)?;
        let mut completions: Vec<Vec<Rank>> = completions.into_iter().collect();
        completions.sort();
        Ok((tokens, completions))
    }

    pub fn encode_single_token(&self, piece: &[u8]) -> TokenizerResult<Rank> {
        if let Some(rank) = self.rank_table.lookup(piece) {
            return Ok(rank);
        }
        if let Ok(literal) = std::str::from_utf8(piece) {
            if let Some(&id) = self.special_tokens_encoder.get(literal) {
                return Ok(id);
            }
        }
        Err(TokenizerError::SingleTokenNotFound(format!("{:?}", piece)))
    }

    // =========
    // Decoding
    // =========

    /// Concatenation of reverse-lookup bytes per token; tokens with no known byte
    /// representation are silently skipped (spec 4.6).
    pub fn decode_bytes(&self, tokens: &[Rank]) -> Vec<u8> {
        let mut out = Vec::with_capacity(tokens.len() * 2);
        for &token in tokens {
            if let Some(bytes) = self.rank_table.reverse(token) {
                out.extend_from_slice(bytes);
            } else if let Some(bytes) = self.special_tokens_decoder.get(&token) {
                out.extend_from_slice(bytes);
            }
        }
        out
    }

    pub fn decode(&self, tokens: &[Rank], errors: DecodeErrorHandler) -> TokenizerResult<String> {
        let bytes = self.decode_bytes(tokens);
        match std::str::from_utf8(&bytes) {
            Ok(s) => Ok(s.to_string()),
            Err(e) => match errors {
                DecodeErrorHandler::Strict => Err(TokenizerError::InvalidEncoding(e.to_string())),
                DecodeErrorHandler::Replace => Ok(String::from_utf8_lossy(&bytes).to_string()),
                DecodeErrorHandler::Ignore => Ok(utf8::from_utf8_ignore(&bytes).to_string()),
                DecodeErrorHandler::BackslashReplace => {
                    Ok(utf8::from_utf8_backslash_replace(&bytes).to_string())
                }
            },
        }
    }

    pub fn decode_single_token_bytes(&self, token: Rank) -> TokenizerResult<Vec<u8>> {
        if let Some(bytes) = self.rank_table.reverse(token) {
            return Ok(bytes.to_vec());
        }
        if let Some(bytes) = self.special_tokens_decoder.get(&token) {
            return Ok(bytes.clone());
        }
        Err(TokenizerError::TokenBytesNotFound(token))
    }

    /// Decodes `tokens` into text along with each token's character-offset start
    /// position, counting Unicode scalars via UTF-8 non-continuation bytes (spec
    /// 4.5, "Decode-with-offsets").
    pub fn decode_with_offsets(&self, tokens: &[Rank]) -> TokenizerResult<(String, Vec<usize>)> {
        let mut offsets = Vec::with_capacity(tokens.len());
        let mut bytes = Vec::new();
        let mut char_len = 0usize;

        for &token in tokens {
            let token_bytes = self.decode_single_token_bytes(token)?;
            let is_continuation = token_bytes
                .first()
                .is_some_and(|&b| (0x80..0xC0).contains(&b));
            offsets.push(if is_continuation {
                char_len.saturating_sub(1)
            } else {
                char_len
            });
            char_len += token_bytes
                .iter()
                .filter(|&&b| !(0x80..0xC0).contains(&b))
                .count();
            bytes.extend(token_bytes);
        }

        let text = std::str::from_utf8(&bytes)
            .map_err(|e| TokenizerError::InvalidEncoding(e.to_string()))?
            .to_string();
        Ok((text, offsets))
    }

    // =============
    // Miscellaneous
    // =============

    pub fn max_token_value(&self) -> Rank {
        self.max_token_value
    }

    pub fn n_vocab(&self) -> Rank {
        self.max_token_value + 1
    }

    pub fn special_tokens_set(&self) -> &HashSet<String> {
        &self.all_specials
    }

    /// Bytes for every dense token id in `[0, max_token_value]` that resolves;
    /// non-dense ids are simply omitted (spec 4.6).
    pub fn token_byte_values(&self) -> Vec<Vec<u8>> {
        (0..=self.max_token_value)
            .filter_map(|id| {
                self.rank_table
                    .reverse(id)
                    .map(<[u8]>::to_vec)
                    .or_else(|| self.special_tokens_decoder.get(&id).cloned())
            })
            .collect()
    }

    pub(crate) fn rank_table(&self) -> &RankTable {
        &self.rank_table
    }

    fn resolve_policies(
        &self,
        allowed: &SpecialTokenPolicy,
        disallowed: &SpecialTokenPolicy,
    ) -> (HashSet<String>, HashSet<String>) {
        SpecialTokenPolicy::resolve(allowed, disallowed, &self.all_specials)
    }

    // ==================
    // Pipeline internals
    // ==================

    /// The cursor-based single-pass state machine shared by `encode`,
    /// `token_count`, `encode_with_unstable`, and `stream` (spec 4.5).
    fn encode_native(
        &self,
        text: &str,
        allowed: &HashSet<String>,
        disallowed: &HashSet<String>,
    ) -> TokenizerResult<(Vec<Rank>, usize)> {
        let mut tokens = Vec::new();
        let mut cursor = 0usize;
        let mut last_piece_token_len = 0usize;

        while cursor < text.len() {
            if let Some(literal) = self.special_matcher.match_at(text, cursor) {
                if disallowed.contains(literal) {
                    return Err(TokenizerError::DisallowedSpecial(literal.to_string()));
                }
                if allowed.contains(literal) {
                    tokens.push(self.special_tokens_encoder[literal]);
                    cursor += literal.len();
                    last_piece_token_len = 0;
                    continue;
                }
                // Neither allowed nor disallowed: don't consume; fall through to
                // the forced single-character advance below.
            }

            let next_special_start = self
                .special_matcher
                .next_from(text, cursor)
                .map(|(start, _)| start)
                .unwrap_or(text.len());

            if next_special_start == cursor {
                let ch = text[cursor..].chars().next().expect("cursor < text.len()");
                let ch_len = ch.len_utf8();
                let piece_tokens =
                    merge::byte_pair_encode(&self.rank_table, text[cursor..cursor + ch_len].as_bytes());
                last_piece_token_len = piece_tokens.len();
                tokens.extend(piece_tokens);
                cursor += ch_len;
                continue;
            }

            for m in self.regex.find_iter(&text[cursor..next_special_start]) {
                let m = m.map_err(|e| TokenizerError::InvalidEncoding(e.to_string()))?;
                let piece = m.as_str().as_bytes();
                match self.rank_table.lookup(piece) {
                    Some(rank) => {
                        tokens.push(rank);
                        last_piece_token_len = 1;
                    }
                    None => {
                        let piece_tokens = merge::byte_pair_encode(&self.rank_table, piece);
                        last_piece_token_len = piece_tokens.len();
                        tokens.extend(piece_tokens);
                    }
                }
            }

            cursor = next_special_start;
        }

        Ok((tokens, last_piece_token_len))
    }

    /// Same traversal as `encode_native` but only ever accumulates a running
    /// count, never the token ids themselves, for ordinary pieces.
    fn count_native(
        &self,
        text: &str,
        allowed: &HashSet<String>,
        disallowed: &HashSet<String>,
    ) -> TokenizerResult<usize> {
        let mut count = 0usize;
        let mut cursor = 0usize;

        while cursor < text.len() {
            if let Some(literal) = self.special_matcher.match_at(text, cursor) {
                if disallowed.contains(literal) {
                    return Err(TokenizerError::DisallowedSpecial(literal.to_string()));
                }
                if allowed.contains(literal) {
                    count += 1;
                    cursor += literal.len();
                    continue;
                }
            }

            let next_special_start = self
                .special_matcher
                .next_from(text, cursor)
                .map(|(start, _)| start)
                .unwrap_or(text.len());

            if next_special_start == cursor {
                let ch = text[cursor..].chars().next().expect("cursor < text.len()");
                let ch_len = ch.len_utf8();
                count += merge::byte_pair_count(&self.rank_table, text[cursor..cursor + ch_len].as_bytes());
                cursor += ch_len;
                continue;
            }

            for m in self.regex.find_iter(&text[cursor..next_special_start]) {
                let m = m.map_err(|e| TokenizerError::InvalidEncoding(e.to_string()))?;
                let piece = m.as_str().as_bytes();
                count += match self.rank_table.lookup(piece) {
                    Some(_) => 1,
                    None => merge::byte_pair_count(&self.rank_table, piece),
                };
            }

            cursor = next_special_start;
        }

        Ok(count)
    }

    /// Parallels `encode_native` but retains character-offset provenance per
    /// segment, for the streaming adapter (spec 4.10) to slice into chunks.
    pub(crate) fn segment_native(
        &self,
        text: &str,
        allowed: &HashSet<String>,
        disallowed: &HashSet<String>,
    ) -> TokenizerResult<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut cursor = 0usize;
        let mut char_count = 0usize;

        while cursor < text.len() {
            if let Some(literal) = self.special_matcher.match_at(text, cursor) {
                if disallowed.contains(literal) {
                    return Err(TokenizerError::DisallowedSpecial(literal.to_string()));
                }
                if allowed.contains(literal) {
                    segments.push(Segment::Special {
                        token: self.special_tokens_encoder[literal],
                        literal: literal.to_string(),
                        char_start: char_count,
                    });
                    cursor += literal.len();
                    char_count += literal.chars().count();
                    continue;
                }
            }

            let next_special_start = self
                .special_matcher
                .next_from(text, cursor)
                .map(|(start, _)| start)
                .unwrap_or(text.len());

            if next_special_start == cursor {
                let ch = text[cursor..].chars().next().expect("cursor < text.len()");
                let ch_len = ch.len_utf8();
                let tokens =
                    merge::byte_pair_encode(&self.rank_table, text[cursor..cursor + ch_len].as_bytes());
                segments.push(Segment::Ordinary {
                    tokens,
                    char_start: char_count,
                    char_end: char_count + 1,
                });
                cursor += ch_len;
                char_count += 1;
                continue;
            }

            let chunk = &text[cursor..next_special_start];
            let chunk_char_len = chunk.chars().count();
            let mut tokens = Vec::new();
            for m in self.regex.find_iter(chunk) {
                let m = m.map_err(|e| TokenizerError::InvalidEncoding(e.to_string()))?;
                let piece = m.as_str().as_bytes();
                match self.rank_table.lookup(piece) {
                    Some(rank) => tokens.push(rank),
                    None => tokens.extend(merge::byte_pair_encode(&self.rank_table, piece)),
                }
            }
            segments.push(Segment::Ordinary {
                tokens,
                char_start: char_count,
                char_end: char_count + chunk_char_len,
            });
            cursor = next_special_start;
            char_count += chunk_char_len;
        }

        Ok(segments)
    }

    /// Extends `last_piece_token_len` leftward while the tokens it covers decode
    /// to all-whitespace bytes — such tokens are sensitive to merges with
    /// incoming text (spec 4.5, "Unstable completions" step 1).
    fn increase_last_piece_token_len(
        &self,
        tokens: Vec<Rank>,
        mut last_piece_token_len: usize,
    ) -> (Vec<Rank>, usize) {
        let token_is_all_space = |token: &Rank| {
            self.rank_table
                .reverse(*token)
                .map(|bytes| bytes.iter().all(|&b| matches!(b, b' ' | b'\t' | b'\n')))
                .unwrap_or(false)
        };

        if last_piece_token_len > 0
            && token_is_all_space(&tokens[tokens.len() - last_piece_token_len])
        {
            while last_piece_token_len < tokens.len()
                && token_is_all_space(&tokens[tokens.len() - last_piece_token_len - 1])
            {
                last_piece_token_len += 1;
            }
        }

        (tokens, last_piece_token_len)
    }

    fn encode_unstable_native(
        &self,
        text: &str,
        allowed: &HashSet<String>,
        disallowed: &HashSet<String>,
    ) -> TokenizerResult<(Vec<Rank>, HashSet<Vec<Rank>>)> {
        let (tokens, last_piece_token_len) = self.encode_native(text, allowed, disallowed)?;
        if last_piece_token_len == 0 {
            return Ok((tokens, HashSet::default()));
        }

        let (mut tokens, last_piece_token_len) =
            self.increase_last_piece_token_len(tokens, last_piece_token_len);

        let unstable_bytes = self.decode_bytes(&tokens[tokens.len() - last_piece_token_len..]);
        tokens.truncate(tokens.len() - last_piece_token_len);

        let mut completions: HashSet<Vec<Rank>> = HashSet::default();
        if unstable_bytes.is_empty() {
            return Ok((tokens, completions));
        }

        for (_, rank) in self.rank_table.prefix_search(&unstable_bytes) {
            completions.insert(vec![rank]);
        }

        for i in 1..unstable_bytes.len() {
            let prefix = &unstable_bytes[..i];
            let suffix = &unstable_bytes[i..];

            for (key_bytes, _) in self.rank_table.prefix_search(suffix) {
                let possibility = [prefix, key_bytes].concat();
                let encoded = match std::str::from_utf8(&possibility) {
                    Ok(s) => self.encode_ordinary(s)?,
                    Err(_) => merge::byte_pair_encode(&self.rank_table, &possibility),
                };

                let mut seq = Vec::new();
                let mut seq_len = 0usize;
                for token in encoded {
                    seq.push(token);
                    seq_len += self.rank_table.reverse(token).map(<[u8]>::len).unwrap_or(0);
                    if seq_len >= unstable_bytes.len() {
                        break;
                    }
                }
                completions.insert(seq);
            }
        }

        if unstable_bytes.len() > 1 {
            let (last_char, last_char_len) = bstr::decode_last_utf8(unstable_bytes.as_slice());
            if unstable_bytes.len() - last_char_len > 0
                && last_char.is_some_and(char::is_whitespace)
            {
                let split = unstable_bytes.len() - last_char_len;
                let mut reencoded = merge::byte_pair_encode(&self.rank_table, &unstable_bytes[..split]);
                reencoded.extend(merge::byte_pair_encode(&self.rank_table, &unstable_bytes[split..]));
                completions.insert(reencoded);
            }
        }

        Ok((tokens, completions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_bpe() -> CoreBpe {
        // A tiny ASCII-letter vocabulary: every single byte, plus a couple of
        // merges, enough to exercise the pipeline end to end without a real
        // downloaded vocab.
        let mut ranks = HashMap::default();
        for b in 0u16..256 {
            ranks.insert(vec![b as u8], b as Rank);
        }
        ranks.insert(b"he".to_vec(), 256);
        ranks.insert(b"llo".to_vec(), 257);
        ranks.insert(b"hello".to_vec(), 258);
        ranks.insert(b" world".to_vec(), 259);

        let mut specials = HashMap::default();
        specials.insert("<|endoftext|>".to_string(), 300);

        CoreBpe::new(ranks, specials, r"hello| world|\s+|.").unwrap()
    }

    #[test]
    fn encode_ordinary_prefers_whole_word_merge() {
        let bpe = toy_bpe();
        let tokens = bpe.encode_ordinary("hello world").unwrap();
        assert_eq!(tokens, vec![258, 259]);
    }

    #[test]
    fn decode_round_trips_encode() {
        let bpe = toy_bpe();
        let tokens = bpe
            .encode(
                "hello world",
                &SpecialTokenPolicy::None,
                &SpecialTokenPolicy::None,
            )
            .unwrap();
        let decoded = bpe.decode(&tokens, DecodeErrorHandler::Strict).unwrap();
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn token_count_matches_encode_length() {
        let bpe = toy_bpe();
        let tokens = bpe
            .encode(
                "hello world",
                &SpecialTokenPolicy::None,
                &SpecialTokenPolicy::None,
            )
            .unwrap();
        let count = bpe
            .token_count(
                "hello world",
                &SpecialTokenPolicy::None,
                &SpecialTokenPolicy::None,
            )
            .unwrap();
        assert_eq!(count, tokens.len());
    }

    #[test]
    fn special_token_allowed_is_emitted() {
        let bpe = toy_bpe();
        let tokens = bpe
            .encode(
                "<|endoftext|>",
                &SpecialTokenPolicy::All,
                &SpecialTokenPolicy::None,
            )
            .unwrap();
        assert_eq!(tokens, vec![300]);
    }

    #[test]
    fn special_token_disallowed_errors() {
        let bpe = toy_bpe();
        let err = bpe
            .encode(
                "<|endoftext|>",
                &SpecialTokenPolicy::None,
                &SpecialTokenPolicy::Automatic,
            )
            .unwrap_err();
        assert_eq!(
            err,
            TokenizerError::DisallowedSpecial("<|endoftext|>".to_string())
        );
    }

    #[test]
    fn special_token_neither_allowed_nor_disallowed_is_ordinary() {
        let bpe = toy_bpe();
        // Empty allowed/disallowed sets: the literal is neither, so it is
        // encoded byte-by-byte as ordinary text instead of erroring.
        let tokens = bpe
            .encode(
                "<|endoftext|>",
                &SpecialTokenPolicy::None,
                &SpecialTokenPolicy::None,
            )
            .unwrap();
        assert!(!tokens.contains(&300));
        assert_eq!(bpe.decode_bytes(&tokens), b"<|endoftext|>");
    }

    #[test]
    fn decode_with_offsets_first_offset_is_zero() {
        let bpe = toy_bpe();
        let tokens = bpe
            .encode(
                "hello world",
                &SpecialTokenPolicy::None,
                &SpecialTokenPolicy::None,
            )
            .unwrap();
        let (text, offsets) = bpe.decode_with_offsets(&tokens).unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(offsets.len(), tokens.len());
        assert_eq!(offsets[0], 0);
    }

    #[test]
    fn unstable_completions_are_prefixed_by_stable_bytes() {
        let bpe = toy_bpe();
        let (stable, completions) = bpe
            .encode_with_unstable(
                "hel",
                &SpecialTokenPolicy::None,
                &SpecialTokenPolicy::None,
            )
            .unwrap();
        assert!(!completions.is_empty());
        let stable_bytes = bpe.decode_bytes(&stable);
        assert!("hel".as_bytes().starts_with(&stable_bytes));
        for completion in completions {
            let mut full = stable_bytes.clone();
            full.extend(bpe.decode_bytes(&completion));
            assert!(full.starts_with(b"hel"));
        }
    }

    #[test]
    fn token_byte_values_skips_non_dense_ids() {
        let bpe = toy_bpe();
        // id 300 is a special, not a dense rank; max_token_value is 300, but
        // token_byte_values should include every rank in [0, 259] plus 300.
        let values = bpe.token_byte_values();
        assert!(values.iter().any(|v| v == b"hello"));
    }
}
