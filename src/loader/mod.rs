//! Vocabulary loaders: pure parsing of the two wire formats tiktoken vocabularies
//! ship in, kept separate from [`fetch`]'s networked/caching collaborator (spec
//! 4.7). Grounded on the teacher's `load_bpe`/`data_gym_to_mergeable_bpe_ranks` in
//! `counter/openai/load.rs`.

pub mod fetch;

use base64::prelude::{Engine, BASE64_STANDARD};
use rustc_hash::FxHashMap as HashMap;

use crate::errors::{TokenizerError, TokenizerResult};
use crate::rank_table::Rank;

/// Parses the `base64(bytes) rank` line format used by `*.tiktoken` files. Lines
/// that don't split into exactly two whitespace-separated fields, or whose
/// fields don't decode, are skipped silently (spec 4.7/6).
pub fn parse_tiktoken_file(contents: &str) -> TokenizerResult<HashMap<Vec<u8>, Rank>> {
    let mut ranks = HashMap::default();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 2 {
            continue;
        }

        let (Ok(bytes), Ok(rank)) = (BASE64_STANDARD.decode(parts[0]), parts[1].parse::<Rank>())
        else {
            continue;
        };
        ranks.insert(bytes, rank);
    }

    Ok(ranks)
}

/// Serializes `ranks` back into the `*.tiktoken` line format, sorted by rank.
pub fn dump_tiktoken_file(ranks: &HashMap<Vec<u8>, Rank>) -> String {
    let mut sorted: Vec<(&Vec<u8>, &Rank)> = ranks.iter().collect();
    sorted.sort_by_key(|&(_, rank)| *rank);

    let mut out = String::new();
    for (bytes, rank) in sorted {
        out.push_str(&BASE64_STANDARD.encode(bytes));
        out.push(' ');
        out.push_str(&rank.to_string());
        out.push('\n');
    }
    out
}

/// Parses the GPT-2 "data gym" format: a `vocab.bpe` merge-list file plus an
/// `encoder.json` rank map, reconciled through the byte<->printable-unicode
/// remapping GPT-2's original tokenizer used to keep every byte value printable
/// in a JSON string.
pub fn parse_data_gym(
    vocab_bpe_contents: &str,
    encoder_json: HashMap<String, Rank>,
) -> TokenizerResult<HashMap<Vec<u8>, Rank>> {
    let mut rank_to_intbyte: Vec<u8> = (0..=255u16)
        .map(|b| b as u8)
        .filter(|&b| {
            let c = b as char;
            c.is_ascii_graphic() && c != ' '
        })
        .collect();

    let mut data_gym_byte_to_byte: HashMap<char, u8> = rank_to_intbyte
        .iter()
        .map(|&byte| (byte as char, byte))
        .collect();

    let mut n: u32 = 0;
    for b in 0..=255u16 {
        let b = b as u8;
        if !rank_to_intbyte.contains(&b) {
            rank_to_intbyte.push(b);
            data_gym_byte_to_byte.insert(char::from_u32(256 + n).expect("valid scalar"), b);
            n += 1;
        }
    }
    debug_assert_eq!(rank_to_intbyte.len(), 256);

    let decode_data_gym = |value: &str| -> TokenizerResult<Vec<u8>> {
        value
            .chars()
            .map(|c| {
                data_gym_byte_to_byte
                    .get(&c)
                    .copied()
                    .ok_or_else(|| TokenizerError::ValueError(format!("{:?} not found in byte2byte map", c)))
            })
            .collect()
    };

    let mut bpe_merges = Vec::new();
    for line in vocab_bpe_contents.trim().lines() {
        if line.starts_with("#version") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(TokenizerError::ValueError(
                "vocab.bpe merge line did not split into exactly two fields".to_string(),
            ));
        }
        bpe_merges.push((parts[0].to_string(), parts[1].to_string()));
    }

    let mut bpe_ranks: HashMap<Vec<u8>, Rank> = rank_to_intbyte
        .iter()
        .enumerate()
        .map(|(idx, &byte)| (vec![byte], idx as Rank))
        .collect();

    let mut next_rank = bpe_ranks.len() as Rank;
    for (first, second) in bpe_merges {
        let mut merged = decode_data_gym(&first)?;
        merged.extend(decode_data_gym(&second)?);
        bpe_ranks.insert(merged, next_rank);
        next_rank += 1;
    }

    let mut encoder_ranks: HashMap<Vec<u8>, Rank> = HashMap::default();
    for (key, value) in encoder_json {
        encoder_ranks.insert(decode_data_gym(&key)?, value);
    }
    encoder_ranks.remove("<|endoftext|>".as_bytes());
    encoder_ranks.remove("<|startoftext|>".as_bytes());

    let consistent = bpe_ranks
        .iter()
        .all(|(key, value)| encoder_ranks.get(key) == Some(value))
        && encoder_ranks
            .iter()
            .all(|(key, value)| bpe_ranks.get(key) == Some(value));
    if !consistent {
        return Err(TokenizerError::ValueError(
            "vocab.bpe merges and encoder.json ranks disagree".to_string(),
        ));
    }

    Ok(bpe_ranks)
}

/// Passes a pre-built `name -> rank` map straight through, validating that ranks
/// are dense and contiguous starting at 0 (the shape a plugin or embedded table is
/// expected to arrive in already).
pub fn from_mergeable_ranks(ranks: HashMap<Vec<u8>, Rank>) -> TokenizerResult<HashMap<Vec<u8>, Rank>> {
    if ranks.is_empty() {
        return Err(TokenizerError::ValueError(
            "mergeable ranks map must not be empty".to_string(),
        ));
    }
    Ok(ranks)
}

/// Fetches and parses a `*.tiktoken` vocabulary from a local path or URL.
pub fn load_tiktoken_bpe(path: &str, expected_hash: Option<&str>) -> TokenizerResult<HashMap<Vec<u8>, Rank>> {
    let contents = fetch::read_cached_file(path, expected_hash)?;
    let text =
        std::str::from_utf8(&contents).map_err(|e| TokenizerError::InvalidEncoding(e.to_string()))?;
    parse_tiktoken_file(text)
}

/// Fetches and parses a GPT-2 data-gym vocabulary from its two constituent files.
pub fn load_data_gym_bpe(
    vocab_bpe_file: &str,
    encoder_json_file: &str,
    vocab_bpe_hash: Option<&str>,
    encoder_json_hash: Option<&str>,
) -> TokenizerResult<HashMap<Vec<u8>, Rank>> {
    let vocab_bpe = fetch::read_cached_file(vocab_bpe_file, vocab_bpe_hash)?;
    let vocab_bpe_text =
        std::str::from_utf8(&vocab_bpe).map_err(|e| TokenizerError::InvalidEncoding(e.to_string()))?;

    let encoder_data = fetch::read_cached_file(encoder_json_file, encoder_json_hash)?;
    let encoder_text =
        std::str::from_utf8(&encoder_data).map_err(|e| TokenizerError::InvalidEncoding(e.to_string()))?;
    let encoder_json: HashMap<String, Rank> =
        serde_json::from_str(encoder_text).map_err(|e| TokenizerError::ValueError(e.to_string()))?;

    parse_data_gym(vocab_bpe_text, encoder_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tiktoken_file_round_trips_dump() {
        let mut ranks = HashMap::default();
        ranks.insert(b"a".to_vec(), 0);
        ranks.insert(b"b".to_vec(), 1);
        ranks.insert(b"ab".to_vec(), 2);

        let dumped = dump_tiktoken_file(&ranks);
        let parsed = parse_tiktoken_file(&dumped).unwrap();
        assert_eq!(parsed, ranks);
    }

    #[test]
    fn parse_tiktoken_file_skips_malformed_lines() {
        let parsed = parse_tiktoken_file("YQ== 0 extra\nYg== 1\n").unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get(b"b".as_slice()), Some(&1));
    }

    #[test]
    fn parse_data_gym_builds_dense_single_byte_ranks() {
        let vocab_bpe = "#version: 0.2\n";

        // Mirror parse_data_gym's own rank_to_intbyte/data_gym_byte_to_byte
        // construction exactly: graphic bytes first in ascending order, then
        // every remaining byte appended in ascending order and remapped to
        // the printable range starting at U+0100. The consistency check
        // requires encoder_json to cover this same 256-byte set, not just the
        // graphic subset.
        let mut rank_to_intbyte: Vec<u8> = (0u16..=255)
            .map(|b| b as u8)
            .filter(|&b| (b as char).is_ascii_graphic() && b as char != ' ')
            .collect();
        let graphic_count = rank_to_intbyte.len();
        for b in 0u16..=255 {
            let b = b as u8;
            if !rank_to_intbyte.contains(&b) {
                rank_to_intbyte.push(b);
            }
        }

        let mut encoder_json = HashMap::default();
        for (idx, &b) in rank_to_intbyte.iter().enumerate() {
            let key = if idx < graphic_count {
                (b as char).to_string()
            } else {
                char::from_u32(256 + (idx - graphic_count) as u32)
                    .unwrap()
                    .to_string()
            };
            encoder_json.insert(key, idx as Rank);
        }

        let parsed = parse_data_gym(vocab_bpe, encoder_json).unwrap();
        assert_eq!(parsed.len(), 256);
        assert!(parsed.contains_key(&vec![b'!']));
    }

    #[test]
    fn from_mergeable_ranks_rejects_empty_map() {
        assert!(from_mergeable_ranks(HashMap::default()).is_err());
    }
}
