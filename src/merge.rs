//! The byte-pair merge engine: array-based, priority-queue-free, optimized for the
//! small `n` that regex segmentation hands it (see `rank_table::RankTable`).
//!
//! Grounded on the teacher's `byte_pair_merge`/`byte_pair_encode`/`byte_pair_split`
//! in `counter/openai/bpe.rs` and `counter/token.rs`, generalized to operate against
//! `RankTable` instead of a raw `HashMap`.

use crate::rank_table::{Rank, RankTable};

/// Runs one pass of the merge loop and returns the `(start_index, rank)` parts list
/// after no more merges apply. Consecutive pairs of entries bound the final subslices.
fn byte_pair_merge(ranks: &RankTable, piece: &[u8]) -> Vec<(usize, Rank)> {
    // parts[i] = (start offset of the i-th still-live boundary, rank of the pair
    // starting there). The final two entries are end-of-piece sentinels.
    let mut parts: Vec<(usize, Rank)> = Vec::with_capacity(piece.len() + 1);

    let mut min_rank: (Rank, usize) = (Rank::MAX, usize::MAX);
    for i in 0..piece.len() - 1 {
        let rank = ranks.lookup(&piece[i..=i + 1]).unwrap_or(Rank::MAX);
        if rank < min_rank.0 {
            min_rank = (rank, i);
        }
        parts.push((i, rank));
    }
    parts.push((piece.len() - 1, Rank::MAX));
    parts.push((piece.len(), Rank::MAX));

    let rank_at = |parts: &[(usize, Rank)], i: usize| -> Rank {
        if i + 3 < parts.len() {
            ranks
                .lookup(&piece[parts[i].0..parts[i + 3].0])
                .unwrap_or(Rank::MAX)
        } else {
            Rank::MAX
        }
    };

    while min_rank.0 != Rank::MAX {
        let i = min_rank.1;
        if i > 0 {
            parts[i - 1].1 = rank_at(&parts, i - 1);
        }
        parts[i].1 = rank_at(&parts, i);
        parts.remove(i + 1);

        min_rank = (Rank::MAX, usize::MAX);
        for (idx, &(_, rank)) in parts[..parts.len() - 1].iter().enumerate() {
            if rank < min_rank.0 {
                min_rank = (rank, idx);
            }
        }
    }

    parts
}

/// Splits `piece` into the byte subslices that make up its final tokens, without
/// resolving them to ranks.
pub fn byte_pair_split<'a>(ranks: &RankTable, piece: &'a [u8]) -> Vec<&'a [u8]> {
    if piece.len() == 1 {
        return vec![piece];
    }
    byte_pair_merge(ranks, piece)
        .windows(2)
        .map(|w| &piece[w[0].0..w[1].0])
        .collect()
}

/// Runs the merge engine over `piece` and resolves each emitted subslice to its rank,
/// falling back to single-byte lookups for any subslice absent from the rank table
/// (the fallback is expected never to trigger for well-formed built-in vocabularies).
pub fn byte_pair_encode(ranks: &RankTable, piece: &[u8]) -> Vec<Rank> {
    if piece.len() == 1 {
        if let Some(rank) = ranks.lookup(piece) {
            return vec![rank];
        }
    }

    byte_pair_merge(ranks, piece)
        .windows(2)
        .flat_map(|w| {
            let subslice = &piece[w[0].0..w[1].0];
            match ranks.lookup(subslice) {
                Some(rank) => vec![rank],
                None => subslice
                    .iter()
                    .filter_map(|&b| ranks.lookup(&[b]))
                    .collect(),
            }
        })
        .collect()
}

/// Same traversal as `byte_pair_encode` but returns only the resulting token
/// count, so callers that only need `token_count` never materialize a `Vec<Rank>`
/// for ordinary pieces (spec 4.5).
pub fn byte_pair_count(ranks: &RankTable, piece: &[u8]) -> usize {
    if piece.len() == 1 {
        return 1;
    }

    byte_pair_merge(ranks, piece)
        .windows(2)
        .map(|w| {
            let subslice = &piece[w[0].0..w[1].0];
            match ranks.lookup(subslice) {
                Some(_) => 1,
                None => subslice
                    .iter()
                    .filter(|&&b| ranks.lookup(&[b]).is_some())
                    .count(),
            }
        })
        .sum()
}
