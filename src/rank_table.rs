//! Immutable byte-sequence -> rank table, with the derived reverse map and the
//! sorted key index used by prefix search during unstable-completion enumeration.

use rustc_hash::FxHashMap as HashMap;

pub type Rank = u32;

/// Holds the encoder's merge ranks, their reverse mapping, and a lexicographically
/// sorted copy of the keys for prefix search.
///
/// Construction eagerly computes all derived artifacts so lookups never pay for it.
#[derive(Clone)]
pub struct RankTable {
    ranks: HashMap<Vec<u8>, Rank>,
    reverse: HashMap<Rank, Vec<u8>>,
    sorted_keys: Vec<Vec<u8>>,
    max_rank: Rank,
}

impl RankTable {
    pub fn new(ranks: HashMap<Vec<u8>, Rank>) -> Self {
        let reverse: HashMap<Rank, Vec<u8>> = ranks
            .iter()
            .map(|(bytes, rank)| (*rank, bytes.clone()))
            .collect();

        debug_assert_eq!(
            ranks.len(),
            reverse.len(),
            "rank map has duplicate rank values; reverse lookup would drop entries"
        );

        let mut sorted_keys: Vec<Vec<u8>> = ranks.keys().cloned().collect();
        sorted_keys.sort();

        let max_rank = ranks.values().copied().max().unwrap_or(0);

        Self {
            ranks,
            reverse,
            sorted_keys,
            max_rank,
        }
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn max_rank(&self) -> Rank {
        self.max_rank
    }

    pub fn lookup(&self, bytes: &[u8]) -> Option<Rank> {
        self.ranks.get(bytes).copied()
    }

    pub fn reverse(&self, rank: Rank) -> Option<&[u8]> {
        self.reverse.get(&rank).map(Vec::as_slice)
    }

    /// All rank-map keys, sorted lexicographically by unsigned byte comparison.
    pub fn sorted_keys(&self) -> &[Vec<u8>] {
        &self.sorted_keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Rank)> {
        self.ranks.iter()
    }

    /// Every key beginning with `prefix`, in sorted order, as `(bytes, rank)` pairs.
    ///
    /// Implemented as binary search for the lower bound of `prefix`, then a linear
    /// walk while keys continue to start with it.
    pub fn prefix_search<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = (&'a [u8], Rank)> {
        let start = self.sorted_keys.partition_point(|k| k.as_slice() < prefix);
        self.sorted_keys[start..]
            .iter()
            .take_while(move |k| k.starts_with(prefix))
            .map(move |k| (k.as_slice(), self.ranks[k.as_slice()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RankTable {
        let mut ranks = HashMap::default();
        ranks.insert(b"a".to_vec(), 0);
        ranks.insert(b"ab".to_vec(), 1);
        ranks.insert(b"abc".to_vec(), 2);
        ranks.insert(b"b".to_vec(), 3);
        RankTable::new(ranks)
    }

    #[test]
    fn lookup_and_reverse_are_inverses() {
        let t = table();
        assert_eq!(t.lookup(b"ab"), Some(1));
        assert_eq!(t.reverse(1), Some(b"ab".as_slice()));
        assert_eq!(t.lookup(b"zz"), None);
    }

    #[test]
    fn prefix_search_walks_sorted_range() {
        let t = table();
        let found: Vec<_> = t.prefix_search(b"ab").map(|(k, r)| (k.to_vec(), r)).collect();
        assert_eq!(found, vec![(b"ab".to_vec(), 1), (b"abc".to_vec(), 2)]);
    }

    #[test]
    fn prefix_search_empty_when_no_match() {
        let t = table();
        assert_eq!(t.prefix_search(b"zzz").count(), 0);
    }

    #[test]
    fn max_rank_tracks_highest_value() {
        assert_eq!(table().max_rank(), 3);
    }
}
