//! Special-token matching and the allowed/disallowed policy resolution described in
//! spec section 4.4. Generalizes the teacher's two-variant `Specials` enum
//! (`All`/`Collection`) into the four-variant policy the spec requires.

use rustc_hash::FxHashSet as HashSet;

/// A caller's policy for one side (allowed or disallowed) of special-token handling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpecialTokenPolicy {
    /// No special tokens participate.
    None,
    /// Every registered special token participates.
    All,
    /// Exactly the named special tokens participate.
    Only(HashSet<String>),
    /// Resolved contextually: empty when used as `allowed`, or "every registered
    /// special not already allowed" when used as `disallowed`.
    Automatic,
}

impl SpecialTokenPolicy {
    /// Resolves an `(allowed, disallowed)` policy pair into concrete string sets,
    /// per the table in spec section 4.4.
    pub fn resolve(
        allowed: &SpecialTokenPolicy,
        disallowed: &SpecialTokenPolicy,
        all_specials: &HashSet<String>,
    ) -> (HashSet<String>, HashSet<String>) {
        let allowed_resolved = match allowed {
            SpecialTokenPolicy::None => HashSet::default(),
            SpecialTokenPolicy::All => all_specials.clone(),
            SpecialTokenPolicy::Only(set) => set.clone(),
            SpecialTokenPolicy::Automatic => HashSet::default(),
        };

        let disallowed_resolved = match disallowed {
            SpecialTokenPolicy::None => HashSet::default(),
            SpecialTokenPolicy::All => all_specials.clone(),
            SpecialTokenPolicy::Only(set) => set.clone(),
            SpecialTokenPolicy::Automatic => all_specials
                .difference(&allowed_resolved)
                .cloned()
                .collect(),
        };

        (allowed_resolved, disallowed_resolved)
    }
}

/// Finds occurrences of literal special-token strings in text.
///
/// Keeps the literals sorted by descending length once at construction, so
/// `match_at` can do a greedy, deterministic O(k*L) scan per spec 4.4.
pub struct SpecialMatcher {
    by_desc_len: Vec<String>,
}

impl SpecialMatcher {
    pub fn new<I: IntoIterator<Item = String>>(literals: I) -> Self {
        let mut by_desc_len: Vec<String> = literals.into_iter().collect();
        by_desc_len.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { by_desc_len }
    }

    /// Returns the special literal that starts exactly at `cursor`, if any, checked
    /// in descending-length order.
    pub fn match_at<'a>(&'a self, text: &str, cursor: usize) -> Option<&'a str> {
        let remainder = &text[cursor..];
        self.by_desc_len
            .iter()
            .find(|literal| remainder.starts_with(literal.as_str()))
            .map(String::as_str)
    }

    /// Returns the earliest-starting special occurrence at or after `cursor`, as
    /// `(start_byte_offset, literal)`. Ties broken by earliest start position.
    pub fn next_from<'a>(&'a self, text: &str, cursor: usize) -> Option<(usize, &'a str)> {
        self.by_desc_len
            .iter()
            .filter_map(|literal| {
                text[cursor..]
                    .find(literal.as_str())
                    .map(|rel| (cursor + rel, literal.as_str()))
            })
            .min_by_key(|&(start, literal)| (start, literal.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolve_none_policy_yields_empty_sets() {
        let all = set(&["<|endoftext|>"]);
        let (a, d) = SpecialTokenPolicy::resolve(&SpecialTokenPolicy::None, &SpecialTokenPolicy::None, &all);
        assert!(a.is_empty());
        assert!(d.is_empty());
    }

    #[test]
    fn resolve_automatic_disallowed_is_complement_of_allowed() {
        let all = set(&["<|endoftext|>", "<|fim_prefix|>"]);
        let allowed = SpecialTokenPolicy::Only(set(&["<|endoftext|>"]));
        let (a, d) = SpecialTokenPolicy::resolve(&allowed, &SpecialTokenPolicy::Automatic, &all);
        assert_eq!(a, set(&["<|endoftext|>"]));
        assert_eq!(d, set(&["<|fim_prefix|>"]));
    }

    #[test]
    fn resolve_all_policy_on_both_sides() {
        let all = set(&["<|endoftext|>"]);
        let (a, d) = SpecialTokenPolicy::resolve(&SpecialTokenPolicy::All, &SpecialTokenPolicy::All, &all);
        assert_eq!(a, all);
        assert_eq!(d, all);
    }

    #[test]
    fn matcher_prefers_longer_literal_at_cursor() {
        let matcher = SpecialMatcher::new(["<|im_end|>".to_string(), "<|im_end|><|fim|>".to_string()]);
        let text = "<|im_end|><|fim|>rest";
        assert_eq!(matcher.match_at(text, 0), Some("<|im_end|><|fim|>"));
    }

    #[test]
    fn matcher_finds_earliest_next_occurrence() {
        let matcher = SpecialMatcher::new(["<|a|>".to_string(), "<|b|>".to_string()]);
        let text = "xx<|b|>yy<|a|>";
        let (start, literal) = matcher.next_from(text, 0).unwrap();
        assert_eq!(start, 2);
        assert_eq!(literal, "<|b|>");
    }

    #[test]
    fn matcher_no_match_returns_none() {
        let matcher = SpecialMatcher::new(["<|a|>".to_string()]);
        assert_eq!(matcher.match_at("plain text", 0), None);
        assert_eq!(matcher.next_from("plain text", 0), None);
    }
}
