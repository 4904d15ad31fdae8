//! End-to-end scenarios against the real built-in encodings. These require a
//! network fetch (and populate the on-disk vocab cache on first run), so they
//! are `#[ignore]`d by default; run with `cargo test -- --ignored` when network
//! access is available.

use bpe_tokenizer::{get_encoding, DecodeErrorHandler, SpecialTokenPolicy, TokenizerError};

#[test]
#[ignore = "fetches the real cl100k_base vocab over the network"]
fn cl100k_base_encodes_non_ascii_text() {
    let encoding = get_encoding("cl100k_base").unwrap();
    let tokens = encoding
        .encode(
            "這個算法真的太棒了",
            &SpecialTokenPolicy::None,
            &SpecialTokenPolicy::None,
        )
        .unwrap();
    assert_eq!(
        tokens,
        vec![
            11589, 247, 20022, 233, 70203, 25333, 89151, 9554, 8192, 103, 77062, 240, 35287
        ]
    );
}

#[test]
#[ignore = "fetches the real cl100k_base vocab over the network"]
fn cl100k_base_allows_endoftext_when_permitted() {
    let encoding = get_encoding("cl100k_base").unwrap();
    let mut allowed = rustc_hash::FxHashSet::default();
    allowed.insert("<|endoftext|>".to_string());

    let tokens = encoding
        .encode(
            "<|endoftext|>",
            &SpecialTokenPolicy::Only(allowed),
            &SpecialTokenPolicy::Automatic,
        )
        .unwrap();
    assert_eq!(tokens, vec![100257]);
}

#[test]
#[ignore = "fetches the real cl100k_base vocab over the network"]
fn cl100k_base_rejects_disallowed_endoftext() {
    let encoding = get_encoding("cl100k_base").unwrap();
    let err = encoding
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
#[ignore = "fetches the real cl100k_base vocab over the network"]
fn cl100k_base_decode_with_offsets_round_trips() {
    let encoding = get_encoding("cl100k_base").unwrap();
    let text = "hello \u{1F44B} world";
    let tokens = encoding
        .encode(text, &SpecialTokenPolicy::None, &SpecialTokenPolicy::None)
        .unwrap();
    let (decoded, offsets) = encoding.decode_with_offsets(&tokens).unwrap();
    assert_eq!(decoded, text);
    assert_eq!(offsets.len(), tokens.len());
    assert_eq!(offsets[0], 0);
}

#[test]
#[ignore = "fetches the real cl100k_base vocab over the network"]
fn cl100k_base_unstable_completions_are_prefix_consistent() {
    let encoding = get_encoding("cl100k_base").unwrap();
    let (stable, completions) = encoding
        .encode_with_unstable(
            "hello fanta",
            &SpecialTokenPolicy::None,
            &SpecialTokenPolicy::None,
        )
        .unwrap();
    assert!(!completions.is_empty());

    let stable_bytes = encoding.decode_bytes(&stable);
    assert!(b"hello fanta".starts_with(&stable_bytes));

    for completion in completions {
        let mut full = stable.clone();
        full.extend(completion);
        let decoded = encoding.decode(&full, DecodeErrorHandler::Strict).unwrap();
        assert!(decoded.starts_with("hello fanta"));
    }
}

#[test]
fn model_alias_resolves_without_network_access() {
    // Resolution is pure registry lookup; only `.build()` touches the network.
    let descriptor = bpe_tokenizer::Registry::global().resolve("gpt-4");
    assert_eq!(descriptor.unwrap().name, "cl100k_base");
}

#[test]
fn unknown_encoding_name_errors_without_network_access() {
    let err = get_encoding("not-a-real-encoding").unwrap_err();
    assert!(matches!(err, TokenizerError::ModelNotFound(_)));
}
