//! Lossy/ignoring/escaping UTF-8 decode helpers used by [`DecodeErrorHandler`].
//!
//! Grounded on the teacher's `counter/utils.rs`, which itself is a trimmed copy of
//! `rust-lang/rust`'s internal `Utf8Chunks` debug formatter. We reuse `bstr`'s
//! implementation of the same chunking idea instead of hand-rolling the UTF-8
//! continuation-byte state machine a second time.
//!
//! [`DecodeErrorHandler`]: crate::core_bpe::DecodeErrorHandler

use bstr::ByteSlice;
use std::borrow::Cow;

/// Decodes `v` as UTF-8, dropping any invalid byte runs entirely.
pub fn from_utf8_ignore(v: &[u8]) -> Cow<'_, str> {
    from_utf8_or(v, "")
}

/// Decodes `v` as UTF-8, rendering each invalid byte as a `\xNN` escape.
pub fn from_utf8_backslash_replace(v: &[u8]) -> Cow<'_, str> {
    if v.is_utf8() {
        // Safety: `ByteSlice::is_utf8` guarantees validity.
        return Cow::Borrowed(unsafe { std::str::from_utf8_unchecked(v) });
    }

    let mut res = String::with_capacity(v.len());
    for chunk in v.utf8_chunks() {
        res.push_str(chunk.valid());
        for &byte in chunk.invalid() {
            res.push_str(&format!("\\x{:02X}", byte));
        }
    }
    Cow::Owned(res)
}

fn from_utf8_or<'a>(v: &'a [u8], replacement: &str) -> Cow<'a, str> {
    if v.is_utf8() {
        return Cow::Borrowed(unsafe { std::str::from_utf8_unchecked(v) });
    }

    let mut res = String::with_capacity(v.len());
    for chunk in v.utf8_chunks() {
        res.push_str(chunk.valid());
        if !chunk.invalid().is_empty() {
            res.push_str(replacement);
        }
    }
    Cow::Owned(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_drops_invalid_bytes() {
        let mut bytes = b"hello ".to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"world");
        assert_eq!(from_utf8_ignore(&bytes), "hello world");
    }

    #[test]
    fn backslash_replace_escapes_invalid_bytes() {
        let bytes = vec![b'a', 0xFF, b'b'];
        assert_eq!(from_utf8_backslash_replace(&bytes), "a\\xFFb");
    }

    #[test]
    fn valid_utf8_is_returned_borrowed() {
        assert_eq!(from_utf8_ignore(b"plain"), "plain");
    }
}
