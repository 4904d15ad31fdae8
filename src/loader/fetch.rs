//! The networked collaborator for [`super::Loader`]: plain or cached reads of a
//! blob path, local file or `http(s)://` URL, with SHA-256 verification and an
//! on-disk cache keyed by the SHA-256 of the source path.
//!
//! Grounded on the teacher's `counter/openai/load.rs` (`read_file`,
//! `read_cached_file`, `check_hash`), generalized so the cache directory and the
//! parsing of what's fetched are separate concerns (spec 4.7).

use std::env::temp_dir;
use std::fs::{create_dir_all, remove_file, rename, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::{TokenizerError, TokenizerResult};

/// Reads `blobpath` verbatim: a local file path is opened directly, an
/// `http://`/`https://` URL is fetched with a blocking GET.
pub fn read_file(blobpath: &str) -> TokenizerResult<Vec<u8>> {
    if !blobpath.starts_with("http://") && !blobpath.starts_with("https://") {
        let mut file =
            File::open(Path::new(blobpath)).map_err(|e| TokenizerError::FileNotFound(e.to_string()))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| TokenizerError::Io(e.to_string()))?;
        return Ok(content);
    }

    let resp = reqwest::blocking::get(blobpath)
        .map_err(|e| TokenizerError::Io(e.to_string()))?
        .bytes()
        .map_err(|e| TokenizerError::Io(e.to_string()))?;
    Ok(resp.to_vec())
}

pub fn check_hash(data: &[u8], expected_hash: &str) -> bool {
    let mut hasher = Sha256::new();
    Digest::update(&mut hasher, data);
    hex_digest(hasher.finalize().as_slice()) == expected_hash
}

fn cache_dir() -> PathBuf {
    if let Ok(val) = std::env::var("TIKTOKEN_CACHE_DIR") {
        return PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("DATA_GYM_CACHE_DIR") {
        return PathBuf::from(val);
    }
    temp_dir().join("data-gym-cache")
}

/// Reads `blobpath` through the on-disk cache, verifying `expected_hash` both on
/// cache hit and after a fresh fetch. A cache entry that fails verification is
/// discarded and re-fetched once.
pub fn read_cached_file(blobpath: &str, expected_hash: Option<&str>) -> TokenizerResult<Vec<u8>> {
    let cache_dir = cache_dir();
    if cache_dir.as_os_str().is_empty() {
        return read_file(blobpath);
    }

    let mut cache_key_hasher = Sha256::new();
    Digest::update(&mut cache_key_hasher, blobpath.as_bytes());
    let cache_key = hex_digest(cache_key_hasher.finalize().as_slice());
    let cache_path = cache_dir.join(&cache_key);

    if cache_path.exists() {
        if let Ok(mut file) = File::open(&cache_path) {
            let mut content = Vec::new();
            if file.read_to_end(&mut content).is_ok() {
                match expected_hash {
                    Some(hash) if check_hash(&content, hash) => return Ok(content),
                    None => return Ok(content),
                    _ => {}
                }
            }
        }
        let _ = remove_file(&cache_path);
    }

    let contents = read_file(blobpath)?;
    if let Some(hash) = expected_hash {
        if !check_hash(&contents, hash) {
            return Err(TokenizerError::ChecksumMismatch {
                expected: hash.to_string(),
                actual: hex_digest(Sha256::digest(&contents).as_slice()),
            });
        }
    }

    create_dir_all(&cache_dir).map_err(|e| TokenizerError::Io(e.to_string()))?;
    let temp_path = cache_dir.join(format!(".{}.tmp", Uuid::new_v4()));
    File::create(&temp_path)
        .and_then(|mut f| f.write_all(&contents))
        .map_err(|e| TokenizerError::Io(e.to_string()))?;
    rename(&temp_path, &cache_path).map_err(|e| TokenizerError::Io(e.to_string()))?;

    Ok(contents)
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_hash_matches_known_digest() {
        assert!(check_hash(
            b"test",
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        ));
    }

    #[test]
    fn check_hash_rejects_wrong_digest() {
        assert!(!check_hash(b"test", "0000000000000000000000000000000000000000000000000000000000000000"));
    }

    #[test]
    fn read_file_reads_local_path() {
        let dir = temp_dir().join(format!("bpe-tokenizer-test-{}", Uuid::new_v4()));
        create_dir_all(&dir).unwrap();
        let path = dir.join("sample.txt");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(read_file(path.to_str().unwrap()).unwrap(), b"hello");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_file_missing_local_path_errors() {
        let err = read_file("/nonexistent/path/for/bpe-tokenizer-tests").unwrap_err();
        assert!(matches!(err, TokenizerError::FileNotFound(_)));
    }
}
