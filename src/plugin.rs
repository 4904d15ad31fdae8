//! Plugin manifest persistence: the on-disk record of which third-party vocab
//! plugins are currently loaded, serialized as `plugins.json` (spec 4.8, 6).

use std::env::temp_dir;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{TokenizerError, TokenizerResult};
use crate::registry::VocabDescriptor;

/// One entry of `plugins.json`: identifying metadata for an active plugin. The
/// descriptor itself is not persisted — only the registry's in-memory state
/// knows how to rebuild it; the manifest exists so a host process can show
/// "what's loaded" without touching the registry lock.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginManifestEntry {
    pub identifier: String,
    pub version: String,
    pub summary: String,
}

/// A plugin ready to be handed to `Registry::load`: manifest metadata plus the
/// vocab descriptor it registers under its own identifier.
pub struct Plugin {
    pub identifier: String,
    pub version: String,
    pub summary: String,
    pub descriptor: VocabDescriptor,
}

impl Plugin {
    pub fn manifest_entry(&self) -> PluginManifestEntry {
        PluginManifestEntry {
            identifier: self.identifier.clone(),
            version: self.version.clone(),
            summary: self.summary.clone(),
        }
    }
}

fn plugin_dir() -> PathBuf {
    if let Ok(val) = std::env::var("BPE_TOKENIZER_PLUGIN_DIR") {
        return PathBuf::from(val);
    }
    temp_dir().join("bpe-tokenizer-plugins")
}

fn manifest_path() -> PathBuf {
    plugin_dir().join("plugins.json")
}

/// Overwrites `plugins.json` with the given set of active plugins, sorted by
/// identifier for a stable diff.
pub fn save_manifest(entries: &[PluginManifestEntry]) -> TokenizerResult<()> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| a.identifier.cmp(&b.identifier));

    let dir = plugin_dir();
    fs::create_dir_all(&dir).map_err(|e| TokenizerError::Io(e.to_string()))?;
    let json = serde_json::to_string_pretty(&sorted)
        .map_err(|e| TokenizerError::ValueError(e.to_string()))?;
    fs::write(manifest_path(), json).map_err(|e| TokenizerError::Io(e.to_string()))
}

/// Reads `plugins.json`, returning an empty list if it doesn't exist yet.
pub fn load_manifest() -> TokenizerResult<Vec<PluginManifestEntry>> {
    let path = manifest_path();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(&path).map_err(|e| TokenizerError::Io(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| TokenizerError::ValueError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_entries_sort_by_identifier_on_save() {
        let entries = vec![
            PluginManifestEntry {
                identifier: "zzz".to_string(),
                version: "1.0".to_string(),
                summary: "z".to_string(),
            },
            PluginManifestEntry {
                identifier: "aaa".to_string(),
                version: "1.0".to_string(),
                summary: "a".to_string(),
            },
        ];
        let mut sorted = entries.clone();
        sorted.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        assert_eq!(sorted[0].identifier, "aaa");
    }
}
