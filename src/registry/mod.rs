//! The process-wide vocabulary registry: named encodings, model alias/prefix
//! resolution, and plugin lifecycle, all guarded by a single mutex (spec 4.8).
//!
//! Grounded on the teacher's `tokenizer/openai/models.rs` (alias/prefix tables,
//! `encoding_name_for_model`) generalized from a fixed `match` into mutable
//! registry state, since the teacher has no registry of its own to extend.

pub mod builtins;

use std::sync::{Mutex, OnceLock};

use rustc_hash::FxHashMap as HashMap;

use crate::errors::{TokenizerError, TokenizerResult};
use crate::loader;
use crate::plugin::{Plugin, PluginManifestEntry};
use crate::rank_table::Rank;
use crate::vocab::Encoding;

/// Where a [`VocabDescriptor`]'s rank map comes from. Resolving a source is the
/// one place the registry touches the loader/fetch collaborators (spec 4.7).
#[derive(Clone, Debug)]
pub enum VocabSource {
    TiktokenUrl {
        url: String,
        hash: Option<String>,
    },
    DataGym {
        vocab_bpe_url: String,
        encoder_json_url: String,
        vocab_bpe_hash: Option<String>,
        encoder_json_hash: Option<String>,
    },
    MergeableRanks(HashMap<Vec<u8>, Rank>),
}

impl VocabSource {
    fn resolve(&self) -> TokenizerResult<HashMap<Vec<u8>, Rank>> {
        match self {
            VocabSource::TiktokenUrl { url, hash } => {
                loader::load_tiktoken_bpe(url, hash.as_deref())
            }
            VocabSource::DataGym {
                vocab_bpe_url,
                encoder_json_url,
                vocab_bpe_hash,
                encoder_json_hash,
            } => loader::load_data_gym_bpe(
                vocab_bpe_url,
                encoder_json_url,
                vocab_bpe_hash.as_deref(),
                encoder_json_hash.as_deref(),
            ),
            VocabSource::MergeableRanks(ranks) => loader::from_mergeable_ranks(ranks.clone()),
        }
    }
}

/// An immutable record describing one registered encoding: its name, pattern,
/// special tokens, declared vocab size, and where to fetch its ranks from (spec
/// 3, "Vocab descriptor").
#[derive(Clone, Debug)]
pub struct VocabDescriptor {
    pub name: String,
    pub pattern: String,
    pub special_tokens: HashMap<String, Rank>,
    pub explicit_n_vocab: Option<u32>,
    pub source: VocabSource,
}

impl VocabDescriptor {
    /// Resolves ranks through this descriptor's loader and builds the bound
    /// `Encoding`.
    pub fn build(&self) -> TokenizerResult<Encoding> {
        let ranks = self.source.resolve()?;
        Encoding::new(
            self.name.clone(),
            &self.pattern,
            ranks,
            self.special_tokens.clone(),
            self.explicit_n_vocab,
        )
    }
}

struct RegistryState {
    names: HashMap<String, VocabDescriptor>,
    aliases: HashMap<String, String>,
    prefixes: Vec<(String, String)>,
    builtin_names: std::collections::HashSet<String>,
    builtin_aliases: HashMap<String, String>,
    builtin_prefixes: Vec<(String, String)>,
    plugins: HashMap<String, PluginManifestEntry>,
}

impl RegistryState {
    fn seeded() -> Self {
        let names: HashMap<String, VocabDescriptor> = builtins::seed_descriptors()
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        let builtin_names = names.keys().cloned().collect();

        let aliases: HashMap<String, String> = builtins::seed_aliases()
            .into_iter()
            .map(|(a, n)| (a.to_string(), n.to_string()))
            .collect();
        let builtin_aliases = aliases.clone();

        let prefixes: Vec<(String, String)> = builtins::seed_prefixes()
            .into_iter()
            .map(|(p, n)| (p.to_string(), n.to_string()))
            .collect();
        let builtin_prefixes = prefixes.clone();

        Self {
            names,
            aliases,
            prefixes,
            builtin_names,
            builtin_aliases,
            builtin_prefixes,
            plugins: HashMap::default(),
        }
    }

    fn reset(&mut self) {
        *self = Self::seeded();
    }
}

/// Thread-safe holder of the process-wide registry state.
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::seeded()),
        }
    }

    /// The process-wide singleton, lazily seeded with built-ins on first use.
    pub fn global() -> &'static Registry {
        static REGISTRY: OnceLock<Registry> = OnceLock::new();
        REGISTRY.get_or_init(Registry::new)
    }

    /// Inserts or replaces a vocab descriptor. Replacing a built-in name is
    /// rejected (spec 4.8: "insert or replace (except the loader of a built-in)").
    pub fn register(&self, descriptor: VocabDescriptor) -> TokenizerResult<()> {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if state.builtin_names.contains(&descriptor.name) {
            return Err(TokenizerError::ValueError(format!(
                "'{}' is a built-in encoding and cannot be replaced",
                descriptor.name
            )));
        }
        state.names.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> TokenizerResult<()> {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if state.builtin_names.contains(name) {
            return Err(TokenizerError::ValueError(format!(
                "'{}' is a built-in encoding and cannot be unregistered",
                name
            )));
        }
        if state.names.remove(name).is_none() {
            return Err(TokenizerError::ModelNotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn register_alias(&self, alias: &str, name: &str) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        state.aliases.insert(alias.to_string(), name.to_string());
    }

    /// Removes `alias`. If a built-in mapping existed for it, restores that
    /// instead of leaving it unresolved (spec 4.8).
    pub fn unregister_alias(&self, alias: &str) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        match state.builtin_aliases.get(alias).cloned() {
            Some(builtin_target) => {
                state.aliases.insert(alias.to_string(), builtin_target);
            }
            None => {
                state.aliases.remove(alias);
            }
        }
    }

    pub fn register_prefix(&self, prefix: &str, name: &str) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        state.prefixes.retain(|(p, _)| p != prefix);
        state.prefixes.push((prefix.to_string(), name.to_string()));
    }

    pub fn unregister_prefix(&self, prefix: &str) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        state.prefixes.retain(|(p, _)| p != prefix);
        if let Some((_, builtin_target)) =
            state.builtin_prefixes.iter().find(|(p, _)| p == prefix).cloned()
        {
            state.prefixes.push((prefix.to_string(), builtin_target));
        }
    }

    /// Resolves `identifier` to a vocab descriptor: exact name, then alias,
    /// then the longest registered prefix that starts `identifier` (the
    /// tie-breaking choice documented in DESIGN.md for the open question in
    /// spec section 9).
    pub fn resolve(&self, identifier: &str) -> Option<VocabDescriptor> {
        let state = self.state.lock().expect("registry mutex poisoned");

        if let Some(descriptor) = state.names.get(identifier) {
            return Some(descriptor.clone());
        }
        if let Some(name) = state.aliases.get(identifier) {
            return state.names.get(name).cloned();
        }

        state
            .prefixes
            .iter()
            .filter(|(prefix, _)| identifier.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .and_then(|(_, name)| state.names.get(name).cloned())
    }

    /// Restores built-in names/aliases/prefixes and unloads every active
    /// plugin.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        state.reset();
    }

    /// Registers `plugin`'s descriptor under its identifier and records it as
    /// active, persisting the updated manifest. Rejects a duplicate identifier.
    pub fn load(&self, plugin: Plugin) -> TokenizerResult<()> {
        {
            let state = self.state.lock().expect("registry mutex poisoned");
            if state.plugins.contains_key(&plugin.identifier) {
                return Err(TokenizerError::PluginDuplicate(plugin.identifier.clone()));
            }
        }

        let entry = plugin.manifest_entry();
        self.register(VocabDescriptor {
            name: plugin.identifier.clone(),
            ..plugin.descriptor
        })?;

        let mut state = self.state.lock().expect("registry mutex poisoned");
        state.plugins.insert(plugin.identifier.clone(), entry);
        let manifest: Vec<PluginManifestEntry> = state.plugins.values().cloned().collect();
        drop(state);
        crate::plugin::save_manifest(&manifest)
    }

    /// Unloads the plugin with identifier `id`, unregistering its descriptor
    /// and persisting the updated manifest. Rejects an unknown identifier.
    pub fn unload(&self, id: &str) -> TokenizerResult<()> {
        {
            let mut state = self.state.lock().expect("registry mutex poisoned");
            if state.plugins.remove(id).is_none() {
                return Err(TokenizerError::PluginUnknown(id.to_string()));
            }
        }

        let _ = self.unregister(id);

        let state = self.state.lock().expect("registry mutex poisoned");
        let manifest: Vec<PluginManifestEntry> = state.plugins.values().cloned().collect();
        drop(state);
        crate::plugin::save_manifest(&manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_descriptor(name: &str) -> VocabDescriptor {
        let mut ranks = HashMap::default();
        ranks.insert(vec![0u8], 0);
        VocabDescriptor {
            name: name.to_string(),
            pattern: r".".to_string(),
            special_tokens: HashMap::default(),
            explicit_n_vocab: None,
            source: VocabSource::MergeableRanks(ranks),
        }
    }

    #[test]
    fn resolve_exact_name_finds_builtin() {
        let registry = Registry::new();
        assert!(registry.resolve("cl100k_base").is_some());
        assert!(registry.resolve("not-a-real-encoding").is_none());
    }

    #[test]
    fn resolve_alias_and_prefix() {
        let registry = Registry::new();
        assert_eq!(registry.resolve("gpt-4o").unwrap().name, "o200k_base");
        assert_eq!(
            registry.resolve("gpt-4-turbo-preview").unwrap().name,
            "cl100k_base"
        );
    }

    #[test]
    fn cannot_register_over_a_builtin_name() {
        let registry = Registry::new();
        let err = registry.register(toy_descriptor("cl100k_base")).unwrap_err();
        assert!(matches!(err, TokenizerError::ValueError(_)));
    }

    #[test]
    fn register_and_unregister_custom_vocab() {
        let registry = Registry::new();
        registry.register(toy_descriptor("toy")).unwrap();
        assert!(registry.resolve("toy").is_some());
        registry.unregister("toy").unwrap();
        assert!(registry.resolve("toy").is_none());
    }

    #[test]
    fn unregister_builtin_name_is_rejected() {
        let registry = Registry::new();
        let err = registry.unregister("gpt2").unwrap_err();
        assert!(matches!(err, TokenizerError::ValueError(_)));
    }

    #[test]
    fn reset_restores_builtins_and_drops_custom_registrations() {
        let registry = Registry::new();
        registry.register(toy_descriptor("toy")).unwrap();
        registry.reset();
        assert!(registry.resolve("toy").is_none());
        assert!(registry.resolve("cl100k_base").is_some());
    }

    #[test]
    fn longest_prefix_wins_on_overlap() {
        let registry = Registry::new();
        registry.register_prefix("gpt-4o-", "toy-alias-target");
        registry.register(toy_descriptor("toy-alias-target")).unwrap();
        // "gpt-4-" (builtin, -> cl100k_base) and "gpt-4o-" (custom) both match
        // "gpt-4o-mini-2024"; the longer prefix must win.
        assert_eq!(
            registry.resolve("gpt-4o-mini-2024").unwrap().name,
            "toy-alias-target"
        );
    }
}
