use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error taxonomy for the whole crate: the core encoding pipeline, the registry,
/// and the loader/fetch collaborators all return this type.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenizerError {
    /// Input contained a special-token literal forbidden by the caller's policy.
    DisallowedSpecial(String),
    /// `encode_single_token` found neither a special nor a rank-map entry.
    SingleTokenNotFound(String),
    /// `decode_single_token_bytes` found no entry for the given id.
    TokenBytesNotFound(u32),
    /// Strict-mode UTF-8 decode failure, or a malformed regex/vocab at construction time.
    InvalidEncoding(String),
    /// Encoding name is not registered and does not resolve via alias or prefix.
    ModelNotFound(String),
    /// A rank or vocab file could not be parsed.
    ValueError(String),
    /// Loader/fetch collaborator: downloaded bytes didn't match the expected digest.
    ChecksumMismatch { expected: String, actual: String },
    /// Loader/fetch collaborator: the source path/URL was malformed or unreadable.
    InvalidSource(String),
    /// Loader/fetch collaborator: a local file path does not exist.
    FileNotFound(String),
    /// Registry: attempted to load a plugin whose identifier is already active.
    PluginDuplicate(String),
    /// Registry: attempted to unload a plugin identifier that isn't active.
    PluginUnknown(String),
    /// Filesystem or network I/O failure surfaced unchanged from the collaborator.
    Io(String),
}

impl Display for TokenizerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DisallowedSpecial(literal) => write!(
                f,
                "Encountered text corresponding to disallowed special token {:?}.\n\
                If you want this text to be encoded as a special token, add it to \
                `allowed_special`. If you want it encoded as normal text, remove it from \
                `disallowed_special`. To disable this check entirely, pass an empty disallowed \
                set.",
                literal
            ),
            Self::SingleTokenNotFound(value) => {
                write!(f, "'{}' is not a known single token", value)
            }
            Self::TokenBytesNotFound(id) => write!(f, "no byte representation for token {}", id),
            Self::InvalidEncoding(detail) => write!(f, "invalid encoding: {}", detail),
            Self::ModelNotFound(name) => write!(f, "encoding '{}' not found", name),
            Self::ValueError(detail) => write!(f, "value error: {}", detail),
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch: expected {}, got {}. This may indicate a corrupted download.",
                expected, actual
            ),
            Self::InvalidSource(detail) => write!(f, "invalid source: {}", detail),
            Self::FileNotFound(path) => write!(f, "file not found: {}", path),
            Self::PluginDuplicate(id) => write!(f, "plugin '{}' is already loaded", id),
            Self::PluginUnknown(id) => write!(f, "no plugin '{}' is loaded", id),
            Self::Io(detail) => write!(f, "I/O error: {}", detail),
        }
    }
}

impl Error for TokenizerError {}

pub type TokenizerResult<T> = Result<T, TokenizerError>;
