use std::path::PathBuf;

/// A configuration value that cannot produce a usable vocabulary, tokenizer
/// or detector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_vocab_size {max_vocab_size} is below the {reserve}-token reserve for non-note tokens")]
    VocabTooSmall { max_vocab_size: usize, reserve: usize },

    #[error("{required} non-note tokens do not fit in the {reserve}-token reserve")]
    ReserveExceeded { required: usize, reserve: usize },

    #[error("invalid octave range {min}..={max} (octaves must lie in -1..=9)")]
    InvalidOctaveRange { min: i32, max: i32 },

    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("{kind} '{name}' renders the token {token} more than once")]
    DuplicateToken {
        kind: &'static str,
        name: String,
        token: String,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Why a single token could not be turned into something meaningful.
///
/// Decoding treats every variant as "skip and continue"; the kind is kept so
/// callers can inspect what was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed note token '{token}': expected NOTE_{{pitch}}_{{duration}}_{{dynamic}}")]
    MalformedNote { token: String },

    #[error("unknown pitch '{pitch}' in token '{token}'")]
    UnknownPitch { token: String, pitch: String },

    #[error("unknown dynamic '{dynamic}' in token '{token}'")]
    UnknownDynamic { token: String, dynamic: String },

    #[error("unrecognized token '{token}'")]
    Unrecognized { token: String },
}

impl TokenError {
    /// The raw token text this error refers to.
    pub fn token(&self) -> &str {
        match self {
            TokenError::MalformedNote { token }
            | TokenError::UnknownPitch { token, .. }
            | TokenError::UnknownDynamic { token, .. }
            | TokenError::Unrecognized { token } => token,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SmtError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("corrupt vocabulary: {0}")]
    CorruptVocabulary(String),
}

impl SmtError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SmtError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SmtError>;
