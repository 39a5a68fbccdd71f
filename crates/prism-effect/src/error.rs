use thiserror::Error;

/// Errors raised while building the effect object model.
#[derive(Debug, Clone, Error)]
pub enum EffectError {
    /// An array-dimension suffix embedded in a parameter name is malformed.
    #[error("malformed array syntax in parameter name {name:?}: {detail}")]
    ArraySyntax {
        /// The offending name, as reported by reflection.
        name: String,
        /// What went wrong.
        detail: String,
    },
    /// A pass tried to bind two shaders of the same stage kind.
    #[error("pass {pass:?} already binds a {stage} shader")]
    DuplicateStageBinding {
        /// Pass name.
        pass: String,
        /// Stage kind, as text.
        stage: &'static str,
    },
}

/// Errors raised while serializing an effect.
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// A name does not fit the 8-bit length prefix.
    #[error("string {0:?} exceeds the 255-byte name limit")]
    StringTooLong(String),
    /// A count field does not fit its declared width.
    #[error("{what} count {count} exceeds the wire maximum {max}")]
    CountOverflow {
        /// What overflowed.
        what: &'static str,
        /// Observed count.
        count: usize,
        /// Wire maximum.
        max: usize,
    },
    /// A size or offset does not fit its declared width.
    #[error("{what} value {value} exceeds the wire maximum {max}")]
    FieldOverflow {
        /// What overflowed.
        what: &'static str,
        /// Observed value.
        value: u64,
        /// Wire maximum.
        max: u64,
    },
    /// The effect was not linked before serialization.
    #[error("effect must be parameter-linked before serialization: {0}")]
    Unlinked(&'static str),
}

/// Errors raised while reading a serialized effect.
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    /// The stream ended before a field could be read.
    #[error("unexpected end of effect data at offset {0}")]
    UnexpectedEof(usize),
    /// The magic bytes are wrong.
    #[error("not an effect binary (bad magic)")]
    BadMagic,
    /// The format version is not supported by this reader.
    #[error("unsupported effect format version {0}")]
    UnsupportedVersion(u8),
    /// A string field is not valid UTF-8.
    #[error("string at offset {0} is not valid UTF-8")]
    InvalidString(usize),
    /// A code field holds a value outside its enum.
    #[error("invalid {what} code {code} at offset {offset}")]
    InvalidCode {
        /// Which field.
        what: &'static str,
        /// Observed code.
        code: u32,
        /// Stream offset.
        offset: usize,
    },
}
