use thiserror::Error;

/// Error produced while parsing a `DXBC` container or one of its chunks.
#[derive(Debug, Clone, Error)]
pub enum DxbcError {
    /// The container header is missing, truncated, or carries a bad magic.
    #[error("malformed DXBC header: {0}")]
    MalformedHeader(String),
    /// The chunk offset table or a chunk header points outside the container.
    #[error("malformed DXBC chunk table: {0}")]
    MalformedChunks(String),
    /// A chunk payload failed to parse.
    #[error("invalid {chunk} chunk: {detail}")]
    InvalidChunk {
        /// FourCC of the offending chunk, as text.
        chunk: String,
        /// What went wrong.
        detail: String,
    },
    /// The container has no shader bytecode chunk (`SHDR`/`SHEX`).
    #[error("DXBC container is missing a shader bytecode chunk (SHDR or SHEX)")]
    MissingShaderChunk,
}

impl DxbcError {
    pub(crate) fn invalid_chunk(chunk: impl std::fmt::Display, detail: impl Into<String>) -> Self {
        DxbcError::InvalidChunk {
            chunk: chunk.to_string(),
            detail: detail.into(),
        }
    }
}
