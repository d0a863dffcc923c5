use thiserror::Error;

/// Parse failures from the minimal reflection JSON reader.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonError {
    #[error("unexpected end of JSON")]
    UnexpectedEnd,
    #[error("invalid JSON token")]
    InvalidToken,
    #[error("expected string")]
    ExpectedString,
    #[error("invalid escape")]
    InvalidEscape,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("expected ':' in object")]
    ExpectedColon,
    #[error("expected ',' or '}}' in object")]
    ExpectedObjectSeparator,
    #[error("unterminated object")]
    UnterminatedObject,
    #[error("expected ',' or ']' in array")]
    ExpectedArraySeparator,
    #[error("unterminated array")]
    UnterminatedArray,
    #[error("invalid boolean")]
    InvalidBool,
    #[error("invalid null")]
    InvalidNull,
    #[error("invalid number")]
    InvalidNumber,
    /// Content remained after the root value.
    #[error("unexpected trailing characters")]
    TrailingCharacters,
}

/// Failures normalizing a Slang reflection JSON document.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlangReflectError {
    /// The side-file was not well-formed JSON.
    #[error("{0}")]
    Json(#[from] JsonError),
    /// The document parsed but its root was not an object.
    #[error("reflection root is not an object")]
    NotAnObject,
}

/// Failures introspecting DXIL bytecode.
///
/// Each variant names the introspection step that refused the container, in
/// the order they are attempted.
#[cfg(windows)]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxilReflectError {
    #[error("empty bytecode")]
    EmptyBytecode,
    #[error("failed to create IDxcUtils")]
    CreateUtils,
    #[error("failed to create container reflection")]
    CreateContainerReflection,
    #[error("failed to create DXIL blob")]
    CreateBlob,
    #[error("failed to load DXIL container")]
    LoadContainer,
    #[error("DXIL part not found in container")]
    MissingDxilPart,
    #[error("container reflection failed")]
    PartReflection,
}
