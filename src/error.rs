//! Errors raised while reading and compiling schema documents.

/// A schema document could not be read as a tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("syntax: {0}")]
    Syntax(String),
    #[error("line {line}: closing tag </{close}> does not match <{open}>")]
    MismatchedTag {
        open: String,
        close: String,
        line: usize,
    },
    #[error("line {line}: unknown entity '&{entity};'")]
    UnknownEntity { entity: String, line: usize },
    #[error("not valid UTF-8: {0}")]
    Encoding(String),
}

/// A message or enum definition is not valid. Fails only the message (or enum block)
/// it was raised for; the rest of the document still compiles.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("<{element}> is missing the '{attribute}' attribute")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("message {message}: invalid id '{value}' (expected 0..={max})")]
    InvalidMessageId {
        message: String,
        value: String,
        max: u8,
    },
    #[error("message {message}: field '{field}' has unknown type '{type_name}'")]
    UnknownType {
        message: String,
        field: String,
        type_name: String,
    },
    #[error("message {message}: field '{field}' has malformed array type '{type_spec}'")]
    MalformedArray {
        message: String,
        field: String,
        type_spec: String,
    },
    #[error("message {message}: field '{field}' array length {arity} does not fit in one byte")]
    ArityOverflow {
        message: String,
        field: String,
        arity: u64,
    },
    #[error("message {message}: duplicate field '{field}'")]
    DuplicateField { message: String, field: String },
    #[error("message {message}: id {id} already used by {existing}")]
    DuplicateMessageId {
        id: u8,
        message: String,
        existing: String,
    },
    #[error("enum {enum_name}: entry '{entry}' has invalid value '{value}'")]
    InvalidEnumValue {
        enum_name: String,
        entry: String,
        value: String,
    },
    #[error("message {message}: artifact {file} already written for {existing}")]
    ArtifactCollision {
        message: String,
        existing: String,
        file: String,
    },
}
