use thiserror::Error;

/// Contract ABI type-parsing, packing and unpacking errors.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("invalid type: {0}")]
    InvalidType(String),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("invalid field name: {0}")]
    InvalidFieldName(String),

    #[error("cannot use {got} as type {expected} as argument")]
    TypeMismatch { expected: String, got: String },

    #[error("negatively-signed value cannot be packed into uint parameter")]
    InvalidSign,

    #[error("value {value} does not fit in {ty}")]
    ValueOutOfRange { ty: String, value: String },

    #[error("argument count mismatch: got {got} for {expected}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("length insufficient: have {have}, require {want}")]
    InsufficientLength { have: usize, want: String },

    #[error("offset overflow: {0}")]
    OffsetOverflow(String),

    #[error("improperly encoded boolean value")]
    ImproperlyEncodedBool,

    #[error("improperly encoded {0} value")]
    ImproperlyEncodedInt(String),

    #[error("improperly encoded function type")]
    ImproperlyEncodedFunction,

    #[error("string payload is not valid utf-8")]
    InvalidUtf8,

    #[error("attempting to unmarshal an empty string while arguments are expected")]
    EmptyInputExpectedArguments,

    #[error("field {0} not found in the given value")]
    FieldNotFound(String),

    #[error("invalid identifier: have 0x{have}, want 0x{want}")]
    InvalidSelector { have: String, want: String },

    #[error("abi json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, AbiError>;
