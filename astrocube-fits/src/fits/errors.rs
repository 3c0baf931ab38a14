#[derive(Debug, thiserror::Error)]
pub enum FitsError {
    #[error("Invalid FITS format: {0}")]
    InvalidFormat(String),

    #[error("Keyword {keyword} not found")]
    KeywordNotFound { keyword: String },

    #[error("Invalid BITPIX value: {0}")]
    InvalidBitPix(i64),

    #[error("Invalid keyword value: {keyword} = {value}")]
    InvalidKeywordValue { keyword: String, value: String },

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Data segment truncated: expected {expected} bytes, found {actual}")]
    TruncatedData { expected: u64, actual: u64 },

    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    #[error("No volume loaded")]
    NoVolume,

    #[error("Degenerate volume: {0}")]
    DegenerateVolume(String),

    #[error("Unsupported component count: {0}")]
    UnsupportedComponents(usize),

    #[error("Invalid reader configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FitsError {
    pub fn keyword_not_found(keyword: impl Into<String>) -> Self {
        Self::KeywordNotFound {
            keyword: keyword.into(),
        }
    }

    pub fn invalid_value(keyword: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidKeywordValue {
            keyword: keyword.into(),
            value: value.into(),
        }
    }

    /// Format errors abort a load; precondition violations only refuse a
    /// statistics request.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_)
                | Self::KeywordNotFound { .. }
                | Self::InvalidBitPix(_)
                | Self::InvalidKeywordValue { .. }
                | Self::InvalidDimensions(_)
                | Self::TruncatedData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FitsError>;
