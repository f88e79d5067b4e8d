use thiserror::Error;

#[derive(Debug, Error)]
pub enum BloomError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("digest of {digest_len} bytes cannot feed {hash_count} hashes of {bytes_per_slice} bytes each")]
    DigestTooShort {
        digest_len: usize,
        hash_count: usize,
        bytes_per_slice: usize,
    },

    #[error("bit index {index} out of range for {len} bits")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("bulk item #{position}: {source}")]
    BulkItem {
        position: usize,
        #[source]
        source: Box<BloomError>,
    },

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BloomError>;

impl serde::ser::Error for BloomError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        BloomError::UnsupportedType(msg.to_string())
    }
}
