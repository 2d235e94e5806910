pub type CardcastResult<T> = Result<T, CardcastError>;

#[derive(thiserror::Error, Debug)]
pub enum CardcastError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CardcastError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self::Font(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
