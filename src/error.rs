use thiserror::Error;

/// Every fallible operation in this crate returns one of these kinds.
///
/// `Native` is kept distinct from `Runtime` so callers that care can recover
/// the backend's raw result code without string-matching a message.
#[derive(Error, Debug)]
pub enum GfxError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("native call failed ({context}): {code}")]
    Native { context: &'static str, code: i32 },
    #[error("argument not initialized: {0}")]
    NotInitialized(&'static str),
    #[error("device lost")]
    DeviceLost,
}

pub type GfxResult<T> = Result<T, GfxError>;

impl GfxError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    pub fn native(context: &'static str, code: i32) -> Self {
        Self::Native { context, code }
    }
}
