//! 错误类型定义

use thiserror::Error;

pub type BreakerResult<T> = std::result::Result<T, BreakerError>;

#[derive(Error, Debug)]
pub enum BreakerError {
    #[error("Invalid hash '{0}': expected 1 to 8 hex digits")]
    InvalidHash(String),

    #[error("Invalid charset: {0}")]
    InvalidCharset(String),

    #[error("Invalid hint: {0}")]
    InvalidHint(String),

    #[error("Invalid batch configuration: {0}")]
    InvalidBatch(String),

    #[error("No usable compute device found")]
    NoDevice,

    #[error("Device '{device}' failed: {message}")]
    Device { device: String, message: String },

    #[error("Batch job failed: {0}")]
    JobFailed(String),

    #[cfg(feature = "opencl")]
    #[error("OpenCL error: {0}")]
    OpenCL(#[from] ocl::Error),
}
