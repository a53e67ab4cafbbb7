use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No Base58 encoding of a 32-byte key can start with this prefix.
    #[error("no 32-byte key encodes to an address starting with \"{0}\"")]
    InvalidPrefix(String),

    #[error("OpenCL platform index {index} out of range ({count} platform(s) available)")]
    PlatformOutOfRange { index: usize, count: usize },

    #[error("OpenCL device index {index} out of range ({count} device(s) available)")]
    DeviceOutOfRange { index: usize, count: usize },

    #[error("no OpenCL devices available on the selected platform")]
    NoDevice,

    #[error("OpenCL error: {0}")]
    OpenCl(#[from] ocl::Error),
}
