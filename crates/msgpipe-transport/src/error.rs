/// Errors that can occur while acquiring channel streams.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The descriptor is not open in this process.
    #[error("descriptor {fd} is not usable: {source}")]
    InvalidDescriptor { fd: i32, source: std::io::Error },

    /// The descriptor is open but cannot be used in the required direction.
    #[error("descriptor {fd} is not {expected}")]
    WrongAccessMode { fd: i32, expected: &'static str },

    /// An I/O error occurred while setting up a stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
