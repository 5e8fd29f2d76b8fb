//! Result and Error types for vsans-decay

/// Type alias for `Result<T, decay::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `vsans-decay` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to write decay summary")]
    FailedToWrite(#[from] std::io::Error),

    #[error("cell \"{name}\" has non-physical parameters (Mu={mu}, Te={te})")]
    InvalidCellParameters { name: String, mu: f64, te: f64 },

    #[error("transmission {transmission} is below the fully depolarized floor {floor}")]
    TransmissionOutOfRange { transmission: f64, floor: f64 },

    #[error("cell \"{0}\" has no transmission observations to fit")]
    NoObservations(String),

    #[error("no He3 cells available to query")]
    NoCells,
}
