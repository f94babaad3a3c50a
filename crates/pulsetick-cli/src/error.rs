use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] pulsetick_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] pulsetick_core::WarehouseError),

    #[error("store error: {0}")]
    Store(#[from] pulsetick_core::StoreError),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
            Self::Warehouse(_) => 10,
            Self::Store(_) => 10,
        }
    }
}
