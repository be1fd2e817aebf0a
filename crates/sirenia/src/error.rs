#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("placement failed for node `{node}`: {reason}")]
    PlacementFailure { node: String, reason: String },

    #[error("invalid pin orientation `{value}` (expected one of U, D, L, R)")]
    InvalidPinOrientation { value: String },

    #[error("net `{net}` refers to missing pin {pin} of part {part}")]
    InvalidNetPin { net: String, part: usize, pin: usize },

    #[error("unknown placement option: {name}")]
    UnknownOption { name: String },

    #[error("invalid value `{value}` for placement option {name}")]
    InvalidOptionValue { name: String, value: String },

    #[error("circuit JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
