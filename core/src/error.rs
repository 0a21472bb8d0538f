use thiserror::Error;

/// Infrastructure failures. Gameplay refusals live in [`Denied`].
#[derive(Error, Debug)]
pub enum CityError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cell ({i}, {j}) is outside the {n}x{n} grid")]
    OutOfBounds { i: usize, j: usize, n: usize },

    #[error("Remote map service unavailable: {reason}")]
    RemoteUnavailable { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CityResult<T> = Result<T, CityError>;

/// A refused player action. Non-fatal: the state is left untouched and
/// the message is shown to the player as a short-lived notice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Denied {
    #[error("Outside the map")]
    OutOfBounds,

    #[error("Field occupied")]
    FieldOccupied,

    #[error("Needs adjacent road")]
    NeedsAdjacentRoad,

    #[error("Not enough money: costs {needed}, you have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("Not enough stars: needs {needed}, you have {available}")]
    InsufficientStars { needed: u32, available: u32 },

    #[error("Nothing to demolish")]
    NothingToDemolish,

    #[error("Unknown building")]
    UnknownTile,

    #[error("The map cannot grow any further")]
    MapAtMaximum,
}
