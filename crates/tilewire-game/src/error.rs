//! Error types for the game layer.

/// A local action the current game state doesn't allow.
///
/// These are checked before anything is sent, so the server never sees
/// the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Someone is shouting, the board is full, or it isn't our turn.
    #[error("it is not possible to take a turn right now")]
    TurnNotAllowed,

    /// Someone is already shouting, or there is nothing on the board.
    #[error("it is not possible to shout right now")]
    ShoutNotAllowed,

    #[error("tile capacity must be between 1 and {max}, got {requested}")]
    InvalidTileCapacity { requested: u8, max: u8 },
}
