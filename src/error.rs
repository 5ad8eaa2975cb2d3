//! Error types and handling for WagerBot
//!
//! Every failure the core can produce is a variant of [`Error`]. Handlers do
//! not decide locally how to react to a failure; they return the error and the
//! orchestrator reacts according to [`Error::class`].

use thiserror::Error;

use crate::protocol::{Coord, ParticipantId, SessionId};

/// Result type alias for WagerBot operations
pub type Result<T> = std::result::Result<T, Error>;

/// How the orchestrator should react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad user input: re-prompt in place, state unchanged
    Validation,
    /// Wrong actor or wrong moment: transient notice, state unchanged
    Authorization,
    /// Data is missing or inconsistent: log and abort the action
    Integrity,
    /// An external collaborator failed: log and degrade
    Collaborator,
    /// Local infrastructure (files, config) failed
    Infrastructure,
}

/// WagerBot error types
///
/// The `Display` text of validation and authorization variants is shown to
/// users verbatim, so it is written as a reply.
#[derive(Debug, Error)]
pub enum Error {
    // Input validation
    #[error("Please enter a valid number of points.")]
    InvalidPointsAmount(String),

    #[error("You don't have enough points. You have {balance}, but you tried to stake {requested}. Please enter a valid amount.")]
    InsufficientBalance { balance: i64, requested: u64 },

    #[error("That is not a valid media file. Please send a photo, video, or voice note.")]
    InvalidMediaStake,

    #[error("Best of {0} is not offered. Please pick one of the listed round counts.")]
    InvalidRoundCount(u8),

    #[error("Invalid coordinate '{0}'. Use a letter A-J followed by a number 1-10, e.g. B7.")]
    InvalidCoordinate(String),

    #[error("Invalid format. Please use A1 H or A1 V.")]
    InvalidPlacementFormat,

    #[error("Invalid placement: ship is out of bounds or overlaps another ship. Try again.")]
    InvalidPlacement,

    #[error("This column is full!")]
    ColumnFull(usize),

    #[error("Column {0} does not exist.")]
    InvalidColumn(usize),

    #[error("You have already fired at {0}.")]
    AlreadyTargeted(Coord),

    #[error("A die only has six faces, got {0}.")]
    InvalidDiceValue(u8),

    #[error("{0}")]
    InvalidInput(String),

    // Authorization
    #[error("It's not your turn!")]
    NotYourTurn,

    #[error("You are not playing in this game.")]
    NotParticipant(ParticipantId),

    #[error("This challenge is not for you.")]
    NotInvited(ParticipantId),

    #[error("You cannot challenge yourself.")]
    SelfChallenge,

    #[error("Only admins can use this command.")]
    NotAuthorized(ParticipantId),

    #[error("{0}")]
    InvalidState(String),

    // Integrity
    #[error("This game is no longer available.")]
    SessionNotFound(SessionId),

    #[error("Session {0} already exists")]
    DuplicateSession(SessionId),

    #[error("No stake recorded for the losing side of session {0}")]
    UnresolvedStake(SessionId),

    #[error("Session {0} is active but has no play state")]
    MissingPlayState(SessionId),

    // Collaborators
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Points ledger error: {0}")]
    Ledger(String),

    // Infrastructure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify the error for the orchestrator
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidPointsAmount(_)
            | Error::InsufficientBalance { .. }
            | Error::InvalidMediaStake
            | Error::InvalidRoundCount(_)
            | Error::InvalidCoordinate(_)
            | Error::InvalidPlacementFormat
            | Error::InvalidPlacement
            | Error::ColumnFull(_)
            | Error::InvalidColumn(_)
            | Error::AlreadyTargeted(_)
            | Error::InvalidDiceValue(_)
            | Error::InvalidInput(_) => ErrorClass::Validation,

            Error::NotYourTurn
            | Error::NotParticipant(_)
            | Error::NotInvited(_)
            | Error::SelfChallenge
            | Error::NotAuthorized(_)
            | Error::InvalidState(_) => ErrorClass::Authorization,

            Error::SessionNotFound(_)
            | Error::DuplicateSession(_)
            | Error::UnresolvedStake(_)
            | Error::MissingPlayState(_) => ErrorClass::Integrity,

            Error::Transport(_) | Error::Ledger(_) => ErrorClass::Collaborator,

            Error::Io(_) | Error::Serialization(_) | Error::ConfigParse(_) | Error::Config(_) => {
                ErrorClass::Infrastructure
            }
        }
    }

    /// Whether the error text is meant to be shown to the acting user
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Validation | ErrorClass::Authorization
        )
    }
}
