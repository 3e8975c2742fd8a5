//! Configuration constants for the quizcast session core
//!
//! This module contains the defaults and limits used throughout the
//! session core: player quota, question timing, protocol sentinels,
//! and size bounds enforced during validation.

/// Session-level defaults and limits
pub mod session {
    use std::time::Duration;

    /// Number of joined players required before the game starts
    pub const DEFAULT_REQUIRED_PLAYERS: usize = 2;
    /// Maximum number of players allowed in a single session
    pub const MAX_PLAYER_COUNT: usize = 64;
    /// Default time limit in seconds for answering a question
    pub const DEFAULT_TIME_LIMIT: u64 = 20;
    /// Minimum configurable time limit in seconds
    pub const MIN_TIME_LIMIT: u64 = 5;
    /// Maximum configurable time limit in seconds
    pub const MAX_TIME_LIMIT: u64 = 240;
    /// Delay between resolving one question and delivering the next,
    /// giving clients time to render the previous result
    pub const PACING_DELAY: Duration = Duration::from_secs(1);
}

/// Question record limits
pub mod question {
    /// Number of answer options every question carries
    pub const OPTION_COUNT: usize = 4;
    /// Maximum length of a question prompt in characters
    pub const MAX_PROMPT_LENGTH: usize = 200;
    /// Maximum length of a single answer option in characters
    pub const MAX_OPTION_LENGTH: usize = 200;
    /// Maximum number of questions in a single bank
    pub const MAX_BANK_SIZE: usize = 100;
}

/// Player identity limits
pub mod player {
    /// Maximum length of a display name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
}

/// Protocol sentinels shared with clients
pub mod protocol {
    /// Sender name used for server-originated chat notices
    pub const SERVER_NAME: &str = "Server";
    /// Winner sentinel broadcast when the session aborts below quorum
    pub const NO_WINNER: &str = "No winner - not enough players";
    /// Winner sentinel broadcast when the score table is empty at the finish
    pub const NO_PLAYERS: &str = "No players";
}
