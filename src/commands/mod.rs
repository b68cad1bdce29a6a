pub mod dispatcher;
pub mod handlers;
pub mod params;

use thiserror::Error;

pub use dispatcher::{CommandHandler, Dispatcher};
pub use handlers::{AnimHandler, FacsHandler, GazeHandler, SpeechHandler, StopSpeechHandler};

pub const SPEECH: &str = "speech";
pub const STOP_SPEECH: &str = "stopSpeech";
pub const GAZE: &str = "gaze";
pub const ANIM: &str = "anim";
pub const FACS: &str = "facs";

/// Every command type the engine understands, whether or not its channel is enabled.
pub const KNOWN_TYPES: [&str; 5] = [SPEECH, STOP_SPEECH, GAZE, ANIM, FACS];

/// Reasons a command is turned into a `rejected` status. The display text is
/// the `reason` attribute sent back to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unsupported command type")]
    UnsupportedCommandType(String),
    #[error("{0} animation not supported")]
    UnsupportedChannel(String),
    #[error("no '{0}' attribute found")]
    MissingParameter(&'static str),
    #[error("unknown animation {0}")]
    UnknownAnimation(String),
}
