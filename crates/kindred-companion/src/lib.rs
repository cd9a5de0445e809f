//! The message-turn pipeline: crisis screening, day-scoped conversation
//! resolution, windowed history, persona prompt assembly and model completion.

pub mod audio;
pub mod clock;
pub mod conversations;
pub mod crisis;
pub mod error;
pub mod groq;
pub mod history;
pub mod model;
pub mod policy;
pub mod prompt;
pub mod resolver;
pub mod testing;
pub mod transcribe;
pub mod turn;

mod store;

pub use error::CompanionError;
