mod engine;
mod progress;
mod runner;

// Public API of the quiz subsystem.
pub use crate::error::QuizError;
pub use engine::{Advance, CheckOutcome, QuizSession};
pub use progress::QuizProgress;
pub use runner::{QuizAdvance, QuizOutcome, QuizRunner};
