// Orchestration: cards through CardProcessor, sets through SetProcessor,
// batches of sets through BatchSetProcessor with an artist flush at every
// batch boundary.

pub mod batch;
pub mod card_processor;
pub mod set_processor;
pub mod stats;

pub use batch::{ArtistFlush, BatchSetProcessor};
pub use card_processor::CardProcessor;
pub use set_processor::{SetOutcome, SetProcessor};
pub use stats::IngestStats;
