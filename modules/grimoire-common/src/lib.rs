pub mod config;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod retry;
pub mod types;

pub use config::Config;
pub use error::GrimoireError;
pub use identity::card_name_guid;
pub use normalize::{normalize_card_name, trigram_positions};
pub use retry::RetryPolicy;
pub use types::*;
