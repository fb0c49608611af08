use scryfall_client::ScryfallCard;
use tracing::debug;

use crate::error::Result;
use crate::processors::CardStep;

/// Runs the per-card steps in order. The first failing step aborts the
/// remaining steps for that card.
pub struct CardProcessor {
    steps: Vec<Box<dyn CardStep>>,
}

impl CardProcessor {
    pub fn new(steps: Vec<Box<dyn CardStep>>) -> Self {
        Self { steps }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn process(&self, card: &ScryfallCard) -> Result<()> {
        debug!(card_id = %card.id, name = %card.name, "Processing card");
        for step in &self.steps {
            step.process(card).await?;
        }
        debug!(card_id = %card.id, name = %card.name, "Card processed");
        Ok(())
    }
}
