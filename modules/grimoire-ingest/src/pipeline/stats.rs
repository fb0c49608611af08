use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub sets_total: u32,
    pub sets_processed: u32,
    pub sets_failed: u32,
    pub set_steps_failed: u32,
    pub cards_processed: u32,
    pub cards_failed: u32,
    pub batches: u32,
    pub artist_flushes: u32,
    pub artists_flushed: u32,
    pub artist_writes_failed: u32,
    pub artists_discarded: u32,
    pub trigrams_written: u32,
    pub trigrams_failed: u32,
    pub elapsed_ms: u64,
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Ingestion Complete ===")?;
        writeln!(f, "Sets:            {} / {}", self.sets_processed, self.sets_total)?;
        writeln!(f, "Sets failed:     {}", self.sets_failed)?;
        writeln!(f, "Set steps failed:{}", self.set_steps_failed)?;
        writeln!(f, "Cards processed: {}", self.cards_processed)?;
        writeln!(f, "Cards failed:    {}", self.cards_failed)?;
        writeln!(f, "Batches:         {}", self.batches)?;
        writeln!(f, "\nArtists:")?;
        writeln!(f, "  Flushes:       {}", self.artist_flushes)?;
        writeln!(f, "  Flushed:       {}", self.artists_flushed)?;
        writeln!(f, "  Write errors:  {}", self.artist_writes_failed)?;
        writeln!(f, "  Discarded:     {}", self.artists_discarded)?;
        writeln!(f, "\nTrigrams:")?;
        writeln!(f, "  Written:       {}", self.trigrams_written)?;
        writeln!(f, "  Failed:        {}", self.trigrams_failed)?;
        write!(f, "\nElapsed:         {:.1}s", self.elapsed_ms as f64 / 1000.0)
    }
}
