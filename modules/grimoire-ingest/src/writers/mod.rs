pub mod artist;
pub mod trigram;

pub use artist::{
    ArtistAggregateWriter, ArtistCardsWriter, ArtistItemsWriter, ArtistSetsWriter, ArtistWriteStep,
    FlushOutcome, SetArtistsWriter,
};
pub use trigram::{TrigramWriteOutcome, TrigramWriter};
