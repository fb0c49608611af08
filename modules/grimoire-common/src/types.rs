use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Collections ---

/// Every document collection the ingestion run writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    SetItems,
    SetCards,
    CardItems,
    CardsByName,
    ArtistItems,
    ArtistCards,
    ArtistSets,
    SetArtists,
    CardNameTrigrams,
    SetCodeIndex,
    SetParentAssociations,
}

impl Collection {
    pub const ALL: [Collection; 11] = [
        Collection::SetItems,
        Collection::SetCards,
        Collection::CardItems,
        Collection::CardsByName,
        Collection::ArtistItems,
        Collection::ArtistCards,
        Collection::ArtistSets,
        Collection::SetArtists,
        Collection::CardNameTrigrams,
        Collection::SetCodeIndex,
        Collection::SetParentAssociations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::SetItems => "set_items",
            Collection::SetCards => "set_cards",
            Collection::CardItems => "card_items",
            Collection::CardsByName => "cards_by_name",
            Collection::ArtistItems => "artist_items",
            Collection::ArtistCards => "artist_cards",
            Collection::ArtistSets => "artist_sets",
            Collection::SetArtists => "set_artists",
            Collection::CardNameTrigrams => "card_name_trigrams",
            Collection::SetCodeIndex => "set_code_index",
            Collection::SetParentAssociations => "set_parent_associations",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted projection. Writes are upserts keyed by
/// (collection, partition key, id), so re-running ingestion over the same
/// source converges on the same end state.
pub trait Document: Serialize + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> String;

    /// Logical bucket the document lives in. Defaults to its own id.
    fn partition_key(&self) -> String {
        self.id()
    }
}

// --- Card payload shared by the card projections ---

/// Typed projection of a source card, embedded in SetCards, CardItems and
/// CardsByName.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPayload {
    pub card_id: Uuid,
    pub oracle_id: Option<Uuid>,
    pub name: String,
    pub lang: String,
    pub printed_name: Option<String>,
    pub released_at: Option<NaiveDate>,
    pub layout: String,
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub flavor_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    pub colors: Vec<String>,
    pub color_identity: Vec<String>,
    pub keywords: Vec<String>,
    pub set_id: Uuid,
    pub set_code: String,
    pub set_name: String,
    pub collector_number: String,
    pub rarity: String,
    pub artist: Option<String>,
    pub artist_ids: Vec<Uuid>,
    pub illustration_id: Option<Uuid>,
    /// Front-face image URLs keyed by resolution.
    pub image_uris: BTreeMap<String, String>,
    pub faces: Vec<CardFacePayload>,
    pub prices: BTreeMap<String, String>,
    pub legalities: BTreeMap<String, String>,
    pub digital: bool,
    pub reprint: bool,
    pub scryfall_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFacePayload {
    pub name: String,
    pub mana_cost: Option<String>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    pub artist: Option<String>,
    pub image_uris: BTreeMap<String, String>,
}

// --- Card projections ---

/// Card printings grouped by set code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCard {
    #[serde(flatten)]
    pub card: CardPayload,
}

impl Document for SetCard {
    const COLLECTION: Collection = Collection::SetCards;

    fn id(&self) -> String {
        self.card.card_id.to_string()
    }

    fn partition_key(&self) -> String {
        self.card.set_code.clone()
    }
}

/// One document per printing, keyed by card id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardItem {
    #[serde(flatten)]
    pub card: CardPayload,
}

impl Document for CardItem {
    const COLLECTION: Collection = Collection::CardItems;

    fn id(&self) -> String {
        self.card.card_id.to_string()
    }
}

/// Every printing of a name, bucketed under the deterministic name GUID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardByName {
    pub name_guid: String,
    #[serde(flatten)]
    pub card: CardPayload,
}

impl Document for CardByName {
    const COLLECTION: Collection = Collection::CardsByName;

    fn id(&self) -> String {
        self.card.card_id.to_string()
    }

    fn partition_key(&self) -> String {
        self.name_guid.clone()
    }
}

// --- Set projections ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetItem {
    pub set_id: Uuid,
    pub code: String,
    pub name: String,
    pub set_type: String,
    pub released_at: Option<NaiveDate>,
    pub block_code: Option<String>,
    pub block: Option<String>,
    pub parent_set_code: Option<String>,
    pub card_count: u32,
    pub printed_size: Option<u32>,
    pub digital: bool,
    pub foil_only: bool,
    pub nonfoil_only: bool,
    pub icon_path: Option<String>,
    /// Blob name of the stored icon in the set-icons container.
    pub icon_blob: String,
    pub scryfall_uri: Option<String>,
}

impl Document for SetItem {
    const COLLECTION: Collection = Collection::SetItems;

    fn id(&self) -> String {
        self.set_id.to_string()
    }
}

/// Lookup from set code to set id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCodeIndex {
    pub set_code: String,
    pub set_id: Uuid,
}

impl Document for SetCodeIndex {
    const COLLECTION: Collection = Collection::SetCodeIndex;

    fn id(&self) -> String {
        self.set_code.clone()
    }
}

/// Child set → parent set, partitioned by parent so "children of X" is one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetParentAssociation {
    pub set_code: String,
    pub set_id: Uuid,
    pub parent_set_code: String,
}

impl Document for SetParentAssociation {
    const COLLECTION: Collection = Collection::SetParentAssociations;

    fn id(&self) -> String {
        self.set_code.clone()
    }

    fn partition_key(&self) -> String {
        self.parent_set_code.clone()
    }
}

// --- Artist projections ---

/// Summary of everything an artist has illustrated, rebuilt in full on every flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistItem {
    pub artist_id: Uuid,
    pub name_variants: Vec<String>,
    pub card_ids: Vec<Uuid>,
    pub set_ids: Vec<Uuid>,
    pub set_codes: Vec<String>,
}

impl Document for ArtistItem {
    const COLLECTION: Collection = Collection::ArtistItems;

    fn id(&self) -> String {
        self.artist_id.to_string()
    }
}

/// Compact card data carried on artist join documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistCardSummary {
    pub card_id: Uuid,
    pub name: String,
    pub set_id: Uuid,
    pub set_code: String,
    pub collector_number: String,
    pub rarity: String,
    pub image_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistCard {
    pub artist_id: Uuid,
    pub card_data: ArtistCardSummary,
}

impl Document for ArtistCard {
    const COLLECTION: Collection = Collection::ArtistCards;

    fn id(&self) -> String {
        self.card_data.card_id.to_string()
    }

    fn partition_key(&self) -> String {
        self.artist_id.to_string()
    }
}

/// Sets an artist appears in, partitioned by artist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistSet {
    pub artist_id: Uuid,
    pub set_id: Uuid,
    pub set_code: String,
    pub artist_names: Vec<String>,
}

impl Document for ArtistSet {
    const COLLECTION: Collection = Collection::ArtistSets;

    fn id(&self) -> String {
        self.set_id.to_string()
    }

    fn partition_key(&self) -> String {
        self.artist_id.to_string()
    }
}

/// Artists appearing in a set, partitioned by set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetArtist {
    pub set_id: Uuid,
    pub set_code: String,
    pub artist_id: Uuid,
    pub artist_names: Vec<String>,
}

impl Document for SetArtist {
    const COLLECTION: Collection = Collection::SetArtists;

    fn id(&self) -> String {
        self.artist_id.to_string()
    }

    fn partition_key(&self) -> String {
        self.set_id.to_string()
    }
}

// --- Trigram index ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrigramEntry {
    pub name: String,
    pub normalized: String,
    /// Character offsets into `normalized`, ascending.
    pub positions: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardNameTrigram {
    pub trigram: String,
    pub entries: Vec<TrigramEntry>,
}

impl Document for CardNameTrigram {
    const COLLECTION: Collection = Collection::CardNameTrigrams;

    fn id(&self) -> String {
        self.trigram.clone()
    }
}

// --- Blobs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlobContainer {
    CardImages,
    SetIcons,
}

impl BlobContainer {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobContainer::CardImages => "card-images",
            BlobContainer::SetIcons => "set-icons",
        }
    }
}

impl fmt::Display for BlobContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A binary object bound for the blob store. Names are deterministic, so
/// rewriting the same image replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub container: BlobContainer,
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Blob {
    /// `<card id>/<size>.<ext>`, with `-face<n>` appended to the size for back faces.
    pub fn card_image_name(card_id: Uuid, face: usize, size: &str, extension: &str) -> String {
        if face == 0 {
            format!("{card_id}/{size}.{extension}")
        } else {
            format!("{card_id}/{size}-face{face}.{extension}")
        }
    }

    pub fn set_icon_name(set_code: &str) -> String {
        format!("{}.svg", set_code.to_lowercase())
    }

    pub fn card_image(
        card_id: Uuid,
        face: usize,
        size: &str,
        extension: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Self {
        Self {
            container: BlobContainer::CardImages,
            name: Self::card_image_name(card_id, face, size, extension),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    pub fn set_icon(set_code: &str, bytes: Bytes) -> Self {
        Self {
            container: BlobContainer::SetIcons,
            name: Self::set_icon_name(set_code),
            content_type: "image/svg+xml".to_string(),
            bytes,
        }
    }
}
