// Test mocks for the ingestion pipeline.
//
// One mock per trait boundary:
// - MockCardSource (CardSource): fixed sets and per-set card lists
// - MockDownloader (Downloader): deterministic bytes, per-URL failures
// - MemoryDocumentStore (DocumentStore): in-memory upserts with an ordered
//   write log and injectable rejections / transport errors
// - MemoryBlobStore (BlobStore): in-memory blobs
//
// Plus fixture builders for cards and sets.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use uuid::Uuid;

use grimoire_common::{Blob, BlobContainer, Collection};
use grimoire_store::{
    BlobStore, BlobWriteResponse, DocumentStore, StoreError, UpsertResponse,
};
use scryfall_client::{CardFace, ImageUris, ScryfallCard, ScryfallError, ScryfallSet};

use crate::error::{IngestError, Result};
use crate::traits::{CardSource, Downloader};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Artist attributed to fixture cards unless overridden.
pub const FIXTURE_ARTIST: &str = "Fixture Artist";

/// Stable set id for a code, shared by `set` and `card`.
pub fn set_id(code: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("set:{}", code.to_lowercase()).as_bytes())
}

/// Stable artist id for a name.
pub fn artist_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("artist:{name}").as_bytes())
}

pub fn set(code: &str, name: &str) -> ScryfallSet {
    ScryfallSet {
        id: set_id(code),
        code: code.to_string(),
        name: name.to_string(),
        set_type: "expansion".to_string(),
        released_at: None,
        block_code: None,
        block: None,
        parent_set_code: None,
        card_count: 0,
        printed_size: None,
        digital: false,
        foil_only: false,
        nonfoil_only: false,
        icon_svg_uri: Some(format!("https://svgs.example/sets/{}.svg", code.to_lowercase())),
        search_uri: None,
        scryfall_uri: None,
    }
}

/// Single-faced card by `FIXTURE_ARTIST`, with every image resolution.
pub fn card(name: &str, set_code: &str) -> ScryfallCard {
    card_by(name, set_code, FIXTURE_ARTIST)
}

pub fn card_by(name: &str, set_code: &str, artist: &str) -> ScryfallCard {
    let id = Uuid::new_v4();
    ScryfallCard {
        id,
        oracle_id: Some(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())),
        name: name.to_string(),
        lang: "en".to_string(),
        printed_name: None,
        released_at: None,
        layout: "normal".to_string(),
        mana_cost: Some("{R}".to_string()),
        cmc: Some(1.0),
        type_line: Some("Instant".to_string()),
        oracle_text: None,
        flavor_text: None,
        power: None,
        toughness: None,
        loyalty: None,
        colors: Some(vec!["R".to_string()]),
        color_identity: vec!["R".to_string()],
        keywords: Vec::new(),
        set: set_code.to_lowercase(),
        set_id: set_id(set_code),
        set_name: set_code.to_uppercase(),
        collector_number: "1".to_string(),
        rarity: "common".to_string(),
        artist: Some(artist.to_string()),
        artist_ids: vec![artist_id(artist)],
        illustration_id: None,
        image_uris: Some(image_uris(id, None)),
        card_faces: Vec::new(),
        prices: None,
        legalities: BTreeMap::new(),
        digital: false,
        reprint: false,
        scryfall_uri: None,
    }
}

/// Double-faced card ("Front // Back"): no top-level images, one set per face.
pub fn dual_faced_card(name: &str, set_code: &str) -> ScryfallCard {
    let mut c = card(name, set_code);
    c.layout = "transform".to_string();
    c.image_uris = None;
    c.card_faces = name
        .split(" // ")
        .enumerate()
        .map(|(i, face)| CardFace {
            name: face.to_string(),
            mana_cost: None,
            type_line: None,
            oracle_text: None,
            flavor_text: None,
            power: None,
            toughness: None,
            loyalty: None,
            artist: c.artist.clone(),
            image_uris: Some(image_uris(c.id, Some(i))),
        })
        .collect();
    c
}

fn image_uris(card_id: Uuid, face: Option<usize>) -> ImageUris {
    let suffix = face.map(|f| format!("-face{f}")).unwrap_or_default();
    let uri = |size: &str, ext: &str| Some(format!("https://cards.example/{card_id}/{size}{suffix}.{ext}"));
    ImageUris {
        small: uri("small", "jpg"),
        normal: uri("normal", "jpg"),
        large: uri("large", "jpg"),
        png: uri("png", "png"),
        art_crop: uri("art_crop", "jpg"),
        border_crop: uri("border_crop", "jpg"),
    }
}

// ---------------------------------------------------------------------------
// MockCardSource
// ---------------------------------------------------------------------------

/// Fixed sets and cards. Builder: `.with_set()`, `.break_stream_after()`.
pub struct MockCardSource {
    sets: Vec<ScryfallSet>,
    cards: HashMap<String, Vec<ScryfallCard>>,
    broken_streams: HashMap<String, usize>,
}

impl MockCardSource {
    pub fn new() -> Self {
        Self {
            sets: Vec::new(),
            cards: HashMap::new(),
            broken_streams: HashMap::new(),
        }
    }

    pub fn with_set(mut self, set: ScryfallSet, cards: Vec<ScryfallCard>) -> Self {
        self.cards.insert(set.code.clone(), cards);
        self.sets.push(set);
        self
    }

    /// The set's stream yields `n` cards, then a parse error.
    pub fn break_stream_after(mut self, code: &str, n: usize) -> Self {
        self.broken_streams.insert(code.to_string(), n);
        self
    }

    pub fn sets(&self) -> &[ScryfallSet] {
        &self.sets
    }
}

impl Default for MockCardSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardSource for MockCardSource {
    async fn fetch_all_sets(&self) -> Result<Vec<ScryfallSet>> {
        Ok(self.sets.clone())
    }

    fn cards<'a>(&'a self, set: &ScryfallSet) -> BoxStream<'a, Result<ScryfallCard>> {
        let cards = self.cards.get(&set.code).cloned().unwrap_or_default();
        let mut items: Vec<Result<ScryfallCard>> = Vec::new();

        match self.broken_streams.get(&set.code) {
            Some(&n) => {
                items.extend(cards.into_iter().take(n).map(Ok));
                items.push(Err(IngestError::Source(ScryfallError::Parse(format!(
                    "MockCardSource: broken stream for {}",
                    set.code
                )))));
            }
            None => items.extend(cards.into_iter().map(Ok)),
        }

        stream::iter(items).boxed()
    }
}

// ---------------------------------------------------------------------------
// MockDownloader
// ---------------------------------------------------------------------------

/// Returns the URL's bytes as the payload. `.fail_on()` makes a URL answer
/// with a 503.
pub struct MockDownloader {
    failing: HashSet<String>,
    requested: Mutex<Vec<String>>,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Default for MockDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    async fn download(&self, url: &str) -> Result<Bytes> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(IngestError::Download {
                url: url.to_string(),
                status: Some(503),
                message: "MockDownloader: injected failure".to_string(),
            });
        }
        Ok(Bytes::from(url.as_bytes().to_vec()))
    }
}

// ---------------------------------------------------------------------------
// MemoryDocumentStore
// ---------------------------------------------------------------------------

/// One accepted upsert, in the order it reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub collection: Collection,
    pub partition_key: String,
    pub id: String,
}

type DocKey = (Collection, String, String);

/// In-memory document store. Upserts replace by (collection, partition, id).
///
/// Injection: `.reject(collection, status)` answers every write to the
/// collection with that status; `.fail(collection)` and `.fail_id(id)`
/// raise a transport error instead; `.corrupt_id(id)` raises a
/// non-transient serialization error.
pub struct MemoryDocumentStore {
    docs: Mutex<BTreeMap<DocKey, serde_json::Value>>,
    log: Mutex<Vec<WriteRecord>>,
    rejections: HashMap<Collection, u16>,
    failing_collections: HashSet<Collection>,
    failing_ids: HashSet<String>,
    corrupt_ids: HashSet<String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
            log: Mutex::new(Vec::new()),
            rejections: HashMap::new(),
            failing_collections: HashSet::new(),
            failing_ids: HashSet::new(),
            corrupt_ids: HashSet::new(),
        }
    }

    pub fn reject(mut self, collection: Collection, status: u16) -> Self {
        self.rejections.insert(collection, status);
        self
    }

    pub fn fail(mut self, collection: Collection) -> Self {
        self.failing_collections.insert(collection);
        self
    }

    /// Transport error for any document with this id, in any collection.
    pub fn fail_id(mut self, id: impl ToString) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    /// Serialization error for any document with this id, in any collection.
    pub fn corrupt_id(mut self, id: impl ToString) -> Self {
        self.corrupt_ids.insert(id.to_string());
        self
    }

    pub fn get(&self, collection: Collection, partition_key: &str, id: &str) -> Option<serde_json::Value> {
        self.docs
            .lock()
            .unwrap()
            .get(&(collection, partition_key.to_string(), id.to_string()))
            .cloned()
    }

    /// Every document in the collection, ordered by (partition, id).
    pub fn documents(&self, collection: Collection) -> Vec<serde_json::Value> {
        self.docs
            .lock()
            .unwrap()
            .iter()
            .filter(|((c, _, _), _)| *c == collection)
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.docs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _, _)| *c == collection)
            .count()
    }

    /// Full contents, for comparing end states.
    pub fn snapshot(&self) -> BTreeMap<DocKey, serde_json::Value> {
        self.docs.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.log.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    /// Position of the first accepted write matching the predicate.
    pub fn first_write(&self, pred: impl Fn(&WriteRecord) -> bool) -> Option<usize> {
        self.log.lock().unwrap().iter().position(pred)
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert_document(
        &self,
        collection: Collection,
        partition_key: &str,
        id: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<UpsertResponse, StoreError> {
        if self.failing_collections.contains(&collection) || self.failing_ids.contains(id) {
            return Err(StoreError::Unavailable(format!(
                "MemoryDocumentStore: injected failure for {collection}/{id}"
            )));
        }
        if self.corrupt_ids.contains(id) {
            let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
            return Err(StoreError::Serialization(err));
        }
        if let Some(status) = self.rejections.get(&collection) {
            return Ok(UpsertResponse::rejected(*status, "MemoryDocumentStore: injected rejection"));
        }

        let key = (collection, partition_key.to_string(), id.to_string());
        let inserted = self.docs.lock().unwrap().insert(key, body.clone()).is_none();
        self.log.lock().unwrap().push(WriteRecord {
            collection,
            partition_key: partition_key.to_string(),
            id: id.to_string(),
        });

        Ok(if inserted {
            UpsertResponse::created()
        } else {
            UpsertResponse::ok()
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<(BlobContainer, String), Blob>>,
    refused: HashSet<BlobContainer>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            refused: HashSet::new(),
        }
    }

    /// Answer every write to the container with no location.
    pub fn refuse(mut self, container: BlobContainer) -> Self {
        self.refused.insert(container);
        self
    }

    pub fn get(&self, container: BlobContainer, name: &str) -> Option<Blob> {
        self.blobs
            .lock()
            .unwrap()
            .get(&(container, name.to_string()))
            .cloned()
    }

    pub fn count(&self, container: BlobContainer) -> usize {
        self.blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| *c == container)
            .count()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write_blob(&self, blob: &Blob) -> std::result::Result<BlobWriteResponse, StoreError> {
        if self.refused.contains(&blob.container) {
            return Ok(BlobWriteResponse::refused());
        }
        self.blobs
            .lock()
            .unwrap()
            .insert((blob.container, blob.name.clone()), blob.clone());
        Ok(BlobWriteResponse::stored(format!("memory://{}/{}", blob.container, blob.name)))
    }
}
