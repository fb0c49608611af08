use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Paging envelope ---

/// Scryfall list object. Every paginated endpoint returns this shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    pub next_page: Option<String>,
    pub total_cards: Option<u32>,
}

/// Error object returned alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub status: u16,
    pub code: String,
    pub details: String,
}

// --- Sets ---

/// A set as returned by `/sets`. Cards are not embedded; stream them with
/// `ScryfallClient::set_cards`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScryfallSet {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub set_type: String,
    pub released_at: Option<NaiveDate>,
    pub block_code: Option<String>,
    pub block: Option<String>,
    pub parent_set_code: Option<String>,
    #[serde(default)]
    pub card_count: u32,
    pub printed_size: Option<u32>,
    #[serde(default)]
    pub digital: bool,
    #[serde(default)]
    pub foil_only: bool,
    #[serde(default)]
    pub nonfoil_only: bool,
    pub icon_svg_uri: Option<String>,
    pub search_uri: Option<String>,
    pub scryfall_uri: Option<String>,
}

// --- Cards ---

/// A single printing of a card. Decoded once at the API boundary; every
/// downstream projection reads from these typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScryfallCard {
    pub id: Uuid,
    pub oracle_id: Option<Uuid>,
    pub name: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    pub printed_name: Option<String>,
    pub released_at: Option<NaiveDate>,
    #[serde(default)]
    pub layout: String,
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub flavor_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub color_identity: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Set code.
    pub set: String,
    pub set_id: Uuid,
    #[serde(default)]
    pub set_name: String,
    #[serde(default)]
    pub collector_number: String,
    #[serde(default)]
    pub rarity: String,
    pub artist: Option<String>,
    #[serde(default)]
    pub artist_ids: Vec<Uuid>,
    pub illustration_id: Option<Uuid>,
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub card_faces: Vec<CardFace>,
    pub prices: Option<Prices>,
    #[serde(default)]
    pub legalities: BTreeMap<String, String>,
    #[serde(default)]
    pub digital: bool,
    #[serde(default)]
    pub reprint: bool,
    pub scryfall_uri: Option<String>,
}

fn default_lang() -> String {
    "en".to_string()
}

impl ScryfallCard {
    /// Every image the card exposes. Single-faced cards use the top-level
    /// URIs; double-faced layouts carry one set of URIs per face.
    pub fn image_variants(&self) -> Vec<ImageVariant> {
        if let Some(uris) = &self.image_uris {
            return uris.variants(0);
        }
        self.card_faces
            .iter()
            .enumerate()
            .filter_map(|(face, f)| f.image_uris.as_ref().map(|u| u.variants(face)))
            .flatten()
            .collect()
    }

    /// The normal-resolution front image, if any.
    pub fn primary_image(&self) -> Option<&str> {
        self.image_uris
            .as_ref()
            .or_else(|| self.card_faces.first().and_then(|f| f.image_uris.as_ref()))
            .and_then(|u| u.normal.as_deref())
    }

    /// Artist name attributed to each entry of `artist_ids`, positionally.
    ///
    /// Multi-artist printings carry a combined string ("A & B"). When the
    /// split count matches the id count each id gets its own name, otherwise
    /// every id gets the combined string.
    pub fn artist_names(&self) -> Vec<(Uuid, Option<String>)> {
        let Some(artist) = self.artist.as_deref().map(str::trim).filter(|a| !a.is_empty())
        else {
            return self.artist_ids.iter().map(|id| (*id, None)).collect();
        };

        let split: Vec<&str> = artist.split(" & ").map(str::trim).collect();
        if split.len() == self.artist_ids.len() {
            self.artist_ids
                .iter()
                .zip(split)
                .map(|(id, name)| (*id, Some(name.to_string())))
                .collect()
        } else {
            self.artist_ids
                .iter()
                .map(|id| (*id, Some(artist.to_string())))
                .collect()
        }
    }
}

/// One face of a multi-faced card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardFace {
    pub name: String,
    pub mana_cost: Option<String>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub flavor_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    pub artist: Option<String>,
    pub image_uris: Option<ImageUris>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
    pub png: Option<String>,
    pub art_crop: Option<String>,
    pub border_crop: Option<String>,
}

impl ImageUris {
    fn variants(&self, face: usize) -> Vec<ImageVariant> {
        [
            (ImageSize::Small, &self.small),
            (ImageSize::Normal, &self.normal),
            (ImageSize::Large, &self.large),
            (ImageSize::Png, &self.png),
            (ImageSize::ArtCrop, &self.art_crop),
            (ImageSize::BorderCrop, &self.border_crop),
        ]
        .into_iter()
        .filter_map(|(size, uri)| {
            uri.as_ref().map(|url| ImageVariant {
                face,
                size,
                url: url.clone(),
            })
        })
        .collect()
    }
}

/// Image resolutions Scryfall publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSize {
    Small,
    Normal,
    Large,
    Png,
    ArtCrop,
    BorderCrop,
}

impl ImageSize {
    pub const ALL: [ImageSize; 6] = [
        ImageSize::Small,
        ImageSize::Normal,
        ImageSize::Large,
        ImageSize::Png,
        ImageSize::ArtCrop,
        ImageSize::BorderCrop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Small => "small",
            ImageSize::Normal => "normal",
            ImageSize::Large => "large",
            ImageSize::Png => "png",
            ImageSize::ArtCrop => "art_crop",
            ImageSize::BorderCrop => "border_crop",
        }
    }

    pub fn parse(s: &str) -> Option<ImageSize> {
        Self::ALL.into_iter().find(|size| size.as_str() == s.trim())
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageSize::Png => "png",
            _ => "jpg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageSize::Png => "image/png",
            _ => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single downloadable image of a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageVariant {
    /// 0 for single-faced cards and front faces.
    pub face: usize,
    pub size: ImageSize,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prices {
    pub usd: Option<String>,
    pub usd_foil: Option<String>,
    pub usd_etched: Option<String>,
    pub eur: Option<String>,
    pub eur_foil: Option<String>,
    pub tix: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_JSON: &str = r#"{
        "object": "card",
        "id": "e3285e6b-3e79-4d7c-bf96-d920f973b80d",
        "oracle_id": "4457ed35-7c10-48c8-9776-456485fdf070",
        "name": "Lightning Bolt",
        "lang": "en",
        "released_at": "1993-08-05",
        "layout": "normal",
        "mana_cost": "{R}",
        "cmc": 1.0,
        "type_line": "Instant",
        "oracle_text": "Lightning Bolt deals 3 damage to any target.",
        "colors": ["R"],
        "color_identity": ["R"],
        "keywords": [],
        "set": "lea",
        "set_id": "288bd996-960e-448b-a187-9504c1ffb911",
        "set_name": "Limited Edition Alpha",
        "collector_number": "161",
        "rarity": "common",
        "artist": "Christopher Rush",
        "artist_ids": ["63d3b8fb-1a5a-4a4d-8d12-f5e3b6e6f5a6"],
        "image_uris": {
            "small": "https://cards.scryfall.io/small/front/e/3/e3285e6b.jpg",
            "normal": "https://cards.scryfall.io/normal/front/e/3/e3285e6b.jpg",
            "png": "https://cards.scryfall.io/png/front/e/3/e3285e6b.png"
        },
        "legalities": {"vintage": "legal", "standard": "not_legal"},
        "prices": {"usd": "500.00", "eur": null, "tix": null},
        "reprint": false,
        "digital": false
    }"#;

    #[test]
    fn decodes_a_card_with_optional_fields_missing() {
        let card: ScryfallCard = serde_json::from_str(CARD_JSON).unwrap();
        assert_eq!(card.name, "Lightning Bolt");
        assert_eq!(card.set, "lea");
        assert_eq!(card.artist_ids.len(), 1);
        assert!(card.power.is_none());
        assert!(card.card_faces.is_empty());
        assert_eq!(card.legalities.get("vintage").map(String::as_str), Some("legal"));
    }

    #[test]
    fn image_variants_skip_missing_resolutions() {
        let card: ScryfallCard = serde_json::from_str(CARD_JSON).unwrap();
        let sizes: Vec<ImageSize> = card.image_variants().iter().map(|v| v.size).collect();
        assert_eq!(sizes, vec![ImageSize::Small, ImageSize::Normal, ImageSize::Png]);
        assert!(card.image_variants().iter().all(|v| v.face == 0));
    }

    #[test]
    fn double_faced_cards_expose_images_per_face() {
        let mut card: ScryfallCard = serde_json::from_str(CARD_JSON).unwrap();
        card.image_uris = None;
        let face = |name: &str| CardFace {
            name: name.into(),
            mana_cost: None,
            type_line: None,
            oracle_text: None,
            flavor_text: None,
            power: None,
            toughness: None,
            loyalty: None,
            artist: None,
            image_uris: Some(ImageUris {
                normal: Some(format!("https://img/{name}.jpg")),
                ..Default::default()
            }),
        };
        card.card_faces = vec![face("front"), face("back")];

        let variants = card.image_variants();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[1].face, 1);
        assert_eq!(card.primary_image(), Some("https://img/front.jpg"));
    }

    #[test]
    fn combined_artist_string_is_split_per_id() {
        let mut card: ScryfallCard = serde_json::from_str(CARD_JSON).unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        card.artist = Some("Alpha Painter & Beta Painter".into());
        card.artist_ids = vec![a, b];

        let names = card.artist_names();
        assert_eq!(names[0], (a, Some("Alpha Painter".to_string())));
        assert_eq!(names[1], (b, Some("Beta Painter".to_string())));
    }

    #[test]
    fn mismatched_artist_split_keeps_the_full_string() {
        let mut card: ScryfallCard = serde_json::from_str(CARD_JSON).unwrap();
        let a = Uuid::new_v4();
        card.artist = Some("Alpha & Beta".into());
        card.artist_ids = vec![a];

        assert_eq!(card.artist_names(), vec![(a, Some("Alpha & Beta".to_string()))]);
    }

    #[test]
    fn decodes_a_set() {
        let json = r#"{
            "object": "set",
            "id": "288bd996-960e-448b-a187-9504c1ffb911",
            "code": "lea",
            "name": "Limited Edition Alpha",
            "set_type": "core",
            "released_at": "1993-08-05",
            "card_count": 295,
            "digital": false,
            "foil_only": false,
            "icon_svg_uri": "https://svgs.scryfall.io/sets/lea.svg"
        }"#;
        let set: ScryfallSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.code, "lea");
        assert!(set.parent_set_code.is_none());
        assert_eq!(set.released_at, NaiveDate::from_ymd_opt(1993, 8, 5));
    }
}
