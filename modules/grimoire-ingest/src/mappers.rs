//! Pure projections from source records into persisted documents.

use std::collections::BTreeMap;

use grimoire_common::{
    card_name_guid, ArtistCardSummary, Blob, CardByName, CardFacePayload, CardItem, CardPayload,
    SetCard, SetCodeIndex, SetItem, SetParentAssociation,
};
use scryfall_client::{CardFace, ImageUris, Prices, ScryfallCard, ScryfallSet};

// --- Cards ---

pub fn card_payload(card: &ScryfallCard) -> CardPayload {
    let front_uris = card
        .image_uris
        .as_ref()
        .or_else(|| card.card_faces.first().and_then(|f| f.image_uris.as_ref()));

    CardPayload {
        card_id: card.id,
        oracle_id: card.oracle_id,
        name: card.name.clone(),
        lang: card.lang.clone(),
        printed_name: card.printed_name.clone(),
        released_at: card.released_at,
        layout: card.layout.clone(),
        mana_cost: card.mana_cost.clone(),
        cmc: card.cmc,
        type_line: card.type_line.clone(),
        oracle_text: card.oracle_text.clone(),
        flavor_text: card.flavor_text.clone(),
        power: card.power.clone(),
        toughness: card.toughness.clone(),
        loyalty: card.loyalty.clone(),
        colors: card.colors.clone().unwrap_or_default(),
        color_identity: card.color_identity.clone(),
        keywords: card.keywords.clone(),
        set_id: card.set_id,
        set_code: card.set.clone(),
        set_name: card.set_name.clone(),
        collector_number: card.collector_number.clone(),
        rarity: card.rarity.clone(),
        artist: card.artist.clone(),
        artist_ids: card.artist_ids.clone(),
        illustration_id: card.illustration_id,
        image_uris: front_uris.map(uri_map).unwrap_or_default(),
        faces: card.card_faces.iter().map(face_payload).collect(),
        prices: card.prices.as_ref().map(price_map).unwrap_or_default(),
        legalities: card.legalities.clone(),
        digital: card.digital,
        reprint: card.reprint,
        scryfall_uri: card.scryfall_uri.clone(),
    }
}

pub fn to_set_card(card: &ScryfallCard) -> SetCard {
    SetCard {
        card: card_payload(card),
    }
}

pub fn to_card_item(card: &ScryfallCard) -> CardItem {
    CardItem {
        card: card_payload(card),
    }
}

/// Keyed by the name GUID rather than the card id, so every printing of a
/// name lands in one bucket.
pub fn to_card_by_name(card: &ScryfallCard) -> CardByName {
    CardByName {
        name_guid: card_name_guid(&card.name).to_string(),
        card: card_payload(card),
    }
}

pub fn artist_card_summary(card: &ScryfallCard) -> ArtistCardSummary {
    ArtistCardSummary {
        card_id: card.id,
        name: card.name.clone(),
        set_id: card.set_id,
        set_code: card.set.clone(),
        collector_number: card.collector_number.clone(),
        rarity: card.rarity.clone(),
        image_uri: card.primary_image().map(str::to_string),
    }
}

fn face_payload(face: &CardFace) -> CardFacePayload {
    CardFacePayload {
        name: face.name.clone(),
        mana_cost: face.mana_cost.clone(),
        type_line: face.type_line.clone(),
        oracle_text: face.oracle_text.clone(),
        power: face.power.clone(),
        toughness: face.toughness.clone(),
        loyalty: face.loyalty.clone(),
        artist: face.artist.clone(),
        image_uris: face.image_uris.as_ref().map(uri_map).unwrap_or_default(),
    }
}

fn uri_map(uris: &ImageUris) -> BTreeMap<String, String> {
    [
        ("small", &uris.small),
        ("normal", &uris.normal),
        ("large", &uris.large),
        ("png", &uris.png),
        ("art_crop", &uris.art_crop),
        ("border_crop", &uris.border_crop),
    ]
    .into_iter()
    .filter_map(|(size, uri)| uri.as_ref().map(|u| (size.to_string(), u.clone())))
    .collect()
}

fn price_map(prices: &Prices) -> BTreeMap<String, String> {
    [
        ("usd", &prices.usd),
        ("usd_foil", &prices.usd_foil),
        ("usd_etched", &prices.usd_etched),
        ("eur", &prices.eur),
        ("eur_foil", &prices.eur_foil),
        ("tix", &prices.tix),
    ]
    .into_iter()
    .filter_map(|(currency, price)| price.as_ref().map(|p| (currency.to_string(), p.clone())))
    .collect()
}

// --- Sets ---

pub fn to_set_item(set: &ScryfallSet) -> SetItem {
    SetItem {
        set_id: set.id,
        code: set.code.clone(),
        name: set.name.clone(),
        set_type: set.set_type.clone(),
        released_at: set.released_at,
        block_code: set.block_code.clone(),
        block: set.block.clone(),
        parent_set_code: set.parent_set_code.clone(),
        card_count: set.card_count,
        printed_size: set.printed_size,
        digital: set.digital,
        foil_only: set.foil_only,
        nonfoil_only: set.nonfoil_only,
        icon_path: set.icon_svg_uri.clone(),
        icon_blob: Blob::set_icon_name(&set.code),
        scryfall_uri: set.scryfall_uri.clone(),
    }
}

pub fn to_set_code_index(set: &ScryfallSet) -> SetCodeIndex {
    SetCodeIndex {
        set_code: set.code.clone(),
        set_id: set.id,
    }
}

/// `None` for top-level sets.
pub fn to_set_parent_association(set: &ScryfallSet) -> Option<SetParentAssociation> {
    let parent = set
        .parent_set_code
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())?;

    Some(SetParentAssociation {
        set_code: set.code.clone(),
        set_id: set.id,
        parent_set_code: parent.to_string(),
    })
}
