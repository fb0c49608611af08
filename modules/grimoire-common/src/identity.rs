use uuid::Uuid;

/// Fixed namespace for card-name GUIDs. Changing it re-keys every
/// CardsByName bucket, so it must never change.
pub const CARD_NAME_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a7e_93d4_4b0a_8c5e_1d27_f4a9_b3c6);

/// Deterministic GUID for a card name: UUID v5 over the trimmed, lowercased
/// name. Every printing of a name maps to the same value, in any process.
///
/// Deliberately not `normalize_card_name`: diacritics and punctuation are
/// part of the printed name and keep their own bucket.
pub fn card_name_guid(name: &str) -> Uuid {
    let key = name.trim().to_lowercase();
    Uuid::new_v5(&CARD_NAME_NAMESPACE, key.as_bytes())
}
