//! Card-name folding and trigram extraction.
//!
//! The trigram index and search share this folding rule: NFKD with
//! combining marks removed, `æ`/`œ` expanded, lowercase, punctuation
//! dropped, whitespace collapsed.
//!
//! Name GUIDs (`identity::card_name_guid`) do not use it. They key
//! CardsByName on the printed name, trimmed and lowercased only, so
//! "Æther Vial" and "Aether Vial" are separate buckets that the trigram
//! index still finds under the same normalized form.

use std::collections::BTreeMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold a card name into its search form.
pub fn normalize_card_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;

    for c in name.nfkd().filter(|c| !is_combining_mark(*c)) {
        for lc in c.to_lowercase() {
            match lc {
                'æ' => push_word_char(&mut out, &mut pending_space, "ae"),
                'œ' => push_word_char(&mut out, &mut pending_space, "oe"),
                c if c.is_alphanumeric() => {
                    let mut buf = [0u8; 4];
                    push_word_char(&mut out, &mut pending_space, c.encode_utf8(&mut buf));
                }
                c if c.is_whitespace() => pending_space = true,
                _ => {}
            }
        }
    }

    out
}

fn push_word_char(out: &mut String, pending_space: &mut bool, s: &str) {
    if *pending_space && !out.is_empty() {
        out.push(' ');
    }
    *pending_space = false;
    out.push_str(s);
}

/// Every 3-character window of `normalized`, with the character offsets at
/// which it starts. Offsets are ascending. Names shorter than three
/// characters produce nothing.
pub fn trigram_positions(normalized: &str) -> BTreeMap<String, Vec<usize>> {
    let chars: Vec<char> = normalized.chars().collect();
    let mut trigrams: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    for (pos, window) in chars.windows(3).enumerate() {
        trigrams
            .entry(window.iter().collect())
            .or_default()
            .push(pos);
    }

    trigrams
}
