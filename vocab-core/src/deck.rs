//! Deck loading
//!
//! Decks are plain text, one pair per line:
//! `origin;translation[;sound[;image]]`. Lines without a separator or with
//! more than four fields are skipped.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::types::VocabularyItem;

const FIELD_SEPARATOR: char = ';';
const DECK_EXTENSION: &str = "txt";

/// Supplies the items of a deck by identifier
pub trait ItemStore {
    fn load_deck(&self, deck_id: &str) -> Result<Vec<VocabularyItem>>;
}

/// Parse deck text into items, in file order
pub fn parse_deck(text: &str) -> Vec<VocabularyItem> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<VocabularyItem> {
    if !line.contains(FIELD_SEPARATOR) {
        return None;
    }

    let parts: Vec<&str> = line.trim().split(FIELD_SEPARATOR).map(str::trim).collect();
    let optional = |s: &str| (!s.is_empty()).then(|| s.to_string());

    match parts.as_slice() {
        [origin, translation] => Some(VocabularyItem::new(*origin, *translation)),
        [origin, translation, sound] => Some(VocabularyItem {
            sound: optional(*sound),
            ..VocabularyItem::new(*origin, *translation)
        }),
        [origin, translation, sound, image] => Some(VocabularyItem {
            sound: optional(*sound),
            image: optional(*image),
            ..VocabularyItem::new(*origin, *translation)
        }),
        _ => None,
    }
}

/// Item store reading `<root>/<deck_id>.txt`
#[derive(Debug, Clone)]
pub struct DeckDirectory {
    root: PathBuf,
}

impl DeckDirectory {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn deck_path(&self, deck_id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", deck_id, DECK_EXTENSION))
    }
}

impl ItemStore for DeckDirectory {
    /// A missing deck file is an empty deck
    fn load_deck(&self, deck_id: &str) -> Result<Vec<VocabularyItem>> {
        let path = self.deck_path(deck_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Deck file {} not found", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let items = parse_deck(&text);
        debug!("Loaded {} items from {}", items.len(), path.display());
        Ok(items)
    }
}
