//! Widget identifiers.
//!
//! An id is the djb2 hash of a label. Two escapes control what gets hashed and what
//! gets shown:
//!
//! - `"Save##toolbar"` shows `"Save"` and hashes the whole label, so two "Save"
//!   buttons can coexist.
//! - `"Save###save-button"` shows `"Save"` and hashes only `"save-button"`, so the
//!   visible text can change without the widget losing its identity.

const DJB2_SEED: u32 = 5381;

#[inline]
pub(crate) fn djb2(seed: u32, bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(seed, |hash, b| hash.wrapping_mul(33).wrapping_add(*b as u32))
}

/// 0 means "no widget" to the input tracker and "empty" to the cache table.
#[inline]
fn non_zero(hash: u32) -> u32 {
    if hash & !crate::hashtable::TOMBSTONE == 0 {
        hash | 1
    } else {
        hash
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Id {
    pub id: u32,
    /// Number of leading bytes of the label that are meant for display.
    pub display_len: usize,
}

impl Id {
    /// Hashes `label` following the `##` and `###` rules.
    pub fn new(label: &str) -> Id {
        let display_len = label.find("##").unwrap_or(label.len());
        let hashed = match label.rfind("###") {
            Some(at) => &label[at + 3..],
            None => label,
        };
        Id {
            id: non_zero(djb2(DJB2_SEED, hashed.as_bytes())),
            display_len,
        }
    }

    /// Shows `display` verbatim and hashes `key` alone.
    pub fn keyed(display: &str, key: &str) -> Id {
        Id {
            id: non_zero(djb2(DJB2_SEED, key.as_bytes())),
            display_len: display.len(),
        }
    }

    /// Hashes `label` and then `index`, for widgets stamped out in a loop.
    pub fn with_index(label: &str, index: u32) -> Id {
        let base = Id::new(label);
        Id {
            id: non_zero(djb2(base.id, &index.to_le_bytes())),
            display_len: base.display_len,
        }
    }

    /// The displayed part of `label`.
    pub fn display<'a>(&self, label: &'a str) -> &'a str {
        label.get(..self.display_len).unwrap_or(label)
    }
}

impl From<&str> for Id {
    fn from(label: &str) -> Self {
        Id::new(label)
    }
}

impl From<(&str, u32)> for Id {
    fn from((label, index): (&str, u32)) -> Self {
        Id::with_index(label, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_truncation() {
        let label = "Test id##53";
        let id0 = Id::new(label);
        assert_ne!(id0.id, 0);
        assert_eq!(id0.display_len, label.len() - 4);
        assert_eq!(id0.display(label), "Test id");

        let id1 = Id::new(&label.to_string());
        assert_eq!(id0, id1);

        let formatted = format!("Test id###{}", 53);
        let id2 = Id::new(&formatted);
        assert_ne!(id2.id, 0);
        assert_ne!(id2.id, id0.id);
        assert_eq!(id2.display_len, 7);
        assert_eq!(id2.id, Id::new("53").id);
    }

    #[test]
    fn triple_hash_keeps_identity_when_text_changes() {
        assert_eq!(Id::new("Play###media").id, Id::new("Pause###media").id);
        assert_ne!(Id::new("Play##media").id, Id::new("Pause##media").id);
    }

    #[test]
    fn keyed_and_indexed() {
        let a = Id::keyed("Save", "toolbar/save");
        assert_eq!(a.display_len, 4);
        assert_eq!(a.id, Id::new("toolbar/save").id);

        let row0 = Id::with_index("row", 0);
        let row1 = Id::from(("row", 1));
        assert_ne!(row0.id, row1.id);
        assert_ne!(row0.id, Id::new("row").id);
        assert_eq!(row1.display_len, 3);
    }

    #[test]
    fn djb2_matches_reference() {
        assert_eq!(djb2(DJB2_SEED, b""), 5381);
        assert_eq!(djb2(DJB2_SEED, b"a"), 5381 * 33 + 97);
    }
}
