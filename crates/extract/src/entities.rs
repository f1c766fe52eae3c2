use serde::Serialize;

use crate::schema::{DialogAttribution, EntityRecord};

/// Parsed entities keyed by name, in order of first appearance.
///
/// Names are unique ignoring case; the first spelling seen is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntityMap {
    records: Vec<EntityRecord>,
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless a record with the same name (ignoring case) exists.
    /// Returns whether the record was added.
    pub fn insert(&mut self, record: EntityRecord) -> bool {
        if self.contains(&record.name) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn get(&self, name: &str) -> Option<&EntityRecord> {
        let wanted = name.to_lowercase();
        self.records.iter().find(|r| r.name.to_lowercase() == wanted)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut EntityRecord> {
        let wanted = name.to_lowercase();
        self.records
            .iter_mut()
            .find(|r| r.name.to_lowercase() == wanted)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every dialog line as a `(speaker, text)` attribution, entity by entity
    pub fn dialogs(&self) -> Vec<DialogAttribution> {
        self.records
            .iter()
            .flat_map(|r| {
                r.dialogs
                    .iter()
                    .map(|line| DialogAttribution::new(r.name.clone(), line.clone()))
            })
            .collect()
    }

    /// Fold another parse result (e.g. the next text segment) into this one.
    ///
    /// Dialog lines are appended, new traits are added in order, and the
    /// first non-empty voice encoding sticks.
    pub fn merge(&mut self, other: EntityMap) {
        for record in other.records {
            match self.get_mut(&record.name) {
                Some(existing) => {
                    existing.dialogs.extend(record.dialogs);
                    for t in record.traits {
                        if !existing.traits.contains(&t) {
                            existing.traits.push(t);
                        }
                    }
                    if existing.voice_encoding.is_empty() {
                        existing.voice_encoding = record.voice_encoding;
                    }
                }
                None => self.records.push(record),
            }
        }
    }
}

/// Extending keeps the first occurrence of every name
impl Extend<EntityRecord> for EntityMap {
    fn extend<I: IntoIterator<Item = EntityRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl IntoIterator for EntityMap {
    type Item = EntityRecord;
    type IntoIter = std::vec::IntoIter<EntityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntityMap {
    type Item = &'a EntityRecord;
    type IntoIter = std::slice::Iter<'a, EntityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
