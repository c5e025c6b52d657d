use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use im::{HashMap, Vector};

use crate::seq::LispSeq;
use crate::value::{Conjable, HasMetadata, Indexed, MetaMap, Seqable, Sequential};
use crate::{LispError, LispValue, Result};

/// Persistent list. Conjoining adds at the front.
#[derive(Clone, Debug, Default)]
pub struct LispList {
    items: Vector<LispValue>,
    meta: Option<MetaMap>,
}

impl LispList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &Vector<LispValue> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<LispValue> {
        self.items.front().cloned()
    }

    /// Everything after the head; empty for an empty list.
    pub fn rest(&self) -> LispList {
        if self.items.is_empty() {
            return LispList::new();
        }
        LispList {
            items: self.items.skip(1),
            meta: None,
        }
    }

    pub fn prepend(&self, val: LispValue) -> LispList {
        let mut items = self.items.clone();
        items.push_front(val);
        LispList {
            items,
            meta: self.meta.clone(),
        }
    }

    pub fn iter(&self) -> im::vector::Iter<'_, LispValue> {
        self.items.iter()
    }
}

impl From<Vector<LispValue>> for LispList {
    fn from(items: Vector<LispValue>) -> Self {
        LispList { items, meta: None }
    }
}

impl FromIterator<LispValue> for LispList {
    fn from_iter<I: IntoIterator<Item = LispValue>>(iter: I) -> Self {
        LispList::from(iter.into_iter().collect::<Vector<_>>())
    }
}

impl Seqable for LispList {
    fn seq(&self) -> LispSeq {
        LispSeq::from(self.items.clone())
    }
}
impl Sequential for LispList {}

impl Conjable for LispList {
    fn conj(&self, val: LispValue) -> Result<LispValue> {
        Ok(LispValue::List(self.prepend(val)))
    }
}

impl HasMetadata for LispList {
    fn meta(&self) -> Option<&MetaMap> {
        self.meta.as_ref()
    }
    fn with_meta(&self, meta: Option<MetaMap>) -> Self {
        LispList {
            items: self.items.clone(),
            meta,
        }
    }
}

/// Persistent vector. Conjoining adds at the end; lookup is by index.
#[derive(Clone, Debug, Default)]
pub struct LispVector {
    items: Vector<LispValue>,
    meta: Option<MetaMap>,
}

impl LispVector {
    pub fn items(&self) -> &Vector<LispValue> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn append(&self, val: LispValue) -> LispVector {
        let mut items = self.items.clone();
        items.push_back(val);
        LispVector {
            items,
            meta: self.meta.clone(),
        }
    }

    pub fn get(&self, index: i64) -> Result<LispValue> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.items.get(i))
            .cloned()
            .ok_or(LispError::IndexOutOfRange(index))
    }

    pub fn iter(&self) -> im::vector::Iter<'_, LispValue> {
        self.items.iter()
    }
}

impl From<Vector<LispValue>> for LispVector {
    fn from(items: Vector<LispValue>) -> Self {
        LispVector { items, meta: None }
    }
}

impl FromIterator<LispValue> for LispVector {
    fn from_iter<I: IntoIterator<Item = LispValue>>(iter: I) -> Self {
        LispVector::from(iter.into_iter().collect::<Vector<_>>())
    }
}

impl Seqable for LispVector {
    fn seq(&self) -> LispSeq {
        LispSeq::from(self.items.clone())
    }
}
impl Sequential for LispVector {}

impl Indexed for LispVector {
    fn lookup(&self, key: &LispValue) -> Option<LispValue> {
        match key {
            LispValue::Integer(i) => self.get(*i).ok(),
            _ => None,
        }
    }
}

impl Conjable for LispVector {
    fn conj(&self, val: LispValue) -> Result<LispValue> {
        Ok(LispValue::Vector(self.append(val)))
    }
}

impl HasMetadata for LispVector {
    fn meta(&self) -> Option<&MetaMap> {
        self.meta.as_ref()
    }
    fn with_meta(&self, meta: Option<MetaMap>) -> Self {
        LispVector {
            items: self.items.clone(),
            meta,
        }
    }
}

/// Persistent hash map keyed by arbitrary values.
#[derive(Clone, Debug, Default)]
pub struct LispMap {
    entries: HashMap<LispValue, LispValue>,
    meta: Option<MetaMap>,
}

impl LispMap {
    pub fn entries(&self) -> &HashMap<LispValue, LispValue> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &LispValue) -> Option<LispValue> {
        self.entries.get(key).cloned()
    }

    pub fn contains_key(&self, key: &LispValue) -> bool {
        self.entries.contains_key(key)
    }

    pub fn assoc(&self, key: LispValue, val: LispValue) -> LispMap {
        LispMap {
            entries: self.entries.update(key, val),
            meta: self.meta.clone(),
        }
    }

    pub fn dissoc(&self, key: &LispValue) -> LispMap {
        LispMap {
            entries: self.entries.without(key),
            meta: self.meta.clone(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &LispValue> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &LispValue> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LispValue, &LispValue)> {
        self.entries.iter()
    }

    /// Order-independent digest of the entries; equal maps agree on it
    /// whatever their internal layout.
    pub(crate) fn content_hash(&self) -> u64 {
        self.entries.iter().fold(0u64, |acc, (k, v)| {
            let mut hasher = DefaultHasher::new();
            k.hash(&mut hasher);
            v.hash(&mut hasher);
            acc.wrapping_add(hasher.finish())
        })
    }
}

impl From<HashMap<LispValue, LispValue>> for LispMap {
    fn from(entries: HashMap<LispValue, LispValue>) -> Self {
        LispMap {
            entries,
            meta: None,
        }
    }
}

impl FromIterator<(LispValue, LispValue)> for LispMap {
    fn from_iter<I: IntoIterator<Item = (LispValue, LispValue)>>(iter: I) -> Self {
        LispMap::from(iter.into_iter().collect::<HashMap<_, _>>())
    }
}

impl PartialEq for LispMap {
    fn eq(&self, other: &LispMap) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.entries.get(k) == Some(v))
    }
}
impl Eq for LispMap {}

impl Seqable for LispMap {
    /// Entries as two-element vectors, in no particular order.
    fn seq(&self) -> LispSeq {
        self.entries
            .iter()
            .map(|(k, v)| LispValue::vector_from([k.clone(), v.clone()]))
            .collect::<Vector<_>>()
            .into()
    }
}

impl Indexed for LispMap {
    fn lookup(&self, key: &LispValue) -> Option<LispValue> {
        self.get(key)
    }
}

impl Conjable for LispMap {
    /// Conjoins a `[key value]` pair, or merges in another map.
    fn conj(&self, val: LispValue) -> Result<LispValue> {
        match val {
            LispValue::Map(other) => Ok(LispValue::Map(LispMap {
                entries: other.entries.union(self.entries.clone()),
                meta: self.meta.clone(),
            })),
            LispValue::Vector(pair) if pair.len() == 2 => {
                let key = pair.get(0)?;
                let val = pair.get(1)?;
                Ok(LispValue::Map(self.assoc(key, val)))
            }
            x => Err(LispError::InvalidDataType("map entry", x.type_of())),
        }
    }
}

impl HasMetadata for LispMap {
    fn meta(&self) -> Option<&MetaMap> {
        self.meta.as_ref()
    }
    fn with_meta(&self, meta: Option<MetaMap>) -> Self {
        LispMap {
            entries: self.entries.clone(),
            meta,
        }
    }
}
