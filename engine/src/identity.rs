//! Identity resolution between local records and remote documents.
//!
//! Local records are keyed by a store-assigned [`LocalKey`] and, for
//! employees and municipalities, a UUID that becomes the remote document ID.
//! Remote documents written by older clients may carry arbitrary IDs, so
//! matching falls back to secondary attributes:
//!
//! | Kind | Match order |
//! |---|---|
//! | Employee | UUID from document ID, then `imageURL`, then (name, e-mail) |
//! | Municipality | UUID from document ID, then (name, region) |
//! | RegionalInfo | composite (name, extension), always |
//!
//! The (name, e-mail) fallback is weak: two different people who share both
//! values, including both empty, resolve to the same record.

use crate::{
    document, ChangeSet, Entity, EntityKind, LocalKey, LocalRecord, RegionalInfo, RemoteDocument,
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Remote document ID for a local record.
///
/// Records with a UUID use its hyphenated form. Others fall back to their
/// local storage identifier with path separators replaced, since document IDs
/// must not contain `/`.
pub fn remote_id_for(record: &LocalRecord) -> String {
    match record.entity.uuid() {
        Some(id) => id.to_string(),
        None => sanitize_document_id(&record.key.storage_uri()),
    }
}

/// Make an arbitrary string usable as a document ID.
pub fn sanitize_document_id(raw: &str) -> String {
    raw.trim().replace(['/', '\\'], "_")
}

/// Case-insensitive, whitespace-trimmed form used by composite keys.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// De facto identity of a [`RegionalInfo`]: normalized (name, extension).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionalKey {
    pub name: String,
    pub extension: String,
}

impl RegionalKey {
    pub fn of(info: &RegionalInfo) -> Self {
        Self {
            name: normalize(&info.name),
            extension: normalize(&info.extension),
        }
    }

    pub fn of_document(doc: &RemoteDocument) -> Self {
        Self {
            name: normalize(&doc.string(document::fields::NAME)),
            extension: normalize(&doc.string(document::fields::EXTENSION)),
        }
    }
}

/// Handle to a record tracked by an [`IdentityResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

/// Outcome of [`IdentityResolver::local_record_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub slot: SlotId,
    /// Whether no local record matched and a new one was created.
    pub created: bool,
}

#[derive(Debug)]
struct Slot {
    key: Option<LocalKey>,
    entity: Entity,
    touched: bool,
}

/// Matches remote documents against a snapshot of one local collection.
///
/// Matches and creations accumulate in memory; [`into_change_set`] turns them
/// into a single change set so the caller can commit once.
///
/// [`into_change_set`]: IdentityResolver::into_change_set
#[derive(Debug)]
pub struct IdentityResolver {
    kind: EntityKind,
    slots: Vec<Slot>,
    by_uuid: HashMap<Uuid, SlotId>,
    by_image_url: HashMap<String, SlotId>,
    by_name_email: HashMap<(String, String), SlotId>,
    by_name_region: HashMap<(String, String), SlotId>,
    by_regional_key: HashMap<RegionalKey, SlotId>,
}

impl IdentityResolver {
    /// Index a snapshot of local records of `kind`. Records of other kinds are ignored.
    pub fn new(kind: EntityKind, records: Vec<LocalRecord>) -> Self {
        let mut resolver = Self {
            kind,
            slots: Vec::with_capacity(records.len()),
            by_uuid: HashMap::new(),
            by_image_url: HashMap::new(),
            by_name_email: HashMap::new(),
            by_name_region: HashMap::new(),
            by_regional_key: HashMap::new(),
        };

        for record in records.into_iter().filter(|r| r.entity.kind() == kind) {
            let slot = SlotId(resolver.slots.len());
            resolver.slots.push(Slot {
                key: Some(record.key),
                entity: record.entity,
                touched: false,
            });
            resolver.index(slot, false);
        }

        resolver
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Find the local record matching `doc`, creating one when nothing matches.
    ///
    /// Never fails. New employees and municipalities take their UUID from the
    /// document ID when it parses, and get a fresh one otherwise.
    pub fn local_record_for(&mut self, doc: &RemoteDocument) -> Resolved {
        if let Some(slot) = self.find(doc) {
            return Resolved {
                slot,
                created: false,
            };
        }

        let mut entity = Entity::empty(self.kind);
        let id = Uuid::parse_str(doc.id.trim()).unwrap_or_else(|_| Uuid::new_v4());
        match &mut entity {
            Entity::Employee(e) => e.id = Some(id),
            Entity::Municipality(m) => m.id = Some(id),
            Entity::RegionalInfo(_) => {}
        }
        // Seed the secondary attributes so later documents in the same batch
        // resolve to this record instead of creating another one.
        document::apply_document(doc, &mut entity);

        let slot = SlotId(self.slots.len());
        self.slots.push(Slot {
            key: None,
            entity,
            touched: true,
        });
        self.index(slot, true);

        Resolved {
            slot,
            created: true,
        }
    }

    /// Mutate a tracked record. The record is re-indexed afterwards, and
    /// attributes it no longer has stop resolving to it.
    pub fn update(&mut self, slot: SlotId, apply: impl FnOnce(&mut Entity)) {
        let before = MatchKeys::of(&self.slots[slot.0].entity);
        let tracked = &mut self.slots[slot.0];
        apply(&mut tracked.entity);
        tracked.touched = true;

        if MatchKeys::of(&self.slots[slot.0].entity) != before {
            self.unindex(slot, before);
        }
        self.index(slot, true);
    }

    pub fn entity(&self, slot: SlotId) -> &Entity {
        &self.slots[slot.0].entity
    }

    /// Local key of a tracked record; `None` for records created in this batch.
    pub fn key(&self, slot: SlotId) -> Option<LocalKey> {
        self.slots[slot.0].key
    }

    /// Number of tracked records, existing and created.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Collect every creation and update into one change set.
    ///
    /// For regional records this also performs the duplicate sweep: within
    /// each composite-key group exactly one record survives, and the others
    /// are deleted (or never inserted).
    pub fn into_change_set(self) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let mut groups = HashSet::new();

        // Existing records precede created ones, so a group's survivor is
        // an existing record whenever it has one.
        for slot in self.slots {
            let survives = match &slot.entity {
                Entity::RegionalInfo(info) => groups.insert(RegionalKey::of(info)),
                _ => true,
            };

            match (slot.key, survives) {
                (Some(key), false) => changes.deletes.push(key),
                (None, false) => {}
                (Some(key), true) if slot.touched => changes.updates.push(LocalRecord {
                    key,
                    entity: slot.entity,
                }),
                (Some(_), true) => {}
                (None, true) => changes.inserts.push(slot.entity),
            }
        }

        changes
    }

    fn find(&self, doc: &RemoteDocument) -> Option<SlotId> {
        match self.kind {
            EntityKind::Employee => match Uuid::parse_str(doc.id.trim()) {
                Ok(id) => self.by_uuid.get(&id).copied(),
                Err(_) => doc
                    .image_url()
                    .and_then(|url| self.by_image_url.get(&url).copied())
                    .or_else(|| {
                        let key = (
                            doc.string(document::fields::NAME).trim().to_string(),
                            doc.string(document::fields::EMAIL).trim().to_string(),
                        );
                        self.by_name_email.get(&key).copied()
                    }),
            },
            EntityKind::Municipality => match Uuid::parse_str(doc.id.trim()) {
                Ok(id) => self.by_uuid.get(&id).copied(),
                Err(_) => {
                    let key = (
                        normalize(&doc.string(document::fields::NAME)),
                        normalize(&doc.string(document::fields::REGION)),
                    );
                    self.by_name_region.get(&key).copied()
                }
            },
            EntityKind::RegionalInfo => self
                .by_regional_key
                .get(&RegionalKey::of_document(doc))
                .copied(),
        }
    }

    /// Register a slot under every attribute it can be matched by.
    ///
    /// Existing entries win when `overwrite` is false, so the first local
    /// record of an ambiguous group stays the match target. Regional keys
    /// always keep their first record.
    fn index(&mut self, slot: SlotId, overwrite: bool) {
        fn put<K: std::hash::Hash + Eq>(
            map: &mut HashMap<K, SlotId>,
            key: Option<K>,
            slot: SlotId,
            overwrite: bool,
        ) {
            let Some(key) = key else { return };
            if overwrite {
                map.insert(key, slot);
            } else {
                map.entry(key).or_insert(slot);
            }
        }

        let keys = MatchKeys::of(&self.slots[slot.0].entity);
        put(&mut self.by_uuid, keys.uuid, slot, overwrite);
        put(&mut self.by_image_url, keys.image_url, slot, overwrite);
        put(&mut self.by_name_email, keys.name_email, slot, overwrite);
        put(&mut self.by_name_region, keys.name_region, slot, overwrite);
        put(&mut self.by_regional_key, keys.regional, slot, false);
    }

    /// Forget the entries pointing at `slot` under its previous attributes,
    /// handing each one to the earliest other record that shares it.
    fn unindex(&mut self, slot: SlotId, stale: MatchKeys) {
        fn take<K: std::hash::Hash + Eq>(map: &mut HashMap<K, SlotId>, key: Option<K>, slot: SlotId) {
            if let Some(key) = key {
                if map.get(&key) == Some(&slot) {
                    map.remove(&key);
                }
            }
        }

        take(&mut self.by_uuid, stale.uuid, slot);
        take(&mut self.by_image_url, stale.image_url, slot);
        take(&mut self.by_name_email, stale.name_email, slot);
        take(&mut self.by_name_region, stale.name_region, slot);
        take(&mut self.by_regional_key, stale.regional, slot);

        for other in (0..self.slots.len()).map(SlotId).filter(|other| *other != slot) {
            self.index(other, false);
        }
    }
}

/// Every attribute a record can be matched by.
#[derive(Debug, Default, PartialEq, Eq)]
struct MatchKeys {
    uuid: Option<Uuid>,
    image_url: Option<String>,
    name_email: Option<(String, String)>,
    name_region: Option<(String, String)>,
    regional: Option<RegionalKey>,
}

impl MatchKeys {
    fn of(entity: &Entity) -> Self {
        match entity {
            Entity::Employee(e) => Self {
                uuid: e.id,
                image_url: e
                    .photo_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string),
                name_email: Some((e.name.trim().to_string(), e.email.trim().to_string())),
                ..Self::default()
            },
            Entity::Municipality(m) => Self {
                uuid: m.id,
                name_region: Some((normalize(&m.name), normalize(&m.region))),
                ..Self::default()
            },
            Entity::RegionalInfo(info) => Self {
                regional: Some(RegionalKey::of(info)),
                ..Self::default()
            },
        }
    }
}
