//! Local entity types.
//!
//! Every entity the directory app stores locally is modelled as an explicit
//! struct and wrapped in the tagged [`Entity`] enum, so the sync paths never
//! need to inspect attributes by name.

use crate::{Error, RowId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The three synchronized entity collections. Serialized by collection name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "employees")]
    Employee,
    #[serde(rename = "municipios")]
    Municipality,
    #[serde(rename = "regionalInfo")]
    RegionalInfo,
}

impl EntityKind {
    /// All kinds, in sync order.
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Employee,
        EntityKind::Municipality,
        EntityKind::RegionalInfo,
    ];

    /// Name of the remote document collection.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Employee => "employees",
            EntityKind::Municipality => "municipios",
            EntityKind::RegionalInfo => "regionalInfo",
        }
    }

    /// Look up a kind by its remote collection name.
    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.collection() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_collection(s).ok_or_else(|| Error::UnknownCollection(s.to_string()))
    }
}

/// Identifier of a record inside the local store.
///
/// Unlike the UUID, this is assigned by the local store and is only
/// meaningful on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalKey {
    pub kind: EntityKind,
    pub row: RowId,
}

impl LocalKey {
    pub fn new(kind: EntityKind, row: RowId) -> Self {
        Self { kind, row }
    }

    /// URI form of the local storage identifier, e.g. `migrator://employees/p12`.
    pub fn storage_uri(&self) -> String {
        format!("migrator://{}/p{}", self.kind.collection(), self.row)
    }
}

impl fmt::Display for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_uri())
    }
}

/// Status of a project owned by an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
    #[default]
    #[serde(rename = "to do")]
    ToDo,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::InProgress => "in progress",
            ProjectStatus::Done => "done",
            ProjectStatus::ToDo => "to do",
        }
    }

    /// Parse a stored status, falling back to "to do" for unknown values.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim() {
            "in progress" => ProjectStatus::InProgress,
            "done" => ProjectStatus::Done,
            _ => ProjectStatus::ToDo,
        }
    }
}

/// A project, exclusively owned by one employee.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub status: ProjectStatus,
    pub description: String,
}

/// A government employee.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Stable identifier; absent on records that predate their first sync.
    pub id: Option<Uuid>,
    pub name: String,
    pub role: String,
    pub extension: String,
    pub mobile: String,
    pub email: String,
    /// Free-text region label.
    pub region: String,
    pub favorite: bool,
    /// Binary photo (JPEG).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
    /// Durable URL of the photo in the remote object store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Employee {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A municipality belonging to a region.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Municipality {
    pub id: Option<Uuid>,
    pub name: String,
    pub region: String,
    pub favorite: bool,
}

impl Municipality {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            name: name.into(),
            region: region.into(),
            favorite: false,
        }
    }
}

/// Contact sheet of a regional office. Has no strong identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalInfo {
    pub name: String,
    pub address: String,
    pub chief: String,
    pub extension: String,
}

/// Any locally stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Entity {
    Employee(Employee),
    Municipality(Municipality),
    RegionalInfo(RegionalInfo),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Employee(_) => EntityKind::Employee,
            Entity::Municipality(_) => EntityKind::Municipality,
            Entity::RegionalInfo(_) => EntityKind::RegionalInfo,
        }
    }

    /// The stable identifier, for kinds that carry one.
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Entity::Employee(e) => e.id,
            Entity::Municipality(m) => m.id,
            Entity::RegionalInfo(_) => None,
        }
    }

    /// An empty entity of the given kind.
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Employee => Entity::Employee(Employee::default()),
            EntityKind::Municipality => Entity::Municipality(Municipality::default()),
            EntityKind::RegionalInfo => Entity::RegionalInfo(RegionalInfo::default()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Employee(e) => &e.name,
            Entity::Municipality(m) => &m.name,
            Entity::RegionalInfo(r) => &r.name,
        }
    }
}

impl From<Employee> for Entity {
    fn from(value: Employee) -> Self {
        Entity::Employee(value)
    }
}

impl From<Municipality> for Entity {
    fn from(value: Municipality) -> Self {
        Entity::Municipality(value)
    }
}

impl From<RegionalInfo> for Entity {
    fn from(value: RegionalInfo) -> Self {
        Entity::RegionalInfo(value)
    }
}

/// An entity together with its local storage identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    pub key: LocalKey,
    pub entity: Entity,
}

impl LocalRecord {
    pub fn new(key: LocalKey, entity: impl Into<Entity>) -> Self {
        Self {
            key,
            entity: entity.into(),
        }
    }
}
