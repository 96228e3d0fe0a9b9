//! Remote documents and the field mapping between them and local entities.
//!
//! Remote payloads are loosely typed JSON objects. Reading never fails:
//! absent or mistyped fields fall back to empty strings and `false`.

use crate::{Employee, Entity, Municipality, RegionalInfo};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names used by the remote collections.
pub mod fields {
    pub const NAME: &str = "nome";
    pub const FUNCTION: &str = "funcao";
    /// Older clients read the employee role from here.
    pub const LEGACY_FUNCTION: &str = "cargo";
    pub const FAVORITE: &str = "favorito";
    pub const REGION: &str = "regional";
    pub const EXTENSION: &str = "ramal";
    pub const MOBILE: &str = "celular";
    pub const EMAIL: &str = "email";
    pub const IMAGE_URL: &str = "imageURL";
    pub const CHIEF: &str = "chefe";
    pub const ADDRESS: &str = "endereco";
}

/// A document in a remote collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// String field, or `""` when absent or not a string.
    pub fn string(&self, field: &str) -> String {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Boolean field, or `false` when absent or not a boolean.
    pub fn flag(&self, field: &str) -> bool {
        self.fields
            .get(field)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Non-empty string field.
    pub fn optional_string(&self, field: &str) -> Option<String> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// The referenced attachment URL, if any.
    pub fn image_url(&self) -> Option<String> {
        self.optional_string(fields::IMAGE_URL)
    }
}

/// Build the remote payload for an employee.
///
/// The role is written both as `funcao` and under its legacy alias `cargo`.
/// `imageURL` is present only when `image_url` is given.
pub fn employee_document(id: &str, employee: &Employee, image_url: Option<&str>) -> RemoteDocument {
    let doc = RemoteDocument::new(id)
        .with(fields::NAME, employee.name.as_str())
        .with(fields::FUNCTION, employee.role.as_str())
        .with(fields::LEGACY_FUNCTION, employee.role.as_str())
        .with(fields::FAVORITE, employee.favorite)
        .with(fields::REGION, employee.region.as_str())
        .with(fields::EXTENSION, employee.extension.as_str())
        .with(fields::MOBILE, employee.mobile.as_str())
        .with(fields::EMAIL, employee.email.as_str());

    match image_url {
        Some(url) => doc.with(fields::IMAGE_URL, url),
        None => doc,
    }
}

pub fn municipality_document(id: &str, municipality: &Municipality) -> RemoteDocument {
    RemoteDocument::new(id)
        .with(fields::NAME, municipality.name.as_str())
        .with(fields::REGION, municipality.region.as_str())
        .with(fields::FAVORITE, municipality.favorite)
}

pub fn regional_document(id: &str, info: &RegionalInfo) -> RemoteDocument {
    RemoteDocument::new(id)
        .with(fields::NAME, info.name.as_str())
        .with(fields::CHIEF, info.chief.as_str())
        .with(fields::EXTENSION, info.extension.as_str())
        .with(fields::ADDRESS, info.address.as_str())
}

/// Build the remote payload for any entity.
pub fn entity_document(id: &str, entity: &Entity, image_url: Option<&str>) -> RemoteDocument {
    match entity {
        Entity::Employee(e) => employee_document(id, e, image_url),
        Entity::Municipality(m) => municipality_document(id, m),
        Entity::RegionalInfo(r) => regional_document(id, r),
    }
}

/// Overwrite every mirrored employee field from `doc`.
///
/// Projects and the binary photo are not mirrored and are left untouched.
pub fn apply_employee(doc: &RemoteDocument, employee: &mut Employee) {
    employee.name = doc.string(fields::NAME);
    employee.role = match doc.optional_string(fields::FUNCTION) {
        Some(role) => role,
        None => doc.string(fields::LEGACY_FUNCTION),
    };
    employee.favorite = doc.flag(fields::FAVORITE);
    employee.region = doc.string(fields::REGION);
    employee.extension = doc.string(fields::EXTENSION);
    employee.mobile = doc.string(fields::MOBILE);
    employee.email = doc.string(fields::EMAIL);
    employee.photo_url = doc.image_url();
}

pub fn apply_municipality(doc: &RemoteDocument, municipality: &mut Municipality) {
    municipality.name = doc.string(fields::NAME);
    municipality.region = doc.string(fields::REGION);
    municipality.favorite = doc.flag(fields::FAVORITE);
}

pub fn apply_regional(doc: &RemoteDocument, info: &mut RegionalInfo) {
    info.name = doc.string(fields::NAME);
    info.chief = doc.string(fields::CHIEF);
    info.extension = doc.string(fields::EXTENSION);
    info.address = doc.string(fields::ADDRESS);
}

/// Overwrite every mirrored field of `entity` from `doc` (remote wins).
pub fn apply_document(doc: &RemoteDocument, entity: &mut Entity) {
    match entity {
        Entity::Employee(e) => apply_employee(doc, e),
        Entity::Municipality(m) => apply_municipality(doc, m),
        Entity::RegionalInfo(r) => apply_regional(doc, r),
    }
}
