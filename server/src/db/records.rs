//! Database operations for the directory tables.

use async_trait::async_trait;
use migrator_engine::{
    error::Result, ChangeSet, CommitSummary, Employee, Entity, EntityKind, Error, LocalKey,
    LocalRecord, LocalStore, Municipality, Project, ProjectStatus, RegionalInfo, RowId,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{local_error, Pool};

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Employee => "employees",
        EntityKind::Municipality => "municipalities",
        EntityKind::RegionalInfo => "regional_infos",
    }
}

fn columns(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Employee => {
            "row_id, uuid, name, role, extension, mobile, email, region, favorite, photo, photo_url"
        }
        EntityKind::Municipality => "row_id, uuid, name, region, favorite",
        EntityKind::RegionalInfo => "row_id, name, address, chief, extension",
    }
}

fn parse_uuid(row_id: RowId, raw: Option<String>) -> Result<Option<Uuid>> {
    raw.filter(|value| !value.is_empty())
        .map(|value| {
            Uuid::parse_str(&value)
                .map_err(|e| Error::Local(format!("row {row_id} has bad uuid '{value}': {e}")))
        })
        .transpose()
}

/// A stored employee row. Projects live in their own table.
#[derive(Debug)]
struct EmployeeRow {
    row_id: RowId,
    uuid: Option<String>,
    name: String,
    role: String,
    extension: String,
    mobile: String,
    email: String,
    region: String,
    favorite: bool,
    photo: Option<Vec<u8>>,
    photo_url: Option<String>,
}

impl<'r> FromRow<'r, SqliteRow> for EmployeeRow {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(EmployeeRow {
            row_id: row.try_get("row_id")?,
            uuid: row.try_get("uuid")?,
            name: row.try_get("name")?,
            role: row.try_get("role")?,
            extension: row.try_get("extension")?,
            mobile: row.try_get("mobile")?,
            email: row.try_get("email")?,
            region: row.try_get("region")?,
            favorite: row.try_get("favorite")?,
            photo: row.try_get("photo")?,
            photo_url: row.try_get("photo_url")?,
        })
    }
}

#[derive(Debug)]
struct MunicipalityRow {
    row_id: RowId,
    uuid: Option<String>,
    name: String,
    region: String,
    favorite: bool,
}

impl<'r> FromRow<'r, SqliteRow> for MunicipalityRow {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(MunicipalityRow {
            row_id: row.try_get("row_id")?,
            uuid: row.try_get("uuid")?,
            name: row.try_get("name")?,
            region: row.try_get("region")?,
            favorite: row.try_get("favorite")?,
        })
    }
}

#[derive(Debug)]
struct ProjectRow {
    employee_id: RowId,
    name: String,
    status: String,
    description: String,
}

impl<'r> FromRow<'r, SqliteRow> for ProjectRow {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(ProjectRow {
            employee_id: row.try_get("employee_id")?,
            name: row.try_get("name")?,
            status: row.try_get("status")?,
            description: row.try_get("description")?,
        })
    }
}

/// Decode one row of `kind`'s table.
fn decode(kind: EntityKind, row: &SqliteRow) -> Result<(RowId, Entity)> {
    match kind {
        EntityKind::Employee => {
            let stored = EmployeeRow::from_row(row).map_err(local_error)?;
            let id = parse_uuid(stored.row_id, stored.uuid)?;
            Ok((
                stored.row_id,
                Entity::Employee(Employee {
                    id,
                    name: stored.name,
                    role: stored.role,
                    extension: stored.extension,
                    mobile: stored.mobile,
                    email: stored.email,
                    region: stored.region,
                    favorite: stored.favorite,
                    photo: stored.photo,
                    photo_url: stored.photo_url,
                    projects: Vec::new(),
                }),
            ))
        }
        EntityKind::Municipality => {
            let stored = MunicipalityRow::from_row(row).map_err(local_error)?;
            let id = parse_uuid(stored.row_id, stored.uuid)?;
            Ok((
                stored.row_id,
                Entity::Municipality(Municipality {
                    id,
                    name: stored.name,
                    region: stored.region,
                    favorite: stored.favorite,
                }),
            ))
        }
        EntityKind::RegionalInfo => {
            let info = RegionalInfo {
                name: row.try_get("name").map_err(local_error)?,
                address: row.try_get("address").map_err(local_error)?,
                chief: row.try_get("chief").map_err(local_error)?,
                extension: row.try_get("extension").map_err(local_error)?,
            };
            let row_id = row.try_get("row_id").map_err(local_error)?;
            Ok((row_id, Entity::RegionalInfo(info)))
        }
    }
}

/// [`LocalStore`] over the SQLite directory tables.
///
/// Every change set is applied in one transaction, and writers queue on a
/// single gate so concurrent commits never interleave.
#[derive(Debug)]
pub struct SqliteLocalStore {
    pool: Pool,
    write_gate: Mutex<()>,
}

impl SqliteLocalStore {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            write_gate: Mutex::new(()),
        }
    }

    /// Projects grouped by owning employee, in stored order.
    async fn projects(&self, employee: Option<RowId>) -> Result<HashMap<RowId, Vec<Project>>> {
        let rows: Vec<ProjectRow> = match employee {
            Some(row_id) => sqlx::query_as::<_, ProjectRow>(
                r#"
                SELECT employee_id, name, status, description
                FROM projects
                WHERE employee_id = ?
                ORDER BY position ASC
                "#,
            )
            .bind(row_id)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as::<_, ProjectRow>(
                r#"
                SELECT employee_id, name, status, description
                FROM projects
                ORDER BY employee_id ASC, position ASC
                "#,
            )
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(local_error)?;

        let mut grouped: HashMap<RowId, Vec<Project>> = HashMap::new();
        for row in rows {
            grouped.entry(row.employee_id).or_default().push(Project {
                name: row.name,
                status: ProjectStatus::parse_lossy(&row.status),
                description: row.description,
            });
        }
        Ok(grouped)
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<LocalRecord>> {
        let sql = format!("SELECT {} FROM {} ORDER BY row_id ASC", columns(kind), table(kind));
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(local_error)?;

        let mut projects = match kind {
            EntityKind::Employee => self.projects(None).await?,
            _ => HashMap::new(),
        };

        rows.iter()
            .map(|row| {
                let (row_id, mut entity) = decode(kind, row)?;
                if let Entity::Employee(employee) = &mut entity {
                    employee.projects = projects.remove(&row_id).unwrap_or_default();
                }
                Ok(LocalRecord::new(LocalKey::new(kind, row_id), entity))
            })
            .collect()
    }

    async fn get(&self, key: LocalKey) -> Result<Option<LocalRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE row_id = ?",
            columns(key.kind),
            table(key.kind)
        );
        let Some(row) = sqlx::query(&sql)
            .bind(key.row)
            .fetch_optional(&self.pool)
            .await
            .map_err(local_error)?
        else {
            return Ok(None);
        };

        let (_, mut entity) = decode(key.kind, &row)?;
        if let Entity::Employee(employee) = &mut entity {
            employee.projects = self
                .projects(Some(key.row))
                .await?
                .remove(&key.row)
                .unwrap_or_default();
        }
        Ok(Some(LocalRecord::new(key, entity)))
    }

    async fn commit(&self, changes: ChangeSet) -> Result<CommitSummary> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await.map_err(local_error)?;
        let mut summary = CommitSummary::default();

        // Returning early drops the transaction, which rolls it back.
        for record in &changes.updates {
            if record.entity.kind() != record.key.kind {
                return Err(Error::Local(format!(
                    "cannot store {} under {}",
                    record.entity.kind(),
                    record.key
                )));
            }
            if !update_entity(&mut tx, record.key.row, &record.entity).await? {
                return Err(Error::RecordNotFound(record.key.to_string()));
            }
            summary.updated += 1;
        }

        for key in &changes.deletes {
            let sql = format!("DELETE FROM {} WHERE row_id = ?", table(key.kind));
            let result = sqlx::query(&sql)
                .bind(key.row)
                .execute(&mut *tx)
                .await
                .map_err(local_error)?;
            summary.deleted += result.rows_affected() as usize;
        }

        for entity in &changes.inserts {
            let row_id = insert_entity(&mut tx, entity).await?;
            summary.inserted.push(LocalKey::new(entity.kind(), row_id));
        }

        tx.commit().await.map_err(local_error)?;

        tracing::debug!(
            inserted = summary.inserted.len(),
            updated = summary.updated,
            deleted = summary.deleted,
            "Committed change set"
        );
        Ok(summary)
    }

    async fn delete_all(&self, kinds: &[EntityKind]) -> Result<usize> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await.map_err(local_error)?;

        let mut deleted = 0;
        for kind in kinds {
            let result = sqlx::query(&format!("DELETE FROM {}", table(*kind)))
                .execute(&mut *tx)
                .await
                .map_err(local_error)?;
            deleted += result.rows_affected() as usize;
        }

        tx.commit().await.map_err(local_error)?;
        tracing::info!(deleted, "Cleared local tables");
        Ok(deleted)
    }
}

async fn insert_entity(conn: &mut SqliteConnection, entity: &Entity) -> Result<RowId> {
    let result = match entity {
        Entity::Employee(e) => {
            sqlx::query(
                r#"
                INSERT INTO employees (
                    uuid, name, role, extension, mobile, email, region,
                    favorite, photo, photo_url
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(e.id.map(|id| id.to_string()))
            .bind(&e.name)
            .bind(&e.role)
            .bind(&e.extension)
            .bind(&e.mobile)
            .bind(&e.email)
            .bind(&e.region)
            .bind(e.favorite)
            .bind(e.photo.as_deref())
            .bind(e.photo_url.as_deref())
            .execute(&mut *conn)
            .await
        }
        Entity::Municipality(m) => {
            sqlx::query("INSERT INTO municipalities (uuid, name, region, favorite) VALUES (?, ?, ?, ?)")
                .bind(m.id.map(|id| id.to_string()))
                .bind(&m.name)
                .bind(&m.region)
                .bind(m.favorite)
                .execute(&mut *conn)
                .await
        }
        Entity::RegionalInfo(r) => {
            sqlx::query(
                "INSERT INTO regional_infos (name, address, chief, extension) VALUES (?, ?, ?, ?)",
            )
            .bind(&r.name)
            .bind(&r.address)
            .bind(&r.chief)
            .bind(&r.extension)
            .execute(&mut *conn)
            .await
        }
    }
    .map_err(local_error)?;

    let row_id = result.last_insert_rowid();
    if let Entity::Employee(e) = entity {
        replace_projects(conn, row_id, &e.projects).await?;
    }
    Ok(row_id)
}

/// Overwrite a stored row. Returns `false` when no such row exists.
async fn update_entity(conn: &mut SqliteConnection, row_id: RowId, entity: &Entity) -> Result<bool> {
    let result = match entity {
        Entity::Employee(e) => {
            sqlx::query(
                r#"
                UPDATE employees SET
                    uuid = ?, name = ?, role = ?, extension = ?, mobile = ?,
                    email = ?, region = ?, favorite = ?, photo = ?, photo_url = ?
                WHERE row_id = ?
                "#,
            )
            .bind(e.id.map(|id| id.to_string()))
            .bind(&e.name)
            .bind(&e.role)
            .bind(&e.extension)
            .bind(&e.mobile)
            .bind(&e.email)
            .bind(&e.region)
            .bind(e.favorite)
            .bind(e.photo.as_deref())
            .bind(e.photo_url.as_deref())
            .bind(row_id)
            .execute(&mut *conn)
            .await
        }
        Entity::Municipality(m) => {
            sqlx::query(
                "UPDATE municipalities SET uuid = ?, name = ?, region = ?, favorite = ? WHERE row_id = ?",
            )
            .bind(m.id.map(|id| id.to_string()))
            .bind(&m.name)
            .bind(&m.region)
            .bind(m.favorite)
            .bind(row_id)
            .execute(&mut *conn)
            .await
        }
        Entity::RegionalInfo(r) => {
            sqlx::query(
                "UPDATE regional_infos SET name = ?, address = ?, chief = ?, extension = ? WHERE row_id = ?",
            )
            .bind(&r.name)
            .bind(&r.address)
            .bind(&r.chief)
            .bind(&r.extension)
            .bind(row_id)
            .execute(&mut *conn)
            .await
        }
    }
    .map_err(local_error)?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }
    if let Entity::Employee(e) = entity {
        replace_projects(conn, row_id, &e.projects).await?;
    }
    Ok(true)
}

async fn replace_projects(conn: &mut SqliteConnection, employee: RowId, projects: &[Project]) -> Result<()> {
    sqlx::query("DELETE FROM projects WHERE employee_id = ?")
        .bind(employee)
        .execute(&mut *conn)
        .await
        .map_err(local_error)?;

    for (position, project) in projects.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO projects (employee_id, position, name, status, description)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee)
        .bind(position as i64)
        .bind(&project.name)
        .bind(project.status.as_str())
        .bind(&project.description)
        .execute(&mut *conn)
        .await
        .map_err(local_error)?;
    }
    Ok(())
}
