//! Wire-format tests for the JSON the server exchanges.
//!
//! Remote documents are read by other clients of the same collections, and
//! events and reports are consumed by operators, so their shapes are fixed.

use migrator_engine::{
    document, Employee, EntityKind, MigrationOutcome, RemoteDocument, ResetReport, SyncEvent,
    SyncOperation, SyncPhase, SyncTask,
};
use serde_json::json;
use uuid::Uuid;

#[cfg(test)]
mod document_format_tests {
    use super::*;

    #[test]
    fn test_employee_document_fields() {
        let id = Uuid::parse_str("9b2f4c1e-8d5a-4e57-9f0a-3c6d2b1e7a40").unwrap();
        let employee = Employee {
            id: Some(id),
            name: "Ana Souza".into(),
            role: "Analista".into(),
            extension: "2041".into(),
            mobile: "+55 63 99999-0000".into(),
            email: "ana@example.gov".into(),
            region: "Regional Norte".into(),
            favorite: true,
            ..Employee::default()
        };

        let doc = document::employee_document(
            &id.to_string(),
            &employee,
            Some("https://blobs.example.gov/o/employeeImages/ana.jpg"),
        );

        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "id": "9b2f4c1e-8d5a-4e57-9f0a-3c6d2b1e7a40",
                "fields": {
                    "nome": "Ana Souza",
                    "funcao": "Analista",
                    "cargo": "Analista",
                    "ramal": "2041",
                    "celular": "+55 63 99999-0000",
                    "email": "ana@example.gov",
                    "regional": "Regional Norte",
                    "favorito": true,
                    "imageURL": "https://blobs.example.gov/o/employeeImages/ana.jpg"
                }
            })
        );
    }

    #[test]
    fn test_document_without_fields_parses() {
        let doc: RemoteDocument = serde_json::from_str(r#"{"id": "legacy-1"}"#).unwrap();
        assert_eq!(doc.id, "legacy-1");
        assert_eq!(doc.string("nome"), "");
        assert!(!doc.flag("favorito"));
    }
}

#[cfg(test)]
mod event_format_tests {
    use super::*;

    #[test]
    fn test_failed_event_carries_error() {
        let event = SyncEvent {
            task: SyncTask::new(SyncOperation::Delete, EntityKind::Municipality),
            phase: SyncPhase::Failed,
            count: None,
            error: Some("remote store error: permission denied".into()),
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "task": {"operation": "delete", "collection": "municipios"},
                "phase": "failed",
                "error": "remote store error: permission denied"
            })
        );
    }

    #[test]
    fn test_global_task_omits_collection() {
        let task = SyncTask::global(SyncOperation::Reset);
        assert_eq!(serde_json::to_value(task).unwrap(), json!({"operation": "reset"}));
    }

    #[test]
    fn test_migration_outcome_format() {
        assert_eq!(
            serde_json::to_value(MigrationOutcome::Migrated(4)).unwrap(),
            json!({"outcome": "migrated", "count": 4})
        );
        assert_eq!(
            serde_json::to_value(MigrationOutcome::Skipped).unwrap(),
            json!({"outcome": "skipped"})
        );
    }

    #[test]
    fn test_reset_report_format() {
        let report = ResetReport {
            local_deleted: 3,
            remote_deleted: 5,
            attachments_deleted: 1,
            seeded: 30,
            pushed: 30,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "localDeleted": 3,
                "remoteDeleted": 5,
                "attachmentsDeleted": 1,
                "seeded": 30,
                "pushed": 30
            })
        );
    }
}
