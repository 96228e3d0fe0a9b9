//! Performance benchmarks for migrator-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use migrator_engine::{
    document,
    identity::{self, IdentityResolver},
    memory::{MemoryBlobStore, MemoryLocalStore, MemoryRemoteStore, MemoryStateStore},
    Employee, EngineConfig, Entity, EntityKind, LocalKey, LocalRecord, LocalStore,
    RegionalInfo, RemoteDocument, RemoteStore, Stores, SyncEngine,
};
use std::sync::Arc;

fn employee_records(count: usize) -> Vec<LocalRecord> {
    (0..count)
        .map(|i| {
            LocalRecord::new(
                LocalKey::new(EntityKind::Employee, i as i64 + 1),
                Employee {
                    email: format!("user{i}@example.gov"),
                    region: "Regional Centro".into(),
                    ..Employee::new(format!("User {i}"))
                },
            )
        })
        .collect()
}

fn documents_for(records: &[LocalRecord]) -> Vec<RemoteDocument> {
    records
        .iter()
        .map(|record| document::entity_document(&identity::remote_id_for(record), &record.entity, None))
        .collect()
}

fn bench_identity(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity");

    for size in [10, 100, 1000].iter() {
        let records = employee_records(*size);
        let documents = documents_for(&records);

        group.bench_with_input(BenchmarkId::new("resolve_by_uuid", size), size, |b, _| {
            b.iter(|| {
                let mut resolver = IdentityResolver::new(EntityKind::Employee, records.clone());
                for doc in &documents {
                    black_box(resolver.local_record_for(doc));
                }
                resolver.into_change_set()
            })
        });

        // Legacy documents carry no UUID and fall back to (name, email).
        let legacy: Vec<RemoteDocument> = records
            .iter()
            .enumerate()
            .map(|(i, record)| document::entity_document(&format!("legacy-{i}"), &record.entity, None))
            .collect();

        group.bench_with_input(BenchmarkId::new("resolve_by_name_email", size), size, |b, _| {
            b.iter(|| {
                let mut resolver = IdentityResolver::new(EntityKind::Employee, records.clone());
                for doc in &legacy {
                    black_box(resolver.local_record_for(doc));
                }
            })
        });
    }

    group.finish();
}

fn bench_regional_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("regional_sweep");

    for size in [10, 100, 500].iter() {
        // Every name appears twice.
        let records: Vec<LocalRecord> = (0..*size)
            .map(|i| {
                LocalRecord::new(
                    LocalKey::new(EntityKind::RegionalInfo, i as i64 + 1),
                    RegionalInfo {
                        name: format!("Regional {}", i / 2),
                        extension: format!("{}", 3000 + i / 2),
                        ..Default::default()
                    },
                )
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("duplicates", size), size, |b, _| {
            b.iter(|| {
                IdentityResolver::new(EntityKind::RegionalInfo, black_box(records.clone()))
                    .into_change_set()
            })
        });
    }

    group.finish();
}

fn bench_documents(c: &mut Criterion) {
    let mut group = c.benchmark_group("documents");
    let employee = Employee {
        role: "Analista".into(),
        email: "ana@example.gov".into(),
        ..Employee::new("Ana")
    };
    let doc = document::employee_document("ana", &employee, Some("memory://blobs/employeeImages/ana.jpg"));

    group.bench_function("employee_to_document", |b| {
        b.iter(|| document::employee_document(black_box("ana"), black_box(&employee), None))
    });

    group.bench_function("apply_document", |b| {
        b.iter(|| {
            let mut entity = Entity::empty(EntityKind::Employee);
            document::apply_document(black_box(&doc), &mut entity);
            entity
        })
    });

    group.bench_function("document_to_json", |b| {
        b.iter(|| serde_json::to_string(black_box(&doc)))
    });

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for size in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("push_then_pull", size), size, |b, &size| {
            b.to_async(&runtime).iter(|| async move {
                let local = Arc::new(MemoryLocalStore::new());
                let remote = Arc::new(MemoryRemoteStore::new());
                let engine = SyncEngine::new(
                    Stores {
                        local: local.clone(),
                        remote: remote.clone(),
                        blobs: Arc::new(MemoryBlobStore::new()),
                        state: Arc::new(MemoryStateStore::new()),
                    },
                    &EngineConfig::default(),
                );
                for record in employee_records(size) {
                    local.insert(record.entity).await.unwrap();
                }
                engine.push_all(EntityKind::Employee).await.unwrap();
                remote
                    .set("employees", RemoteDocument::new("legacy").with("nome", "Extra"))
                    .await
                    .unwrap();
                engine.pull_all(EntityKind::Employee).await.unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_identity,
    bench_regional_sweep,
    bench_documents,
    bench_engine,
);
criterion_main!(benches);
