//! HTTP route definitions.

mod events;
mod health;
mod maintenance;
mod sync;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(sync::routes())
        .merge(maintenance::routes())
        .merge(events::routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{memory_pool, SqliteLocalStore, SqliteStateStore};
    use axum::body::Body;
    use axum::http::{header::AUTHORIZATION, Method, Request, StatusCode};
    use migrator_engine::{
        memory::{MemoryBlobStore, MemoryRemoteStore},
        EngineConfig, LocalStore, Municipality, ResetEngine, RuntimeEnvironment, Stores,
        SyncEngine,
    };
    use serde_json::Value;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        pool: crate::db::Pool,
        local: Arc<SqliteLocalStore>,
        remote: Arc<MemoryRemoteStore>,
        _cache: tempfile::TempDir,
    }

    async fn app(environment: RuntimeEnvironment, auth_secret: Option<&str>) -> TestApp {
        let pool = memory_pool().await;
        let cache = tempfile::tempdir().unwrap();
        let local = Arc::new(SqliteLocalStore::new(pool.clone()));
        let remote = Arc::new(MemoryRemoteStore::new());
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "sqlite::memory:".into(),
            remote_url: "http://remote.invalid".into(),
            blob_url: "http://remote.invalid".into(),
            remote_token: None,
            cache_dir: PathBuf::from(cache.path()),
            max_attachment_bytes: 1024,
            environment,
            auth_secret: auth_secret.map(str::to_string),
        };
        let engine = Arc::new(SyncEngine::new(
            Stores {
                local: local.clone(),
                remote: remote.clone(),
                blobs: Arc::new(MemoryBlobStore::new()),
                state: Arc::new(SqliteStateStore::new(pool.clone())),
            },
            &EngineConfig {
                cache_dir: cache.path().to_path_buf(),
                ..config.engine_config()
            },
        ));
        let state = AppState {
            pool: pool.clone(),
            reset: Arc::new(ResetEngine::new(engine.clone(), environment)),
            engine,
            config: Arc::new(config),
        };

        TestApp {
            router: create_routes().with_state(state),
            pool,
            local,
            remote,
            _cache: cache,
        }
    }

    async fn call(router: &Router, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app(RuntimeEnvironment::Production, None).await;
        let (status, body) = call(&app.router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["environment"], "production");
    }

    #[tokio::test]
    async fn health_fails_once_database_is_closed() {
        let app = app(RuntimeEnvironment::Production, None).await;
        app.pool.close().await;
        let (status, body) = call(&app.router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn push_then_status() {
        let app = app(RuntimeEnvironment::Production, None).await;
        app.local
            .insert(Municipality::new("Palmas", "Regional Centro").into())
            .await
            .unwrap();

        let (status, body) = call(&app.router, Method::POST, "/sync/municipios/push", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["collection"], "municipios");
        assert_eq!(body["count"], 1);
        assert_eq!(app.remote.count("municipios"), 1);

        let (_, body) = call(&app.router, Method::GET, "/sync/municipios/status", None).await;
        assert_eq!(body["tasks"][0]["operation"], "pushAll");
        assert_eq!(body["tasks"][0]["phase"], "completed");
    }

    #[tokio::test]
    async fn migrate_reports_outcome_once() {
        let app = app(RuntimeEnvironment::Production, None).await;
        app.local
            .insert(Municipality::new("Palmas", "Regional Centro").into())
            .await
            .unwrap();

        let (_, first) = call(&app.router, Method::POST, "/sync/municipios/migrate", None).await;
        let (_, second) = call(&app.router, Method::POST, "/sync/municipios/migrate", None).await;

        assert_eq!(first["outcome"], "migrated");
        assert_eq!(first["count"], 1);
        assert_eq!(second["outcome"], "skipped");
    }

    #[tokio::test]
    async fn record_routes_push_and_delete() {
        let app = app(RuntimeEnvironment::Production, None).await;
        let key = app
            .local
            .insert(Municipality::new("Gurupi", "Regional Sul").into())
            .await
            .unwrap();
        let uri = format!("/sync/municipios/records/{}", key.row);

        let (status, body) = call(&app.router, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"], key.storage_uri());
        assert_eq!(app.remote.count("municipios"), 1);

        let (status, _) = call(&app.router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.remote.count("municipios"), 0);
        assert!(app.local.get(key).await.unwrap().is_none());

        let (status, _) = call(&app.router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_collection_is_not_found() {
        let app = app(RuntimeEnvironment::Production, None).await;
        let (status, body) = call(&app.router, Method::POST, "/sync/cities/pull", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("cities"));
    }

    #[tokio::test]
    async fn malformed_record_key_is_bad_request() {
        let app = app(RuntimeEnvironment::Production, None).await;
        for uri in ["/sync/employees/records/abc", "/sync/employees/records/0"] {
            let (status, body) = call(&app.router, Method::POST, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("invalid record key"));
        }
    }

    #[tokio::test]
    async fn reset_is_forbidden_in_production() {
        let app = app(RuntimeEnvironment::Production, None).await;
        let (status, _) = call(&app.router, Method::POST, "/maintenance/reset", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reset_reseeds_in_development() {
        let app = app(RuntimeEnvironment::Development, None).await;
        let (status, body) = call(&app.router, Method::POST, "/maintenance/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["seeded"],
            migrator_engine::seed::default_employee_count()
                + migrator_engine::seed::default_municipality_count()
        );
    }

    #[tokio::test]
    async fn secret_requires_matching_bearer() {
        let app = app(RuntimeEnvironment::Production, Some("s3cret")).await;

        let (status, _) = call(&app.router, Method::GET, "/sync/employees/status", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) =
            call(&app.router, Method::GET, "/sync/employees/status", Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) =
            call(&app.router, Method::GET, "/sync/employees/status", Some("s3cret")).await;
        assert_eq!(status, StatusCode::OK);

        // Liveness stays open.
        let (status, _) = call(&app.router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
