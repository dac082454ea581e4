//! Contract tests run against every storage backend.

use async_trait::async_trait;
use ledger_store::{
    Action, DataService, DataServiceOptions, FsBackend, MemoryBackend, SledBackend,
    StorageBackend, StoreError,
};
use serde_json::{json, Value};
use std::sync::Arc;

struct Fixture {
    service: DataService,
    _dir: Option<tempfile::TempDir>,
}

fn fixtures(autocommit: bool) -> Vec<Fixture> {
    let options = DataServiceOptions {
        autocommit,
        ..Default::default()
    };
    let fs_dir = tempfile::tempdir().unwrap();
    vec![
        Fixture {
            service: DataService::new(Arc::new(MemoryBackend::new()), options.clone()),
            _dir: None,
        },
        Fixture {
            service: DataService::new(Arc::new(SledBackend::temporary()), options.clone()),
            _dir: None,
        },
        Fixture {
            service: DataService::new(Arc::new(FsBackend::new(fs_dir.path())), options),
            _dir: Some(fs_dir),
        },
    ]
}

#[tokio::test]
async fn test_collection_lifecycle_on_every_backend() {
    for fixture in fixtures(true) {
        let service = &fixture.service;
        let name = service.backend_name().to_string();

        assert!(!service.exists_collection("Asset:sheeps").await.unwrap(), "{name}");
        service.create_collection("Asset:sheeps", false).await.unwrap();
        assert!(service.exists_collection("Asset:sheeps").await.unwrap(), "{name}");

        let err = service
            .create_collection("Asset:sheeps", false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCollection(_)), "{name}");

        service.delete_collection("Asset:sheeps").await.unwrap();
        let err = service.get_collection("Asset:sheeps").await.unwrap_err();
        assert!(err.is_not_found(), "{name}");
        let err = service.delete_collection("Asset:sheeps").await.unwrap_err();
        assert!(err.is_not_found(), "{name}");
    }
}

#[tokio::test]
async fn test_delete_collection_cascades_on_every_backend() {
    for fixture in fixtures(true) {
        let service = &fixture.service;
        let name = service.backend_name().to_string();

        let sheeps = service.create_collection("Asset:sheeps", false).await.unwrap();
        let farmers = service
            .create_collection("Participant:farmers", false)
            .await
            .unwrap();
        sheeps.add("1", json!({ "sheepId": "1" }), false).await.unwrap();
        sheeps.add("2", json!({ "sheepId": "2" }), false).await.unwrap();
        farmers.add("bob", json!({ "farmerId": "bob" }), false).await.unwrap();

        service.delete_collection("Asset:sheeps").await.unwrap();

        // recreating must not resurrect old objects
        let sheeps = service.create_collection("Asset:sheeps", false).await.unwrap();
        assert!(sheeps.get_all().await.unwrap().is_empty(), "{name}");
        assert_eq!(farmers.get_all().await.unwrap().len(), 1, "{name}");
    }
}

#[tokio::test]
async fn test_objects_on_every_backend() {
    for fixture in fixtures(true) {
        let service = &fixture.service;
        let name = service.backend_name().to_string();
        let c = service.create_collection("$sysdata", false).await.unwrap();

        c.add("businessnetwork", json!({ "hash": "abc" }), false)
            .await
            .unwrap();
        assert!(c
            .add("businessnetwork", json!({}), false)
            .await
            .unwrap_err()
            .is_duplicate());
        c.update("businessnetwork", json!({ "hash": "def" }))
            .await
            .unwrap();
        assert_eq!(
            c.get("businessnetwork").await.unwrap(),
            json!({ "hash": "def" }),
            "{name}"
        );
        c.remove("businessnetwork").await.unwrap();
        assert!(c.get("businessnetwork").await.unwrap_err().is_not_found(), "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_with_distinct_ids_both_land() {
    for fixture in fixtures(true) {
        let service = fixture.service.clone();
        let name = service.backend_name().to_string();
        service.create_collection("c", false).await.unwrap();

        let first = {
            let service = service.session();
            tokio::spawn(async move {
                let c = service.get_collection("c").await?;
                c.add("1", json!({ "id": "1" }), false).await
            })
        };
        let second = {
            let service = service.session();
            tokio::spawn(async move {
                let c = service.get_collection("c").await?;
                c.add("2", json!({ "id": "2" }), false).await
            })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let c = service.get_collection("c").await.unwrap();
        assert!(c.exists("1").await.unwrap(), "{name}");
        assert!(c.exists("2").await.unwrap(), "{name}");
        assert_eq!(c.get_all().await.unwrap().len(), 2, "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deferred_adds_of_same_id_admit_one() {
    for fixture in fixtures(false) {
        let service = fixture.service.clone();
        service.create_collection("c", false).await.unwrap();

        let mut handles = Vec::new();
        for n in 0..2 {
            let session = service.session();
            handles.push(tokio::spawn(async move {
                session.transaction_start(false).await?;
                let c = session.get_collection("c").await?;
                c.add("same", json!({ "writer": n }), false).await?;
                let result = session.transaction_prepare().await;
                session.transaction_end().await?;
                result
            }));
        }

        let mut ok = 0;
        let mut duplicate = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => ok += 1,
                Err(e) if e.is_duplicate() => duplicate += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((ok, duplicate), (1, 1), "{}", service.backend_name());
    }
}

#[tokio::test]
async fn test_remove_all_data() {
    for fixture in fixtures(true) {
        let service = &fixture.service;
        service.create_collection("a", false).await.unwrap();
        service.create_collection("b", false).await.unwrap();
        service.remove_all_data().await.unwrap();
        assert!(!service.exists_collection("a").await.unwrap());
        assert!(!service.exists_collection("b").await.unwrap());
    }
}

/// A backend that leaves the optional primitive unimplemented.
struct Minimal(MemoryBackend);

#[async_trait]
impl StorageBackend for Minimal {
    fn name(&self) -> &str {
        "minimal"
    }
    async fn open(&self) -> ledger_store::Result<()> {
        self.0.open().await
    }
    async fn has_collection(&self, id: &str) -> ledger_store::Result<bool> {
        self.0.has_collection(id).await
    }
    async fn read_object(&self, c: &str, id: &str) -> ledger_store::Result<Option<Value>> {
        self.0.read_object(c, id).await
    }
    async fn read_all(&self, c: &str) -> ledger_store::Result<Vec<(String, Value)>> {
        self.0.read_all(c).await
    }
    async fn apply(&self, action: &Action) -> ledger_store::Result<()> {
        self.0.apply(action).await
    }
}

#[tokio::test]
async fn test_missing_primitive_is_abstract_method_error() {
    let service = DataService::new(
        Arc::new(Minimal(MemoryBackend::new())),
        DataServiceOptions::default(),
    );
    let err = service.remove_all_data().await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::AbstractMethod {
            method: "remove_all_data",
            ..
        }
    ));
}
