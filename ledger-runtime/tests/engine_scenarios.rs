//! End-to-end engine scenarios against an in-process container.

use async_trait::async_trait;
use ledger_runtime::archive::hash_archive;
use ledger_runtime::identity::{certificate_fingerprint, DEFAULT_ISSUER};
use ledger_runtime::ledger_store::{
    Action, DataService, DataServiceOptions, MemoryBackend, StorageBackend,
};
use ledger_runtime::registry::RegistryRecord;
use ledger_runtime::{
    AnonymousIdentity, Api, ArchiveBuilder, CertificateIdentity, Container, ContainerConfig,
    Context, Engine, IdentityService, LoggingService, ModelFile, Relationship, Resource,
    RuntimeError, ScriptDescriptor, ScriptFunction, StorageConfig, TransactionProcessor,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn sheep_model() -> ModelFile {
    ModelFile::new("org.acme")
        .asset("Sheep", "sheepId")
        .participant("Farmer", "farmerId")
        .transaction("MoveSheep")
        .transaction("Shear")
        .event("SheepMoved")
}

fn sheep_network() -> String {
    ArchiveBuilder::new("sheep-network", "0.1.0")
        .model(sheep_model())
        .script(
            "logic",
            ScriptDescriptor {
                functions: vec![
                    ScriptFunction::named("onMoveSheep"),
                    ScriptFunction::for_transaction("audit", "org.acme.MoveSheep"),
                ],
            },
        )
        .build_base64()
        .unwrap()
}

fn anonymous(container: &Container) -> Context {
    container.create_context(Arc::new(AnonymousIdentity))
}

fn caller(container: &Container, identity: CertificateIdentity) -> Context {
    let identity: Arc<dyn IdentityService> = Arc::new(identity);
    container.create_context(identity)
}

async fn deploy(container: &Container, archive: &str) {
    Engine::new()
        .init(&mut anonymous(container), &args(&[archive]))
        .await
        .unwrap();
}

async fn deployed() -> Container {
    let container = Container::new(ContainerConfig::new("scenario")).unwrap();
    deploy(&container, &sheep_network()).await;
    container
}

async fn invoke(container: &Container, function: &str, values: &[&str]) -> Result<Value, RuntimeError> {
    Engine::new()
        .invoke(&mut anonymous(container), function, &args(values))
        .await
}

async fn query(container: &Container, function: &str, values: &[&str]) -> Result<Value, RuntimeError> {
    Engine::new()
        .query(&mut anonymous(container), function, &args(values))
        .await
}

fn sheep(id: &str, location: &str) -> String {
    json!({ "$class": "org.acme.Sheep", "sheepId": id, "location": location }).to_string()
}

async fn add_farmer(container: &Container, id: &str) {
    let farmer = json!({ "$class": "org.acme.Farmer", "farmerId": id }).to_string();
    invoke(container, "addResourceToRegistry", &["Participant", "org.acme.Farmer", &farmer])
        .await
        .unwrap();
}

/// Counts every action that reaches storage.
struct CountingBackend {
    inner: MemoryBackend,
    applied: Arc<AtomicUsize>,
}

#[async_trait]
impl StorageBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    async fn open(&self) -> ledger_runtime::ledger_store::Result<()> {
        self.inner.open().await
    }

    async fn has_collection(&self, id: &str) -> ledger_runtime::ledger_store::Result<bool> {
        self.inner.has_collection(id).await
    }

    async fn read_object(
        &self,
        collection: &str,
        id: &str,
    ) -> ledger_runtime::ledger_store::Result<Option<Value>> {
        self.inner.read_object(collection, id).await
    }

    async fn read_all(
        &self,
        collection: &str,
    ) -> ledger_runtime::ledger_store::Result<Vec<(String, Value)>> {
        self.inner.read_all(collection).await
    }

    async fn apply(&self, action: &Action) -> ledger_runtime::ledger_store::Result<()> {
        self.applied.fetch_add(1, Ordering::SeqCst);
        self.inner.apply(action).await
    }
}

/// Moves the sheep named by the transaction and emits `SheepMoved`.
struct MoveSheep {
    calls: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

#[async_trait]
impl TransactionProcessor for MoveSheep {
    async fn process(&self, api: &Api, transaction: &Resource) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("onMoveSheep".to_string());
        let target = transaction
            .get("sheep")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("transaction has no sheep"))?;
        let relationship = Relationship::parse(target)?;

        let registry = api.get_asset_registry("org.acme.Sheep").await?;
        let mut sheep = registry.get(&relationship.identifier).await?;
        sheep.set("location", transaction.get("field").cloned().unwrap_or(Value::Null));
        registry.update(&sheep).await?;

        let mut event = api.get_factory().new_event("org.acme.SheepMoved")?;
        event.set("sheep", json!(target));
        api.emit(event).await?;

        if self.fail {
            anyhow::bail!("fence is closed");
        }
        Ok(())
    }
}

struct Audit {
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl TransactionProcessor for Audit {
    async fn process(&self, _api: &Api, _transaction: &Resource) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("audit".to_string());
        Ok(())
    }
}

struct Stuck;

#[async_trait]
impl TransactionProcessor for Stuck {
    async fn process(&self, _api: &Api, _transaction: &Resource) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

async fn register_sheep_logic(container: &Container, fail: bool) -> Arc<Mutex<Vec<String>>> {
    let calls = Arc::new(Mutex::new(Vec::new()));
    container
        .register_processor(
            "onMoveSheep",
            Arc::new(MoveSheep {
                calls: calls.clone(),
                fail,
            }),
        )
        .await;
    container
        .register_processor("audit", Arc::new(Audit { calls: calls.clone() }))
        .await;
    calls
}

fn move_sheep(transaction_id: &str) -> String {
    json!({
        "$class": "org.acme.MoveSheep",
        "transactionId": transaction_id,
        "sheep": "resource:org.acme.Sheep#1",
        "field": "north"
    })
    .to_string()
}

#[tokio::test]
async fn test_deploy_creates_default_registries() {
    let container = deployed().await;

    let assets = query(&container, "getAllRegistries", &["Asset"]).await.unwrap();
    assert_eq!(assets[0]["registryId"], "org.acme.Sheep");
    assert_eq!(assets[0]["name"], "Asset registry for org.acme.Sheep");

    for (kind, id) in [
        ("Participant", "org.acme.Farmer"),
        ("Transaction", "org.acme.MoveSheep"),
        ("Transaction", "default"),
    ] {
        let exists = query(&container, "existsRegistry", &[kind, id]).await.unwrap();
        assert_eq!(exists, json!(true), "{kind}:{id}");
    }
}

#[tokio::test]
async fn test_redeploy_over_existing_store() {
    let container = deployed().await;
    invoke(&container, "addResourceToRegistry", &["Asset", "org.acme.Sheep", &sheep("1", "pen")])
        .await
        .unwrap();

    deploy(&container, &sheep_network()).await;

    let kept = query(&container, "getResourceInRegistry", &["Asset", "org.acme.Sheep", "1"])
        .await
        .unwrap();
    assert_eq!(kept["location"], "pen");
    let exists = query(&container, "existsRegistry", &["Transaction", "default"]).await.unwrap();
    assert_eq!(exists, json!(true));
    let network = query(&container, "getBusinessNetwork", &[]).await.unwrap();
    assert_eq!(network["hash"], json!(hash_archive(&sheep_network())));
}

#[tokio::test]
async fn test_wrong_arity_never_touches_storage() {
    let applied = Arc::new(AtomicUsize::new(0));
    let backend = CountingBackend {
        inner: MemoryBackend::new(),
        applied: applied.clone(),
    };
    let data_service = DataService::new(Arc::new(backend), DataServiceOptions::default());
    let container = Container::with_services(
        ContainerConfig::new("counting"),
        data_service,
        LoggingService::new("info"),
    );
    deploy(&container, &sheep_network()).await;
    let baseline = applied.load(Ordering::SeqCst);
    assert!(baseline > 0);

    let calls: &[(&str, &[&str])] = &[
        ("addResourceToRegistry", &["Asset", "org.acme.Sheep"]),
        ("addRegistry", &["Asset", "cars"]),
        ("issueIdentity", &["resource:org.acme.Farmer#bob"]),
        ("bindIdentity", &[]),
        ("revokeIdentity", &["a", "b"]),
        ("updateBusinessNetwork", &[]),
        ("resetBusinessNetwork", &["now"]),
        ("submitTransaction", &[]),
    ];
    for (function, values) in calls {
        let err = invoke(&container, function, values).await.unwrap_err();
        match err {
            RuntimeError::InvalidArguments { function: ref name, .. } => assert_eq!(name, function),
            other => panic!("{function}: unexpected {other}"),
        }
    }
    let err = Engine::new()
        .init(&mut anonymous(&container), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidArguments { .. }));

    assert_eq!(applied.load(Ordering::SeqCst), baseline);
}

#[tokio::test]
async fn test_unknown_and_mutating_functions() {
    let container = deployed().await;

    let err = invoke(&container, "mintCoins", &[]).await.unwrap_err();
    assert!(matches!(err, RuntimeError::UnsupportedFunction { .. }));

    let err = query(&container, "resetBusinessNetwork", &[]).await.unwrap_err();
    assert!(matches!(err, RuntimeError::UnsupportedFunction { .. }));

    let ping = query(&container, "ping", &[]).await.unwrap();
    assert_eq!(ping["version"], json!(container.version()));
    assert_eq!(ping["participant"], Value::Null);
}

#[tokio::test]
async fn test_resource_crud_through_engine() {
    let container = deployed().await;
    let registry = ["Asset", "org.acme.Sheep"];

    invoke(&container, "addResourceToRegistry", &[registry[0], registry[1], &sheep("1", "south")])
        .await
        .unwrap();
    let err = invoke(&container, "addResourceToRegistry", &[registry[0], registry[1], &sheep("1", "east")])
        .await
        .unwrap_err();
    assert!(err.is_duplicate());

    let stored = query(&container, "getResourceInRegistry", &[registry[0], registry[1], "1"])
        .await
        .unwrap();
    assert_eq!(stored, json!({ "$class": "org.acme.Sheep", "sheepId": "1", "location": "south" }));

    invoke(&container, "updateResourceInRegistry", &[registry[0], registry[1], &sheep("1", "west")])
        .await
        .unwrap();
    let stored = query(&container, "getResourceInRegistry", &[registry[0], registry[1], "1"])
        .await
        .unwrap();
    assert_eq!(stored["location"], "west");

    invoke(&container, "removeResourceFromRegistry", &[registry[0], registry[1], "1"])
        .await
        .unwrap();
    let exists = query(&container, "existsResourceInRegistry", &[registry[0], registry[1], "1"])
        .await
        .unwrap();
    assert_eq!(exists, json!(false));
    let err = query(&container, "getResourceInRegistry", &[registry[0], registry[1], "1"])
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Object with ID '1' in collection with ID 'Asset:org.acme.Sheep' does not exist"
    );
}

#[tokio::test]
async fn test_wrong_type_is_rejected_by_registry() {
    let container = deployed().await;
    let farmer = json!({ "$class": "org.acme.Farmer", "farmerId": "bob" }).to_string();
    let err = invoke(&container, "addResourceToRegistry", &["Asset", "org.acme.Sheep", &farmer])
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Resource(_)), "{err}");
}

#[tokio::test]
async fn test_reset_removes_every_registry() {
    let container = Container::new(ContainerConfig::new("reset")).unwrap();
    let empty = ArchiveBuilder::new("empty-network", "0.1.0")
        .model(ModelFile::new("org.empty"))
        .build_base64()
        .unwrap();
    deploy(&container, &empty).await;

    invoke(&container, "addRegistry", &["Asset", "sheeps", "Sheep registry"])
        .await
        .unwrap();
    invoke(&container, "addRegistry", &["Participant", "farmers", "Farmer registry"])
        .await
        .unwrap();
    let data = container.data_service();
    let sheeps = data.get_collection("Asset:sheeps").await.unwrap();
    sheeps.add("1", json!({ "sheepId": "1" }), false).await.unwrap();
    sheeps.add("2", json!({ "sheepId": "2" }), false).await.unwrap();
    let farmers = data.get_collection("Participant:farmers").await.unwrap();
    farmers.add("bob", json!({ "farmerId": "bob" }), false).await.unwrap();

    invoke(&container, "resetBusinessNetwork", &[]).await.unwrap();

    for id in ["Asset:sheeps", "Participant:farmers"] {
        let err = data.get_collection(id).await.unwrap_err();
        assert!(err.is_not_found(), "{id}");
    }
    let records: Vec<RegistryRecord> = data
        .get_collection("$sysregistries")
        .await
        .unwrap()
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|object| serde_json::from_value(object).unwrap())
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].collection_id(), "Transaction:default");
    assert!(data.exists_collection("Transaction:default").await.unwrap());
}

#[tokio::test]
async fn test_revoked_identity_is_rejected_in_every_state() {
    let container = deployed().await;
    add_farmer(&container, "bob").await;
    let engine = Engine::new();

    // ISSUED
    let issued = invoke(&container, "issueIdentity", &["resource:org.acme.Farmer#bob", "alice"])
        .await
        .unwrap();
    assert_eq!(issued["state"], "ISSUED");
    let alice = || CertificateIdentity::new("alice", DEFAULT_ISSUER, "cert-alice");
    let err = engine
        .query(&mut caller(&container, alice()), "ping", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::IdentityInvalid { .. }), "{err}");

    let issued_id = issued["identityId"].as_str().unwrap().to_string();
    invoke(&container, "revokeIdentity", &[&issued_id]).await.unwrap();

    // BOUND
    let bound = invoke(&container, "bindIdentity", &["resource:org.acme.Farmer#bob", "cert-carol"])
        .await
        .unwrap();
    assert_eq!(bound["state"], "BOUND");
    let bound_id = bound["identityId"].as_str().unwrap().to_string();
    invoke(&container, "revokeIdentity", &[&bound_id]).await.unwrap();
    let carol = || CertificateIdentity::new("carol", "elsewhere", "cert-carol");

    // ACTIVATED
    invoke(&container, "issueIdentity", &["resource:org.acme.Farmer#bob", "dave"])
        .await
        .unwrap();
    let dave = || CertificateIdentity::new("dave", DEFAULT_ISSUER, "cert-dave");
    let activated = engine
        .invoke(&mut caller(&container, dave()), "activateIdentity", &[])
        .await
        .unwrap();
    assert_eq!(activated["state"], "ACTIVATED");
    let ping = engine
        .query(&mut caller(&container, dave()), "ping", &[])
        .await
        .unwrap();
    assert_eq!(ping["participant"], "org.acme.Farmer#bob");
    invoke(&container, "revokeIdentity", &[&certificate_fingerprint("cert-dave")])
        .await
        .unwrap();

    for identity in [alice(), carol(), dave()] {
        let err = engine
            .query(&mut caller(&container, identity), "ping", &[])
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .contains("The identity may be invalid or may have been revoked"),
            "{err}"
        );
    }

    let err = invoke(&container, "revokeIdentity", &[&bound_id]).await.unwrap_err();
    assert_eq!(err.to_string(), "The specified identity has already been revoked");
}

#[tokio::test]
async fn test_update_business_network() {
    let container = deployed().await;
    let original = query(&container, "getBusinessNetwork", &[]).await.unwrap();
    assert_eq!(original["hash"], json!(hash_archive(&sheep_network())));

    let updated = ArchiveBuilder::new("sheep-network", "0.2.0")
        .model(sheep_model().asset("Cow", "cowId"))
        .build_base64()
        .unwrap();
    invoke(&container, "updateBusinessNetwork", &[&updated]).await.unwrap();

    let network = query(&container, "getBusinessNetwork", &[]).await.unwrap();
    assert_eq!(network["hash"], json!(hash_archive(&updated)));
    assert_eq!(network["data"], json!(updated));
    let exists = query(&container, "existsRegistry", &["Asset", "org.acme.Cow"])
        .await
        .unwrap();
    assert_eq!(exists, json!(true));

    // a bad archive is rejected before anything is stored
    assert!(invoke(&container, "updateBusinessNetwork", &["bm90IGEgemlw"]).await.is_err());
    let network = query(&container, "getBusinessNetwork", &[]).await.unwrap();
    assert_eq!(network["hash"], json!(hash_archive(&updated)));
}

#[tokio::test]
async fn test_undeployed_network_rejects_calls() {
    let container = deployed().await;
    invoke(&container, "undeployBusinessNetwork", &[]).await.unwrap();
    let err = query(&container, "ping", &[]).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Undeployed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_are_both_kept() {
    let container = deployed().await;

    let tasks: Vec<_> = ["1", "2"]
        .into_iter()
        .map(|id| {
            let container = container.clone();
            tokio::spawn(async move {
                let mut context = container.create_context(Arc::new(AnonymousIdentity));
                Engine::new()
                    .invoke(
                        &mut context,
                        "addResourceToRegistry",
                        &args(&["Asset", "org.acme.Sheep", &sheep(id, "pen")]),
                    )
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let all = query(&container, "getAllResourcesInRegistry", &["Asset", "org.acme.Sheep"])
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);
    for id in ["1", "2"] {
        let exists = query(&container, "existsResourceInRegistry", &["Asset", "org.acme.Sheep", id])
            .await
            .unwrap();
        assert_eq!(exists, json!(true));
    }
}

#[tokio::test]
async fn test_submit_transaction_runs_processors_in_order() {
    let container = Container::new(ContainerConfig::new("tx")).unwrap();
    let calls = register_sheep_logic(&container, false).await;
    deploy(&container, &sheep_network()).await;
    invoke(&container, "addResourceToRegistry", &["Asset", "org.acme.Sheep", &sheep("1", "south")])
        .await
        .unwrap();
    let mut events = container.subscribe_events();

    invoke(&container, "submitTransaction", &[&move_sheep("tx1")]).await.unwrap();

    assert_eq!(*calls.lock().unwrap(), vec!["onMoveSheep", "audit"]);
    let moved = query(&container, "getResourceInRegistry", &["Asset", "org.acme.Sheep", "1"])
        .await
        .unwrap();
    assert_eq!(moved["location"], "north");

    let stored = query(&container, "getResourceInRegistry", &["Transaction", "org.acme.MoveSheep", "tx1"])
        .await
        .unwrap();
    assert_eq!(stored["sheep"], "resource:org.acme.Sheep#1");

    let event = events.try_recv().unwrap();
    assert_eq!(event["$class"], "org.acme.SheepMoved");
    assert_eq!(event["eventId"], "tx1#0");
}

#[tokio::test]
async fn test_resubmitted_transaction_fails_before_processors_run() {
    let container = Container::new(ContainerConfig::new("tx")).unwrap();
    let calls = register_sheep_logic(&container, false).await;
    deploy(&container, &sheep_network()).await;
    invoke(&container, "addResourceToRegistry", &["Asset", "org.acme.Sheep", &sheep("1", "south")])
        .await
        .unwrap();
    invoke(&container, "submitTransaction", &[&move_sheep("dup")]).await.unwrap();

    invoke(&container, "updateResourceInRegistry", &["Asset", "org.acme.Sheep", &sheep("1", "south")])
        .await
        .unwrap();
    let mut events = container.subscribe_events();

    let err = invoke(&container, "submitTransaction", &[&move_sheep("dup")]).await.unwrap_err();
    assert!(err.is_duplicate(), "{err}");
    assert_eq!(
        err.to_string(),
        "Failed to add object with ID 'dup' as the object already exists"
    );

    assert_eq!(*calls.lock().unwrap(), vec!["onMoveSheep", "audit"]);
    let stored = query(&container, "getResourceInRegistry", &["Asset", "org.acme.Sheep", "1"])
        .await
        .unwrap();
    assert_eq!(stored["location"], "south");
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_transaction_without_processors_fails() {
    let container = Container::new(ContainerConfig::new("tx")).unwrap();
    register_sheep_logic(&container, false).await;
    deploy(&container, &sheep_network()).await;

    let shear = json!({ "$class": "org.acme.Shear", "transactionId": "tx2" }).to_string();
    let err = invoke(&container, "submitTransaction", &[&shear]).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not find any functions to execute for transaction org.acme.Shear"
    );
    let err = query(&container, "getResourceInRegistry", &["Transaction", "org.acme.Shear", "tx2"])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_failed_transaction_rolls_back_deferred_writes() {
    let config = ContainerConfig::new("deferred").with_autocommit(false);
    let container = Container::new(config).unwrap();
    register_sheep_logic(&container, true).await;
    deploy(&container, &sheep_network()).await;
    invoke(&container, "addResourceToRegistry", &["Asset", "org.acme.Sheep", &sheep("1", "south")])
        .await
        .unwrap();
    let mut events = container.subscribe_events();

    let err = invoke(&container, "submitTransaction", &[&move_sheep("tx3")]).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Processor { .. }), "{err}");

    let unchanged = query(&container, "getResourceInRegistry", &["Asset", "org.acme.Sheep", "1"])
        .await
        .unwrap();
    assert_eq!(unchanged["location"], "south");
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_cancelled_call_is_abandoned() {
    let container = Container::new(ContainerConfig::new("cancel")).unwrap();
    container.register_processor("onMoveSheep", Arc::new(Stuck)).await;
    deploy(&container, &sheep_network()).await;

    let mut context = anonymous(&container);
    let handle = context.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });
    let err = Engine::new()
        .invoke(&mut context, "submitTransaction", &args(&[&move_sheep("tx4")]))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Cancelled));
}

#[tokio::test]
async fn test_call_timeout() {
    let config = ContainerConfig::new("timeout").with_call_timeout(Duration::from_millis(100));
    let container = Container::new(config).unwrap();
    container.register_processor("onMoveSheep", Arc::new(Stuck)).await;
    deploy(&container, &sheep_network()).await;

    let err = invoke(&container, "submitTransaction", &[&move_sheep("tx5")]).await.unwrap_err();
    assert!(matches!(err, RuntimeError::TimedOut(100)));
}

#[tokio::test]
async fn test_query_and_resolve() {
    let container = deployed().await;
    add_farmer(&container, "bob").await;
    let owned = json!({
        "$class": "org.acme.Sheep",
        "sheepId": "1",
        "owner": "resource:org.acme.Farmer#bob"
    })
    .to_string();
    invoke(&container, "addResourceToRegistry", &["Asset", "org.acme.Sheep", &owned])
        .await
        .unwrap();
    invoke(&container, "addResourceToRegistry", &["Asset", "org.acme.Sheep", &sheep("2", "pen")])
        .await
        .unwrap();

    let selector = json!({ "owner": "resource:org.acme.Farmer#bob" }).to_string();
    let matched = query(&container, "executeQuery", &["Asset", "org.acme.Sheep", &selector])
        .await
        .unwrap();
    assert_eq!(matched.as_array().unwrap().len(), 1);
    assert_eq!(matched[0]["sheepId"], "1");

    let resolved = query(&container, "resolveResourceInRegistry", &["Asset", "org.acme.Sheep", "1"])
        .await
        .unwrap();
    assert_eq!(resolved["owner"]["farmerId"], "bob");
}

#[tokio::test]
async fn test_log_level_functions() {
    let container = deployed().await;
    let logging = container.logging_service();
    assert!(logging.is_installed(), "{logging:?}");
    assert_eq!(query(&container, "getLogLevel", &[]).await.unwrap(), json!("info"));

    invoke(&container, "setLogLevel", &["debug"]).await.unwrap();
    assert_eq!(query(&container, "getLogLevel", &[]).await.unwrap(), json!("debug"));
    assert_eq!(logging.active_filter().as_deref(), Some("debug"));

    assert!(invoke(&container, "setLogLevel", &["ledger_runtime=verbose"]).await.is_err());
    assert_eq!(logging.active_filter().as_deref(), Some("debug"));
    invoke(&container, "setLogLevel", &["info"]).await.unwrap();
}

#[tokio::test]
async fn test_filesystem_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = || {
        ContainerConfig::new("restart").with_storage(StorageConfig::Filesystem {
            root: dir.path().to_path_buf(),
        })
    };

    let first = Container::new(config()).unwrap();
    deploy(&first, &sheep_network()).await;
    invoke(&first, "addResourceToRegistry", &["Asset", "org.acme.Sheep", &sheep("1", "barn")])
        .await
        .unwrap();
    drop(first);

    let second = Container::new(config()).unwrap();
    let stored = query(&second, "getResourceInRegistry", &["Asset", "org.acme.Sheep", "1"])
        .await
        .unwrap();
    assert_eq!(stored["location"], "barn");
    let network = query(&second, "getBusinessNetwork", &[]).await.unwrap();
    assert_eq!(network["hash"], json!(hash_archive(&sheep_network())));
}
