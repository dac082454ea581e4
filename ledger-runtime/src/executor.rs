//! Transaction processors and their execution.
//!
//! Processor implementations are registered with the container by function
//! name. When a business network is loaded, the functions its scripts
//! declare are bound to those implementations, giving a
//! [`CompiledScriptBundle`]. Submitting a transaction runs every bound
//! function that handles its type, one after another, in script order.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::Api;
use crate::archive::Script;
use crate::error::{Result, RuntimeError};
use crate::resource::Resource;

/// User transaction logic.
#[async_trait::async_trait]
pub trait TransactionProcessor: Send + Sync {
    async fn process(&self, api: &Api, transaction: &Resource) -> anyhow::Result<()>;
}

/// Processor implementations by function name.
#[derive(Clone, Default)]
pub struct ProcessorTable {
    processors: Arc<DashMap<String, Arc<dyn TransactionProcessor>>>,
}

impl ProcessorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, function: &str, processor: Arc<dyn TransactionProcessor>) {
        self.processors.insert(function.to_string(), processor);
    }

    pub fn get(&self, function: &str) -> Option<Arc<dyn TransactionProcessor>> {
        self.processors.get(function).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// A script function bound to its implementation.
#[derive(Clone)]
pub struct BoundFunction {
    pub script: String,
    pub name: String,
    pub transaction: Option<String>,
    processor: Arc<dyn TransactionProcessor>,
}

impl BoundFunction {
    /// Declared for this transaction type, or undeclared and named `on<Type>`.
    pub fn handles(&self, transaction: &Resource) -> bool {
        match &self.transaction {
            Some(fqn) => *fqn == transaction.fqn(),
            None => self.name == format!("on{}", transaction.type_name),
        }
    }
}

impl std::fmt::Debug for BoundFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundFunction")
            .field("script", &self.script)
            .field("name", &self.name)
            .field("transaction", &self.transaction)
            .finish()
    }
}

/// The bound functions of one business network, in discovery order.
#[derive(Debug, Default)]
pub struct CompiledScriptBundle {
    functions: Vec<BoundFunction>,
    unbound: Vec<String>,
}

impl CompiledScriptBundle {
    pub fn compile(scripts: &[Script], table: &ProcessorTable) -> Self {
        let mut bundle = Self::default();
        for script in scripts {
            for function in &script.functions {
                match table.get(&function.name) {
                    Some(processor) => bundle.functions.push(BoundFunction {
                        script: script.identifier.clone(),
                        name: function.name.clone(),
                        transaction: function.transaction.clone(),
                        processor,
                    }),
                    None => {
                        warn!(script = %script.identifier, function = %function.name, "No processor registered for script function");
                        bundle.unbound.push(function.name.clone());
                    }
                }
            }
        }
        debug!(
            bound = bundle.functions.len(),
            unbound = bundle.unbound.len(),
            "Scripts compiled"
        );
        bundle
    }

    pub fn functions(&self) -> &[BoundFunction] {
        &self.functions
    }

    /// Declared functions that had no registered implementation.
    pub fn unbound(&self) -> &[String] {
        &self.unbound
    }

    pub fn functions_for(&self, transaction: &Resource) -> Vec<&BoundFunction> {
        self.functions
            .iter()
            .filter(|f| f.handles(transaction))
            .collect()
    }
}

/// Runs transactions for one kind of script.
#[async_trait::async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// Kind of script this executor handles.
    fn kind(&self) -> &str;

    /// Run every matching function; returns how many ran.
    async fn execute(
        &self,
        api: &Api,
        scripts: &CompiledScriptBundle,
        transaction: &Resource,
    ) -> Result<usize>;
}

/// Executes processors registered in-process.
#[derive(Debug, Default)]
pub struct NativeTransactionExecutor;

#[async_trait::async_trait]
impl TransactionExecutor for NativeTransactionExecutor {
    fn kind(&self) -> &str {
        "native"
    }

    async fn execute(
        &self,
        api: &Api,
        scripts: &CompiledScriptBundle,
        transaction: &Resource,
    ) -> Result<usize> {
        let functions = scripts.functions_for(transaction);
        for function in &functions {
            debug!(
                function = %function.name,
                script = %function.script,
                transaction = %transaction.fqi(),
                "Executing transaction processor"
            );
            function
                .processor
                .process(api, transaction)
                .await
                .map_err(|source| RuntimeError::Processor {
                    function: function.name.clone(),
                    source,
                })?;
        }
        Ok(functions.len())
    }
}
