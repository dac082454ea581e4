//! Business network archives.
//!
//! An archive is a zip file:
//!
//! ```text
//! package.json        { "name", "version", "description"? }
//! models/*.json       model files
//! lib/*.json          script descriptors: { "functions": [{ "name", "transaction"? }] }
//! ```
//!
//! Scripts are discovered in archive path order.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::model::{Introspector, ModelFile};

const PACKAGE_FILE: &str = "package.json";
const MODELS_DIR: &str = "models/";
const SCRIPTS_DIR: &str = "lib/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A function exported by a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptFunction {
    pub name: String,
    /// Transaction type handled; when absent the `on<Type>` name applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

impl ScriptFunction {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transaction: None,
        }
    }

    pub fn for_transaction(name: &str, transaction: &str) -> Self {
        Self {
            name: name.to_string(),
            transaction: Some(transaction.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptDescriptor {
    #[serde(default)]
    pub functions: Vec<ScriptFunction>,
}

/// A script and the archive path it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub identifier: String,
    pub functions: Vec<ScriptFunction>,
}

/// A parsed business network.
#[derive(Debug, Clone)]
pub struct BusinessNetworkDefinition {
    package: PackageInfo,
    models: Vec<ModelFile>,
    scripts: Vec<Script>,
    introspector: Arc<Introspector>,
}

impl BusinessNetworkDefinition {
    pub fn new(package: PackageInfo, models: Vec<ModelFile>, scripts: Vec<Script>) -> Result<Self> {
        let introspector = Arc::new(Introspector::new(&models)?);
        Ok(Self {
            package,
            models,
            scripts,
            introspector,
        })
    }

    /// Parse a zip archive.
    pub fn from_archive(bytes: &[u8]) -> Result<Self> {
        let files = extract_zip(bytes)?;

        let package: PackageInfo = files
            .get(PACKAGE_FILE)
            .ok_or_else(|| RuntimeError::Archive(format!("missing {PACKAGE_FILE}")))
            .and_then(|data| parse_entry(PACKAGE_FILE, data))?;

        let mut models = Vec::new();
        let mut scripts = Vec::new();
        for (path, data) in &files {
            if !path.ends_with(".json") {
                continue;
            }
            if path.starts_with(MODELS_DIR) {
                models.push(parse_entry::<ModelFile>(path, data)?);
            } else if path.starts_with(SCRIPTS_DIR) {
                let descriptor: ScriptDescriptor = parse_entry(path, data)?;
                scripts.push(Script {
                    identifier: path.clone(),
                    functions: descriptor.functions,
                });
            }
        }

        debug!(
            name = %package.name,
            version = %package.version,
            models = models.len(),
            scripts = scripts.len(),
            "Business network archive parsed"
        );
        Self::new(package, models, scripts)
    }

    /// Decode a base64 archive payload.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::from_archive(&decode_archive(encoded)?)
    }

    /// Write the definition back out as an archive.
    pub fn to_archive(&self) -> Result<Vec<u8>> {
        let mut builder = ArchiveBuilder::from_package(self.package.clone());
        for model in &self.models {
            builder = builder.model(model.clone());
        }
        for script in &self.scripts {
            let name = script
                .identifier
                .trim_start_matches(SCRIPTS_DIR)
                .trim_end_matches(".json")
                .to_string();
            builder = builder.script(
                &name,
                ScriptDescriptor {
                    functions: script.functions.clone(),
                },
            );
        }
        builder.build()
    }

    /// `name@version`
    pub fn identifier(&self) -> String {
        format!("{}@{}", self.package.name, self.package.version)
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn version(&self) -> &str {
        &self.package.version
    }

    pub fn description(&self) -> Option<&str> {
        self.package.description.as_deref()
    }

    pub fn introspector(&self) -> Arc<Introspector> {
        self.introspector.clone()
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }
}

/// Hash identifying an archive: hex SHA-256 of the base64 payload as stored.
pub fn hash_archive(encoded: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn decode_archive(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| RuntimeError::Archive(format!("invalid base64: {e}")))
}

pub fn encode_archive(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn extract_zip(data: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    let zip_err = |e: zip::result::ZipError| RuntimeError::Archive(e.to_string());
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).map_err(zip_err)?;
    let mut files = BTreeMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(zip_err)?;
        if file.is_file() {
            let name = file.name().trim_start_matches('/').to_string();
            if !name.is_empty() {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)
                    .map_err(|e| RuntimeError::Archive(e.to_string()))?;
                files.insert(name, contents);
            }
        }
    }

    Ok(files)
}

fn parse_entry<T: serde::de::DeserializeOwned>(path: &str, data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| RuntimeError::Archive(format!("{path}: {e}")))
}

/// Builds business network archives.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    package: PackageInfo,
    models: Vec<ModelFile>,
    scripts: Vec<(String, ScriptDescriptor)>,
}

impl ArchiveBuilder {
    pub fn new(name: &str, version: &str) -> Self {
        Self::from_package(PackageInfo {
            name: name.to_string(),
            version: version.to_string(),
            description: None,
        })
    }

    fn from_package(package: PackageInfo) -> Self {
        Self {
            package,
            models: Vec::new(),
            scripts: Vec::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.package.description = Some(description.to_string());
        self
    }

    pub fn model(mut self, model: ModelFile) -> Self {
        self.models.push(model);
        self
    }

    /// Add `lib/{name}.json`.
    pub fn script(mut self, name: &str, descriptor: ScriptDescriptor) -> Self {
        self.scripts.push((name.to_string(), descriptor));
        self
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        let zip_err = |e: zip::result::ZipError| RuntimeError::Archive(e.to_string());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

        let mut entries: Vec<(String, Vec<u8>)> =
            vec![(PACKAGE_FILE.to_string(), serde_json::to_vec_pretty(&self.package)?)];
        for (index, model) in self.models.iter().enumerate() {
            entries.push((
                format!("{MODELS_DIR}{:02}-{}.json", index, model.namespace),
                serde_json::to_vec_pretty(model)?,
            ));
        }
        for (name, descriptor) in &self.scripts {
            entries.push((
                format!("{SCRIPTS_DIR}{name}.json"),
                serde_json::to_vec_pretty(descriptor)?,
            ));
        }

        for (path, data) in entries {
            writer.start_file(path, options).map_err(zip_err)?;
            writer
                .write_all(&data)
                .map_err(|e| RuntimeError::Archive(e.to_string()))?;
        }
        Ok(writer.finish().map_err(zip_err)?.into_inner())
    }

    /// The archive as a base64 payload.
    pub fn build_base64(&self) -> Result<String> {
        Ok(encode_archive(&self.build()?))
    }
}
