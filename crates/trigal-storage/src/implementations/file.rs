//! File-based storage backend.
//!
//! Each document lives in its own file under `<storage_path>/<namespace>/`.
//! Files start with a fixed header that records an optional expiry, followed
//! by the raw document bytes.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::AsyncReadExt;
use trigal_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, StorageKey, ValidationError,
};

const DOCUMENT_EXTENSION: &str = "doc";
const DEFAULT_STORAGE_PATH: &str = "./data/trigal";

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Fixed-size document header.
///
/// Layout, 32 bytes:
/// - `[0..4]` magic `TRGL`
/// - `[4..6]` format version, u16 little-endian
/// - `[6..14]` expiry as Unix seconds, u64 little-endian, 0 when permanent
/// - `[14..32]` zero padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DocumentHeader {
	version: u16,
	expires_at: u64,
}

impl DocumentHeader {
	const MAGIC: &'static [u8; 4] = b"TRGL";
	const VERSION: u16 = 1;
	const SIZE: usize = 32;

	fn with_ttl(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0
		} else {
			unix_now().saturating_add(ttl.as_secs().max(1))
		};
		Self {
			version: Self::VERSION,
			expires_at,
		}
	}

	fn encode(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.expires_at.to_le_bytes());
		bytes
	}

	fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE || &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Missing document header".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported document version: {}",
				version
			)));
		}

		let mut expires = [0u8; 8];
		expires.copy_from_slice(&bytes[6..14]);
		Ok(Self {
			version,
			expires_at: u64::from_le_bytes(expires),
		})
	}

	fn is_expired(&self) -> bool {
		self.expires_at != 0 && unix_now() >= self.expires_at
	}
}

/// Default time-to-live per collection, configured as `ttl_<collection>` seconds.
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
	ttls: HashMap<StorageKey, Duration>,
}

impl TtlConfig {
	fn from_config(config: &toml::Value) -> Self {
		let ttls = StorageKey::all()
			.filter_map(|key| {
				config
					.get(format!("ttl_{}", key.as_str()))
					.and_then(|v| v.as_integer())
					.filter(|secs| *secs > 0)
					.map(|secs| (key, Duration::from_secs(secs as u64)))
			})
			.collect();
		Self { ttls }
	}

	fn ttl_for_namespace(&self, namespace: &str) -> Duration {
		namespace
			.parse::<StorageKey>()
			.ok()
			.and_then(|key| self.ttls.get(&key).copied())
			.unwrap_or(Duration::ZERO)
	}
}

/// File-based storage implementation.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// concurrent reader never observes a half-written document.
pub struct FileStorage {
	base_path: PathBuf,
	ttl_config: TtlConfig,
}

impl FileStorage {
	pub fn new(base_path: PathBuf, ttl_config: TtlConfig) -> Self {
		Self {
			base_path,
			ttl_config,
		}
	}

	/// Splits `namespace:id` into its parts. Keys without a namespace land in `_`.
	fn split_key(key: &str) -> (&str, &str) {
		key.split_once(':').unwrap_or(("_", key))
	}

	fn sanitize(component: &str) -> String {
		component.replace(['/', '\\', ':', '.'], "_")
	}

	fn document_path(&self, key: &str) -> PathBuf {
		let (namespace, id) = Self::split_key(key);
		self.base_path
			.join(Self::sanitize(namespace))
			.join(format!("{}.{}", Self::sanitize(id), DOCUMENT_EXTENSION))
	}

	async fn read_document(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
		let data = match fs::read(path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let header = DocumentHeader::decode(&data)?;
		if header.is_expired() {
			return Ok(None);
		}
		Ok(Some(data[DocumentHeader::SIZE..].to_vec()))
	}

	async fn read_header(path: &Path) -> Option<DocumentHeader> {
		let mut file = fs::File::open(path).await.ok()?;
		let mut bytes = [0u8; DocumentHeader::SIZE];
		file.read_exact(&mut bytes).await.ok()?;
		DocumentHeader::decode(&bytes).ok()
	}

	async fn namespace_dirs(&self) -> Result<Vec<(String, PathBuf)>, StorageError> {
		let mut dirs = Vec::new();
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(dirs),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.is_dir() {
				if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
					dirs.push((name.to_string(), path.clone()));
				}
			}
		}
		Ok(dirs)
	}

	/// Returns `(id, path)` for every document file in a namespace directory.
	async fn documents_in(dir: &Path) -> Result<Vec<(String, PathBuf)>, StorageError> {
		let mut documents = Vec::new();
		let mut entries = match fs::read_dir(dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(documents),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
				continue;
			}
			if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
				documents.push((id.to_string(), path.clone()));
			}
		}
		Ok(documents)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		Self::read_document(&self.document_path(key))
			.await?
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let path = self.document_path(key);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let (namespace, _) = Self::split_key(key);
		let ttl = ttl.unwrap_or_else(|| self.ttl_config.ttl_for_namespace(namespace));

		let mut contents = Vec::with_capacity(DocumentHeader::SIZE + value.len());
		contents.extend_from_slice(&DocumentHeader::with_ttl(ttl).encode());
		contents.extend_from_slice(&value);

		let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
		fs::write(&temp_path, contents)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		if let Err(e) = fs::rename(&temp_path, &path).await {
			let _ = fs::remove_file(&temp_path).await;
			return Err(StorageError::Backend(e.to_string()));
		}

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.document_path(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.document_path(key);
		if !path.exists() {
			return Ok(false);
		}
		Ok(Self::read_header(&path)
			.await
			.is_some_and(|header| !header.is_expired()))
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let (namespace_filter, id_prefix) = match prefix.split_once(':') {
			Some((namespace, id_prefix)) => (Some(Self::sanitize(namespace)), id_prefix),
			None => (None, ""),
		};

		let mut keys = Vec::new();
		for (namespace, dir) in self.namespace_dirs().await? {
			let matches_namespace = match &namespace_filter {
				Some(wanted) => *wanted == namespace,
				None => namespace.starts_with(prefix),
			};
			if !matches_namespace {
				continue;
			}

			for (id, path) in Self::documents_in(&dir).await? {
				if !id.starts_with(id_prefix) {
					continue;
				}
				if Self::read_header(&path)
					.await
					.is_some_and(|header| !header.is_expired())
				{
					keys.push(format!("{}:{}", namespace, id));
				}
			}
		}

		Ok(keys)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let mut removed = 0;
		for (_, dir) in self.namespace_dirs().await? {
			for (_, path) in Self::documents_in(&dir).await? {
				let Some(header) = Self::read_header(&path).await else {
					tracing::debug!(path = ?path, "Skipping file without document header");
					continue;
				};
				if !header.is_expired() {
					continue;
				}
				match fs::remove_file(&path).await {
					Ok(()) => removed += 1,
					Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to remove expired document"),
				}
			}
		}
		Ok(removed)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let mut optional = vec![Field::new("storage_path", FieldType::String)];
		optional.extend(StorageKey::all().map(|key| {
			Field::new(
				format!("ttl_{}", key.as_str()),
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			)
		}));

		Schema::new(vec![], optional).validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: "./data/trigal")
/// - `ttl_orders`, `ttl_users`, `ttl_branches`: default expiry in seconds (0 = never)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(
		PathBuf::from(storage_path),
		TtlConfig::from_config(config),
	)))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn storage(dir: &TempDir) -> FileStorage {
		FileStorage::new(dir.path().to_path_buf(), TtlConfig::default())
	}

	#[test]
	fn test_header_encoding() {
		let header = DocumentHeader::with_ttl(Duration::ZERO);
		let decoded = DocumentHeader::decode(&header.encode()).unwrap();
		assert_eq!(decoded, header);
		assert!(!decoded.is_expired());

		assert!(DocumentHeader::decode(b"{\"id\":\"plain json\"}").is_err());
	}

	#[tokio::test]
	async fn test_basic_operations() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);

		storage
			.set_bytes("orders:o-1", b"payload".to_vec(), None)
			.await
			.unwrap();
		assert!(dir.path().join("orders").join("o-1.doc").exists());
		assert_eq!(storage.get_bytes("orders:o-1").await.unwrap(), b"payload");
		assert!(storage.exists("orders:o-1").await.unwrap());

		storage.delete("orders:o-1").await.unwrap();
		assert!(!storage.exists("orders:o-1").await.unwrap());
		assert!(matches!(
			storage.get_bytes("orders:o-1").await,
			Err(StorageError::NotFound)
		));
		storage.delete("orders:o-1").await.unwrap();
	}

	#[tokio::test]
	async fn test_list_keys_round_trips_namespace() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);
		for key in ["orders:a", "orders:b", "branches:plant-1"] {
			storage.set_bytes(key, vec![0], None).await.unwrap();
		}

		let mut keys = storage.list_keys("orders:").await.unwrap();
		keys.sort();
		assert_eq!(keys, vec!["orders:a", "orders:b"]);
		assert_eq!(
			storage.list_keys("branches:").await.unwrap(),
			vec!["branches:plant-1"]
		);
		assert!(storage.list_keys("users:").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_expired_documents() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);

		let path = storage.document_path("orders:stale");
		fs::create_dir_all(path.parent().unwrap()).await.unwrap();
		let header = DocumentHeader {
			version: DocumentHeader::VERSION,
			expires_at: unix_now() - 10,
		};
		let mut contents = header.encode().to_vec();
		contents.extend_from_slice(b"old");
		fs::write(&path, contents).await.unwrap();
		storage
			.set_bytes("orders:fresh", b"new".to_vec(), None)
			.await
			.unwrap();

		assert!(matches!(
			storage.get_bytes("orders:stale").await,
			Err(StorageError::NotFound)
		));
		assert_eq!(storage.list_keys("orders:").await.unwrap(), vec!["orders:fresh"]);
		assert_eq!(storage.cleanup_expired().await.unwrap(), 1);
		assert!(!path.exists());
	}

	#[test]
	fn test_schema_rejects_negative_ttl() {
		let config: toml::Value = toml::from_str("ttl_orders = -5").unwrap();
		assert!(FileStorageSchema.validate(&config).is_err());
		assert!(create_storage(&config).is_err());

		let config: toml::Value =
			toml::from_str("storage_path = \"/tmp/trigal\"\nttl_orders = 60").unwrap();
		assert!(create_storage(&config).is_ok());
	}
}
