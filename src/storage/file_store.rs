use crate::contracts::record::ContractRecord;
use crate::storage::storage_trait::{ContractStore, StorageError};
use crate::types::address::Address;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

/// [`ContractStore`] keeping one JSON file per contract under a directory.
///
/// Files are named `<address>.json`. Writes go to a temporary file that is
/// then renamed over the target, so a reader never sees a half-written record.
#[derive(Clone, Debug)]
pub struct FileContractStore {
    dir: PathBuf,
}

impl FileContractStore {
    /// Opens (creating if needed) the store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, address: &Address) -> PathBuf {
        self.dir.join(format!("{address}.{EXTENSION}"))
    }

    fn read(&self, path: &Path) -> Result<Option<ContractRecord>, StorageError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Persistence(format!("{}: {e}", path.display()))
}

impl ContractStore for FileContractStore {
    fn persist(&self, record: &ContractRecord) -> Result<(), StorageError> {
        let path = self.path_for(&record.address);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        let bytes = serde_json::to_vec_pretty(record).map_err(|e| StorageError::Persistence(e.to_string()))?;
        fs::write(&tmp, bytes).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))
    }

    fn retrieve(&self, address: &Address) -> Result<Option<ContractRecord>, StorageError> {
        self.read(&self.path_for(address))
    }

    fn retrieve_all(&self) -> Result<Vec<ContractRecord>, StorageError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        let mut records = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(record) = self.read(&path)? {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.address);
        Ok(records)
    }

    fn remove(&self, address: &Address) -> Result<Option<ContractRecord>, StorageError> {
        let path = self.path_for(address);
        let record = self.read(&path)?;
        if record.is_some() {
            fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
        }
        Ok(record)
    }
}
