//! Issuer and agent persistence as one JSON file per record.
//!
//! ```text
//! {base_dir}/
//! ├── issuers/
//! │   └── {did_key}.json
//! └── agents/
//!     └── {did_key}.json
//! ```
//!
//! `did_key` is the first 32 hex chars of the DID's SHA-256, so any DID maps
//! to a safe file name. File format:
//! ```json
//! { "version": 1, "record": { ... Issuer or Agent ... } }
//! ```

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::crypto::digest::did_key;
use crate::error::{Result, TrustError};
use crate::index::{AgentRepository, IssuerRepository};
use crate::issuer::{Agent, Issuer};

// ── File format constants ─────────────────────────────────────────────────────

const RECORD_FILE_VERSION: u32 = 1;

const ISSUERS_DIR: &str = "issuers";
const AGENTS_DIR: &str = "agents";

// ── On-disk structures ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct RecordFile<T> {
    version: u32,
    record: T,
}

// ── RecordDir ─────────────────────────────────────────────────────────────────

/// A directory of versioned JSON records keyed by DID.
#[derive(Debug)]
struct RecordDir<T> {
    dir: PathBuf,
    kind: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> RecordDir<T> {
    fn open(dir: PathBuf, kind: &'static str) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            kind,
            _marker: PhantomData,
        })
    }

    fn path(&self, did: &str) -> PathBuf {
        self.dir.join(format!("{}.json", did_key(did)))
    }

    fn get(&self, did: &str) -> Result<Option<T>> {
        let path = self.path(did);
        if !path.exists() {
            return Ok(None);
        }
        self.read(&path).map(Some)
    }

    /// Returns whether no record existed for `did` before.
    fn put(&self, did: &str, record: &T) -> Result<bool> {
        let file = RecordFile {
            version: RECORD_FILE_VERSION,
            record,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| TrustError::SerializationError(e.to_string()))?;
        let path = self.path(did);
        let created = !path.exists();
        write_atomic(&path, json.as_bytes())?;
        Ok(created)
    }

    fn remove(&self, did: &str) -> Result<bool> {
        let path = self.path(did);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }

    fn list(&self) -> Result<Vec<T>> {
        self.record_paths()?
            .iter()
            .map(|path| self.read(path))
            .collect()
    }

    fn count(&self) -> Result<usize> {
        Ok(self.record_paths()?.len())
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn read(&self, path: &Path) -> Result<T> {
        let bytes = std::fs::read(path)?;
        let file: RecordFile<T> = serde_json::from_slice(&bytes).map_err(|e| {
            TrustError::InvalidFileFormat(format!(
                "failed to parse {} file {}: {e}",
                self.kind,
                path.display()
            ))
        })?;
        if file.version != RECORD_FILE_VERSION {
            return Err(TrustError::InvalidFileFormat(format!(
                "unsupported {} file version {} in {}",
                self.kind,
                file.version,
                path.display()
            )));
        }
        Ok(file.record)
    }
}

/// Write to a sibling temp file, then rename into place.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

// ── Repositories ──────────────────────────────────────────────────────────────

/// Filesystem-backed [`IssuerRepository`] under `{base_dir}/issuers/`.
#[derive(Debug)]
pub struct FileIssuerRepository {
    records: RecordDir<Issuer>,
}

impl FileIssuerRepository {
    /// Open (creating if needed) the issuer directory under `base_dir`.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            records: RecordDir::open(base_dir.as_ref().join(ISSUERS_DIR), "issuer")?,
        })
    }
}

impl IssuerRepository for FileIssuerRepository {
    fn get(&self, did: &str) -> Result<Option<Issuer>> {
        self.records.get(did)
    }

    fn put(&self, issuer: &Issuer) -> Result<bool> {
        self.records.put(&issuer.did, issuer)
    }

    fn remove(&self, did: &str) -> Result<bool> {
        self.records.remove(did)
    }

    fn list(&self) -> Result<Vec<Issuer>> {
        let mut all = self.records.list()?;
        all.sort_by(|a, b| a.did.cmp(&b.did));
        Ok(all)
    }

    fn len(&self) -> Result<usize> {
        self.records.count()
    }
}

/// Filesystem-backed [`AgentRepository`] under `{base_dir}/agents/`.
#[derive(Debug)]
pub struct FileAgentRepository {
    records: RecordDir<Agent>,
}

impl FileAgentRepository {
    /// Open (creating if needed) the agent directory under `base_dir`.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            records: RecordDir::open(base_dir.as_ref().join(AGENTS_DIR), "agent")?,
        })
    }
}

impl AgentRepository for FileAgentRepository {
    fn get(&self, did: &str) -> Result<Option<Agent>> {
        self.records.get(did)
    }

    fn put(&self, agent: &Agent) -> Result<bool> {
        self.records.put(&agent.did, agent)
    }

    fn remove(&self, did: &str) -> Result<bool> {
        self.records.remove(did)
    }

    fn list(&self) -> Result<Vec<Agent>> {
        let mut all = self.records.list()?;
        all.sort_by(|a, b| a.did.cmp(&b.did));
        Ok(all)
    }

    fn len(&self) -> Result<usize> {
        self.records.count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
