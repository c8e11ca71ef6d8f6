//! File-backed registries.
//!
//! Each registry keeps an append-only JSON-lines log. The log is replayed
//! into memory when the registry is opened; reads are served from memory and
//! every mutation is appended and flushed before it becomes visible.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fl_core::Token;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::RegistryResult;
use crate::revocation::RevocationRegistry;
use crate::token::TokenRegistry;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum TokenRecord {
    Put { token: Token },
    Remove { id: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct RevocationRecord {
    id: String,
    revoked_at: DateTime<Utc>,
}

/// Appends one JSON record per line and flushes.
#[derive(Debug)]
struct AppendLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AppendLog {
    fn open(path: &Path) -> RegistryResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::drop_torn_tail(path, &file)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Cuts an unterminated final record left by an interrupted write, so
    /// the next append starts on a line of its own.
    fn drop_torn_tail(path: &Path, file: &File) -> RegistryResult<()> {
        let content = std::fs::read(path)?;
        if matches!(content.last(), None | Some(b'\n')) {
            return Ok(());
        }

        let keep = content.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        warn!(
            path = %path.display(),
            discarded_bytes = content.len() - keep,
            "truncating torn registry record"
        );
        file.set_len(keep as u64)?;
        Ok(())
    }

    fn append<T: Serialize>(&self, record: &T) -> RegistryResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Reads every well-formed record. Malformed lines are skipped with a
    /// warning so a torn final write does not make the log unreadable; the
    /// torn tail itself is cut when the log is opened for appending.
    fn replay<T: for<'de> Deserialize<'de>>(path: &Path) -> RegistryResult<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    path = %path.display(),
                    line = number + 1,
                    error = %e,
                    "skipping malformed registry record"
                ),
            }
        }
        Ok(records)
    }
}

/// Issued-token registry backed by an append-only log file.
#[derive(Debug)]
pub struct FileTokenRegistry {
    tokens: DashMap<String, Token>,
    log: AppendLog,
}

impl FileTokenRegistry {
    /// Opens the registry, replaying the log at `path` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or opened for appending.
    pub fn open(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let tokens = DashMap::new();

        for record in AppendLog::replay::<TokenRecord>(path)? {
            match record {
                TokenRecord::Put { token } => {
                    tokens.insert(token.id.clone(), token);
                }
                TokenRecord::Remove { id } => {
                    tokens.remove(&id);
                }
            }
        }

        info!(path = %path.display(), tokens = tokens.len(), "token registry loaded");

        Ok(Self {
            tokens,
            log: AppendLog::open(path)?,
        })
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.log.path
    }
}

#[async_trait]
impl TokenRegistry for FileTokenRegistry {
    async fn put(&self, id: &str, token: &Token) -> RegistryResult<()> {
        let mut token = token.clone();
        token.id = id.to_string();
        self.log.append(&TokenRecord::Put {
            token: token.clone(),
        })?;
        self.tokens.insert(id.to_string(), token);
        Ok(())
    }

    async fn get(&self, id: &str) -> RegistryResult<Option<Token>> {
        Ok(self.tokens.get(id).map(|entry| entry.value().clone()))
    }

    async fn remove(&self, id: &str) -> RegistryResult<()> {
        if self.tokens.remove(id).is_some() {
            self.log.append(&TokenRecord::Remove { id: id.to_string() })?;
        }
        Ok(())
    }

    async fn len(&self) -> RegistryResult<usize> {
        Ok(self.tokens.len())
    }
}

/// Revocation registry backed by an append-only log file.
#[derive(Debug)]
pub struct FileRevocationRegistry {
    revoked: DashMap<String, DateTime<Utc>>,
    log: AppendLog,
}

impl FileRevocationRegistry {
    /// Opens the registry, replaying the log at `path` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or opened for appending.
    pub fn open(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let revoked = DashMap::new();

        for record in AppendLog::replay::<RevocationRecord>(path)? {
            revoked.entry(record.id).or_insert(record.revoked_at);
        }

        info!(path = %path.display(), revoked = revoked.len(), "revocation registry loaded");

        Ok(Self {
            revoked,
            log: AppendLog::open(path)?,
        })
    }
}

#[async_trait]
impl RevocationRegistry for FileRevocationRegistry {
    async fn revoke(&self, id: &str) -> RegistryResult<()> {
        // The entry guard serializes concurrent revocations of the same ID,
        // so exactly one of them writes the record.
        match self.revoked.entry(id.to_string()) {
            dashmap::Entry::Occupied(_) => {
                debug!(token_id = %id, "token already revoked");
            }
            dashmap::Entry::Vacant(vacant) => {
                let revoked_at = Utc::now();
                self.log.append(&RevocationRecord {
                    id: id.to_string(),
                    revoked_at,
                })?;
                vacant.insert(revoked_at);
            }
        }
        Ok(())
    }

    async fn is_revoked(&self, id: &str) -> RegistryResult<bool> {
        Ok(self.revoked.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use fl_core::QName;

    use super::*;

    fn token(id: &str) -> Token {
        Token {
            id: id.to_string(),
            token_type: "urn:x".to_string(),
            service: Some("https://rp.example.com".to_string()),
            family: "test".to_string(),
            element: QName::new("urn:test", "Token"),
            payload: "<Token/>".to_string(),
            created: Utc::now(),
            expires: None,
        }
    }

    #[tokio::test]
    async fn tokens_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.log");

        {
            let registry = FileTokenRegistry::open(&path).unwrap();
            registry.put("a", &token("a")).await.unwrap();
            registry.put("b", &token("b")).await.unwrap();
            registry.remove("a").await.unwrap();
        }

        let registry = FileTokenRegistry::open(&path).unwrap();
        assert!(registry.get("a").await.unwrap().is_none());
        assert_eq!(registry.get("b").await.unwrap().unwrap().payload, "<Token/>");
        assert_eq!(registry.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn revocations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("revoked.log");

        {
            let registry = FileRevocationRegistry::open(&path).unwrap();
            registry.revoke("a").await.unwrap();
            registry.revoke("a").await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);

        let registry = FileRevocationRegistry::open(&path).unwrap();
        assert!(registry.is_revoked("a").await.unwrap());
        assert!(!registry.is_revoked("b").await.unwrap());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revoked.log");
        std::fs::write(
            &path,
            "{\"id\":\"a\",\"revoked_at\":\"2024-01-01T00:00:00Z\"}\n{\"id\":\"b\",\"rev",
        )
        .unwrap();

        let registry = FileRevocationRegistry::open(&path).unwrap();
        assert!(registry.is_revoked("a").await.unwrap());
        assert!(!registry.is_revoked("b").await.unwrap());
    }

    #[tokio::test]
    async fn revocation_after_torn_tail_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revoked.log");
        std::fs::write(
            &path,
            "{\"id\":\"a\",\"revoked_at\":\"2024-01-01T00:00:00Z\"}\n{\"id\":\"b\",\"rev",
        )
        .unwrap();

        {
            let registry = FileRevocationRegistry::open(&path).unwrap();
            registry.revoke("c").await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));

        let registry = FileRevocationRegistry::open(&path).unwrap();
        assert!(registry.is_revoked("a").await.unwrap());
        assert!(!registry.is_revoked("b").await.unwrap());
        assert!(registry.is_revoked("c").await.unwrap());
    }

    #[tokio::test]
    async fn token_put_after_torn_tail_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.log");
        std::fs::write(&path, "{\"op\":\"put\",\"tok").unwrap();

        {
            let registry = FileTokenRegistry::open(&path).unwrap();
            registry.put("a", &token("a")).await.unwrap();
        }

        let registry = FileTokenRegistry::open(&path).unwrap();
        assert!(registry.get("a").await.unwrap().is_some());
        assert_eq!(registry.len().await.unwrap(), 1);
    }
}
