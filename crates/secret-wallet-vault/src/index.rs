//! Metadata index.
//!
//! Secure storage cannot be enumerated, so the vault keeps its own list of
//! what it has stored: one JSON array in a single file, readable only by the
//! owner, rewritten whole on every change.
//!
//! All reads and read-modify-write cycles in this process go through one
//! global lock. Nothing coordinates separate processes beyond the atomic
//! rename, so two processes mutating at once can lose an update.
//!
//! A file that cannot be read or decoded is treated as an empty index. The
//! secrets themselves stay in secure storage, so a damaged index must not
//! lock the user out of the vault.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, VaultError};
use crate::types::SecretMetadata;

static INDEX_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Handle to the metadata index file.
#[derive(Debug, Clone)]
pub struct MetadataIndex {
    path: PathBuf,
}

impl MetadataIndex {
    /// Point at an index file. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, in stored order. Always re-reads the file.
    pub fn list(&self) -> Vec<SecretMetadata> {
        let _guard = INDEX_LOCK.lock();
        self.load().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "metadata index unreadable, treating as empty");
            Vec::new()
        })
    }

    /// Look up one entry by name.
    pub fn find(&self, name: &str) -> Option<SecretMetadata> {
        self.list().into_iter().find(|m| m.name == name)
    }

    /// Insert `metadata`, replacing an entry with the same name in place.
    pub fn upsert(&self, metadata: SecretMetadata) -> Result<()> {
        let _guard = INDEX_LOCK.lock();
        let mut all = self.load_for_update();

        match all.iter().position(|m| m.name == metadata.name) {
            Some(pos) => {
                debug!(name = %metadata.name, "replacing metadata entry");
                let name = metadata.name.clone();
                all[pos] = metadata;
                // Drop any later duplicates a hand edit may have introduced.
                let mut index = 0;
                all.retain(|m| {
                    let keep = m.name != name || index == pos;
                    index += 1;
                    keep
                });
            }
            None => {
                debug!(name = %metadata.name, "adding metadata entry");
                all.push(metadata);
            }
        }

        self.write_all(&all)
    }

    /// Remove the entry called `name`. Removing an absent name is not an error.
    pub fn remove(&self, name: &str) -> Result<()> {
        let _guard = INDEX_LOCK.lock();
        let mut all = self.load_for_update();
        let before = all.len();
        all.retain(|m| m.name != name);
        if all.len() == before {
            debug!(name, "no metadata entry to remove");
            return Ok(());
        }
        self.write_all(&all)
    }

    fn load(&self) -> Result<Vec<SecretMetadata>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(VaultError::IndexCorrupted(format!("unreadable: {e}"))),
        };
        serde_json::from_slice(&bytes).map_err(|e| VaultError::IndexCorrupted(e.to_string()))
    }

    /// Load before a rewrite. A corrupt file is copied aside first so the
    /// rewrite does not destroy what a user might still recover by hand.
    fn load_for_update(&self) -> Vec<SecretMetadata> {
        match self.load() {
            Ok(all) => all,
            Err(e) => {
                let backup = sibling(&self.path, "corrupt");
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "metadata index unreadable, starting from empty"
                );
                if let Err(copy_err) = fs::copy(&self.path, &backup) {
                    warn!(error = %copy_err, "could not preserve corrupt metadata index");
                } else if let Err(perm_err) = restrict_file(&backup) {
                    warn!(error = %perm_err, "could not restrict corrupt index backup");
                }
                Vec::new()
            }
        }
    }

    fn write_all(&self, items: &[SecretMetadata]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                restrict_dir(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(items)?;
        let temp = sibling(&self.path, &format!("{}.tmp", std::process::id()));

        let written = (|| -> std::io::Result<()> {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut file = options.open(&temp)?;
            file.write_all(&json)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp, &self.path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        restrict_file(&self.path)?;
        debug!(path = %self.path.display(), entries = items.len(), "metadata index written");
        Ok(())
    }
}

/// `metadata.json` -> `metadata.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn restrict_file(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn restrict_dir(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_index() -> (MetadataIndex, TempDir) {
        let tmp = TempDir::new().unwrap();
        let index = MetadataIndex::new(tmp.path().join("metadata.json"));
        (index, tmp)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (index, _tmp) = test_index();
        assert!(index.list().is_empty());
        assert!(!index.path().exists());
    }

    #[test]
    fn test_upsert_appends_in_order() {
        let (index, _tmp) = test_index();
        index.upsert(SecretMetadata::new("a", "A_KEY")).unwrap();
        index.upsert(SecretMetadata::new("b", "B_KEY")).unwrap();
        index.upsert(SecretMetadata::new("c", "C_KEY")).unwrap();

        let names: Vec<_> = index.list().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let (index, _tmp) = test_index();
        index.upsert(SecretMetadata::new("a", "A_KEY")).unwrap();
        index.upsert(SecretMetadata::new("b", "B_KEY")).unwrap();
        index
            .upsert(SecretMetadata::new("a", "NEW_A").biometric(true))
            .unwrap();

        let all = index.list();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "a");
        assert_eq!(all[0].env_name, "NEW_A");
        assert!(all[0].biometric_required);
        assert_eq!(all[1].name, "b");
    }

    #[test]
    fn test_upsert_collapses_duplicates() {
        let (index, _tmp) = test_index();
        fs::write(
            index.path(),
            r#"[{"name":"a","envName":"A1","biometricRequired":false},
                {"name":"b","envName":"B","biometricRequired":false},
                {"name":"a","envName":"A2","biometricRequired":false}]"#,
        )
        .unwrap();

        index.upsert(SecretMetadata::new("a", "A3")).unwrap();
        let all = index.list();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].env_name, "A3");
        assert_eq!(all[1].name, "b");
    }

    #[test]
    fn test_remove() {
        let (index, _tmp) = test_index();
        index.upsert(SecretMetadata::new("a", "A_KEY")).unwrap();
        index.upsert(SecretMetadata::new("b", "B_KEY")).unwrap();

        index.remove("a").unwrap();
        let names: Vec<_> = index.list().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["b"]);

        // Absent name is fine.
        index.remove("zzz").unwrap();
        assert_eq!(index.list().len(), 1);
    }

    #[test]
    fn test_find() {
        let (index, _tmp) = test_index();
        index.upsert(SecretMetadata::new("a", "A_KEY")).unwrap();
        assert_eq!(index.find("a").unwrap().env_name, "A_KEY");
        assert!(index.find("b").is_none());
    }

    #[test]
    fn test_corrupt_file_lists_empty() {
        let (index, _tmp) = test_index();
        fs::write(index.path(), b"{not json").unwrap();
        assert!(index.list().is_empty());
    }

    #[test]
    fn test_corrupt_file_preserved_on_rewrite() {
        let (index, tmp) = test_index();
        fs::write(index.path(), b"{not json").unwrap();

        index.upsert(SecretMetadata::new("a", "A_KEY")).unwrap();

        assert_eq!(index.list().len(), 1);
        let backup = tmp.path().join("metadata.json.corrupt");
        assert_eq!(fs::read(backup).unwrap(), b"{not json");
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let (index, tmp) = test_index();
        index.upsert(SecretMetadata::new("a", "A_KEY")).unwrap();
        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_creates_missing_parent() {
        let tmp = TempDir::new().unwrap();
        let index = MetadataIndex::new(tmp.path().join("nested").join("metadata.json"));
        index.upsert(SecretMetadata::new("a", "A_KEY")).unwrap();
        assert_eq!(index.list().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (index, _tmp) = test_index();
        index.upsert(SecretMetadata::new("a", "A_KEY")).unwrap();

        let mode = fs::metadata(index.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "metadata index should have 0600 permissions");
    }

    #[test]
    fn test_concurrent_upserts_do_not_lose_updates() {
        let (index, _tmp) = test_index();
        let index = Arc::new(index);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    index
                        .upsert(SecretMetadata::new(format!("k{i}"), format!("K{i}")))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(index.list().len(), 8);
    }
}
