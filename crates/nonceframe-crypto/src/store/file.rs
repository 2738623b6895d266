//! Directory-backed key store.
//!
//! One file per identifier, holding the raw key bytes. On Unix the directory
//! is created `0700` and key files are written `0600`. Writes go to a
//! temporary sibling first and are renamed into place, so a crash never
//! leaves a half-written key behind.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use super::{KeyStore, KeyStoreError};

/// Key store rooted at a directory on the local filesystem.
///
/// Clone is cheap (Arc). Clones refer to the same directory.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    root: Arc<PathBuf>,
}

impl FileKeyStore {
    /// Open the store at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `KeyStoreError::Io` if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, KeyStoreError> {
        let root = root.as_ref().to_path_buf();
        create_private_dir(&root)?;

        tracing::debug!("Key store opened at {}", root.display());
        Ok(Self { root: Arc::new(root) })
    }

    /// Directory holding the key files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an identifier to a file path inside the root.
    ///
    /// Identifiers are file names, never paths: anything that could escape
    /// the root directory is rejected.
    fn path_for(&self, identifier: &str) -> Result<PathBuf, KeyStoreError> {
        let escapes = identifier.is_empty()
            || identifier.contains(['/', '\\', '\0'])
            || identifier.contains("..")
            || identifier.starts_with('.');

        if escapes {
            return Err(KeyStoreError::InvalidIdentifier { identifier: identifier.to_string() });
        }

        Ok(self.root.join(identifier))
    }
}

impl KeyStore for FileKeyStore {
    fn exists(&self, identifier: &str) -> bool {
        self.path_for(identifier).is_ok_and(|path| path.is_file())
    }

    fn load(&self, identifier: &str) -> Result<Vec<u8>, KeyStoreError> {
        let path = self.path_for(identifier)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                KeyStoreError::NotFound { identifier: identifier.to_string() }
            },
            _ => KeyStoreError::from(e),
        })
    }

    fn save(&self, identifier: &str, key: &[u8]) -> Result<(), KeyStoreError> {
        let path = self.path_for(identifier)?;
        let staging = self.root.join(format!(".{identifier}.tmp"));

        {
            let mut file = private_file_options().open(&staging)?;
            file.write_all(key)?;
            file.sync_all()?;
        }

        fs::rename(&staging, &path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(root: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(root)
}

#[cfg(not(unix))]
fn create_private_dir(root: &Path) -> io::Result<()> {
    fs::create_dir_all(root)
}

fn private_file_options() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::open(dir.path()).unwrap();

        store.save("peer_secret.key", &[7u8; 32]).unwrap();

        assert!(store.exists("peer_secret.key"));
        assert_eq!(store.load("peer_secret.key").unwrap(), vec![7u8; 32]);
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("keys");

        let store = FileKeyStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::open(dir.path()).unwrap();

        assert!(!store.exists("absent"));
        assert!(matches!(store.load("absent"), Err(KeyStoreError::NotFound { .. })));
    }

    #[test]
    fn rejects_escaping_identifiers() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::open(dir.path()).unwrap();

        for identifier in ["", "../x", "a/b", "a\\b", ".hidden", "nul\0byte"] {
            assert!(
                matches!(
                    store.save(identifier, &[1]),
                    Err(KeyStoreError::InvalidIdentifier { .. })
                ),
                "identifier {identifier:?} should be rejected"
            );
            assert!(!store.exists(identifier));
        }
    }

    #[test]
    fn save_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::open(dir.path()).unwrap();

        store.save("k", &[1, 2]).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["k".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn key_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileKeyStore::open(dir.path()).unwrap();
        store.save("k", &[1]).unwrap();

        let mode = fs::metadata(dir.path().join("k")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
