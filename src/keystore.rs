//! Key material supply.
//!
//! The key is loaded once, before any cipher exists, and never regenerated
//! while a key file is present: a new key would orphan every stored record.

use crate::cipher::EncryptionKey;
use crate::error::{MeasursError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Supplies the process-wide encryption key
pub trait KeyStore {
    fn load_key(&self) -> Result<EncryptionKey>;
}

/// Key kept in a base64 file, generated on first use
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing(&self) -> Result<EncryptionKey> {
        let encoded = fs::read_to_string(&self.path).map_err(|e| {
            MeasursError::KeyUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let decoded = BASE64.decode(encoded.trim().as_bytes()).map_err(|e| {
            MeasursError::KeyUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        EncryptionKey::from_slice(&decoded)
    }

    fn create(&self) -> Result<EncryptionKey> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let key = EncryptionKey::generate();
        let encoded = BASE64.encode(key.as_bytes());
        // create_new: never clobber a key written by a concurrent first run
        match write_new_file_restricted(&self.path, encoded.as_bytes()) {
            Ok(()) => {
                tracing::info!(
                    path = %self.path.display(),
                    fingerprint = %key.fingerprint(),
                    "generated new encryption key"
                );
                Ok(key)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => self.read_existing(),
            Err(e) => Err(MeasursError::KeyUnavailable(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl KeyStore for FileKeyStore {
    fn load_key(&self) -> Result<EncryptionKey> {
        if self.path.exists() {
            self.read_existing()
        } else {
            self.create()
        }
    }
}

/// Key already held in memory
#[derive(Debug, Clone)]
pub struct StaticKeyStore {
    key: EncryptionKey,
}

impl StaticKeyStore {
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }
}

impl KeyStore for StaticKeyStore {
    fn load_key(&self) -> Result<EncryptionKey> {
        Ok(self.key.clone())
    }
}

fn write_new_file_restricted(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create_new(true).write(true).open(path)?;
    file.write_all(data)?;
    file.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
