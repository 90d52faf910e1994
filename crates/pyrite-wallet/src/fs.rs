//! Filesystem capability for the wallet file.
//!
//! The wallet only needs three operations, so the seam is kept that narrow;
//! unit tests swap in an in-memory map instead of touching disk.

use std::fs;
use std::path::Path;

use crate::error::WalletError;

pub trait WalletFs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> Result<Vec<u8>, WalletError>;
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), WalletError>;
}

/// Real filesystem. Writes land with owner read-write permissions only;
/// the file holds a private key.
pub struct DiskFs;

impl DiskFs {
    fn io_error(path: &Path, err: std::io::Error) -> WalletError {
        WalletError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl WalletFs for DiskFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, WalletError> {
        fs::read(path).map_err(|e| Self::io_error(path, e))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), WalletError> {
        fs::write(path, bytes).map_err(|e| Self::io_error(path, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .map_err(|e| Self::io_error(path, e))?;
        }
        Ok(())
    }
}

/// In-memory double for unit tests.
#[cfg(test)]
pub struct MemFs {
    files: std::sync::Mutex<std::collections::HashMap<std::path::PathBuf, Vec<u8>>>,
}

#[cfg(test)]
impl MemFs {
    pub fn new() -> Self {
        Self {
            files: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(test)]
impl WalletFs for MemFs {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, WalletError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| WalletError::Io {
                path: path.display().to_string(),
                message: "not found".into(),
            })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), WalletError> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}
