mod accounts;
mod memory;
mod settings_store;

use std::path::Path;

pub use accounts::{Account, AccountStore, NewAccount};
pub use memory::MemorySettingsStore;
pub use settings_store::{JsonFileSettingsStore, SettingsKey, SettingsStore};

use crate::error::Result;

/// Write a file atomically (temp file, then rename) with owner-only
/// permissions on Unix.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, bytes).await?;
    tokio::fs::rename(&temp_path, path).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(path).await?.permissions();
        perms.set_mode(0o600);
        tokio::fs::set_permissions(path, perms).await?;
    }

    Ok(())
}
