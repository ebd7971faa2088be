pub mod config;
pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod session;
pub mod shell;
pub mod storage;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use safekey_biometric::{BiometricAuthenticator, DesktopBiometrics};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

pub use config::AppConfig;
pub use error::{Result, SafeKeyError};
pub use lifecycle::{AppLifecycle, LifecycleObserver, LifecycleSubscription};
pub use lock::{LockNotice, LockScreen, LockStage};
pub use session::{Pin, PinPurpose, SessionEvent, SessionManager, SettingsPanel, Theme};
pub use shell::{Shell, ShellCommand};
pub use storage::{
    AccountStore, JsonFileSettingsStore, MemorySettingsStore, SettingsKey, SettingsStore,
};

/// Start the app: load settings, then drive the shell from stdin until
/// `quit` or end of input.
pub async fn run(config: AppConfig) -> Result<()> {
    config.init_data_dir()?;

    let store: Arc<dyn SettingsStore> = if config.ephemeral {
        info!("Ephemeral run; settings will not be persisted");
        Arc::new(MemorySettingsStore::new())
    } else {
        Arc::new(JsonFileSettingsStore::new(config.settings_path()))
    };
    let accounts = Arc::new(AccountStore::new(config.accounts_path()));
    let session = Arc::new(SessionManager::new(store));

    // Nothing may render until the first load completes
    let loader = session.clone();
    tokio::spawn(async move { loader.load().await });
    session.wait_until_loaded().await;

    let biometrics: Arc<dyn BiometricAuthenticator> = Arc::new(DesktopBiometrics::new());
    match biometrics.check_availability().await {
        Ok(status) if status.is_usable() => info!("Biometric unlock available"),
        Ok(status) => info!(
            "Biometric unlock unavailable: {}",
            status.unavailable_reason.as_deref().unwrap_or("unknown")
        ),
        Err(e) => warn!("Failed to query biometrics: {}", e),
    }

    let mut shell = Shell::new(session.clone(), biometrics, accounts);
    for line in shell.refresh().await? {
        println!("{}", line);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if command == ShellCommand::Quit {
            break;
        }

        match shell.execute(command).await {
            Ok(output) => {
                for line in output {
                    println!("{}", line);
                }
            }
            Err(e) => println!("Error: {}", e),
        }
    }

    if let Err(e) = session.flush().await {
        error!("Failed to flush settings on exit: {}", e);
    }
    info!("Goodbye");
    Ok(())
}
