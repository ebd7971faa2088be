//! Line-oriented front end standing in for the mobile UI.
//!
//! While the session is locked only the PIN pad, lifecycle and status
//! commands are accepted; everything touching the vault is refused.

use std::sync::Arc;

use safekey_biometric::BiometricAuthenticator;
use tracing::debug;

use crate::error::{Result, SafeKeyError};
use crate::lifecycle::{AppLifecycle, LifecycleObserver};
use crate::lock::LockScreen;
use crate::session::{PinPurpose, SessionManager, SettingsPanel, Theme, PIN_LENGTH};
use crate::storage::{Account, AccountStore, NewAccount};

pub const HELP: &str = "\
PIN pad:    <digits> | del | bio
Lifecycle:  bg | fg | inactive
Settings:   status | theme <light|dark|system> | lock <on|off> | biometrics <on|off>
            pin set <pin> | pin change <pin> | pin clear
Accounts:   list | show <id> | add name=<..> [email=..] [password=..] [website=..] [tags=a,b] [icon=..]
            edit <id> <field>=<value>... | rm <id> | clear-all
Other:      help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Digits(String),
    Delete,
    Biometric,
    Lifecycle(AppLifecycle),
    Status,
    Theme(Theme),
    AppLock(bool),
    Biometrics(bool),
    SetPin(PinPurpose, String),
    ClearPin,
    Add(Vec<(String, String)>),
    List,
    Show(i64),
    Edit(i64, Vec<(String, String)>),
    Remove(i64),
    ClearAll,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();

        let command = match (head, rest.as_slice()) {
            (digits, []) if digits.bytes().all(|b| b.is_ascii_digit()) => {
                Self::Digits(digits.to_string())
            }
            ("del", []) => Self::Delete,
            ("bio", []) => Self::Biometric,
            ("bg", []) => Self::Lifecycle(AppLifecycle::Background),
            ("fg", []) => Self::Lifecycle(AppLifecycle::Active),
            ("inactive", []) => Self::Lifecycle(AppLifecycle::Inactive),
            ("status", []) => Self::Status,
            ("theme", [theme]) => Self::Theme(theme.parse()?),
            ("lock", [flag]) => Self::AppLock(parse_switch(flag)?),
            ("biometrics", [flag]) => Self::Biometrics(parse_switch(flag)?),
            ("pin", ["set", pin]) => Self::SetPin(PinPurpose::Set, pin.to_string()),
            ("pin", ["change", pin]) => Self::SetPin(PinPurpose::Change, pin.to_string()),
            ("pin", ["clear"]) => Self::ClearPin,
            ("add", fields) if !fields.is_empty() => Self::Add(parse_fields(fields)?),
            ("list", []) => Self::List,
            ("show", [id]) => Self::Show(parse_id(id)?),
            ("edit", [id, fields @ ..]) if !fields.is_empty() => {
                Self::Edit(parse_id(id)?, parse_fields(fields)?)
            }
            ("rm", [id]) => Self::Remove(parse_id(id)?),
            ("clear-all", []) => Self::ClearAll,
            ("help", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            _ => {
                return Err(SafeKeyError::InvalidInput(format!(
                    "Unknown command: {} (try `help`)",
                    line.trim()
                )))
            }
        };
        Ok(Some(command))
    }

    /// Commands that work while the vault is locked.
    fn allowed_while_locked(&self) -> bool {
        matches!(
            self,
            Self::Digits(_)
                | Self::Delete
                | Self::Biometric
                | Self::Lifecycle(_)
                | Self::Status
                | Self::Help
                | Self::Quit
        )
    }
}

fn parse_switch(flag: &str) -> Result<bool> {
    match flag {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => Err(SafeKeyError::InvalidInput(format!(
            "Expected on/off, got {}",
            other
        ))),
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| SafeKeyError::InvalidInput(format!("Not an account id: {}", raw)))
}

fn parse_fields(raw: &[&str]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| {
            let (field, value) = pair.split_once('=').ok_or_else(|| {
                SafeKeyError::InvalidInput(format!("Expected field=value, got {}", pair))
            })?;
            match field {
                "name" | "email" | "password" | "website" | "tags" | "icon" => {
                    Ok((field.to_string(), value.to_string()))
                }
                other => Err(SafeKeyError::InvalidInput(format!(
                    "Unknown field: {}",
                    other
                ))),
            }
        })
        .collect()
}

fn new_account(fields: Vec<(String, String)>) -> NewAccount {
    let mut account = NewAccount::default();
    for (field, value) in fields {
        match field.as_str() {
            "name" => account.name = value,
            "email" => account.email = value,
            "password" => account.password = value,
            "website" => account.website = value,
            "tags" => account.tags = value,
            "icon" => account.icon = value,
            _ => {}
        }
    }
    account
}

fn apply_fields(account: &mut Account, fields: Vec<(String, String)>) {
    for (field, value) in fields {
        match field.as_str() {
            "name" => account.name = value,
            "email" => account.email = value,
            "password" => account.password = value,
            "website" => account.website = value,
            "tags" => account.tags = value,
            "icon" => account.icon = value,
            _ => {}
        }
    }
}

fn describe(account: &Account) -> String {
    let mut line = format!("#{} {} <{}>", account.id, account.name, account.email);
    if !account.website.is_empty() {
        line.push_str(&format!(" {}", account.website));
    }
    if !account.tags.is_empty() {
        line.push_str(&format!(" [{}]", account.tag_list().join(", ")));
    }
    line
}

pub struct Shell {
    session: Arc<SessionManager>,
    biometrics: Arc<dyn BiometricAuthenticator>,
    accounts: Arc<AccountStore>,
    panel: SettingsPanel,
    lifecycle: LifecycleObserver,
    lock_screen: Option<LockScreen>,
}

impl Shell {
    pub fn new(
        session: Arc<SessionManager>,
        biometrics: Arc<dyn BiometricAuthenticator>,
        accounts: Arc<AccountStore>,
    ) -> Self {
        let panel = SettingsPanel::new(session.clone(), accounts.clone());
        let lifecycle = LifecycleObserver::new(session.clone());
        Self {
            session,
            biometrics,
            accounts,
            panel,
            lifecycle,
            lock_screen: None,
        }
    }

    /// Mount or tear down the lock screen to match the session.
    /// Returns the lines to show when the lock screen changed.
    pub async fn refresh(&mut self) -> Result<Vec<String>> {
        let locked = self.session.is_locked().await;
        let mut out = Vec::new();

        let mounted = self.lock_screen.as_ref().map(LockScreen::is_unlocked);
        match (mounted, locked) {
            (None, true) => {
                let screen = LockScreen::mount(self.session.clone(), self.biometrics.clone()).await?;
                if screen.is_unlocked() {
                    out.push("Unlocked with biometrics.".to_string());
                } else {
                    out.extend(Self::render(&screen));
                    self.lock_screen = Some(screen);
                }
            }
            (Some(unlocked), _) if unlocked || !locked => {
                debug!("Tearing down lock screen");
                self.lock_screen = None;
                out.push("Vault unlocked.".to_string());
            }
            _ => {}
        }
        Ok(out)
    }

    fn render(screen: &LockScreen) -> Vec<String> {
        let dots: String = (0..PIN_LENGTH)
            .map(|i| if i < screen.entered_len() { '●' } else { '○' })
            .collect();
        vec![
            format!("== {} ==", screen.title()),
            screen.subtitle().to_string(),
            dots,
        ]
    }

    pub async fn execute(&mut self, command: ShellCommand) -> Result<Vec<String>> {
        let mut out = self.refresh().await?;

        if self.lock_screen.is_some() && !command.allowed_while_locked() {
            return Err(SafeKeyError::Locked);
        }

        match command {
            ShellCommand::Digits(digits) => match self.lock_screen.as_mut() {
                Some(screen) => {
                    for digit in digits.chars() {
                        if let Some(notice) = screen.digit_pressed(digit).await? {
                            out.push(notice.to_string());
                        }
                    }
                    if !screen.is_unlocked() {
                        out.extend(Self::render(screen));
                    }
                }
                None => out.push("Vault is already unlocked.".to_string()),
            },
            ShellCommand::Delete => match self.lock_screen.as_mut() {
                Some(screen) => {
                    screen.delete_pressed();
                    out.extend(Self::render(screen));
                }
                None => out.push("Vault is already unlocked.".to_string()),
            },
            ShellCommand::Biometric => match self.lock_screen.as_mut() {
                Some(screen) if screen.biometric_button_enabled() => {
                    if !screen.biometric_attempt().await {
                        out.extend(Self::render(screen));
                    }
                }
                Some(_) => out.push("Biometrics are unavailable during PIN setup.".to_string()),
                None => out.push("Vault is already unlocked.".to_string()),
            },
            ShellCommand::Lifecycle(next) => {
                // Applied before the next command so a re-lock gates it
                self.lifecycle.on_transition(next).await;
                out.push(format!("App is now {}.", next));
            }
            ShellCommand::Status => {
                let snapshot = self.session.snapshot().await;
                out.push(serde_json::to_string_pretty(&snapshot)?);
            }
            ShellCommand::Theme(theme) => {
                self.panel.set_theme(theme).await;
                out.push(format!("Theme set to {}.", theme));
            }
            ShellCommand::AppLock(enabled) => {
                self.panel.toggle_app_lock(enabled).await?;
                out.push(format!("App lock {}.", if enabled { "on" } else { "off" }));
            }
            ShellCommand::Biometrics(enabled) => {
                self.panel.set_biometrics(enabled).await;
                out.push(format!("Biometrics {}.", if enabled { "on" } else { "off" }));
            }
            ShellCommand::SetPin(purpose, pin) => {
                out.push(self.panel.submit_pin(purpose, &pin).await?.to_string());
            }
            ShellCommand::ClearPin => {
                let _ = self.session.set_pin(None).await;
                out.push("PIN removed.".to_string());
            }
            ShellCommand::Add(fields) => {
                let id = self.accounts.insert(new_account(fields)).await?;
                out.push(format!("Account saved successfully! (#{})", id));
            }
            ShellCommand::List => {
                let accounts = self.accounts.list().await?;
                if accounts.is_empty() {
                    out.push("No accounts saved yet.".to_string());
                }
                out.extend(accounts.iter().map(describe));
            }
            ShellCommand::Show(id) => {
                let account = self
                    .accounts
                    .get(id)
                    .await?
                    .ok_or(SafeKeyError::AccountNotFound(id))?;
                out.push(describe(&account));
                out.push(format!("password: {}", account.password));
            }
            ShellCommand::Edit(id, fields) => {
                let mut account = self
                    .accounts
                    .get(id)
                    .await?
                    .ok_or(SafeKeyError::AccountNotFound(id))?;
                apply_fields(&mut account, fields);
                self.accounts.update(account).await?;
                out.push(format!("Account #{} updated.", id));
            }
            ShellCommand::Remove(id) => {
                self.accounts.delete(id).await?;
                out.push(format!("Account #{} deleted.", id));
            }
            ShellCommand::ClearAll => {
                let removed = self.panel.clear_all_data().await?;
                out.push(format!("All data has been cleared ({} accounts).", removed));
            }
            ShellCommand::Help => out.push(HELP.to_string()),
            ShellCommand::Quit => {}
        }

        out.extend(self.refresh().await?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SettingsKey;
    use crate::test_support::{loaded_session, ScriptedBiometrics};

    async fn shell(values: &[(SettingsKey, &str)]) -> (tempfile::TempDir, Arc<SessionManager>, Shell) {
        let (_store, session) = loaded_session(values).await;
        let dir = tempfile::tempdir().unwrap();
        let accounts = Arc::new(AccountStore::new(dir.path().join("accounts.json")));
        let shell = Shell::new(
            session.clone(),
            Arc::new(ScriptedBiometrics::without_hardware()),
            accounts,
        );
        (dir, session, shell)
    }

    fn cmd(line: &str) -> ShellCommand {
        ShellCommand::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ShellCommand::parse("   ").unwrap(), None);
        assert_eq!(cmd("1234"), ShellCommand::Digits("1234".into()));
        assert_eq!(cmd("bg"), ShellCommand::Lifecycle(AppLifecycle::Background));
        assert_eq!(cmd("theme dark"), ShellCommand::Theme(Theme::Dark));
        assert_eq!(cmd("lock off"), ShellCommand::AppLock(false));
        assert_eq!(
            cmd("pin change 9876"),
            ShellCommand::SetPin(PinPurpose::Change, "9876".into())
        );
        assert_eq!(
            cmd("edit 3 email=a@b.c"),
            ShellCommand::Edit(3, vec![("email".into(), "a@b.c".into())])
        );
        assert!(ShellCommand::parse("theme neon").is_err());
        assert!(ShellCommand::parse("add colour=red").is_err());
        assert!(ShellCommand::parse("rm abc").is_err());
        assert!(ShellCommand::parse("dance").is_err());
    }

    #[tokio::test]
    async fn test_first_launch_setup_then_vault_access() {
        let (_dir, session, mut shell) = shell(&[]).await;

        let out = shell.refresh().await.unwrap();
        assert_eq!(out[0], "== Secure Your Vault ==");

        assert!(matches!(
            shell.execute(cmd("list")).await,
            Err(SafeKeyError::Locked)
        ));

        shell.execute(cmd("1234")).await.unwrap();
        let out = shell.execute(cmd("1234")).await.unwrap();
        assert!(out.contains(&"Vault unlocked.".to_string()));
        assert!(!session.is_locked().await);

        let out = shell
            .execute(cmd("add name=Github email=me@github.com tags=dev,work"))
            .await
            .unwrap();
        assert_eq!(out, ["Account saved successfully! (#1)"]);
        let out = shell.execute(cmd("list")).await.unwrap();
        assert_eq!(out, ["#1 Github <me@github.com> [dev, work]"]);
    }

    #[tokio::test]
    async fn test_wrong_pin_shows_notice() {
        let (_dir, session, mut shell) = shell(&[
            (SettingsKey::UserPin, "4242"),
            (SettingsKey::AppLockEnabled, "true"),
        ])
        .await;

        let out = shell.execute(cmd("0000")).await.unwrap();
        assert!(out.contains(&"Incorrect PIN".to_string()));
        assert!(session.is_locked().await);

        let out = shell.execute(cmd("bio")).await.unwrap();
        assert!(out.iter().any(|l| l.starts_with("== SafeKey Locked")));

        shell.execute(cmd("4242")).await.unwrap();
        assert!(!session.is_locked().await);
    }

    #[tokio::test]
    async fn test_disabling_lock_from_settings() {
        let (_dir, session, mut shell) = shell(&[(SettingsKey::UserPin, "4242")]).await;
        shell.execute(cmd("lock on")).await.unwrap();
        assert!(session.app_lock_enabled().await);

        session.set_is_locked(true).await;
        assert!(matches!(
            shell.execute(cmd("lock off")).await,
            Err(SafeKeyError::Locked)
        ));
        shell.execute(cmd("4242")).await.unwrap();
        shell.execute(cmd("lock off")).await.unwrap();
        assert!(!session.app_lock_enabled().await);
        assert!(!session.is_locked().await);
    }

    #[tokio::test]
    async fn test_background_locks_before_next_command() {
        let (_dir, session, mut shell) = shell(&[
            (SettingsKey::UserPin, "4242"),
            (SettingsKey::AppLockEnabled, "true"),
        ])
        .await;
        shell.execute(cmd("4242")).await.unwrap();
        shell
            .execute(cmd("add name=Bank password=s3cret"))
            .await
            .unwrap();

        shell.execute(cmd("bg")).await.unwrap();
        assert!(session.is_locked().await);
        assert!(matches!(
            shell.execute(cmd("show 1")).await,
            Err(SafeKeyError::Locked)
        ));

        shell.execute(cmd("fg")).await.unwrap();
        assert!(matches!(
            shell.execute(cmd("list")).await,
            Err(SafeKeyError::Locked)
        ));
        shell.execute(cmd("4242")).await.unwrap();
        let out = shell.execute(cmd("show 1")).await.unwrap();
        assert_eq!(out[1], "password: s3cret");
    }
}
