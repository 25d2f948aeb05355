use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use navflow_shared::UserDto;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Durable key/value storage for credentials.
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("credentials.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.path.display()))
    }

    #[tracing::instrument(skip(self, values), fields(path = %self.path.display(), keys = values.len()))]
    fn write_all(&self, values: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, values)?;
        writeln!(temp)?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;

        debug!("saved credentials atomically");
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// In-memory token pair mirrored to a [`CredentialStore`].
#[derive(Debug)]
pub struct Session {
    store: Box<dyn CredentialStore>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<UserDto>,
}

impl Session {
    #[tracing::instrument(skip(store))]
    pub fn load(store: Box<dyn CredentialStore>) -> anyhow::Result<Self> {
        let access_token = store.get(ACCESS_TOKEN_KEY)?;
        let refresh_token = store.get(REFRESH_TOKEN_KEY)?;
        info!(
            has_access = access_token.is_some(),
            has_refresh = refresh_token.is_some(),
            "loaded session"
        );
        Ok(Self {
            store,
            access_token,
            refresh_token,
            user: None,
        })
    }

    pub fn ephemeral() -> Self {
        Self {
            store: Box::new(MemoryCredentialStore::new()),
            access_token: None,
            refresh_token: None,
            user: None,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn user(&self) -> Option<&UserDto> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: Option<UserDto>) {
        self.user = user;
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    #[tracing::instrument(skip_all, fields(has_refresh = refresh.is_some()))]
    pub fn login(
        &mut self,
        access: &str,
        refresh: Option<&str>,
        user: Option<UserDto>,
    ) -> anyhow::Result<()> {
        self.store
            .set(ACCESS_TOKEN_KEY, access)
            .context("failed to store access token")?;
        match refresh {
            Some(refresh) => self
                .store
                .set(REFRESH_TOKEN_KEY, refresh)
                .context("failed to store refresh token")?,
            None => self.store.remove(REFRESH_TOKEN_KEY)?,
        }
        self.access_token = Some(access.to_string());
        self.refresh_token = refresh.map(str::to_string);
        self.user = user;
        info!("session established");
        Ok(())
    }

    /// Stores a refreshed access token, and a rotated refresh token when one
    /// was issued.
    #[tracing::instrument(skip_all, fields(rotated = refresh.is_some()))]
    pub fn set_access_token(&mut self, access: &str, refresh: Option<&str>) -> anyhow::Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, access)?;
        self.access_token = Some(access.to_string());
        if let Some(refresh) = refresh {
            self.store.set(REFRESH_TOKEN_KEY, refresh)?;
            self.refresh_token = Some(refresh.to_string());
        }
        debug!("access token replaced");
        Ok(())
    }

    /// Clears memory first so a failing store still ends the session.
    #[tracing::instrument(skip(self))]
    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.access_token = None;
        self.refresh_token = None;
        self.user = None;
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        info!("session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_persists_across_sessions() {
        let dir = tempfile::tempdir().unwrap();

        let mut session = Session::load(Box::new(FileCredentialStore::new(dir.path()))).unwrap();
        assert!(!session.is_authenticated());
        session.login("a1", Some("r1"), None).unwrap();

        let reloaded = Session::load(Box::new(FileCredentialStore::new(dir.path()))).unwrap();
        assert_eq!(reloaded.access_token(), Some("a1"));
        assert_eq!(reloaded.refresh_token(), Some("r1"));

        let raw = fs::read_to_string(dir.path().join("credentials.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["access_token"], "a1");
        assert_eq!(parsed["refresh_token"], "r1");
    }

    #[test]
    fn logout_clears_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::load(Box::new(FileCredentialStore::new(dir.path()))).unwrap();
        session.login("a1", Some("r1"), None).unwrap();
        session.logout().unwrap();
        assert!(!session.is_authenticated());

        let reloaded = Session::load(Box::new(FileCredentialStore::new(dir.path()))).unwrap();
        assert_eq!(reloaded.access_token(), None);
        assert_eq!(reloaded.refresh_token(), None);
    }

    #[test]
    fn refresh_keeps_refresh_token_unless_rotated() {
        let mut session = Session::ephemeral();
        session.login("a1", Some("r1"), None).unwrap();

        session.set_access_token("a2", None).unwrap();
        assert_eq!(session.access_token(), Some("a2"));
        assert_eq!(session.refresh_token(), Some("r1"));

        session.set_access_token("a3", Some("r2")).unwrap();
        assert_eq!(session.refresh_token(), Some("r2"));
    }
}
