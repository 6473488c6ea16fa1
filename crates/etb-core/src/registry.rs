//! User → spreadsheet mapping.
//!
//! The handler is the only writer. `JsonFileRegistry` rewrites the whole file
//! on every `set_sheet`; a crash mid-write can leave it corrupt, which is then
//! reported at the next startup.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::{SheetId, UserId},
    errors::Error,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSheet {
    pub sheet_id: SheetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Storage port for the user registry.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn get_sheet(&self, user_id: &UserId) -> Option<SheetId>;

    /// Insert or overwrite the mapping; durable implementations persist before returning.
    async fn set_sheet(
        &self,
        user_id: &UserId,
        sheet_id: SheetId,
        email: Option<String>,
    ) -> Result<()>;

    async fn user_count(&self) -> usize;
}

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    users: BTreeMap<UserId, UserSheet>,
}

/// Registry persisted as a JSON document.
pub struct JsonFileRegistry {
    path: PathBuf,
    users: Mutex<BTreeMap<UserId, UserSheet>>,
}

impl JsonFileRegistry {
    /// Load from `path`. Absent or empty file means an empty registry;
    /// anything unparsable is a startup error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users = load_registry_file(&path)?;
        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    async fn persist(&self, users: &BTreeMap<UserId, UserSheet>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let doc = RegistryFileRef { users };
        let txt = serde_json::to_string_pretty(&doc)?;
        tokio::fs::write(&self.path, txt).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct RegistryFileRef<'a> {
    users: &'a BTreeMap<UserId, UserSheet>,
}

fn load_registry_file(path: &Path) -> Result<BTreeMap<UserId, UserSheet>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let txt = std::fs::read_to_string(path)?;
    if txt.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let doc: RegistryFile = serde_json::from_str(&txt).map_err(|e| Error::CorruptRegistry {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(doc.users)
}

#[async_trait]
impl UserRegistry for JsonFileRegistry {
    async fn get_sheet(&self, user_id: &UserId) -> Option<SheetId> {
        self.users
            .lock()
            .await
            .get(user_id)
            .map(|u| u.sheet_id.clone())
    }

    async fn set_sheet(
        &self,
        user_id: &UserId,
        sheet_id: SheetId,
        email: Option<String>,
    ) -> Result<()> {
        let mut users = self.users.lock().await;
        // Only a mapping that reached disk becomes visible.
        let mut next = users.clone();
        next.insert(user_id.clone(), UserSheet { sheet_id, email });
        self.persist(&next).await?;
        *users = next;
        Ok(())
    }

    async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }
}

/// Non-durable registry, for tests and throwaway runs.
#[derive(Default)]
pub struct InMemoryRegistry {
    users: Mutex<BTreeMap<UserId, UserSheet>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRegistry for InMemoryRegistry {
    async fn get_sheet(&self, user_id: &UserId) -> Option<SheetId> {
        self.users
            .lock()
            .await
            .get(user_id)
            .map(|u| u.sheet_id.clone())
    }

    async fn set_sheet(
        &self,
        user_id: &UserId,
        sheet_id: SheetId,
        email: Option<String>,
    ) -> Result<()> {
        self.users
            .lock()
            .await
            .insert(user_id.clone(), UserSheet { sheet_id, email });
        Ok(())
    }

    async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    #[tokio::test]
    async fn absent_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let reg = JsonFileRegistry::load(dir.path().join("missing.json")).unwrap();
        assert_eq!(reg.user_count().await, 0);
        assert_eq!(reg.get_sheet(&user("1")).await, None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/registry.json");

        let reg = JsonFileRegistry::load(&path).unwrap();
        reg.set_sheet(&user("42"), SheetId::from("sheet-a"), Some("a@b.com".to_string()))
            .await
            .unwrap();
        assert_eq!(reg.get_sheet(&user("42")).await, Some(SheetId::from("sheet-a")));

        let reloaded = JsonFileRegistry::load(&path).unwrap();
        assert_eq!(
            reloaded.get_sheet(&user("42")).await,
            Some(SheetId::from("sheet-a"))
        );
    }

    #[tokio::test]
    async fn setup_again_overwrites_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let reg = JsonFileRegistry::load(&path).unwrap();
        reg.set_sheet(&user("1"), SheetId::from("old"), None)
            .await
            .unwrap();
        reg.set_sheet(&user("1"), SheetId::from("new"), None)
            .await
            .unwrap();
        assert_eq!(reg.user_count().await, 1);

        let reloaded = JsonFileRegistry::load(&path).unwrap();
        assert_eq!(reloaded.get_sheet(&user("1")).await, Some(SheetId::from("new")));
    }

    #[tokio::test]
    async fn persisted_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let reg = JsonFileRegistry::load(&path).unwrap();
        reg.set_sheet(&user("7"), SheetId::from("s7"), Some("x@y.z".to_string()))
            .await
            .unwrap();
        reg.set_sheet(&user("8"), SheetId::from("s8"), None)
            .await
            .unwrap();

        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["users"]["7"]["sheet_id"], "s7");
        assert_eq!(v["users"]["7"]["email"], "x@y.z");
        assert_eq!(v["users"]["8"]["sheet_id"], "s8");
        assert!(v["users"]["8"].get("email").is_none());
    }

    #[tokio::test]
    async fn failed_write_leaves_mapping_unset() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let reg = JsonFileRegistry::load(blocker.join("registry.json")).unwrap();
        let res = reg
            .set_sheet(&user("1"), SheetId::from("s1"), Some("a@b.com".to_string()))
            .await;
        assert!(res.is_err());
        assert_eq!(reg.get_sheet(&user("1")).await, None);
        assert_eq!(reg.user_count().await, 0);
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let reg = JsonFileRegistry::load(&path).unwrap();
        reg.set_sheet(&user("1"), SheetId::from("old"), None)
            .await
            .unwrap();

        // A directory at the file's path makes the rewrite fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        assert!(reg
            .set_sheet(&user("1"), SheetId::from("new"), None)
            .await
            .is_err());
        assert_eq!(reg.get_sheet(&user("1")).await, Some(SheetId::from("old")));
    }

    #[test]
    fn malformed_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileRegistry::load(&path).err().unwrap();
        assert!(matches!(err, Error::CorruptRegistry { .. }));
        assert!(err.is_startup());
    }

    #[test]
    fn empty_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, "\n").unwrap();
        assert!(JsonFileRegistry::load(&path).is_ok());
    }

    #[tokio::test]
    async fn in_memory_round_trip() {
        let reg = InMemoryRegistry::new();
        reg.set_sheet(&user("u"), SheetId::from("s"), None)
            .await
            .unwrap();
        assert_eq!(reg.get_sheet(&user("u")).await, Some(SheetId::from("s")));
        assert_eq!(reg.get_sheet(&user("other")).await, None);
    }
}
