use std::{collections::HashMap, hash::Hash, path::PathBuf, sync::Arc};
use tokio::{fs, sync::RwLock};
use tracing::warn;

use crate::errors::ServiceError;

/// Generic JSON file-backed key-value map.
///
/// The whole map is rewritten on every mutation, and the write lock is held
/// until the file is on disk so two writers never persist out of order.
pub struct JsonMapStore<K, V> {
    inner: RwLock<HashMap<K, V>>,
    file_path: PathBuf,
}

impl<K, V> JsonMapStore<K, V>
where
    K: Eq + Hash + serde::Serialize + serde::de::DeserializeOwned + Clone,
    V: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    /// Open the store at `path`, creating the file with an empty map if missing.
    /// An unreadable file is kept aside as `<name>.corrupt` and replaced by an empty map.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        let map: HashMap<K, V> = match fs::read(&file_path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    let aside = file_path.with_extension("corrupt");
                    warn!(path = %file_path.display(), error = %e, "store file unreadable; starting empty");
                    fs::rename(&file_path, &aside).await.map_err(ServiceError::storage)?;
                    Self::write(&file_path, &HashMap::new()).await?;
                    HashMap::new()
                }
            },
            Err(_) => {
                let empty: HashMap<K, V> = HashMap::new();
                Self::write(&file_path, &empty).await?;
                empty
            }
        };

        Ok(Arc::new(Self { inner: RwLock::new(map), file_path }))
    }

    async fn write(path: &PathBuf, map: &HashMap<K, V>) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(map).map_err(ServiceError::storage)?;
        fs::write(path, data).await.map_err(ServiceError::storage)
    }

    /// Get value by key.
    pub async fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().await;
        map.get(key).cloned()
    }

    /// Insert or replace a value and persist.
    pub async fn insert(&self, key: K, value: V) -> Result<(), ServiceError> {
        self.update_map(|m| {
            m.insert(key, value);
            Ok(())
        })
        .await
    }

    /// Apply a mutation and persist it under the same lock.
    /// Nothing is written if `f` fails.
    pub async fn update_map<F>(&self, f: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut HashMap<K, V>) -> Result<(), ServiceError>,
    {
        let mut map = self.inner.write().await;
        let mut next = map.clone();
        f(&mut next)?;
        Self::write(&self.file_path, &next).await?;
        *map = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("json_map_store_{tag}_{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn json_map_store_crud_persists() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("crud");
        let store = JsonMapStore::<String, String>::new(&tmp).await?;

        store.insert("a".into(), "1".into()).await?;
        store.insert("b".into(), "2".into()).await?;
        assert_eq!(store.get(&"a".into()).await.as_deref(), Some("1"));

        store
            .update_map(|m| {
                if let Some(v) = m.get_mut("a") { *v = "10".into(); }
                Ok(())
            })
            .await?;

        store
            .update_map(|m| {
                m.remove("b");
                Ok(())
            })
            .await?;

        let reloaded = JsonMapStore::<String, String>::new(&tmp).await?;
        assert_eq!(reloaded.get(&"a".into()).await.as_deref(), Some("10"));
        assert_eq!(reloaded.get(&"b".into()).await, None);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_update_leaves_map_untouched() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("rollback");
        let store = JsonMapStore::<String, String>::new(&tmp).await?;
        store.insert("a".into(), "1".into()).await?;

        let res = store
            .update_map(|m| {
                m.insert("a".into(), "changed".into());
                Err(ServiceError::Validation("nope".into()))
            })
            .await;
        assert!(res.is_err());
        assert_eq!(store.get(&"a".into()).await.as_deref(), Some("1"));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_moved_aside() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("corrupt");
        tokio::fs::write(&tmp, b"{not json").await?;
        let store = JsonMapStore::<String, String>::new(&tmp).await?;
        assert_eq!(store.get(&"a".into()).await, None);
        let aside = tmp.with_extension("corrupt");
        assert_eq!(tokio::fs::read(&aside).await?, b"{not json");

        let _ = tokio::fs::remove_file(&tmp).await;
        let _ = tokio::fs::remove_file(&aside).await;
        Ok(())
    }
}
