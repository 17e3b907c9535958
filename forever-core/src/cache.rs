use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::Result;

/// 键值存储后端（redis / pika）
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// 写入，`ttl` 为 `None` 时永不过期
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;
    /// 仅当键不存在时写入，返回是否写入成功
    async fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool>;
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// 仅当键的当前值等于 `value` 时删除，返回是否删除
    async fn delete_if(&self, key: &str, value: &[u8]) -> Result<bool>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}

#[async_trait]
pub trait Cache: CacheBackend {
    async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let value_bytes = serde_json::to_vec(value)?;
        self.set_raw(key, &value_bytes, ttl).await
    }

    async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        if let Some(raw) = self.get_raw(key).await? {
            Ok(Some(serde_json::from_slice::<T>(&raw)?))
        } else {
            Ok(None)
        }
    }
}

/// 为所有实现了 CacheBackend 的类型自动实现 Cache
impl<T: CacheBackend> Cache for T {}
