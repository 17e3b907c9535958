use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::OnceCell;

use forever_core::{Error, Result, cache::CacheBackend, config::RedisSettings};

/// 比较后删除，保证只删除自己写入的值
const DELETE_IF_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Redis / Pika 缓存实现
///
/// 创建时只解析地址，首次使用时才建立连接，之后复用同一个多路复用连接。
#[derive(Debug, Clone)]
pub struct RedisCache {
    name: &'static str,
    client: redis::Client,
    connection: Arc<OnceCell<MultiplexedConnection>>,
    prefix: String,
}

impl RedisCache {
    /// 根据配置创建客户端，`name` 用于日志与错误信息
    pub fn new(name: &'static str, settings: &RedisSettings, prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(settings.url())
            .map_err(|e| Error::Cache(format!("Failed to create {} client: {}", name, e)))?;

        tracing::info!(
            "{} client ready: {}:{} db={}",
            name,
            settings.host,
            settings.port,
            settings.db
        );

        Ok(Self {
            name,
            client,
            connection: Arc::new(OnceCell::new()),
            prefix: prefix.into(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| Error::Cache(format!("Failed to connect to {}: {}", self.name, e)))
            })
            .await?;

        Ok(connection.clone())
    }

    /// 构建带前缀的键
    fn build_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn error(&self, action: &str, e: redis::RedisError) -> Error {
        Error::Cache(format!("Failed to {} on {}: {}", action, self.name, e))
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let full_key = self.build_key(key);
        let mut conn = self.connection().await?;

        match ttl.filter(|ttl| ttl.as_secs() > 0) {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(&full_key, value, ttl.as_secs())
                .await
                .map_err(|e| self.error("set key", e))?,
            None => conn
                .set::<_, _, ()>(&full_key, value)
                .await
                .map_err(|e| self.error("set key", e))?,
        }

        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        let full_key = self.build_key(key);
        let mut conn = self.connection().await?;

        // SET key value NX EX ttl，未写入时返回 nil
        let reply: Option<String> = redis::cmd("SET")
            .arg(&full_key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| self.error("set key if absent", e))?;

        Ok(reply.is_some())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full_key = self.build_key(key);
        let mut conn = self.connection().await?;

        conn.get(&full_key)
            .await
            .map_err(|e| self.error("get key", e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_key = self.build_key(key);
        let mut conn = self.connection().await?;

        conn.del::<_, ()>(&full_key)
            .await
            .map_err(|e| self.error("delete key", e))
    }

    async fn delete_if(&self, key: &str, value: &[u8]) -> Result<bool> {
        let full_key = self.build_key(key);
        let mut conn = self.connection().await?;

        let removed: i64 = redis::Script::new(DELETE_IF_SCRIPT)
            .key(&full_key)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| self.error("delete key if matched", e))?;

        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full_key = self.build_key(key);
        let mut conn = self.connection().await?;

        conn.exists(&full_key)
            .await
            .map_err(|e| self.error("check key existence", e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let full_key = self.build_key(key);
        let mut conn = self.connection().await?;

        conn.expire::<_, ()>(&full_key, ttl.as_secs() as i64)
            .await
            .map_err(|e| self.error("set key expiration", e))
    }
}
