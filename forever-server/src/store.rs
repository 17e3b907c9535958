use std::time::Duration;

use async_trait::async_trait;
use forever_core::{
    Result,
    cache::{Cache, CacheBackend},
    user::{NewUser, RegisterOutcome, UserRecord, UserStore},
};
use uuid::Uuid;

/// 注册锁的过期时间
const REGISTER_LOCK_TTL: Duration = Duration::from_secs(10);

/// 基于键值存储的用户仓库
///
/// `locks` 存放短期的注册锁（redis），`users` 持久化用户记录（pika）。
pub struct KvUserStore<L, U> {
    locks: L,
    users: U,
}

impl<L, U> KvUserStore<L, U>
where
    L: CacheBackend,
    U: CacheBackend,
{
    pub fn new(locks: L, users: U) -> Self {
        Self { locks, users }
    }

    fn lock_key(username: &str) -> String {
        format!("lock:register:{}", username)
    }

    async fn create(&self, user: &NewUser) -> Result<RegisterOutcome> {
        let key = UserRecord::key(&user.username);
        if self.users.exists(&key).await? {
            return Ok(RegisterOutcome::AlreadyExists);
        }

        self.users.set(&key, &UserRecord::from_new(user), None).await?;
        Ok(RegisterOutcome::Created)
    }
}

#[async_trait]
impl<L, U> UserStore for KvUserStore<L, U>
where
    L: CacheBackend + 'static,
    U: CacheBackend + 'static,
{
    async fn register(&self, user: &NewUser) -> Result<RegisterOutcome> {
        let lock_key = Self::lock_key(&user.username);
        let token = Uuid::new_v4().simple().to_string();
        if !self.locks.set_nx(&lock_key, token.as_bytes(), REGISTER_LOCK_TTL).await? {
            tracing::debug!("register lock for '{}' is held", user.username);
            return Ok(RegisterOutcome::InProgress);
        }

        let outcome = self.create(user).await;

        // 只释放自己持有的锁；释放失败等锁过期即可，不影响注册结果
        match self.locks.delete_if(&lock_key, token.as_bytes()).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                "register lock for '{}' expired before release",
                user.username
            ),
            Err(e) => tracing::warn!(
                "failed to release register lock for '{}': {}",
                user.username,
                e
            ),
        }

        outcome
    }
}
