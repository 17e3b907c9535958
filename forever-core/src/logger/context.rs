//! 请求关联：执行单元标识与路由表

use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static CURRENT: ExecutionId;
}

/// 并发执行单元（一次请求处理）的进程内唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionId(u64);

impl ExecutionId {
    /// 分配一个新的标识
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// 当前任务所属的执行单元，请求之外为 `None`
    pub fn current() -> Option<Self> {
        CURRENT.try_with(|id| *id).ok()
    }

    /// 在该执行单元内运行 future
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }

    /// 在该执行单元内运行同步闭包
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(self, f)
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 执行单元 → 路由名 的并发映射
///
/// 生命周期与服务状态一致。每个标识同一时刻至多对应一个路由名，
/// 请求开始时写入，结束时由 [`RouteGuard`] 删除。
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: DashMap<ExecutionId, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入路由名，返回被替换的旧值
    pub fn insert(&self, id: ExecutionId, route: impl Into<String>) -> Option<String> {
        self.routes.insert(id, route.into())
    }

    pub fn get(&self, id: ExecutionId) -> Option<String> {
        self.routes.get(&id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, id: ExecutionId) -> Option<String> {
        self.routes.remove(&id).map(|(_, route)| route)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// 当前执行单元的路由名，不存在时为空字符串
    pub fn current_route(&self) -> String {
        ExecutionId::current()
            .and_then(|id| self.get(id))
            .unwrap_or_default()
    }

    /// 写入路由名并返回守卫，守卫释放时删除该条目
    pub fn enter(self: &Arc<Self>, id: ExecutionId, route: impl Into<String>) -> RouteGuard {
        self.insert(id, route);
        RouteGuard {
            table: Arc::clone(self),
            id,
        }
    }
}

/// 请求结束（或 future 被取消）时清理路由表条目
#[derive(Debug)]
pub struct RouteGuard {
    table: Arc<RouteTable>,
    id: ExecutionId,
}

impl RouteGuard {
    pub fn id(&self) -> ExecutionId {
        self.id
    }
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

/// 显式传递的请求上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub id: ExecutionId,
    pub route: Arc<str>,
}

impl RequestContext {
    pub fn new(route: impl Into<Arc<str>>) -> Self {
        Self {
            id: ExecutionId::next(),
            route: route.into(),
        }
    }
}
