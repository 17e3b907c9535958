use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use forever_core::logger::{RequestContext, RouteTable};

/// 路由标签，作为中间件状态挂在具体路由上
#[derive(Debug, Clone)]
pub struct RouteLabel {
    routes: Arc<RouteTable>,
    name: &'static str,
}

impl RouteLabel {
    pub fn new(routes: &Arc<RouteTable>, name: &'static str) -> Self {
        Self {
            routes: Arc::clone(routes),
            name,
        }
    }
}

/// 为请求分配执行单元并登记路由名
///
/// 处理期间路由表中保留一条记录，请求结束（包括 panic 展开）后自动移除。
/// 上下文同时放入 request extensions，供 handler 显式使用。
pub async fn correlate(State(label): State<RouteLabel>, mut request: Request, next: Next) -> Response {
    let ctx = RequestContext::new(label.name);
    let _guard = label.routes.enter(ctx.id, label.name);

    tracing::debug!("request {} enters route {}", ctx.id, label.name);
    request.extensions_mut().insert(ctx.clone());

    ctx.id.scope(next.run(request)).await
}
