use axum::{Router, middleware::from_fn_with_state, routing::post};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    handlers::{self, AppState, RegisterData, RegisterRequest},
    middleware::{RouteLabel, correlate},
};

/// 接口文档
#[derive(OpenApi)]
#[openapi(
    info(title = "forever", description = "forever 后端接口"),
    paths(handlers::register),
    components(schemas(RegisterRequest, RegisterData)),
    tags((name = "user", description = "用户"))
)]
pub struct ApiDoc;

/// 注册全部路由
pub fn routers(state: AppState) -> Router {
    let api_v1 = Router::new().nest("/user", user_routers(&state));

    Router::new()
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api/v1", api_v1)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

fn user_routers(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/register",
        post(handlers::register).layer(from_fn_with_state(
            RouteLabel::new(state.routes(), "UserRegister"),
            correlate,
        )),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use forever_core::{
        Logger, Result,
        user::{NewUser, RegisterOutcome, UserStore},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::store::{KvUserStore, tests::MemoryCache};

    fn app() -> (Router, AppState, MemoryCache) {
        let (locks, users) = (MemoryCache::default(), MemoryCache::default());
        let state = AppState::new(
            Logger::default(),
            Arc::new(KvUserStore::new(locks, users.clone())),
        );
        (routers(state.clone()), state, users)
    }

    async fn post_register(app: Router, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/user/register")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_register_success() {
        let (app, state, users) = app();

        let (status, body) =
            post_register(app, r#"{"username":"alice","password":"secret1"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        assert_eq!(body["message"], "success");
        assert_eq!(body["data"]["username"], "alice");
        assert!(users.contains("user:alice"));
        // 请求结束后路由表被清理
        assert!(state.routes().is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_fails() {
        let (app, _, _) = app();
        let body = r#"{"username":"alice","password":"secret1"}"#;

        post_register(app.clone(), body).await;
        let (status, body) = post_register(app, body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 402);
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_register_bad_params() {
        let (app, state, users) = app();

        for payload in [
            r#"{"username":"a","password":"secret1"}"#,
            r#"{"username":"alice","password":"123"}"#,
            r#"{"username":"alice"}"#,
            "not json",
        ] {
            let (status, body) = post_register(app.clone(), payload).await;
            assert_eq!(status, StatusCode::OK, "{}", payload);
            assert_eq!(body["code"], 200, "{}", payload);
            assert_eq!(body["text"], "参数错误", "{}", payload);
        }
        assert!(!users.contains("user:alice"));
        assert!(state.routes().is_empty());
    }

    #[tokio::test]
    async fn test_register_store_error() {
        let (locks, users) = (MemoryCache::default(), MemoryCache::default());
        users.break_writes();
        let state = AppState::new(Logger::default(), Arc::new(KvUserStore::new(locks, users)));

        let (_, body) = post_register(
            routers(state),
            r#"{"username":"alice","password":"secret1"}"#,
        )
        .await;
        assert_eq!(body["code"], 500);
    }

    /// 记录处理期间可见的路由名
    #[derive(Default)]
    struct RouteRecorder {
        state: Mutex<Option<AppState>>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UserStore for RouteRecorder {
        async fn register(&self, _user: &NewUser) -> Result<RegisterOutcome> {
            let routes = self.state.lock().unwrap().as_ref().map(|s| Arc::clone(s.routes()));
            if let Some(routes) = routes {
                self.seen.lock().unwrap().push(routes.current_route());
            }
            Ok(RegisterOutcome::Created)
        }
    }

    #[tokio::test]
    async fn test_handler_runs_inside_labelled_route() {
        let recorder = Arc::new(RouteRecorder::default());
        let state = AppState::new(Logger::default(), recorder.clone());
        *recorder.state.lock().unwrap() = Some(state.clone());

        post_register(
            routers(state.clone()),
            r#"{"username":"alice","password":"secret1"}"#,
        )
        .await;

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["UserRegister".to_string()]);
        assert!(state.routes().is_empty());
    }

    /// 收集 fmt 输出
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_handler_logs_carry_route() {
        let buf = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buf.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let (app, _, _) = app();
        post_register(app, r#"{"username":"alice","password":"secret1"}"#).await;

        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let handler_lines: Vec<_> = output
            .lines()
            .filter(|line| line.contains("caller=handlers.rs"))
            .collect();

        assert_eq!(handler_lines.len(), 2, "{}", output);
        assert!(handler_lines[0].contains("register request for 'alice', route=UserRegister"));
        assert!(handler_lines[1].contains("user 'alice' registered, route=UserRegister"));
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let (app, _, _) = app();
        let request = Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/api/v1/user/register"]["post"].is_object());
    }

    #[tokio::test]
    async fn test_swagger_ui_served() {
        let (app, _, _) = app();
        let request = Request::builder()
            .uri("/swagger/index.html")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (app, _, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/user/login")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
