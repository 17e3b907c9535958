use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use forever_core::{
    Code, Logger, RequestContext, debugf, errorf, infof,
    logger::RouteTable,
    message,
    user::{NewUser, RegisterOutcome, UserStore},
    warnf,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub log: Logger,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(log: Logger, users: Arc<dyn UserStore>) -> Self {
        Self { log, users }
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        self.log.routes()
    }
}

/// 注册请求
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    /// 3~32 位字母、数字或下划线
    #[schema(example = "alice_01")]
    pub username: String,
    /// 6~64 个字符
    #[schema(example = "secret1")]
    pub password: String,
}

/// 注册成功返回的数据
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterData {
    pub username: String,
}

/// 统一响应体
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Envelope<T> {
    pub code: i32,
    pub message: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 业务响应：HTTP 状态码与响应体都由 [`Code`] 决定
#[derive(Debug)]
pub struct Reply<T> {
    code: Code,
    data: Option<T>,
}

impl<T> Reply<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: message::SUCCESS,
            data: Some(data),
        }
    }

    pub fn code(code: Code) -> Self {
        Self { code, data: None }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.status).unwrap_or(StatusCode::OK);
        let body = Envelope {
            code: self.code.code,
            message: self.code.message_en.to_string(),
            text: self.code.message_cn.to_string(),
            data: self.data,
        };

        (status, Json(body)).into_response()
    }
}

/// 用户注册
#[utoipa::path(
    post,
    path = "/api/v1/user/register",
    tag = "user",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "code=0 注册成功；200 参数错误；402 用户已存在或正在注册；500 服务器内部异常", body = Envelope<RegisterData>)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Reply<RegisterData>, AppError> {
    let log = state.log.scoped(&ctx);

    let Json(req) = payload.map_err(|e| {
        warnf!(log, "register body rejected: {}", e);
        forever_core::Error::InvalidParam(e.body_text())
    })?;
    debugf!(log, "register request for '{}'", req.username);

    let user = NewUser::parse(&req.username, &req.password)
        .inspect_err(|e| warnf!(log, "register param error: {}", e))?;

    match state.users.register(&user).await {
        Ok(RegisterOutcome::Created) => {
            infof!(log, "user '{}' registered", user.username);
            Ok(Reply::success(RegisterData {
                username: user.username,
            }))
        }
        Ok(RegisterOutcome::AlreadyExists) => {
            infof!(log, "user '{}' already exists", user.username);
            Ok(Reply::code(message::REQUEST_FAIL))
        }
        Ok(RegisterOutcome::InProgress) => {
            infof!(log, "user '{}' is being registered", user.username);
            Ok(Reply::code(message::REQUEST_FAIL))
        }
        Err(e) => {
            errorf!(log, "register '{}' failed: {}", user.username, e);
            Err(e.into())
        }
    }
}

/// 应用错误类型
#[derive(Debug)]
pub struct AppError(forever_core::Error);

impl AppError {
    fn code(&self) -> Code {
        match &self.0 {
            forever_core::Error::InvalidParam(_) => message::PARAM_ERR,
            _ => message::SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        Reply::<()>::code(self.code()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<forever_core::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
