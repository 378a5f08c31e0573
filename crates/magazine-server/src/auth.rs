use axum::body::Body;
use axum::extract::{Extension, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use magazine_common::types::{
    ChangePasswordRequest, LoginRequest, LoginResponse, User, UserInfo, UserRole,
};
use magazine_storage::auth::{hash_password, verify_password};
use magazine_storage::UserUpdate;
use serde::{Deserialize, Serialize};

use crate::api::{error_response, storage_error_response, success_response, validate_request};
use crate::logging::TraceId;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// `users.token_version` at issue time; a mismatch revokes the token.
    pub ver: i64,
    pub iat: u64,
    pub exp: u64,
}

/// The authenticated caller, inserted into request extensions by
/// [`jwt_auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

pub fn create_token(secret: &str, user: &User, expire_secs: u64) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
        ver: user.token_version,
        iat: now,
        exp: now + expire_secs,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn trace_id_of(req: &Request<Body>) -> String {
    req.extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default()
}

/// JWT 鉴权中间件
///
/// 校验 Bearer Token，并确认用户仍存在、未被禁用且 `token_version` 未变化。
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trace_id = trace_id_of(&req);
    let unauthorized =
        |msg: &str| error_response(StatusCode::UNAUTHORIZED, &trace_id, "unauthorized", msg);

    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.is_empty() => token,
        Some(_) => return unauthorized("invalid authorization header"),
        None if auth_header.is_none() => return unauthorized("missing authorization header"),
        None => return unauthorized("invalid authorization header"),
    };

    let claims = match validate_token(&state.jwt_secret, token) {
        Ok(claims) => claims,
        Err(e) => {
            if matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            ) {
                return error_response(
                    StatusCode::UNAUTHORIZED,
                    &trace_id,
                    "token_expired",
                    "token expired",
                );
            }
            return unauthorized("invalid token");
        }
    };

    let user = match state.store.get_user_by_id(&claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized("invalid token"),
        Err(e) => return storage_error_response(&trace_id, e),
    };

    if !user.is_active || user.token_version != claims.ver {
        tracing::warn!(trace_id = %trace_id, user_id = %user.id, "Rejected revoked token");
        return unauthorized("token revoked");
    }

    req.extensions_mut().insert(CurrentUser::from(&user));
    next.run(req).await
}

fn issue_login_response(state: &AppState, trace_id: &str, user: &User) -> Response {
    match create_token(&state.jwt_secret, user, state.token_expire_secs) {
        Ok(token) => success_response(
            StatusCode::OK,
            trace_id,
            LoginResponse {
                access_token: token,
                token_type: "Bearer".to_string(),
                expires_in: state.token_expire_secs,
                user: UserInfo::from(user),
            },
        ),
        Err(e) => {
            tracing::error!(trace_id = %trace_id, error = %e, "Failed to create token");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "internal_error",
                "internal error",
            )
        }
    }
}

/// 登录接口
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = LoginResponse),
        (status = 401, description = "邮箱或密码错误", body = crate::api::ApiError),
        (status = 403, description = "账号已禁用", body = crate::api::ApiError),
        (status = 422, description = "请求参数错误", body = crate::api::ApiError)
    )
)]
pub async fn login(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }

    let invalid = || {
        error_response(
            StatusCode::UNAUTHORIZED,
            &trace_id,
            "unauthorized",
            "invalid credentials",
        )
    };

    let user = match state.store.get_user_by_email(&req.email).await {
        Ok(Some(u)) => u,
        Ok(None) => return invalid(),
        Err(e) => return storage_error_response(&trace_id, e),
    };

    match verify_password(&req.password, &user.password_hash) {
        Ok(true) => {}
        _ => return invalid(),
    }

    if !user.is_active {
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "account is disabled",
        );
    }

    tracing::info!(trace_id = %trace_id, user_id = %user.id, "User logged in");
    issue_login_response(&state, &trace_id, &user)
}

/// 获取当前登录用户信息。
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "当前用户", body = UserInfo),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
pub async fn me(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.get_user_by_id(&current.id).await {
        Ok(Some(user)) => success_response(StatusCode::OK, &trace_id, UserInfo::from(&user)),
        Ok(None) => crate::api::not_found_response(&trace_id, "user"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 修改当前用户密码。
/// 成功后旧 Token 全部失效，响应中返回新 Token。
#[utoipa::path(
    post,
    path = "/v1/auth/password",
    tag = "Auth",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "密码已修改，返回新 Token", body = LoginResponse),
        (status = 401, description = "未认证", body = crate::api::ApiError),
        (status = 422, description = "当前密码错误或新密码不合法", body = crate::api::ApiError)
    )
)]
pub async fn change_password(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(req): Json<ChangePasswordRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }

    let user = match state.store.get_user_by_id(&current.id).await {
        Ok(Some(u)) => u,
        Ok(None) => return crate::api::not_found_response(&trace_id, "user"),
        Err(e) => return storage_error_response(&trace_id, e),
    };

    if !matches!(verify_password(&req.current_password, &user.password_hash), Ok(true)) {
        return storage_error_response(
            &trace_id,
            magazine_storage::StorageError::field("current_password", "is incorrect"),
        );
    }

    let password_hash = match hash_password(&req.new_password) {
        Ok(h) => h,
        Err(e) => return storage_error_response(&trace_id, e),
    };

    let updated = match state
        .store
        .update_user(
            &user.id,
            UserUpdate {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await
    {
        Ok(u) => u,
        Err(e) => return storage_error_response(&trace_id, e),
    };

    tracing::info!(trace_id = %trace_id, user_id = %updated.id, "Password changed");
    issue_login_response(&state, &trace_id, &updated)
}
