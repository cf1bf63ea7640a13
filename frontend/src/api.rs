//! REST API 客户端
//!
//! `ApiClient` 负责：
//! - 为每个请求附加 Bearer token
//! - 401 响应时触发全局登出（白名单路由除外，见 `UnauthorizedPolicy`）
//! - 将错误响应映射为 `ApiError`
//!
//! 具体的 HTTP 实现通过 `HttpTransport` 注入，浏览器中为 `web::GlooTransport`，
//! 测试中为 `MockTransport`。

mod endpoints;
#[cfg(test)]
pub(crate) mod tests;

use async_trait::async_trait;
use bobinas_shared::protocol::{ApiRequest, HttpMethod};
use bobinas_shared::{Bobina, ConflictBody, FieldErrors, MessageBody, ValidationBody};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

// =========================================================
// 错误类型
// =========================================================

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// 422: 字段级校验错误
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },
    /// 409: 业务主键重复
    #[error("{message}")]
    Conflict {
        message: String,
        existing: Option<Bobina>,
    },
    /// 白名单路由上的 401，由调用方在流程内展示
    #[error("{0}")]
    Unauthorized(String),
    /// 401 已触发全局登出
    #[error("La sesión expiró, inicie sesión nuevamente")]
    SessionExpired,
    #[error("Error {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Error de red: {0}")]
    Transport(String),
    #[error("Respuesta inválida del servidor: {0}")]
    Decode(String),
}

impl ApiError {
    /// 字段级错误（仅 422 有）
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// 创建 bobina 时 HU 已存在
    ///
    /// 409 一律视为重复；422 只有在 `hu` 字段出错时才算，
    /// 格式错误在客户端已被拦截。
    pub fn is_duplicate_hu(&self) -> bool {
        match self {
            ApiError::Conflict { .. } => true,
            ApiError::Validation { errors, .. } => errors.contains("hu"),
            _ => false,
        }
    }

    fn from_response(status: u16, body: &str) -> Self {
        match status {
            422 => {
                let parsed: ValidationBody = decode_lenient(body);
                ApiError::Validation {
                    message: parsed
                        .message
                        .unwrap_or_else(|| "Revise los campos marcados".to_string()),
                    errors: parsed.errors,
                }
            }
            409 => {
                let parsed: ConflictBody = decode_lenient(body);
                ApiError::Conflict {
                    message: parsed
                        .message
                        .unwrap_or_else(|| "El registro ya existe".to_string()),
                    existing: parsed.bobina,
                }
            }
            401 => {
                let parsed: MessageBody = decode_lenient(body);
                ApiError::Unauthorized(
                    parsed
                        .message
                        .unwrap_or_else(|| "Credenciales inválidas".to_string()),
                )
            }
            403 => ApiError::Status {
                status,
                message: "No tiene permisos para esta acción".to_string(),
            },
            _ => {
                let parsed: MessageBody = decode_lenient(body);
                ApiError::Status {
                    status,
                    message: parsed
                        .message
                        .unwrap_or_else(|| "Error inesperado del servidor".to_string()),
                }
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn decode_lenient<T: DeserializeOwned + Default>(body: &str) -> T {
    serde_json_wasm::from_str(body).unwrap_or_default()
}

// =========================================================
// 传输层抽象 (HTTP Transport Abstraction)
// =========================================================

/// multipart 表单的一个部分
#[derive(Debug, Clone)]
pub enum FormPart<F> {
    Text { name: String, value: String },
    File { name: String, file: F, filename: String },
}

impl<F> FormPart<F> {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        FormPart::Text {
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody<F> {
    Empty,
    Json(String),
    Multipart(Vec<FormPart<F>>),
}

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest<F> {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody<F>,
}

impl<F> HttpRequest<F> {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP 传输特性
///
/// `File` 是 multipart 中文件部分的类型：浏览器里是 `web_sys::File`，
/// 测试中可以是任何可克隆的占位类型。
#[async_trait(?Send)]
pub trait HttpTransport {
    type File: Clone;

    async fn send(&self, request: HttpRequest<Self::File>) -> ApiResult<HttpResponse>;
}

// =========================================================
// 会话注入与 401 策略
// =========================================================

/// 当前 bearer token 的来源
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// 401 不触发全局登出的路由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedRoute {
    pub method: HttpMethod,
    pub path: &'static str,
    /// 仅当请求携带 líder 凭据时才豁免
    pub only_with_lead_credentials: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedPolicy {
    excluded: Vec<ExcludedRoute>,
}

impl Default for UnauthorizedPolicy {
    fn default() -> Self {
        Self {
            excluded: vec![
                ExcludedRoute {
                    method: HttpMethod::Post,
                    path: "/login",
                    only_with_lead_credentials: false,
                },
                // 手动登出时令牌可能已失效，由调用方自己清理
                ExcludedRoute {
                    method: HttpMethod::Post,
                    path: "/logout",
                    only_with_lead_credentials: false,
                },
                ExcludedRoute {
                    method: HttpMethod::Post,
                    path: "/auth/verificar-lider",
                    only_with_lead_credentials: false,
                },
                ExcludedRoute {
                    method: HttpMethod::Post,
                    path: "/bobinas",
                    only_with_lead_credentials: true,
                },
            ],
        }
    }
}

impl UnauthorizedPolicy {
    pub fn is_excluded(&self, method: HttpMethod, path: &str, has_lead_credentials: bool) -> bool {
        let path = path.split('?').next().unwrap_or(path).trim_end_matches('/');
        self.excluded.iter().any(|route| {
            route.method == method
                && route.path == path
                && (!route.only_with_lead_credentials || has_lead_credentials)
        })
    }
}

// =========================================================
// ApiClient
// =========================================================

pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

pub struct ApiClient<T: HttpTransport> {
    transport: T,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    policy: UnauthorizedPolicy,
    on_unauthorized: UnauthorizedHook,
}

impl<T: HttpTransport + Clone> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            base_url: self.base_url.clone(),
            tokens: self.tokens.clone(),
            policy: self.policy.clone(),
            on_unauthorized: self.on_unauthorized.clone(),
        }
    }
}

/// 单次请求的附加信息
#[derive(Debug, Clone, Copy, Default)]
struct RequestFlags {
    lead_credentials: bool,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(
        transport: T,
        base_url: &str,
        tokens: Arc<dyn TokenSource>,
        on_unauthorized: UnauthorizedHook,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            policy: UnauthorizedPolicy::default(),
            on_unauthorized,
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// 拼接查询字符串
    fn url_with_query(&self, path: &str, pairs: &[(&str, String)]) -> String {
        let url = self.url(path);
        if pairs.is_empty() {
            return url;
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())))
            .finish();
        format!("{}?{}", url, query)
    }

    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        url: String,
        body: RequestBody<T::File>,
        flags: RequestFlags,
    ) -> ApiResult<HttpResponse> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = self.tokens.token() {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        if matches!(body, RequestBody::Json(_)) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        log::debug!("[Api] {} {}", method.as_str(), path);
        let response = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await?;

        if response.status == 401 {
            if self
                .policy
                .is_excluded(method, path, flags.lead_credentials)
            {
                return Err(ApiError::from_response(401, &response.body));
            }
            log::warn!("[Api] 401 on {} {}, forcing logout", method.as_str(), path);
            (self.on_unauthorized)();
            return Err(ApiError::SessionExpired);
        }

        if !response.is_success() {
            let err = ApiError::from_response(response.status, &response.body);
            log::debug!("[Api] {} {} -> {}", method.as_str(), path, response.status);
            return Err(err);
        }

        Ok(response)
    }

    fn decode<R: DeserializeOwned>(response: &HttpResponse) -> ApiResult<R> {
        serde_json_wasm::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn encode<B: serde::Serialize>(body: &B) -> ApiResult<RequestBody<T::File>> {
        serde_json_wasm::to_string(body)
            .map(RequestBody::Json)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// 固定路径的 JSON 请求
    pub async fn call<R: ApiRequest>(&self, request: &R) -> ApiResult<R::Response> {
        let body = match R::METHOD {
            HttpMethod::Get => RequestBody::Empty,
            _ => Self::encode(request)?,
        };
        let response = self
            .execute(R::METHOD, R::PATH, self.url(R::PATH), body, RequestFlags::default())
            .await?;
        Self::decode(&response)
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<R> {
        let url = self.url_with_query(path, query);
        let response = self
            .execute(HttpMethod::Get, path, url, RequestBody::Empty, RequestFlags::default())
            .await?;
        Self::decode(&response)
    }

    async fn send_json<B: serde::Serialize, R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> ApiResult<R> {
        let response = self
            .execute(method, path, self.url(path), Self::encode(body)?, RequestFlags::default())
            .await?;
        Self::decode(&response)
    }

    async fn send_multipart<R: DeserializeOwned>(
        &self,
        path: &str,
        parts: Vec<FormPart<T::File>>,
        flags: RequestFlags,
    ) -> ApiResult<R> {
        let response = self
            .execute(
                HttpMethod::Post,
                path,
                self.url(path),
                RequestBody::Multipart(parts),
                flags,
            )
            .await?;
        Self::decode(&response)
    }

    /// DELETE，接受 204 或空响应体
    async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(
            HttpMethod::Delete,
            path,
            self.url(path),
            RequestBody::Empty,
            RequestFlags::default(),
        )
        .await?;
        Ok(())
    }
}
