//! HTTP 传输实现
//!
//! 基于 `gloo-net` 的 fetch 封装，实现 `api::HttpTransport`。
//! multipart 请求体用 `FormData` 构造，由浏览器生成 boundary。

use crate::api::{ApiError, ApiResult, FormPart, HttpRequest, HttpResponse, HttpTransport, RequestBody};
use async_trait::async_trait;
use bobinas_shared::protocol::HttpMethod;
use gloo_net::http::{Method, RequestBuilder};
use web_sys::{File, FormData};

/// 浏览器 fetch 传输
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTransport;

fn method_of(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// 构造 multipart 表单
fn form_data(parts: &[FormPart<File>]) -> ApiResult<FormData> {
    let form = FormData::new()
        .map_err(|e| ApiError::Transport(format!("创建 FormData 失败: {:?}", e)))?;
    for part in parts {
        let appended = match part {
            FormPart::Text { name, value } => form.append_with_str(name, value),
            FormPart::File {
                name,
                file,
                filename,
            } => form.append_with_blob_and_filename(name, file, filename),
        };
        appended.map_err(|e| {
            ApiError::Transport(format!("添加表单字段 {} 失败: {:?}", part.name(), e))
        })?;
    }
    Ok(form)
}

#[async_trait(?Send)]
impl HttpTransport for GlooTransport {
    type File = File;

    async fn send(&self, request: HttpRequest<File>) -> ApiResult<HttpResponse> {
        let mut builder = RequestBuilder::new(&request.url).method(method_of(request.method));
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        let built = match request.body {
            RequestBody::Empty => builder.build(),
            RequestBody::Json(json) => builder.body(json),
            RequestBody::Multipart(parts) => builder.body(form_data(&parts)?),
        }
        .map_err(|e| ApiError::Transport(format!("请求构建失败: {}", e)))?;

        let response = built
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        // 204 等空响应体读取失败时按空串处理
        let body = response.text().await.unwrap_or_default();
        Ok(HttpResponse { status, body })
    }
}
