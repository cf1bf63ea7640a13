use super::*;
use bobinas_shared::{
    BobinaFilter, ConfigPayload, LeadCredentials, NewBobina, RetentionConfig, Role, SortOrder,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 测试用的文件占位类型
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FakeFile(pub &'static str);

/// 按顺序返回预设响应，并记录收到的请求
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    responses: Rc<RefCell<VecDeque<ApiResult<HttpResponse>>>>,
    requests: Rc<RefCell<Vec<HttpRequest<FakeFile>>>>,
}

impl MockTransport {
    pub(crate) fn respond(&self, status: u16, body: &str) -> &Self {
        self.responses.borrow_mut().push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub(crate) fn fail(&self, message: &str) -> &Self {
        self.responses
            .borrow_mut()
            .push_back(Err(ApiError::Transport(message.to_string())));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest<FakeFile>> {
        self.requests.borrow().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest<FakeFile> {
        self.requests
            .borrow()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait(?Send)]
impl HttpTransport for MockTransport {
    type File = FakeFile;

    async fn send(&self, request: HttpRequest<FakeFile>) -> ApiResult<HttpResponse> {
        self.requests.borrow_mut().push(request);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no response queued".into())))
    }
}

pub(crate) struct StaticToken(pub Option<&'static str>);

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.map(str::to_string)
    }
}

/// 构造测试客户端，返回 401 钩子的调用计数
pub(crate) fn client_with(
    transport: &MockTransport,
    token: Option<&'static str>,
) -> (ApiClient<MockTransport>, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let client = ApiClient::new(
        transport.clone(),
        "/api/",
        Arc::new(StaticToken(token)),
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    (client, hits)
}

pub(crate) const BOBINA_JSON: &str = r#"{"id":1,"hu":"123456789","cliente":"Acme","foto_url":"/storage/fotos/1.jpg","fecha_embarque":"2024-05-02","dias_restantes":88}"#;

fn text_value<'a>(parts: &'a [FormPart<FakeFile>], field: &str) -> Option<&'a str> {
    parts.iter().find_map(|part| match part {
        FormPart::Text { name, value } if name == field => Some(value.as_str()),
        _ => None,
    })
}

fn multipart(request: &HttpRequest<FakeFile>) -> &[FormPart<FakeFile>] {
    match &request.body {
        RequestBody::Multipart(parts) => parts,
        other => panic!("expected multipart body, got {other:?}"),
    }
}

// =========================================================
// 请求头与 URL
// =========================================================

#[tokio::test]
async fn attaches_bearer_token_and_accept_header() {
    let transport = MockTransport::default();
    transport.respond(200, r#"{"id":2,"username":"ana","role":"admin"}"#);
    let (client, _) = client_with(&transport, Some("tok-9"));

    let user = client.me().await.unwrap();

    assert_eq!(user.role, Role::Admin);
    let request = transport.last_request();
    assert_eq!(request.url, "/api/me");
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.header("authorization"), Some("Bearer tok-9"));
    assert_eq!(request.header("Accept"), Some("application/json"));
    assert!(matches!(request.body, RequestBody::Empty));
}

#[tokio::test]
async fn omits_authorization_without_session() {
    let transport = MockTransport::default();
    transport.respond(200, r#"{"token":"t","role":"embarcador","userId":3}"#);
    let (client, _) = client_with(&transport, None);

    let login = client.login(" ana ", "pw").await.unwrap();

    assert_eq!(login.user_id, 3);
    let request = transport.last_request();
    assert_eq!(request.header("Authorization"), None);
    assert_eq!(request.header("Content-Type"), Some("application/json"));
    match request.body {
        RequestBody::Json(json) => assert_eq!(json, r#"{"username":"ana","password":"pw"}"#),
        other => panic!("unexpected body {other:?}"),
    }
}

#[tokio::test]
async fn list_query_string_is_encoded() {
    let transport = MockTransport::default();
    transport.respond(
        200,
        &format!(r#"{{"data":[{BOBINA_JSON}],"current_page":1,"last_page":2,"total":11}}"#),
    );
    let (client, _) = client_with(&transport, Some("t"));
    let filter = BobinaFilter {
        search: "12 34".into(),
        cliente: "Acme & Co".into(),
        orden_dias: Some(SortOrder::Asc),
        page: 0,
        ..Default::default()
    };

    let page = client.list_bobinas(&filter).await.unwrap();

    assert_eq!(page.data.len(), 1);
    assert!(page.has_next());
    assert_eq!(
        transport.last_request().url,
        "/api/bobinas?search=12+34&cliente=Acme+%26+Co&orden_dias=asc&page=1"
    );
}

// =========================================================
// 401 策略
// =========================================================

#[tokio::test]
async fn unauthorized_on_protected_route_forces_logout() {
    let transport = MockTransport::default();
    transport.respond(401, r#"{"message":"Unauthenticated."}"#);
    let (client, hits) = client_with(&transport, Some("stale"));

    let err = client.list_configs().await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unauthorized_on_login_is_reported_inline() {
    let transport = MockTransport::default();
    transport.respond(401, r#"{"message":"Credenciales incorrectas"}"#);
    let (client, hits) = client_with(&transport, None);

    let err = client.login("ana", "bad").await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Credenciales incorrectas"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unauthorized_on_lead_verification_keeps_session() {
    let transport = MockTransport::default();
    transport.respond(401, "");
    let (client, hits) = client_with(&transport, Some("t"));

    let err = client
        .verify_lead(&LeadCredentials {
            username: "luis".into(),
            password: "x".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(err.to_string(), "Credenciales inválidas");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_logout_does_not_trigger_forced_logout() {
    let transport = MockTransport::default();
    transport.respond(401, "");
    let (client, hits) = client_with(&transport, Some("expired"));

    let err = client.logout().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(transport.last_request().url, "/api/logout");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn lead_verification_posts_plain_credentials() {
    let transport = MockTransport::default();
    transport.respond(200, r#"{"valid":true,"username":"luis"}"#);
    let (client, _) = client_with(&transport, Some("t"));

    let verification = client
        .verify_lead(&LeadCredentials {
            username: "luis".into(),
            password: "pw".into(),
        })
        .await
        .unwrap();

    assert!(verification.valid);
    let request = transport.last_request();
    assert_eq!(request.url, "/api/auth/verificar-lider");
    assert_eq!(request.method, HttpMethod::Post);
    match request.body {
        RequestBody::Json(json) => assert_eq!(json, r#"{"username":"luis","password":"pw"}"#),
        other => panic!("expected JSON body, got {other:?}"),
    }
}

#[tokio::test]
async fn bobina_creation_is_exempt_only_with_lead_credentials() {
    let transport = MockTransport::default();
    transport.respond(401, "{}").respond(401, "{}");
    let (client, hits) = client_with(&transport, Some("t"));
    let bobina = NewBobina {
        hu: "123456789".into(),
        cliente: "Acme".into(),
    };
    let lead = LeadCredentials {
        username: "luis".into(),
        password: "pw".into(),
    };

    let with_lead = client
        .create_bobina(&bobina, FakeFile("a"), "a.jpg", Some(&lead))
        .await
        .unwrap_err();
    assert!(matches!(with_lead, ApiError::Unauthorized(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let without_lead = client
        .create_bobina(&bobina, FakeFile("a"), "a.jpg", None)
        .await
        .unwrap_err();
    assert!(matches!(without_lead, ApiError::SessionExpired));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn policy_ignores_query_and_trailing_slash() {
    let policy = UnauthorizedPolicy::default();
    assert!(policy.is_excluded(HttpMethod::Post, "/login/", false));
    assert!(policy.is_excluded(HttpMethod::Post, "/logout", false));
    assert!(policy.is_excluded(HttpMethod::Post, "/auth/verificar-lider?x=1", false));
    assert!(!policy.is_excluded(HttpMethod::Get, "/login", false));
    assert!(!policy.is_excluded(HttpMethod::Post, "/bobinas", false));
    assert!(policy.is_excluded(HttpMethod::Post, "/bobinas", true));
    assert!(!policy.is_excluded(HttpMethod::Post, "/bobinas/7", true));
}

// =========================================================
// 错误映射
// =========================================================

#[tokio::test]
async fn validation_errors_keep_field_messages() {
    let transport = MockTransport::default();
    transport.respond(
        422,
        r#"{"message":"The given data was invalid.","errors":{"dias_retencion":["Debe ser mayor a 0"]}}"#,
    );
    let (client, _) = client_with(&transport, Some("t"));

    let err = client
        .create_config(&ConfigPayload {
            cliente: "Acme".into(),
            dias_retencion: 0,
        })
        .await
        .unwrap_err();

    let errors = err.field_errors().unwrap();
    assert_eq!(errors.first("dias_retencion"), Some("Debe ser mayor a 0"));
    assert!(!err.is_duplicate_hu());
}

#[test]
fn duplicate_hu_detection() {
    let conflict = ApiError::from_response(409, &format!(r#"{{"message":"dup","bobina":{BOBINA_JSON}}}"#));
    assert!(conflict.is_duplicate_hu());
    match conflict {
        ApiError::Conflict { existing, .. } => assert_eq!(existing.unwrap().hu, "123456789"),
        other => panic!("unexpected {other:?}"),
    }

    let hu_taken = ApiError::from_response(422, r#"{"errors":{"hu":["El HU ya fue registrado"]}}"#);
    assert!(hu_taken.is_duplicate_hu());
    assert_eq!(hu_taken.to_string(), "Revise los campos marcados");

    let photo_missing = ApiError::from_response(422, r#"{"errors":{"foto":["requerida"]}}"#);
    assert!(!photo_missing.is_duplicate_hu());
}

#[test]
fn unparseable_error_bodies_fall_back_to_generic_messages() {
    let err = ApiError::from_response(500, "<html>oops</html>");
    assert_eq!(err.to_string(), "Error 500: Error inesperado del servidor");
    let forbidden = ApiError::from_response(403, "{}");
    assert!(matches!(forbidden, ApiError::Status { status: 403, .. }));
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let transport = MockTransport::default();
    transport.respond(200, "not json");
    let (client, _) = client_with(&transport, Some("t"));

    let err = client.list_clientes().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn transport_failures_propagate() {
    let transport = MockTransport::default();
    transport.fail("offline");
    let (client, hits) = client_with(&transport, Some("t"));

    let err = client.get_bobina(4).await.unwrap_err();
    assert_eq!(err.to_string(), "Error de red: offline");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

// =========================================================
// multipart
// =========================================================

#[tokio::test]
async fn create_bobina_sends_photo_and_lead_fields() {
    let transport = MockTransport::default();
    transport.respond(201, BOBINA_JSON);
    let (client, _) = client_with(&transport, Some("t"));

    let created = client
        .create_bobina(
            &NewBobina {
                hu: "123456789".into(),
                cliente: "Acme".into(),
            },
            FakeFile("jpeg"),
            "captura.jpg",
            Some(&LeadCredentials {
                username: " luis ".into(),
                password: "pw".into(),
            }),
        )
        .await
        .unwrap();
    assert_eq!(created.id, 1);

    let request = transport.last_request();
    assert_eq!(request.url, "/api/bobinas");
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.header("Content-Type"), None);
    let parts = multipart(&request);
    assert_eq!(text_value(parts, "hu"), Some("123456789"));
    assert_eq!(text_value(parts, "lider_username"), Some("luis"));
    assert_eq!(text_value(parts, "lider_password"), Some("pw"));
    assert!(parts.iter().any(|p| matches!(
        p,
        FormPart::File { name, file, filename }
            if name == "foto" && *file == FakeFile("jpeg") && filename == "captura.jpg"
    )));
}

#[tokio::test]
async fn update_bobina_tunnels_put_through_post() {
    let transport = MockTransport::default();
    transport.respond(200, BOBINA_JSON).respond(200, BOBINA_JSON);
    let (client, _) = client_with(&transport, Some("t"));

    client.update_bobina(1, " Acme ", None).await.unwrap();
    client
        .update_bobina(1, "Acme", Some((FakeFile("new"), "nueva.jpg".into())))
        .await
        .unwrap();

    let requests = transport.requests();
    let first = multipart(&requests[0]);
    assert_eq!(requests[0].url, "/api/bobinas/1");
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(text_value(first, "_method"), Some("PUT"));
    assert_eq!(text_value(first, "cliente"), Some("Acme"));
    assert!(!first.iter().any(|p| p.name() == "foto"));
    assert!(multipart(&requests[1]).iter().any(|p| p.name() == "foto"));
}

#[tokio::test]
async fn delete_accepts_empty_body() {
    let transport = MockTransport::default();
    transport.respond(204, "");
    let (client, _) = client_with(&transport, Some("t"));

    client.delete_user(8).await.unwrap();

    let request = transport.last_request();
    assert_eq!(request.method, HttpMethod::Delete);
    assert_eq!(request.url, "/api/users/8");
}

#[tokio::test]
async fn find_by_hu_matches_exactly() {
    let transport = MockTransport::default();
    transport.respond(
        200,
        &format!(
            r#"{{"data":[{{"id":9,"hu":"1234567890","cliente":"X"}},{BOBINA_JSON}]}}"#
        ),
    );
    let (client, _) = client_with(&transport, Some("t"));

    let found = client.find_bobina_by_hu("123456789").await.unwrap();
    assert_eq!(found.map(|b| b.id), Some(1));
}

#[tokio::test]
async fn configs_decode_as_plain_list() {
    let transport = MockTransport::default();
    transport.respond(200, r#"[{"id":1,"cliente":"Acme","dias_retencion":30}]"#);
    let (client, _) = client_with(&transport, Some("t"));

    let configs: Vec<RetentionConfig> = client.list_configs().await.unwrap();
    assert_eq!(configs[0].dias_retencion, 30);
}
