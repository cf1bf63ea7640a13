use super::*;
use crate::api::tests::{BOBINA_JSON, FakeFile, MockTransport, client_with};
use crate::api::{FormPart, RequestBody};
use bobinas_shared::protocol::HttpMethod;
use std::sync::atomic::Ordering;

const REPLACED_JSON: &str = r#"{"id":12,"hu":"123456789","cliente":"Acme","foto_url":"/storage/fotos/12.jpg","fecha_embarque":"2024-05-03","dias_restantes":90,"fecha_reemplazo":"2024-05-03T09:12:00Z","reemplazador":"ana","aprobador":"luis"}"#;

fn acme() -> NewBobina {
    NewBobina {
        hu: "123456789".into(),
        cliente: "Acme".into(),
    }
}

fn bobina(id: u64) -> Bobina {
    Bobina {
        id,
        hu: "123456789".into(),
        cliente: "Acme".into(),
        foto_url: None,
        fecha_embarque: None,
        dias_restantes: None,
        fecha_reemplazo: None,
        reemplazador: None,
        aprobador: None,
    }
}

/// 把流程推进到 AwaitingLeadAuthorization
fn awaiting_lead() -> ReplacementFlow {
    let mut flow = ReplacementFlow::new();
    let ticket = flow.begin_submit().unwrap();
    flow.finish_submit(ticket, SubmitOutcome::Duplicate(Some(bobina(1))));
    assert!(flow.confirm());
    flow
}

fn fill_lead(flow: &mut ReplacementFlow) {
    flow.set_lead_username("luis".into());
    flow.set_lead_password("clave".into());
}

// =========================================================
// 端到端场景
// =========================================================

#[tokio::test]
async fn register_then_replace_with_lead_authorization() {
    let transport = MockTransport::default();
    let (api, logouts) = client_with(&transport, Some("tok"));
    let mut flow = ReplacementFlow::new();

    // 第一次登记：HU 不存在
    transport.respond(201, BOBINA_JSON);
    let ticket = flow.begin_submit().unwrap();
    let outcome = submit_registration(&api, &acme(), FakeFile("foto"), "foto_123456789.jpg").await;
    assert_eq!(flow.finish_submit(ticket, outcome).map(|e| e.to_string()), None);
    assert_eq!(flow.state().success_message(), Some("Bobina registrada correctamente"));

    let draft = RegistrationDraft {
        hu: "123456789".into(),
        cliente: "Acme".into(),
    };
    assert_eq!(
        ResetPolicy::for_role(Role::Embarcador).next_draft(&draft),
        RegistrationDraft {
            hu: String::new(),
            cliente: "Acme".into()
        }
    );
    flow.reset();

    // 同一 HU 再次登记：冲突 → 确认 → 授权 → 替换
    transport.respond(409, &format!(r#"{{"message":"El HU ya existe","bobina":{BOBINA_JSON}}}"#));
    let ticket = flow.begin_submit().unwrap();
    let outcome = submit_registration(&api, &acme(), FakeFile("foto"), "foto_123456789.jpg").await;
    assert!(flow.finish_submit(ticket, outcome).is_none());
    assert!(flow.state().shows_confirmation());
    assert_eq!(flow.state().existing().map(|b| b.id), Some(1));

    assert!(flow.confirm());
    assert!(flow.state().shows_lead_dialog());
    fill_lead(&mut flow);

    transport
        .respond(200, r#"{"valid":true,"username":"luis"}"#)
        .respond(201, REPLACED_JSON);
    let (ticket, credentials) = flow.begin_authorize().unwrap();
    assert!(flow.state().is_busy());
    let outcome = authorize_replacement(
        &api,
        &acme(),
        FakeFile("foto"),
        "foto_123456789.jpg",
        &credentials,
    )
    .await;
    flow.finish_authorize(ticket, outcome);

    match flow.state() {
        FlowState::Replaced(replaced) => {
            assert_eq!(replaced.fecha_reemplazo.as_deref(), Some("2024-05-03T09:12:00Z"));
            assert_eq!(replaced.aprobador.as_deref(), Some("luis"));
        }
        other => panic!("expected Replaced, got {other:?}"),
    }
    assert_eq!(flow.credentials(), &LeadCredentials::default());
    assert_eq!(logouts.load(Ordering::SeqCst), 0);

    let requests = transport.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[2].url, "/api/auth/verificar-lider");
    let RequestBody::Multipart(parts) = &requests[3].body else {
        panic!("replacement write must be multipart");
    };
    assert!(parts.iter().any(|p| matches!(
        p,
        FormPart::Text { name, value } if name == "lider_username" && value == "luis"
    )));
    assert!(parts.iter().any(|p| p.name() == "foto"));
}

#[tokio::test]
async fn duplicate_from_validation_error_looks_up_existing_record() {
    let transport = MockTransport::default();
    let (api, _) = client_with(&transport, Some("tok"));
    transport
        .respond(422, r#"{"message":"invalid","errors":{"hu":["El HU ya fue registrado"]}}"#)
        .respond(200, &format!(r#"{{"data":[{BOBINA_JSON}]}}"#));

    let outcome = submit_registration(&api, &acme(), FakeFile("f"), "f.jpg").await;

    match outcome {
        SubmitOutcome::Duplicate(Some(existing)) => assert_eq!(existing.id, 1),
        other => panic!("unexpected outcome {other:?}"),
    }
    let lookup = transport.last_request();
    assert_eq!(lookup.method, HttpMethod::Get);
    assert_eq!(lookup.url, "/api/bobinas?search=123456789&page=1");
}

#[tokio::test]
async fn failed_lookup_still_offers_replacement() {
    let transport = MockTransport::default();
    let (api, _) = client_with(&transport, Some("tok"));
    transport
        .respond(422, r#"{"errors":{"hu":["duplicado"]}}"#)
        .fail("offline");

    let outcome = submit_registration(&api, &acme(), FakeFile("f"), "f.jpg").await;
    assert!(matches!(outcome, SubmitOutcome::Duplicate(None)));
}

#[tokio::test]
async fn other_errors_are_returned_to_the_form() {
    let transport = MockTransport::default();
    let (api, _) = client_with(&transport, Some("tok"));
    transport.respond(422, r#"{"errors":{"foto":["La foto es obligatoria"]}}"#);
    let mut flow = ReplacementFlow::new();

    let ticket = flow.begin_submit().unwrap();
    let outcome = submit_registration(&api, &acme(), FakeFile("f"), "f.jpg").await;
    let err = flow.finish_submit(ticket, outcome).unwrap();

    assert_eq!(flow.state(), &FlowState::Idle);
    assert_eq!(
        err.field_errors().and_then(|e| e.first("foto")),
        Some("La foto es obligatoria")
    );
}

// =========================================================
// líder 授权失败
// =========================================================

#[tokio::test]
async fn rejected_lead_credentials_reprompt_without_logout() {
    let transport = MockTransport::default();
    let (api, logouts) = client_with(&transport, Some("tok"));
    let mut flow = awaiting_lead();

    for attempt in 0..3 {
        fill_lead(&mut flow);
        transport.respond(401, r#"{"message":"Credenciales incorrectas"}"#);
        let (ticket, credentials) = flow.begin_authorize().unwrap();
        let outcome = authorize_replacement(&api, &acme(), FakeFile("f"), "f.jpg", &credentials).await;
        flow.finish_authorize(ticket, outcome);

        assert_eq!(
            flow.state().lead_error(),
            Some("Credenciales incorrectas"),
            "attempt {attempt}"
        );
        assert!(flow.state().shows_lead_dialog());
        assert_eq!(flow.credentials().username, "luis");
        assert!(flow.credentials().password.is_empty());
    }
    assert_eq!(logouts.load(Ordering::SeqCst), 0);
    // 验证失败时不会执行替换写入
    assert!(transport.requests().iter().all(|r| r.url.ends_with("/auth/verificar-lider")));
}

#[tokio::test]
async fn verification_returning_invalid_is_denied() {
    let transport = MockTransport::default();
    let (api, _) = client_with(&transport, Some("tok"));
    transport.respond(200, r#"{"valid":false}"#);

    let outcome = authorize_replacement(
        &api,
        &acme(),
        FakeFile("f"),
        "f.jpg",
        &LeadCredentials {
            username: "pedro".into(),
            password: "x".into(),
        },
    )
    .await;

    assert!(matches!(outcome, AuthorizeOutcome::Denied(ref m) if m == LEAD_REJECTED));
}

#[tokio::test]
async fn replacement_write_401_stays_in_dialog() {
    let transport = MockTransport::default();
    let (api, logouts) = client_with(&transport, Some("tok"));
    transport
        .respond(200, r#"{"valid":true}"#)
        .respond(401, r#"{"message":"El usuario no es líder"}"#);

    let outcome = authorize_replacement(
        &api,
        &acme(),
        FakeFile("f"),
        "f.jpg",
        &LeadCredentials {
            username: "luis".into(),
            password: "clave".into(),
        },
    )
    .await;

    assert!(matches!(outcome, AuthorizeOutcome::Denied(ref m) if m == "El usuario no es líder"));
    assert_eq!(logouts.load(Ordering::SeqCst), 0);
}

#[test]
fn network_failure_keeps_credentials_for_retry() {
    let mut flow = awaiting_lead();
    fill_lead(&mut flow);
    let (ticket, _) = flow.begin_authorize().unwrap();

    flow.finish_authorize(
        ticket,
        AuthorizeOutcome::Failed(ApiError::Transport("offline".into())),
    );

    assert_eq!(flow.state().lead_error(), Some("Error de red: offline"));
    assert_eq!(flow.credentials().password, "clave");
}

#[test]
fn incomplete_credentials_do_not_start_authorization() {
    let mut flow = awaiting_lead();
    flow.set_lead_username("luis".into());

    assert!(flow.begin_authorize().is_none());
    assert_eq!(flow.state().lead_error(), Some(LEAD_CREDENTIALS_REQUIRED));
    assert!(!flow.state().is_busy());
}

// =========================================================
// 取消与过期结果
// =========================================================

#[test]
fn cancel_from_every_non_terminal_state_clears_authorization_data() {
    let mut submitting = ReplacementFlow::new();
    submitting.begin_submit();

    let mut confirming = ReplacementFlow::new();
    let ticket = confirming.begin_submit().unwrap();
    confirming.finish_submit(ticket, SubmitOutcome::Duplicate(None));

    let mut awaiting = awaiting_lead();
    fill_lead(&mut awaiting);

    let mut authorizing = awaiting_lead();
    fill_lead(&mut authorizing);
    authorizing.begin_authorize().unwrap();

    for mut flow in [ReplacementFlow::new(), submitting, confirming, awaiting, authorizing] {
        assert!(flow.cancel());
        assert_eq!(flow.state(), &FlowState::Idle);
        assert_eq!(flow.credentials(), &LeadCredentials::default());
        assert_eq!(flow.state().lead_error(), None);
    }
}

#[test]
fn outcome_arriving_after_cancel_is_ignored() {
    let mut flow = awaiting_lead();
    fill_lead(&mut flow);
    let (ticket, _) = flow.begin_authorize().unwrap();
    flow.cancel();

    flow.finish_authorize(ticket, AuthorizeOutcome::Replaced(bobina(3)));
    assert_eq!(flow.state(), &FlowState::Idle);

    let stale = flow.begin_submit().unwrap();
    flow.cancel();
    let fresh = flow.begin_submit().unwrap();
    assert_ne!(stale, fresh);
    flow.finish_submit(stale, SubmitOutcome::Created(bobina(4)));
    assert_eq!(flow.state(), &FlowState::SubmitAttempted);
}

#[test]
fn duplicate_submission_is_blocked_while_busy() {
    let mut flow = ReplacementFlow::new();
    assert!(flow.begin_submit().is_some());
    assert!(flow.begin_submit().is_none());
    assert!(flow.state().is_busy());
}

#[test]
fn terminal_state_cannot_be_cancelled_only_reset() {
    let mut flow = ReplacementFlow::new();
    let ticket = flow.begin_submit().unwrap();
    flow.finish_submit(ticket, SubmitOutcome::Created(bobina(1)));

    assert!(!flow.cancel());
    assert!(flow.state().is_terminal());
    flow.reset();
    assert_eq!(flow.state(), &FlowState::Idle);
}

#[test]
fn reset_policy_by_role() {
    let draft = RegistrationDraft {
        hu: "123456789".into(),
        cliente: "Acme".into(),
    };
    assert_eq!(ResetPolicy::for_role(Role::Embarcador), ResetPolicy::KeepCliente);
    for role in [Role::Admin, Role::Ingeniero, Role::Lider] {
        assert_eq!(
            ResetPolicy::for_role(role).next_draft(&draft),
            RegistrationDraft::default()
        );
    }
}
