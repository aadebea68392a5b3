use std::time::Duration;

use carga_http::{HttpClient, HttpRequest, HttpResponse};
use carga_testserver::{TestServer, TestServerOptions};
use serde_json::{Value, json};

async fn post(url: &str, body: Value, token: Option<&str>) -> HttpResponse {
    let mut req = HttpRequest::post_json(url, &body).unwrap_or_else(|e| panic!("encode: {e}"));
    if let Some(token) = token {
        req = req.header("Authorization", token);
    }
    HttpClient::default()
        .request(req)
        .await
        .unwrap_or_else(|e| panic!("request: {e}"))
}

fn user(email: &str, admin: &str) -> Value {
    json!({
        "nome": "User K6 1",
        "email": email,
        "password": "teste",
        "administrador": admin,
    })
}

fn product(nome: &str) -> Value {
    json!({
        "nome": nome,
        "preco": 50,
        "descricao": "Produto teste k6",
        "quantidade": 10,
    })
}

async fn login(base: &str, email: &str) -> HttpResponse {
    post(
        &format!("{base}/login"),
        json!({ "email": email, "password": "teste" }),
        None,
    )
    .await
}

#[tokio::test]
async fn happy_path_creates_user_logs_in_and_creates_product() {
    let server = TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("start: {e}"));
    let base = server.base_url().to_string();

    let res = post(&format!("{base}/usuarios"), user("k6_desafio_1@qa.com.br", "true"), None).await;
    assert_eq!(res.status, 201);

    let dup = post(&format!("{base}/usuarios"), user("k6_desafio_1@qa.com.br", "true"), None).await;
    assert_eq!(dup.status, 400);

    let res = login(&base, "k6_desafio_1@qa.com.br").await;
    assert_eq!(res.status, 200);
    let token = res
        .json_field("authorization")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    assert!(token.starts_with("Bearer "));

    let res = post(&format!("{base}/produtos"), product("Mouse 1"), Some(&token)).await;
    assert_eq!(res.status, 201);
    let dup = post(&format!("{base}/produtos"), product("Mouse 1"), Some(&token)).await;
    assert_eq!(dup.status, 400);

    let stats = server.stats();
    assert_eq!(stats.usuarios_total(), 2);
    assert_eq!(stats.login_total(), 1);
    assert_eq!(stats.produtos_total(), 2);
    assert_eq!(stats.produtos_created(), 1);

    let last = stats
        .last_product()
        .unwrap_or_else(|| panic!("expected captured product"));
    assert_eq!(last.body["nome"], "Mouse 1");
    assert_eq!(last.authorization.as_deref(), Some(token.as_str()));

    server.shutdown().await;
}

#[tokio::test]
async fn rejects_bad_credentials_and_tokens() {
    let server = TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("start: {e}"));
    let base = server.base_url().to_string();

    assert_eq!(login(&base, "nobody@qa.com.br").await.status, 401);
    assert_eq!(
        post(&format!("{base}/produtos"), product("X"), Some("")).await.status,
        401
    );
    assert_eq!(
        post(&format!("{base}/produtos"), product("X"), None).await.status,
        401
    );

    post(&format!("{base}/usuarios"), user("plain@qa.com.br", "false"), None).await;
    let token = login(&base, "plain@qa.com.br")
        .await
        .json_field("authorization")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    assert_eq!(
        post(&format!("{base}/produtos"), product("X"), Some(&token)).await.status,
        403
    );

    server.shutdown().await;
}

#[tokio::test]
async fn knobs_force_failures() {
    let server = TestServer::start_with(TestServerOptions {
        usuarios_status: Some(500),
        empty_token: true,
        latency: Duration::from_millis(30),
    })
    .await
    .unwrap_or_else(|e| panic!("start: {e}"));
    let base = server.base_url().to_string();

    let res = post(&format!("{base}/usuarios"), user("a@qa.com.br", "true"), None).await;
    assert_eq!(res.status, 500);
    assert!(res.duration >= Duration::from_millis(30));

    // The forced failure did not register the user.
    assert_eq!(login(&base, "a@qa.com.br").await.status, 401);

    server.shutdown().await;
}

#[tokio::test]
async fn empty_token_knob_blanks_authorization() {
    let server = TestServer::start_with(TestServerOptions {
        empty_token: true,
        ..TestServerOptions::default()
    })
    .await
    .unwrap_or_else(|e| panic!("start: {e}"));
    let base = server.base_url().to_string();

    post(&format!("{base}/usuarios"), user("b@qa.com.br", "true"), None).await;
    let res = login(&base, "b@qa.com.br").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.json_field("authorization"), Some(Value::String(String::new())));

    server.shutdown().await;
}
