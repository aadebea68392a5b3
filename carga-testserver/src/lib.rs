//! In-process mock of the ServeRest endpoints the load test hits, with knobs
//! for forcing failures and captures for asserting what was sent.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

mod store;

use store::{AuthError, Store};

pub const PATH_USUARIOS: &str = "/usuarios";
pub const PATH_LOGIN: &str = "/login";
pub const PATH_PRODUTOS: &str = "/produtos";

/// Failure knobs, fixed for the lifetime of a server.
#[derive(Debug, Clone, Default)]
pub struct TestServerOptions {
    /// Answer every `POST /usuarios` with this status without registering the user.
    pub usuarios_status: Option<u16>,
    /// Successful logins return `"authorization": ""`.
    pub empty_token: bool,
    /// Added before every response.
    pub latency: Duration,
}

/// A `POST /produtos` as received.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedProduct {
    pub body: Value,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    usuarios_total: Arc<AtomicU64>,
    login_total: Arc<AtomicU64>,
    produtos_total: Arc<AtomicU64>,
    produtos_created: Arc<AtomicU64>,
    last_product: Arc<Mutex<Option<CapturedProduct>>>,
}

impl TestServerStats {
    pub fn usuarios_total(&self) -> u64 {
        self.usuarios_total.load(Ordering::Relaxed)
    }

    pub fn login_total(&self) -> u64 {
        self.login_total.load(Ordering::Relaxed)
    }

    pub fn produtos_total(&self) -> u64 {
        self.produtos_total.load(Ordering::Relaxed)
    }

    /// `POST /produtos` answered with 201.
    pub fn produtos_created(&self) -> u64 {
        self.produtos_created.load(Ordering::Relaxed)
    }

    pub fn last_product(&self) -> Option<CapturedProduct> {
        self.last_product
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn capture_product(&self, product: CapturedProduct) {
        *self
            .last_product
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(product);
    }
}

#[derive(Debug, Clone)]
struct AppState {
    opts: TestServerOptions,
    stats: TestServerStats,
    store: Arc<Mutex<Store>>,
}

impl AppState {
    fn store(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if !self.opts.latency.is_zero() {
            sleep(self.opts.latency).await;
        }
    }
}

type Reply = (StatusCode, Json<Value>);

fn message(status: StatusCode, msg: &str) -> Reply {
    (status, Json(json!({ "message": msg })))
}

#[derive(Debug, Deserialize)]
struct NewUser {
    nome: String,
    email: String,
    password: String,
    administrador: String,
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct NewProduct {
    nome: String,
    preco: f64,
    descricao: String,
    quantidade: u64,
}

async fn handle_usuarios(State(state): State<AppState>, body: Bytes) -> Reply {
    state.stats.usuarios_total.fetch_add(1, Ordering::Relaxed);
    state.delay().await;

    if let Some(forced) = state.opts.usuarios_status {
        let status = StatusCode::from_u16(forced).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return message(status, "forced failure");
    }

    let user: NewUser = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return message(StatusCode::BAD_REQUEST, "corpo da requisição inválido"),
    };
    let admin = match user.administrador.as_str() {
        "true" => true,
        "false" => false,
        _ => {
            return message(
                StatusCode::BAD_REQUEST,
                "administrador deve ser 'true' ou 'false'",
            );
        }
    };
    if user.nome.is_empty() || user.email.is_empty() || user.password.is_empty() {
        return message(StatusCode::BAD_REQUEST, "campos obrigatórios em branco");
    }

    if !state.store().add_user(&user.email, &user.password, admin) {
        return message(StatusCode::BAD_REQUEST, "Este email já está sendo usado");
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Cadastro realizado com sucesso",
            "_id": uuid::Uuid::new_v4().simple().to_string(),
        })),
    )
}

async fn handle_login(State(state): State<AppState>, body: Bytes) -> Reply {
    state.stats.login_total.fetch_add(1, Ordering::Relaxed);
    state.delay().await;

    let creds: Credentials = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return message(StatusCode::BAD_REQUEST, "corpo da requisição inválido"),
    };

    let Some(token) = state.store().login(&creds.email, &creds.password) else {
        return message(StatusCode::UNAUTHORIZED, "Email e/ou senha inválidos");
    };
    let authorization = if state.opts.empty_token {
        String::new()
    } else {
        token
    };

    (
        StatusCode::OK,
        Json(json!({
            "message": "Login realizado com sucesso",
            "authorization": authorization,
        })),
    )
}

async fn handle_produtos(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Reply {
    state.stats.produtos_total.fetch_add(1, Ordering::Relaxed);

    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.stats.capture_product(CapturedProduct {
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        authorization: authorization.clone(),
    });
    state.delay().await;

    let auth = state.store().authorize_admin(authorization.as_deref());
    match auth {
        Ok(()) => {}
        Err(AuthError::MissingOrInvalid) => {
            return message(
                StatusCode::UNAUTHORIZED,
                "Token de acesso ausente, inválido, expirado ou usuário do token não existe mais",
            );
        }
        Err(AuthError::NotAdmin) => {
            return message(StatusCode::FORBIDDEN, "Rota exclusiva para administradores");
        }
    }

    let product: NewProduct = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return message(StatusCode::BAD_REQUEST, "corpo da requisição inválido"),
    };
    if product.descricao.is_empty() || !product.preco.is_finite() || product.quantidade == 0 {
        return message(StatusCode::BAD_REQUEST, "campos do produto inválidos");
    }

    if !state.store().add_product(&product.nome) {
        return message(StatusCode::BAD_REQUEST, "Já existe produto com esse nome");
    }

    state.stats.produtos_created.fetch_add(1, Ordering::Relaxed);
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Cadastro realizado com sucesso",
            "_id": uuid::Uuid::new_v4().simple().to_string(),
        })),
    )
}

pub fn router(opts: TestServerOptions, stats: TestServerStats) -> Router {
    let state = AppState {
        opts,
        stats,
        store: Arc::default(),
    };
    Router::new()
        .route(PATH_USUARIOS, post(handle_usuarios))
        .route(PATH_LOGIN, post(handle_login))
        .route(PATH_PRODUTOS, post(handle_produtos))
        .with_state(state)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerOptions::default()).await
    }

    pub async fn start_with(opts: TestServerOptions) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(opts, stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
