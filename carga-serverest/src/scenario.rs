use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use carga_core::{
    HttpResponse, Iteration, IterationFuture, RunSummary, Scenario, ScriptOptions, SharedArray,
    SummaryOutputs, html_report,
};

use crate::error::{Error, Result};
use crate::helpers::{build_auth_headers, generate_random_user, pick_product, product_payload};
use crate::model::{Credentials, Product};
use crate::options::{FIXTURE_NAME, LOGIN_DURATION, REPORT_FILE, options};

pub const GROUP_USER_LOGIN: &str = "Criação de Usuário e Login";
pub const GROUP_PRODUCTS: &str = "Operações de Produtos (Data Driven)";

pub const CHECK_USER_CREATED: &str = "usuario criado com sucesso";
pub const CHECK_LOGIN: &str = "login realizado";
pub const CHECK_HAS_TOKEN: &str = "tem token";
pub const CHECK_PRODUCT_CREATED: &str = "produto cadastrado";

const THINK_TIME: Duration = Duration::from_secs(1);

/// Loads the product fixture. An empty array is rejected: nothing could be posted.
pub fn load_products(path: &Path) -> Result<SharedArray<Product>> {
    let products = SharedArray::<Product>::load_json(FIXTURE_NAME, path)?;
    if products.is_empty() {
        return Err(Error::EmptyFixture(path.display().to_string()));
    }
    Ok(products)
}

/// `authorization` from the login body; empty when missing, not a string, or not JSON.
pub fn extract_token(res: &HttpResponse) -> String {
    res.json_field("authorization")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// User sign-up, login and a data-driven product creation against ServeRest.
#[derive(Debug, Clone)]
pub struct ServeRest {
    base_url: String,
    products: SharedArray<Product>,
    think_time: Duration,
}

impl ServeRest {
    pub fn new(base_url: impl Into<String>, products: SharedArray<Product>) -> Self {
        Self {
            base_url: base_url.into(),
            products,
            think_time: THINK_TIME,
        }
    }

    /// Pause at the end of each iteration.
    #[must_use]
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Returns the session token, possibly empty.
    async fn sign_up_and_login(&self, it: &mut Iteration) -> String {
        let user = generate_random_user();
        let it = it.group(GROUP_USER_LOGIN);

        let res = it.post_json(&self.url("/usuarios"), &user, Vec::new()).await;
        it.check(
            &res,
            &[(CHECK_USER_CREATED, &|r: &HttpResponse| r.status == 201)],
        );

        let res = it
            .post_json(&self.url("/login"), &Credentials::from(&user), Vec::new())
            .await;
        it.trend(LOGIN_DURATION, res.duration);
        it.check(
            &res,
            &[
                (CHECK_LOGIN, &|r: &HttpResponse| r.status == 200),
                (CHECK_HAS_TOKEN, &|r: &HttpResponse| !extract_token(r).is_empty()),
            ],
        );

        extract_token(&res)
    }

    async fn create_product(&self, it: &mut Iteration, token: &str) {
        let it = it.group(GROUP_PRODUCTS);

        let payload = pick_product(self.products.as_slice(), &mut rand::thread_rng())
            .map(|p| product_payload(p, epoch_ms()));
        let Some(payload) = payload else {
            tracing::warn!("no product to post");
            return;
        };

        let res = it
            .post_json(&self.url("/produtos"), &payload, build_auth_headers(token))
            .await;
        it.check(
            &res,
            &[(CHECK_PRODUCT_CREATED, &|r: &HttpResponse| r.status == 201)],
        );
    }
}

impl Scenario for ServeRest {
    fn options(&self) -> ScriptOptions {
        options()
    }

    fn iteration<'a>(&'a self, it: &'a mut Iteration) -> IterationFuture<'a> {
        Box::pin(async move {
            // No step is gated on an earlier check; a failed login still posts the product.
            let token = self.sign_up_and_login(it).await;
            self.create_product(it, &token).await;
            it.sleep(self.think_time).await;
        })
    }

    fn handle_summary(&self, summary: &RunSummary) -> carga_core::Result<SummaryOutputs> {
        Ok(vec![(REPORT_FILE.to_string(), html_report(summary)?)])
    }
}
