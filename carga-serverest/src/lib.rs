//! ServeRest load test: sign up a random admin user, log in, then create a
//! product picked from a shared fixture, under a 5-VU ramp.

mod error;
pub mod helpers;
pub mod model;
mod options;
mod scenario;

pub use error::{Error, Result};
pub use model::{Credentials, Product, ProductPayload, UserRecord};
pub use options::{
    BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_FIXTURE_PATH, LOGIN_DURATION, REPORT_FILE, options,
    resolve_base_url,
};
pub use scenario::{
    CHECK_HAS_TOKEN, CHECK_LOGIN, CHECK_PRODUCT_CREATED, CHECK_USER_CREATED, GROUP_PRODUCTS,
    GROUP_USER_LOGIN, ServeRest, extract_token, load_products,
};
