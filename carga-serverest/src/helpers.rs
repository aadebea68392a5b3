use carga_core::Headers;
use rand::Rng;

use crate::model::{Product, ProductPayload, UserRecord};

/// Exclusive upper bound of the id embedded in generated names and emails.
pub const USER_ID_RANGE: u32 = 1_000_000;
pub const USER_PASSWORD: &str = "teste";
pub const PRODUCT_DESCRIPTION: &str = "Produto teste k6";
pub const PRODUCT_QUANTITY: u32 = 10;

pub fn generate_random_user() -> UserRecord {
    generate_random_user_with(&mut rand::thread_rng())
}

pub fn generate_random_user_with<R: Rng + ?Sized>(rng: &mut R) -> UserRecord {
    let id = rng.gen_range(0..USER_ID_RANGE);
    UserRecord {
        name: format!("User K6 {id}"),
        email: format!("k6_desafio_{id}@qa.com.br"),
        password: USER_PASSWORD.to_string(),
        admin: "true".to_string(),
    }
}

/// The token goes out verbatim, empty or not.
pub fn build_auth_headers(token: &str) -> Headers {
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Authorization".to_string(), token.to_string()),
    ]
}

pub fn pick_product<'a, R: Rng + ?Sized>(products: &'a [Product], rng: &mut R) -> Option<&'a Product> {
    if products.is_empty() {
        return None;
    }
    products.get(rng.gen_range(0..products.len()))
}

/// The epoch-millisecond suffix keeps names unique across iterations.
pub fn product_payload(product: &Product, now_ms: u128) -> ProductPayload {
    ProductPayload {
        name: format!("{} {now_ms}", product.name),
        price: product.price.clone(),
        description: PRODUCT_DESCRIPTION.to_string(),
        quantity: PRODUCT_QUANTITY,
    }
}
