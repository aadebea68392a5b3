use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Payload of `POST /usuarios`. Built fresh every iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    pub password: String,
    /// ServeRest takes the flag as a string.
    #[serde(rename = "administrador")]
    pub admin: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a UserRecord> for Credentials<'a> {
    fn from(user: &'a UserRecord) -> Self {
        Self {
            email: &user.email,
            password: &user.password,
        }
    }
}

/// One fixture entry. The price keeps its JSON form so `50` is sent back as `50`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "preco")]
    pub price: Number,
}

/// Payload of `POST /produtos`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPayload {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "preco")]
    pub price: Number,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "quantidade")]
    pub quantity: u32,
}
