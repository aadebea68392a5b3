use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct User {
    password: String,
    admin: bool,
}

/// In-memory ServeRest state: users by email, issued tokens, product names.
#[derive(Debug, Default)]
pub(crate) struct Store {
    users: HashMap<String, User>,
    /// `Bearer <token>` → email.
    tokens: HashMap<String, String>,
    products: HashSet<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AuthError {
    MissingOrInvalid,
    NotAdmin,
}

impl Store {
    /// `false` when the email is taken.
    pub(crate) fn add_user(&mut self, email: &str, password: &str, admin: bool) -> bool {
        if self.users.contains_key(email) {
            return false;
        }
        self.users.insert(
            email.to_string(),
            User {
                password: password.to_string(),
                admin,
            },
        );
        true
    }

    pub(crate) fn login(&mut self, email: &str, password: &str) -> Option<String> {
        let user = self.users.get(email)?;
        if user.password != password {
            return None;
        }
        let token = format!("Bearer {}", uuid::Uuid::new_v4().simple());
        self.tokens.insert(token.clone(), email.to_string());
        Some(token)
    }

    pub(crate) fn authorize_admin(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        let email = authorization
            .and_then(|t| self.tokens.get(t))
            .ok_or(AuthError::MissingOrInvalid)?;
        match self.users.get(email) {
            Some(user) if user.admin => Ok(()),
            Some(_) => Err(AuthError::NotAdmin),
            None => Err(AuthError::MissingOrInvalid),
        }
    }

    /// `false` when a product with that name exists.
    pub(crate) fn add_product(&mut self, nome: &str) -> bool {
        self.products.insert(nome.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_issues_bearer_tokens_for_known_users() {
        let mut store = Store::default();
        assert!(store.add_user("a@qa.com.br", "teste", true));
        assert!(!store.add_user("a@qa.com.br", "other", true));

        assert!(store.login("a@qa.com.br", "wrong").is_none());
        assert!(store.login("b@qa.com.br", "teste").is_none());

        let token = store
            .login("a@qa.com.br", "teste")
            .unwrap_or_else(|| panic!("expected token"));
        assert!(token.starts_with("Bearer "));
        assert_eq!(store.authorize_admin(Some(&token)), Ok(()));
        assert_eq!(
            store.authorize_admin(Some("")),
            Err(AuthError::MissingOrInvalid)
        );
        assert_eq!(store.authorize_admin(None), Err(AuthError::MissingOrInvalid));
    }

    #[test]
    fn non_admins_cannot_create_products() {
        let mut store = Store::default();
        store.add_user("c@qa.com.br", "teste", false);
        let token = store.login("c@qa.com.br", "teste");
        assert_eq!(
            store.authorize_admin(token.as_deref()),
            Err(AuthError::NotAdmin)
        );
    }

    #[test]
    fn product_names_are_unique() {
        let mut store = Store::default();
        assert!(store.add_product("Mouse 1"));
        assert!(!store.add_product("Mouse 1"));
        assert!(store.add_product("Mouse 2"));
    }
}
