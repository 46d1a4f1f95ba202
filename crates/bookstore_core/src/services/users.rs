//! crates/bookstore_core/src/services/users.rs
//!
//! User administration and the cart embedded on each user.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{CartItem, NewUser, Pagination, User, UserLookup, UserPatch, MAX_PAGE_SIZE};
use crate::ports::{CatalogStore, EmailSender, PortError};

use super::{not_found, page_offset, require_id, require_text, ServiceError, ServiceResult};

const DEFAULT_USERS_PER_PAGE: usize = 25;
const DEFAULT_ROLE: &str = "user";
const USER_NOT_FOUND: &str = "User not found";

#[derive(Debug, Clone, Default)]
pub struct UserForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// A cart write as received: the owner lookup plus the raw cart payload.
#[derive(Debug, Clone, Default)]
pub struct CartForm {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub products_cart: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub data: Vec<User>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn CatalogStore>,
    mailer: Arc<dyn EmailSender>,
}

impl UserService {
    pub fn new(store: Arc<dyn CatalogStore>, mailer: Arc<dyn EmailSender>) -> Self {
        Self { store, mailer }
    }

    pub async fn list_users(&self, page: Option<usize>, limit: Option<usize>) -> ServiceResult<UserPage> {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_USERS_PER_PAGE)
            .min(MAX_PAGE_SIZE);
        let offset = page_offset(&Pagination::new(page, limit, 0))?;
        let (total, data) = self.store.list_users(offset, limit).await?;
        Ok(UserPage {
            data,
            pagination: Pagination::new(page, limit, total),
        })
    }

    pub async fn get_user(&self, user_id: &str) -> ServiceResult<User> {
        let user_id = require_id(Some(user_id), "user id")?;
        self.store
            .get_user(&UserLookup::Id(user_id))
            .await
            .map_err(not_found(USER_NOT_FOUND))
    }

    /// Creates the user and sends a welcome e-mail without waiting for it.
    pub async fn create_user(&self, form: UserForm) -> ServiceResult<User> {
        let name = require_text(form.name.as_deref(), "Please provide a name")?.to_string();
        let email = require_email(form.email.as_deref())?;
        let role = form
            .role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        let user = self
            .store
            .create_user(NewUser { name, email, role })
            .await
            .map_err(duplicate_email)?;
        info!("Created user {}", user.id);

        let mailer = self.mailer.clone();
        let (to, name) = (user.email.clone(), user.name.clone());
        tokio::spawn(async move {
            let body = format!("Hi {name},\n\nYour bookstore account is ready. Happy reading!");
            if let Err(e) = mailer.send(&to, "Welcome to the bookstore", &body).await {
                error!("Failed to send welcome e-mail to {}: {}", to, e);
            }
        });

        Ok(user)
    }

    pub async fn update_user(&self, user_id: &str, form: UserForm) -> ServiceResult<User> {
        let user_id = require_id(Some(user_id), "user id")?;
        let email = match form.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(e) => Some(require_email(Some(e))?),
            None => None,
        };
        let patch = UserPatch {
            name: non_blank(form.name),
            email,
            role: non_blank(form.role),
        };
        self.store
            .update_user(user_id, patch)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => ServiceError::NotFound(USER_NOT_FOUND.to_string()),
                other => duplicate_email(other),
            })
    }

    pub async fn delete_user(&self, user_id: &str) -> ServiceResult<()> {
        let user_id = require_id(Some(user_id), "user id")?;
        self.store
            .delete_user(user_id)
            .await
            .map_err(not_found(USER_NOT_FOUND))?;
        info!("Deleted user {}", user_id);
        Ok(())
    }

    /// Replaces the user's cart with a validated copy of `productsCart`.
    pub async fn replace_cart(&self, form: CartForm) -> ServiceResult<Vec<CartItem>> {
        let lookup = lookup(form.user_id.as_deref(), form.email.as_deref())?;
        let cart = parse_cart(form.products_cart)?;

        let user = self
            .store
            .get_user(&lookup)
            .await
            .map_err(not_found(USER_NOT_FOUND))?;
        Ok(self.store.set_cart(user.id, &cart).await?)
    }

    pub async fn get_cart(&self, user_id: Option<&str>, email: Option<&str>) -> ServiceResult<Vec<CartItem>> {
        let lookup = lookup(user_id, email)?;
        let user = self
            .store
            .get_user(&lookup)
            .await
            .map_err(not_found(USER_NOT_FOUND))?;
        Ok(user.products_cart)
    }
}

fn lookup(user_id: Option<&str>, email: Option<&str>) -> ServiceResult<UserLookup> {
    if let Some(id) = user_id.map(str::trim).filter(|v| !v.is_empty()) {
        let id: Uuid = require_id(Some(id), "userId")?;
        return Ok(UserLookup::Id(id));
    }
    if let Some(email) = email.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(UserLookup::Email(email.to_lowercase()));
    }
    Err(ServiceError::Validation(
        "Please provide a userId or an email".to_string(),
    ))
}

/// Every item needs a product with id, title and a positive price, and a
/// quantity of at least one.
fn parse_cart(value: Option<Value>) -> ServiceResult<Vec<CartItem>> {
    let items = match value {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(ServiceError::Validation(
                "productsCart must be an array".to_string(),
            ))
        }
    };

    let invalid_product = || {
        ServiceError::Validation(
            "Every cart item needs a product with id, title and price".to_string(),
        )
    };
    items
        .into_iter()
        .map(|item| {
            let item: CartItem = serde_json::from_value(item).map_err(|_| invalid_product())?;
            if item.product.id.trim().is_empty()
                || item.product.title.trim().is_empty()
                || item.product.price <= 0.0
            {
                return Err(invalid_product());
            }
            if item.quantity < 1 {
                return Err(ServiceError::Validation(
                    "Quantity must be greater than 0".to_string(),
                ));
            }
            Ok(item)
        })
        .collect()
}

fn require_email(value: Option<&str>) -> ServiceResult<String> {
    let email = require_text(value, "Please provide an email")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(email.to_lowercase())
        }
        _ => Err(ServiceError::Validation(format!(
            "\"{email}\" is not a valid email"
        ))),
    }
}

fn duplicate_email(e: PortError) -> ServiceError {
    match e {
        PortError::Conflict(email) => {
            ServiceError::Validation(format!("Email \"{email}\" is already registered"))
        }
        other => other.into(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cart_keeps_snapshot_fields() {
        let cart = parse_cart(Some(json!([
            {"product": {"id": "b1", "title": "Dune", "price": 9.5, "coverImage": "x.png"}, "quantity": 2}
        ])))
        .expect("valid cart");
        assert_eq!(cart[0].quantity, 2);
        assert_eq!(cart[0].product.extra.get("coverImage"), Some(&json!("x.png")));
    }

    #[test]
    fn cart_rejects_incomplete_products_and_bad_quantities() {
        for bad in [
            json!([{"product": {"id": "b1", "price": 1.0}, "quantity": 1}]),
            json!([{"product": {"id": "b1", "title": "T", "price": 0}, "quantity": 1}]),
            json!([{"quantity": 1}]),
            json!([{"product": {"id": "b1", "title": "T", "price": 2}, "quantity": 0}]),
        ] {
            assert!(matches!(parse_cart(Some(bad)), Err(ServiceError::Validation(_))));
        }
        assert!(parse_cart(Some(json!({"not": "an array"}))).is_err());
        assert!(parse_cart(None).is_err());
    }

    #[test]
    fn lookup_prefers_id_and_requires_one_key() {
        let id = Uuid::new_v4();
        assert_eq!(
            lookup(Some(&id.to_string()), Some("a@b.co")),
            Ok(UserLookup::Id(id))
        );
        assert_eq!(
            lookup(None, Some(" A@B.co ")),
            Ok(UserLookup::Email("a@b.co".to_string()))
        );
        assert!(lookup(Some(" "), None).is_err());
    }
}
