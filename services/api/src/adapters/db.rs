//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CatalogStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use bookstore_core::domain::{
    Book, BookPatch, CartItem, Category, CategoryWithQuantity, Customer, CustomerProfile,
    NewBook, NewUser, PurchasedItem, Review, User, UserLookup, UserPatch,
};
use bookstore_core::ports::{BookQuery, CatalogStore, PortError, PortResult};
use bookstore_core::reviews::{ReviewAction, ReviewSubmission};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const BOOK_SELECT: &str = "SELECT b.id, b.title, b.author, b.issn, b.category_id, \
     c.name AS category_name, b.price, b.stock, b.publish_year, b.pages, b.description, \
     b.cover_image, b.volume, b.reviews, b.average_rating, b.is_deleted, b.created_at \
     FROM books b LEFT JOIN categories c ON c.id = b.category_id";

const USER_COLUMNS: &str = "id, name, email, role, products_cart, created_at";
const CUSTOMER_COLUMNS: &str = "id, user_id, full_name, email, is_active";

const ISSN_CONSTRAINT: &str = "books_issn_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CatalogStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch_customers(&self, ids: Vec<Uuid>) -> PortResult<Vec<Customer>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, CustomerRecord>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CustomerRecord::to_domain).collect())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    title: String,
    author: String,
    issn: Option<String>,
    category_id: Uuid,
    category_name: Option<String>,
    price: f64,
    stock: i32,
    publish_year: Option<i32>,
    pages: Option<i32>,
    description: Option<String>,
    cover_image: Option<String>,
    volume: Option<String>,
    reviews: Json<Vec<Review>>,
    average_rating: f64,
    is_deleted: bool,
    created_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author: self.author,
            issn: self.issn,
            category_id: self.category_id,
            category_name: self.category_name,
            price: self.price,
            stock: self.stock,
            publish_year: self.publish_year,
            pages: self.pages,
            description: self.description,
            cover_image: self.cover_image,
            volume: self.volume,
            reviews: self.reviews.0,
            average_rating: self.average_rating,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CategoryRecord {
    id: Uuid,
    name: String,
}
impl CategoryRecord {
    fn to_domain(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct CategoryQuantityRecord {
    id: Uuid,
    name: String,
    quantity: i64,
}

#[derive(FromRow)]
struct CustomerRecord {
    id: Uuid,
    user_id: Uuid,
    full_name: String,
    email: Option<String>,
    is_active: bool,
}
impl CustomerRecord {
    fn to_domain(self) -> Customer {
        Customer {
            id: self.id,
            user_id: self.user_id,
            full_name: self.full_name,
            email: self.email,
            is_active: self.is_active,
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    products_cart: Json<Vec<CartItem>>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            products_cart: self.products_cart.0,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct PurchasedItemRecord {
    title: String,
    author: Option<String>,
    quantity: i32,
}

//=========================================================================================
// Error Mapping and Query Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Converts a row limit or offset into a SQL `BIGINT`.
fn to_bigint(value: usize) -> PortResult<i64> {
    i64::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("Row offset {} is out of range", value)))
}

/// Converts a SQL `COUNT(*)` back into a row count.
fn to_count(value: i64) -> PortResult<usize> {
    usize::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("Row count {} is out of range", value)))
}

/// Maps a violation of `constraint` to `Conflict(value)`, anything else to `Unexpected`.
fn conflict_on(constraint: &'static str, value: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| {
        let violated =
            matches!(&e, sqlx::Error::Database(db) if db.constraint() == Some(constraint));
        if violated {
            PortError::Conflict(value)
        } else {
            unexpected(e)
        }
    }
}

/// Appends the filters of `query` to a statement that already has a `WHERE` clause.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    if let Some(ids) = &query.ids {
        qb.push(" AND b.id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(exclude) = query.exclude {
        qb.push(" AND b.id <> ").push_bind(exclude);
    }
    if let Some(category_id) = query.category_id {
        qb.push(" AND b.category_id = ").push_bind(category_id);
    }
    if let Some(author) = &query.author {
        qb.push(" AND b.author = ").push_bind(author.clone());
    }
}

/// Reviews are stored without the populated customer profile.
fn stored_reviews(reviews: &[Review]) -> Vec<Review> {
    reviews
        .iter()
        .cloned()
        .map(|mut r| {
            r.customer = None;
            r
        })
        .collect()
}

//=========================================================================================
// `CatalogStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogStore for DbAdapter {
    async fn find_books(&self, query: &BookQuery) -> PortResult<Vec<Book>> {
        let limit = query.limit.map(to_bigint).transpose()?;
        let offset = to_bigint(query.offset)?;

        let mut qb = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        qb.push(" WHERE NOT b.is_deleted");
        push_filters(&mut qb, query);
        qb.push(" ORDER BY b.created_at, b.id");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if offset > 0 {
            qb.push(" OFFSET ").push_bind(offset);
        }

        let records = qb
            .build_query_as::<BookRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(BookRecord::to_domain).collect())
    }

    async fn count_books(&self, query: &BookQuery) -> PortResult<usize> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b WHERE NOT b.is_deleted");
        push_filters(&mut qb, query);
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        to_count(count)
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!("{BOOK_SELECT} WHERE b.id = $1"))
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Book {}", book_id)))?;
        let mut book = record.to_domain();

        let customer_ids = book.reviews.iter().map(|r| r.customer_id).collect();
        let customers = self.fetch_customers(customer_ids).await?;
        for review in &mut book.reviews {
            review.customer = customers
                .iter()
                .find(|c| c.id == review.customer_id)
                .map(|c| CustomerProfile {
                    full_name: c.full_name.clone(),
                    email: c.email.clone(),
                });
        }
        Ok(book)
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        let id = Uuid::new_v4();
        let issn = book.issn.clone().unwrap_or_default();
        sqlx::query(
            "INSERT INTO books (id, title, author, issn, category_id, price, publish_year, pages, \
             description, cover_image, volume) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(id)
        .bind(book.title)
        .bind(book.author)
        .bind(book.issn)
        .bind(book.category_id)
        .bind(book.price)
        .bind(book.publish_year)
        .bind(book.pages)
        .bind(book.description)
        .bind(book.cover_image)
        .bind(book.volume)
        .execute(&self.pool)
        .await
        .map_err(conflict_on(ISSN_CONSTRAINT, issn))?;

        self.get_book(id).await
    }

    async fn update_book(&self, book_id: Uuid, patch: BookPatch) -> PortResult<Book> {
        let issn = patch.issn.clone().unwrap_or_default();
        let result = sqlx::query(
            "UPDATE books SET title = COALESCE($2, title), author = COALESCE($3, author), \
             issn = COALESCE($4, issn), category_id = COALESCE($5, category_id), \
             price = COALESCE($6, price), publish_year = COALESCE($7, publish_year), \
             pages = COALESCE($8, pages), description = COALESCE($9, description), \
             cover_image = COALESCE($10, cover_image), volume = COALESCE($11, volume) \
             WHERE id = $1",
        )
        .bind(book_id)
        .bind(patch.title)
        .bind(patch.author)
        .bind(patch.issn)
        .bind(patch.category_id)
        .bind(patch.price)
        .bind(patch.publish_year)
        .bind(patch.pages)
        .bind(patch.description)
        .bind(patch.cover_image)
        .bind(patch.volume)
        .execute(&self.pool)
        .await
        .map_err(conflict_on(ISSN_CONSTRAINT, issn))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Book {}", book_id)));
        }
        self.get_book(book_id).await
    }

    async fn soft_delete_book(&self, book_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("UPDATE books SET is_deleted = TRUE WHERE id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Book {}", book_id)));
        }
        Ok(())
    }

    async fn upsert_review(
        &self,
        book_id: Uuid,
        submission: &ReviewSubmission,
    ) -> PortResult<ReviewAction> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // The row lock serializes concurrent reviews of the same book.
        let Json(mut reviews) = sqlx::query_scalar::<_, Json<Vec<Review>>>(
            "SELECT reviews FROM books WHERE id = $1 AND NOT is_deleted FOR UPDATE",
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Book {}", book_id)))?;

        let (action, average_rating) = submission.apply_to(&mut reviews);
        sqlx::query("UPDATE books SET reviews = $2, average_rating = $3 WHERE id = $1")
            .bind(book_id)
            .bind(Json(stored_reviews(&reviews)))
            .bind(average_rating)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(action)
    }

    async fn list_categories(&self) -> PortResult<Vec<Category>> {
        let records = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, name FROM categories ORDER BY created_at, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CategoryRecord::to_domain).collect())
    }

    async fn list_categories_with_quantity(&self) -> PortResult<Vec<CategoryWithQuantity>> {
        let records = sqlx::query_as::<_, CategoryQuantityRecord>(
            "SELECT c.id, c.name, COUNT(b.id) FILTER (WHERE NOT b.is_deleted) AS quantity \
             FROM categories c LEFT JOIN books b ON b.category_id = c.id \
             GROUP BY c.id, c.name, c.created_at ORDER BY c.created_at, c.name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| CategoryWithQuantity {
                id: r.id,
                name: r.name,
                quantity: r.quantity,
            })
            .collect())
    }

    async fn get_category(&self, category_id: Uuid) -> PortResult<Category> {
        sqlx::query_as::<_, CategoryRecord>("SELECT id, name FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(CategoryRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Category {}", category_id)))
    }

    async fn create_category(&self, name: &str) -> PortResult<Category> {
        let record = sqlx::query_as::<_, CategoryRecord>(
            "INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn find_active_customer(&self, user_id: Uuid) -> PortResult<Customer> {
        sqlx::query_as::<_, CustomerRecord>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE user_id = $1 AND is_active LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(CustomerRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("Customer for user {}", user_id)))
    }

    async fn purchase_history(
        &self,
        user_id: Uuid,
        max_orders: usize,
    ) -> PortResult<Vec<PurchasedItem>> {
        let records = sqlx::query_as::<_, PurchasedItemRecord>(
            "SELECT oi.title, b.author, oi.quantity \
             FROM (SELECT id, created_at FROM orders \
                   WHERE user_id = $1 AND status IN ('delivered', 'completed') \
                   ORDER BY created_at DESC LIMIT $2) o \
             JOIN order_items oi ON oi.order_id = o.id \
             LEFT JOIN books b ON b.id = oi.book_id \
             ORDER BY o.created_at DESC, oi.id",
        )
        .bind(user_id)
        .bind(to_bigint(max_orders)?)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| PurchasedItem {
                title: r.title,
                author: r.author,
                quantity: r.quantity,
            })
            .collect())
    }

    async fn list_users(&self, offset: usize, limit: usize) -> PortResult<(usize, Vec<User>)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        ))
        .bind(to_bigint(limit)?)
        .bind(to_bigint(offset)?)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok((
            to_count(total)?,
            records.into_iter().map(UserRecord::to_domain).collect(),
        ))
    }

    async fn get_user(&self, lookup: &UserLookup) -> PortResult<User> {
        let record = match lookup {
            UserLookup::Id(id) => {
                sqlx::query_as::<_, UserRecord>(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
                ))
                .bind(*id)
                .fetch_optional(&self.pool)
                .await
            }
            UserLookup::Email(email) => {
                sqlx::query_as::<_, UserRecord>(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
                ))
                .bind(email.as_str())
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(unexpected)?;
        record
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound("User".to_string()))
    }

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let email = user.email.clone();
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on(EMAIL_CONSTRAINT, email))?;
        Ok(record.to_domain())
    }

    async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> PortResult<User> {
        let email = patch.email.clone().unwrap_or_default();
        sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
             role = COALESCE($4, role) WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.role)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_on(EMAIL_CONSTRAINT, email))?
        .map(UserRecord::to_domain)
        .ok_or_else(|| PortError::NotFound("User".to_string()))
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("User".to_string()));
        }
        Ok(())
    }

    async fn set_cart(&self, user_id: Uuid, cart: &[CartItem]) -> PortResult<Vec<CartItem>> {
        let stored: Option<Json<Vec<CartItem>>> = sqlx::query_scalar(
            "UPDATE users SET products_cart = $2 WHERE id = $1 RETURNING products_cart",
        )
        .bind(user_id)
        .bind(Json(cart))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        stored
            .map(|Json(cart)| cart)
            .ok_or_else(|| PortError::NotFound("User".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn populated_profiles_are_not_persisted() {
        let review = Review {
            customer_id: Uuid::new_v4(),
            customer: Some(CustomerProfile {
                full_name: "Ada".into(),
                email: None,
            }),
            rating: 5,
            review: "Great".into(),
            created_at: Utc::now(),
        };
        let stored = serde_json::to_value(stored_reviews(&[review])).unwrap();
        assert!(stored[0].get("customer").is_none());
        assert_eq!(stored[0]["rating"], json!(5));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn row_offsets_beyond_bigint_are_errors_not_negative_numbers() {
        assert_eq!(to_bigint(18), Ok(18));
        assert!(matches!(to_bigint(usize::MAX), Err(PortError::Unexpected(_))));
        assert_eq!(to_count(11), Ok(11));
        assert!(to_count(-1).is_err());
    }

    #[test]
    fn filters_extend_the_where_clause() {
        let query = BookQuery::active()
            .exclude(Uuid::nil())
            .category(Uuid::nil())
            .author("Herbert");
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM books b WHERE NOT b.is_deleted");
        push_filters(&mut qb, &query);
        let sql = qb.sql();
        assert!(sql.contains("b.id <> $1"));
        assert!(sql.contains("b.category_id = $2"));
        assert!(sql.contains("b.author = $3"));
        assert!(!sql.contains("ANY"));
    }
}
