//! In-memory fakes of every port, shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bookstore_core::domain::{
    Book, BookPatch, CartItem, Category, CategoryWithQuantity, Customer, CustomerProfile, NewBook,
    NewUser, PurchasedItem, User, UserLookup, UserPatch,
};
use bookstore_core::ports::{
    BookQuery, CatalogStore, CompletionRequest, CompletionService, EmailSender, ImageStore,
    ModelTier, PortError, PortResult,
};
use bookstore_core::reviews::{ReviewAction, ReviewSubmission};
use chrono::{Duration, Utc};
use uuid::Uuid;

//=========================================================================================
// Catalog
//=========================================================================================

#[derive(Default)]
struct State {
    books: Vec<Book>,
    categories: Vec<Category>,
    customers: Vec<Customer>,
    users: Vec<User>,
    history: Vec<(Uuid, PurchasedItem)>,
}

#[derive(Default)]
pub struct InMemoryCatalog {
    state: Mutex<State>,
    pub calls: AtomicUsize,
    pub writes: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, name: &str) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.state.lock().unwrap().categories.push(category.clone());
        category
    }

    /// Inserts a book; books inserted later sort later in catalog order.
    pub fn add_book(&self, title: &str, author: &str, category: &Category, description: Option<&str>) -> Book {
        let mut state = self.state.lock().unwrap();
        let position = state.books.len() as i64;
        let book = Book {
            id: Uuid::new_v4(),
            title: title.to_string(),
            author: author.to_string(),
            issn: None,
            category_id: category.id,
            category_name: Some(category.name.clone()),
            price: 10.0,
            stock: 5,
            publish_year: Some(2001),
            pages: Some(200),
            description: description.map(str::to_string),
            cover_image: None,
            volume: None,
            reviews: Vec::new(),
            average_rating: 0.0,
            is_deleted: false,
            created_at: Utc::now() + Duration::seconds(position),
        };
        state.books.push(book.clone());
        book
    }

    pub fn delete_book(&self, id: Uuid) {
        let mut state = self.state.lock().unwrap();
        if let Some(book) = state.books.iter_mut().find(|b| b.id == id) {
            book.is_deleted = true;
        }
    }

    pub fn add_customer(&self, user_id: Uuid, name: &str) -> Customer {
        let customer = Customer {
            id: Uuid::new_v4(),
            user_id,
            full_name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            is_active: true,
        };
        self.state.lock().unwrap().customers.push(customer.clone());
        customer
    }

    pub fn add_purchase(&self, user_id: Uuid, title: &str, quantity: i32) {
        self.state.lock().unwrap().history.push((
            user_id,
            PurchasedItem {
                title: title.to_string(),
                author: Some("Someone".to_string()),
                quantity,
            },
        ));
    }

    pub fn book(&self, id: Uuid) -> Book {
        self.state
            .lock()
            .unwrap()
            .books
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .expect("book exists")
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn populate(state: &State, mut book: Book) -> Book {
    book.category_name = state
        .categories
        .iter()
        .find(|c| c.id == book.category_id)
        .map(|c| c.name.clone());
    for review in &mut book.reviews {
        review.customer = state
            .customers
            .iter()
            .find(|c| c.id == review.customer_id)
            .map(|c| CustomerProfile {
                full_name: c.full_name.clone(),
                email: c.email.clone(),
            });
    }
    book
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn find_books(&self, query: &BookQuery) -> PortResult<Vec<Book>> {
        self.touch();
        let state = self.state.lock().unwrap();
        let mut books: Vec<Book> = state
            .books
            .iter()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        books.sort_by_key(|b| b.created_at);
        Ok(books
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|b| populate(&state, b))
            .collect())
    }

    async fn count_books(&self, query: &BookQuery) -> PortResult<usize> {
        self.touch();
        let state = self.state.lock().unwrap();
        Ok(state.books.iter().filter(|b| query.matches(b)).count())
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        self.touch();
        let state = self.state.lock().unwrap();
        state
            .books
            .iter()
            .find(|b| b.id == book_id)
            .cloned()
            .map(|b| populate(&state, b))
            .ok_or_else(|| PortError::NotFound(format!("Book {book_id}")))
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        self.touch();
        self.wrote();
        let mut state = self.state.lock().unwrap();
        if let Some(issn) = &book.issn {
            if state.books.iter().any(|b| b.issn.as_ref() == Some(issn)) {
                return Err(PortError::Conflict(issn.clone()));
            }
        }
        let created = Book {
            id: Uuid::new_v4(),
            title: book.title,
            author: book.author,
            issn: book.issn,
            category_id: book.category_id,
            category_name: None,
            price: book.price,
            stock: 0,
            publish_year: book.publish_year,
            pages: book.pages,
            description: book.description,
            cover_image: book.cover_image,
            volume: book.volume,
            reviews: Vec::new(),
            average_rating: 0.0,
            is_deleted: false,
            created_at: Utc::now() + Duration::seconds(state.books.len() as i64),
        };
        state.books.push(created.clone());
        Ok(populate(&state, created))
    }

    async fn update_book(&self, book_id: Uuid, patch: BookPatch) -> PortResult<Book> {
        self.touch();
        self.wrote();
        let mut state = self.state.lock().unwrap();
        let book = state
            .books
            .iter_mut()
            .find(|b| b.id == book_id)
            .ok_or_else(|| PortError::NotFound(format!("Book {book_id}")))?;
        patch.apply(book);
        let book = book.clone();
        Ok(populate(&state, book))
    }

    async fn soft_delete_book(&self, book_id: Uuid) -> PortResult<()> {
        self.touch();
        self.wrote();
        let mut state = self.state.lock().unwrap();
        let book = state
            .books
            .iter_mut()
            .find(|b| b.id == book_id)
            .ok_or_else(|| PortError::NotFound(format!("Book {book_id}")))?;
        book.is_deleted = true;
        Ok(())
    }

    async fn upsert_review(&self, book_id: Uuid, submission: &ReviewSubmission) -> PortResult<ReviewAction> {
        self.touch();
        self.wrote();
        let mut state = self.state.lock().unwrap();
        let book = state
            .books
            .iter_mut()
            .find(|b| b.id == book_id && !b.is_deleted)
            .ok_or_else(|| PortError::NotFound(format!("Book {book_id}")))?;
        let (action, average) = submission.apply_to(&mut book.reviews);
        book.average_rating = average;
        Ok(action)
    }

    async fn list_categories(&self) -> PortResult<Vec<Category>> {
        self.touch();
        Ok(self.state.lock().unwrap().categories.clone())
    }

    async fn list_categories_with_quantity(&self) -> PortResult<Vec<CategoryWithQuantity>> {
        self.touch();
        let state = self.state.lock().unwrap();
        Ok(state
            .categories
            .iter()
            .map(|c| CategoryWithQuantity {
                id: c.id,
                name: c.name.clone(),
                quantity: state
                    .books
                    .iter()
                    .filter(|b| b.category_id == c.id && !b.is_deleted)
                    .count() as i64,
            })
            .collect())
    }

    async fn get_category(&self, category_id: Uuid) -> PortResult<Category> {
        self.touch();
        self.state
            .lock()
            .unwrap()
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Category {category_id}")))
    }

    async fn create_category(&self, name: &str) -> PortResult<Category> {
        self.touch();
        self.wrote();
        Ok(self.add_category(name))
    }

    async fn find_active_customer(&self, user_id: Uuid) -> PortResult<Customer> {
        self.touch();
        // Let concurrent requests interleave between the book read and the write.
        tokio::task::yield_now().await;
        self.state
            .lock()
            .unwrap()
            .customers
            .iter()
            .find(|c| c.user_id == user_id && c.is_active)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Customer for user {user_id}")))
    }

    async fn purchase_history(&self, user_id: Uuid, _max_orders: usize) -> PortResult<Vec<PurchasedItem>> {
        self.touch();
        Ok(self
            .state
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn list_users(&self, offset: usize, limit: usize) -> PortResult<(usize, Vec<User>)> {
        self.touch();
        let state = self.state.lock().unwrap();
        Ok((
            state.users.len(),
            state.users.iter().skip(offset).take(limit).cloned().collect(),
        ))
    }

    async fn get_user(&self, lookup: &UserLookup) -> PortResult<User> {
        self.touch();
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| match lookup {
                UserLookup::Id(id) => u.id == *id,
                UserLookup::Email(email) => u.email == *email,
            })
            .cloned()
            .ok_or_else(|| PortError::NotFound("User".to_string()))
    }

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        self.touch();
        self.wrote();
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(PortError::Conflict(user.email));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            role: user.role,
            products_cart: Vec::new(),
            created_at: Utc::now(),
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> PortResult<User> {
        self.touch();
        self.wrote();
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| PortError::NotFound("User".to_string()))?;
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        self.touch();
        self.wrote();
        let mut state = self.state.lock().unwrap();
        let before = state.users.len();
        state.users.retain(|u| u.id != user_id);
        if state.users.len() == before {
            return Err(PortError::NotFound("User".to_string()));
        }
        Ok(())
    }

    async fn set_cart(&self, user_id: Uuid, cart: &[CartItem]) -> PortResult<Vec<CartItem>> {
        self.touch();
        self.wrote();
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| PortError::NotFound("User".to_string()))?;
        user.products_cart = cart.to_vec();
        Ok(user.products_cart.clone())
    }
}

//=========================================================================================
// Completion
//=========================================================================================

/// Replays scripted answers in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedCompletion {
    answers: Mutex<VecDeque<PortResult<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, text: impl Into<String>) -> Self {
        self.answers.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, error: PortError) -> Self {
        self.answers.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> PortResult<String> {
        self.requests.lock().unwrap().push(request);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }

    fn model_name(&self, tier: ModelTier) -> String {
        match tier {
            ModelTier::Primary => "primary-model".to_string(),
            ModelTier::Fast => "fast-model".to_string(),
        }
    }
}

//=========================================================================================
// Images and Mail
//=========================================================================================

#[derive(Default)]
pub struct FakeImages {
    pub uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(&self, path: &Path, folder: &str) -> PortResult<String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let url = format!("https://img.test/{folder}/{name}");
        self.uploads.lock().unwrap().push(url.clone());
        Ok(url)
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> PortResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}
