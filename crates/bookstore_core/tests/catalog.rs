mod common;

use std::path::PathBuf;
use std::sync::Arc;

use bookstore_core::reviews::ReviewAction;
use bookstore_core::services::catalog::BookForm;
use bookstore_core::{CatalogService, ServiceError};
use common::{FakeImages, InMemoryCatalog};
use serde_json::json;
use uuid::Uuid;

fn service(catalog: &Arc<InMemoryCatalog>) -> (CatalogService, Arc<FakeImages>) {
    let images = Arc::new(FakeImages::default());
    (CatalogService::new(catalog.clone(), images.clone()), images)
}

fn form(title: &str, category: Uuid) -> BookForm {
    BookForm {
        title: Some(title.to_string()),
        author: Some("Author".to_string()),
        category: Some(category.to_string()),
        price: Some("12.5".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn list_books_pages_over_active_books_only() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Fiction");
    let books: Vec<_> = (0..12)
        .map(|i| catalog.add_book(&format!("Book {i}"), "A", &cat, None))
        .collect();
    catalog.delete_book(books[0].id);
    let (svc, _) = service(&catalog);

    let first = svc.list_books(None, None).await.unwrap();
    assert_eq!(first.books.len(), 9);
    assert_eq!(first.pagination.total, 11);
    assert_eq!(first.pagination.total_pages, 2);
    assert!(first.books.iter().all(|b| b.id != books[0].id));

    let second = svc.list_books(Some("2"), Some("9")).await.unwrap();
    assert_eq!(second.books.len(), 2);

    let junk = svc.list_books(Some("abc"), Some("-3")).await.unwrap();
    assert_eq!(junk.pagination.page, 1);
    assert_eq!(junk.pagination.limit, 9);
}

#[tokio::test]
async fn unreachable_pages_are_rejected_and_page_size_is_capped() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Fiction");
    catalog.add_book("Dune", "Herbert", &cat, None);
    let (svc, _) = service(&catalog);

    let err = svc
        .list_books(Some("18446744073709551615"), Some("9"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(catalog.call_count(), 0);

    let wide = svc.list_books(Some("1"), Some("5000")).await.unwrap();
    assert_eq!(wide.pagination.limit, 100);
    assert_eq!(wide.books.len(), 1);
}

#[tokio::test]
async fn create_book_uploads_cover_and_validates_category() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Science");
    let (svc, images) = service(&catalog);

    let mut with_cover = form("Cosmos", cat.id);
    with_cover.cover = Some(PathBuf::from("/tmp/uploads/cosmos.png"));
    let book = svc.create_book(with_cover).await.unwrap();
    assert_eq!(book.price, 12.5);
    assert_eq!(
        book.cover_image.as_deref(),
        Some("https://img.test/books/cosmos.png")
    );
    assert_eq!(images.uploads.lock().unwrap().len(), 1);

    let err = svc.create_book(form("Orphan", Uuid::new_v4())).await.unwrap_err();
    assert_eq!(
        err,
        ServiceError::Validation("Category does not exist".to_string())
    );
}

#[tokio::test]
async fn duplicate_issn_is_a_validation_error() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Science");
    let (svc, _) = service(&catalog);

    let mut first = form("One", cat.id);
    first.issn = Some("1234-5678".to_string());
    svc.create_book(first.clone()).await.unwrap();

    let err = svc.create_book(first).await.unwrap_err();
    match err {
        ServiceError::Validation(msg) => assert!(msg.contains("1234-5678")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn create_book_rejects_non_numeric_price() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Science");
    let (svc, _) = service(&catalog);

    let mut bad = form("One", cat.id);
    bad.price = Some("cheap".to_string());
    assert!(matches!(
        svc.create_book(bad).await,
        Err(ServiceError::Validation(_))
    ));
    assert_eq!(catalog.write_count(), 0);
}

#[tokio::test]
async fn update_and_soft_delete() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Science");
    let book = catalog.add_book("Old title", "A", &cat, None);
    let (svc, _) = service(&catalog);

    let updated = svc
        .update_book(
            &book.id.to_string(),
            BookForm {
                title: Some("New title".to_string()),
                author: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.author, "A");

    svc.delete_book(&book.id.to_string()).await.unwrap();
    assert!(catalog.book(book.id).is_deleted);
    assert!(matches!(
        svc.get_book(&book.id.to_string()).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn a_second_review_by_the_same_customer_replaces_the_first() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Science");
    let book = catalog.add_book("Cosmos", "Sagan", &cat, None);
    let user_id = Uuid::new_v4();
    let customer = catalog.add_customer(user_id, "Ada");
    let (svc, _) = service(&catalog);
    let book_id = book.id.to_string();

    let first = svc
        .add_review(&book_id, user_id, Some(&json!(3)), Some("ok"))
        .await
        .unwrap();
    assert_eq!(first.action, ReviewAction::Added);
    assert_eq!(first.book.average_rating, 3.0);

    let second = svc
        .add_review(&book_id, user_id, Some(&json!("5")), Some("great"))
        .await
        .unwrap();
    assert_eq!(second.action, ReviewAction::Updated);
    assert_eq!(second.book.reviews.len(), 1);
    assert_eq!(second.book.reviews[0].rating, 5);
    assert_eq!(second.book.reviews[0].review, "great");
    assert_eq!(second.book.average_rating, 5.0);
    assert_eq!(
        second.book.reviews[0].customer.as_ref().map(|c| c.full_name.as_str()),
        Some(customer.full_name.as_str())
    );
}

#[tokio::test]
async fn concurrent_reviews_from_different_customers_are_all_kept() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Science");
    let book = catalog.add_book("Cosmos", "Sagan", &cat, None);
    let (ada, bob) = (Uuid::new_v4(), Uuid::new_v4());
    catalog.add_customer(ada, "Ada");
    catalog.add_customer(bob, "Bob");
    let (svc, _) = service(&catalog);
    let book_id = book.id.to_string();

    let (five, one) = (json!(5), json!(1));
    let (first, second) = tokio::join!(
        svc.add_review(&book_id, ada, Some(&five), Some("superb")),
        svc.add_review(&book_id, bob, Some(&one), Some("dull")),
    );
    assert_eq!(first.unwrap().action, ReviewAction::Added);
    assert_eq!(second.unwrap().action, ReviewAction::Added);

    let stored = catalog.book(book.id);
    assert_eq!(stored.reviews.len(), 2);
    assert_eq!(stored.average_rating, 3.0);
}

#[tokio::test]
async fn invalid_ratings_never_reach_the_store() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Science");
    let book = catalog.add_book("Cosmos", "Sagan", &cat, None);
    let user_id = Uuid::new_v4();
    catalog.add_customer(user_id, "Ada");
    let (svc, _) = service(&catalog);

    for rating in [json!(4.5), json!(0), json!(6), json!("five"), json!(null)] {
        let err = svc
            .add_review(&book.id.to_string(), user_id, Some(&rating), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{rating}");
    }
    assert_eq!(catalog.call_count(), 0);
    assert!(catalog.book(book.id).reviews.is_empty());
}

#[tokio::test]
async fn reviewing_needs_a_customer_profile() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Science");
    let book = catalog.add_book("Cosmos", "Sagan", &cat, None);
    let (svc, _) = service(&catalog);

    let err = svc
        .add_review(&book.id.to_string(), Uuid::new_v4(), Some(&json!(4)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(catalog.write_count(), 0);
}

#[tokio::test]
async fn categories_report_active_book_quantities() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let cat = catalog.add_category("Science");
    catalog.add_category("Empty");
    catalog.add_book("A", "X", &cat, None);
    let gone = catalog.add_book("B", "X", &cat, None);
    catalog.delete_book(gone.id);
    let (svc, _) = service(&catalog);

    let first = svc.list_categories().await.unwrap();
    let second = svc.list_categories().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].quantity, 1);
    assert_eq!(first[1].quantity, 0);

    assert!(svc.create_category(Some("  ")).await.is_err());
    let created = svc.create_category(Some("Poetry")).await.unwrap();
    assert_eq!(created.name, "Poetry");
}
