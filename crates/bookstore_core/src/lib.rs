pub mod domain;
pub mod matcher;
pub mod parse;
pub mod ports;
pub mod prompt;
pub mod reviews;
pub mod services;

pub use domain::{
    Book, BookPatch, CartItem, CartProduct, Category, CategoryWithQuantity, Customer,
    CustomerProfile, NewBook, NewUser, Pagination, PurchasedItem, Review, User, UserLookup,
    UserPatch,
};
pub use ports::{
    BookQuery, CatalogStore, ChatMessage, CompletionRequest, CompletionService, EmailSender,
    ImageStore, ModelTier, PortError, PortResult, Role,
};
pub use services::{CatalogService, ChatbotService, ServiceError, ServiceResult, UserService};
