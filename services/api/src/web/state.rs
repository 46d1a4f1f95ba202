//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use bookstore_core::ports::{CatalogStore, CompletionService, EmailSender, ImageStore};
use bookstore_core::{CatalogService, ChatbotService, UserService};

use crate::config::Config;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chatbot: ChatbotService,
    pub catalog: CatalogService,
    pub users: UserService,
}

impl AppState {
    /// Wires the core services onto one set of adapters.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn CatalogStore>,
        llm: Arc<dyn CompletionService>,
        images: Arc<dyn ImageStore>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            config,
            chatbot: ChatbotService::new(store.clone(), llm),
            catalog: CatalogService::new(store.clone(), images),
            users: UserService::new(store, mailer),
        }
    }
}
