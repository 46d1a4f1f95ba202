pub mod db;
pub mod email;
pub mod images;
pub mod llm;

pub use db::DbAdapter;
pub use email::LogEmailSender;
pub use images::LocalImageStore;
pub use llm::OpenAiCompletionAdapter;
