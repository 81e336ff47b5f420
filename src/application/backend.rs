use async_trait::async_trait;

use crate::domain::model::book::{BookDraft, BookRecord, LoanAction};
use crate::domain::model::id::BookId;
use crate::domain::model::patron::{LoanRequest, Registration};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    /// 通信は成功したが `{"error": ...}` が返った
    #[error("{0}")]
    Server(String),
}

/// 図書館バックエンドのREST契約。Infra層が実装する。
#[async_trait]
pub trait LibraryBackend: Send + Sync {
    async fn list_books(&self) -> Result<Vec<BookRecord>, BackendError>;

    async fn search_books(&self, query: &str) -> Result<Vec<BookRecord>, BackendError>;

    async fn add_book(&self, draft: &BookDraft) -> Result<BookRecord, BackendError>;

    async fn update_book(&self, id: &BookId, draft: &BookDraft)
        -> Result<BookRecord, BackendError>;

    async fn delete_book(&self, id: &BookId) -> Result<(), BackendError>;

    async fn register_user(&self, registration: &Registration) -> Result<(), BackendError>;

    /// checkout / return / reserve
    async fn loan_action(
        &self,
        action: LoanAction,
        request: &LoanRequest,
    ) -> Result<(), BackendError>;
}
