use super::model::id::BookId;

/// キャッシュ整合性エラー（未知のID・重複ID）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("book already cached: {0}")]
    DuplicateId(BookId),

    #[error("book not found: {0}")]
    NotFound(BookId),
}
