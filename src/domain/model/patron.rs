use serde::{Deserialize, Serialize};

use super::id::BookId;

/// 利用者登録リクエスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
}

/// 貸出操作の利用者識別。メールアドレスか利用者名のどちらか。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatronRef {
    Email(String),
    UserName(String),
}

/// checkout / return / reserve 共通のリクエスト。
/// ワイヤ形式は `{"book_id": ..., "email": ...}` または `{"book_id": ..., "user_name": ...}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub book_id: BookId,
    #[serde(flatten)]
    pub patron: PatronRef,
}
