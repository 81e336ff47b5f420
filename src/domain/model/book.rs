use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::BookId;

/// 貸出状態。サーバーのレスポンスのみが正とする。
///
/// サーバーは `reserved` と `Reserved` の両方を返すため、解析は大文字小文字を区別しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BookStatus {
    Available,
    Borrowed,
    Reserved,
    Returned,
}

/// 利用者による貸出系操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoanAction {
    Checkout,
    Return,
    Reserve,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown book status: '{0}'")]
pub struct UnknownStatus(pub String);

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Borrowed => "borrowed",
            BookStatus::Reserved => "reserved",
            BookStatus::Returned => "returned",
        }
    }

    /// 状態遷移表。遷移できない組み合わせはNone。
    ///
    /// 表示上のヒント（選択肢の絞り込み）にのみ使う。実際の可否はサーバーが判定する。
    pub fn transition(self, action: LoanAction) -> Option<BookStatus> {
        match (self, action) {
            (BookStatus::Available, LoanAction::Checkout) => Some(BookStatus::Borrowed),
            (BookStatus::Available, LoanAction::Reserve) => Some(BookStatus::Reserved),
            (BookStatus::Borrowed, LoanAction::Return) => Some(BookStatus::Available),
            // 返却済みは再び貸出可能として扱う
            (BookStatus::Returned, LoanAction::Checkout) => Some(BookStatus::Borrowed),
            (BookStatus::Returned, LoanAction::Reserve) => Some(BookStatus::Reserved),
            _ => None,
        }
    }
}

impl FromStr for BookStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(BookStatus::Available),
            "borrowed" => Ok(BookStatus::Borrowed),
            "reserved" => Ok(BookStatus::Reserved),
            "returned" => Ok(BookStatus::Returned),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for BookStatus {
    type Error = UnknownStatus;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BookStatus> for String {
    fn from(status: BookStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1冊の本。サーバーレスポンスの余分なフィールド（作成日時など）は無視する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub status: BookStatus,
}

impl BookRecord {
    pub fn new(
        id: impl Into<BookId>,
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
        status: BookStatus,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            status,
        }
    }
}

/// 追加・更新リクエストのボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl BookDraft {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
        }
    }
}
