use crate::domain::model::book::BookRecord;
use crate::domain::model::id::BookId;

/// 表示側の抽象（DOM相当）。キャッシュ更新のたびに影響するノードだけを更新する。
pub trait BookView: Send {
    fn replace_all(&mut self, books: &[BookRecord]);
    fn upsert(&mut self, book: &BookRecord);
    fn remove(&mut self, id: &BookId);
    fn render(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// 利用者への通知。一定時間後に自動で消える。
pub trait Notifier: Send {
    fn notify(&mut self, notice: Notice);
    /// まだ表示中の通知（古い順）
    fn active(&mut self) -> Vec<Notice>;
}
