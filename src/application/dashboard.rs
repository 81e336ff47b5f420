use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use serde::Deserialize;

use crate::domain::model::book::{BookDraft, BookRecord, LoanAction};
use crate::domain::model::cache::{BookFilter, Mutation};
use crate::domain::model::id::BookId;
use crate::domain::model::patron::{LoanRequest, Registration};
use crate::domain::repository::CacheStore;
use crate::domain::validation::{self, ValidationError};

use super::backend::LibraryBackend;
use super::error::AppError;
use super::service::BookCacheService;
use super::view::{BookView, Notice, Notifier};

/// ダッシュボードの種別。許可されるコマンドが変わる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Librarian,
    Patron,
}

impl Role {
    pub fn permits(self, kind: CommandKind) -> bool {
        use CommandKind::*;
        match kind {
            Reconcile | Search => true,
            Add | Update | Delete => self == Role::Librarian,
            Register | Checkout | Return | Reserve => self == Role::Patron,
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "librarian" => Ok(Role::Librarian),
            "patron" => Ok(Role::Patron),
            other => Err(format!("unknown role: '{other}'. Use: librarian, patron")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Librarian => f.write_str("librarian"),
            Role::Patron => f.write_str("patron"),
        }
    }
}

/// 1回の利用者操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reconcile,
    Search(String),
    Add(BookDraft),
    Update { id: BookId, draft: BookDraft },
    Delete(BookId),
    Register(Registration),
    Loan(LoanAction, LoanRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Reconcile,
    Search,
    Add,
    Update,
    Delete,
    Register,
    Checkout,
    Return,
    Reserve,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Reconcile => CommandKind::Reconcile,
            Command::Search(_) => CommandKind::Search,
            Command::Add(_) => CommandKind::Add,
            Command::Update { .. } => CommandKind::Update,
            Command::Delete(_) => CommandKind::Delete,
            Command::Register(_) => CommandKind::Register,
            Command::Loan(LoanAction::Checkout, _) => CommandKind::Checkout,
            Command::Loan(LoanAction::Return, _) => CommandKind::Return,
            Command::Loan(LoanAction::Reserve, _) => CommandKind::Reserve,
        }
    }
}

/// コマンド成功時の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Listed(usize),
    /// 検索結果。キャッシュには書き戻さない。
    Searched(Vec<BookRecord>),
    Added(BookRecord),
    Updated(BookRecord),
    Deleted(BookId),
    Registered,
    Loaned(LoanAction),
}

pub mod messages {
    use super::CommandKind;

    pub const NETWORK_ERROR: &str =
        "Network connection issue. Please check your internet connection.";

    pub fn success(kind: CommandKind) -> &'static str {
        match kind {
            CommandKind::Reconcile => "Books loaded successfully!",
            CommandKind::Search => "Search completed successfully!",
            CommandKind::Add => "Book added successfully! The book is now in the library.",
            CommandKind::Update => "Book updated successfully! The changes have been saved.",
            CommandKind::Delete => {
                "Book deleted successfully! The book has been removed from the library."
            }
            CommandKind::Register => "Registration successful! Welcome to the library system.",
            CommandKind::Checkout => "Book checked out successfully!",
            CommandKind::Return => "Book returned successfully!",
            CommandKind::Reserve => "Book reserved successfully!",
        }
    }

    pub fn failure(kind: CommandKind) -> &'static str {
        match kind {
            CommandKind::Reconcile => "Failed to load books. Please refresh the page.",
            CommandKind::Search => "Search operation failed. Please try again.",
            CommandKind::Add => "Failed to add book. Please check your input and try again.",
            CommandKind::Update => {
                "Failed to update book. Please verify the information and try again."
            }
            CommandKind::Delete => "Failed to delete book. Please try again later.",
            CommandKind::Register => "Registration failed.",
            CommandKind::Checkout => "Checkout failed.",
            CommandKind::Return => "Return failed.",
            CommandKind::Reserve => "Reservation failed.",
        }
    }
}

/// 司書・利用者ダッシュボード共通のコマンドディスパッチャ。
///
/// 検証 → REST呼び出し → キャッシュ反映 → 表示更新 → 通知 の順に処理する。
/// ネットワーク待ちの間はロックを保持しないため、競合した応答は後着が勝つ。
pub struct Dashboard<B, S, V, N>
where
    B: LibraryBackend,
    S: CacheStore,
    V: BookView,
    N: Notifier,
{
    role: Role,
    backend: B,
    books: BookCacheService<S>,
    view: Mutex<V>,
    notifier: Mutex<N>,
}

impl<B, S, V, N> Dashboard<B, S, V, N>
where
    B: LibraryBackend,
    S: CacheStore,
    V: BookView,
    N: Notifier,
{
    /// 保存済みキャッシュがあれば表示に反映した状態で作成する。
    pub fn new(
        role: Role,
        backend: B,
        books: BookCacheService<S>,
        mut view: V,
        notifier: N,
    ) -> Result<Self, AppError> {
        view.replace_all(&books.snapshot()?);
        Ok(Self {
            role,
            backend,
            books,
            view: Mutex::new(view),
            notifier: Mutex::new(notifier),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn books(&self) -> &BookCacheService<S> {
        &self.books
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// コマンドを実行し、結果を通知にも積む。
    pub async fn dispatch(&self, command: Command) -> Result<Outcome, AppError> {
        self.run(command).await.0
    }

    /// コマンドを実行し、利用者に見せる通知を返す。エラーはすべて通知に変換される。
    pub async fn handle(&self, command: Command) -> Notice {
        self.run(command).await.1
    }

    /// 現在の表示内容
    pub fn render(&self) -> Result<String, AppError> {
        Ok(self.view()?.render())
    }

    /// 表示中の通知
    pub fn notices(&self) -> Result<Vec<Notice>, AppError> {
        Ok(self
            .notifier
            .lock()
            .map_err(|_| AppError::LockPoisoned)?
            .active())
    }

    /// キャッシュ内の検索。通信せず、表示も変更しない。
    pub fn local_search(&self, filter: &BookFilter) -> Result<Vec<BookRecord>, AppError> {
        self.books.filter_by_search(filter)
    }

    // --- private ---

    async fn run(&self, command: Command) -> (Result<Outcome, AppError>, Notice) {
        let kind = command.kind();
        let result = if self.role.permits(kind) {
            self.execute(command).await
        } else {
            Err(AppError::NotPermitted(kind))
        };

        let notice = match &result {
            Ok(outcome) => {
                tracing::info!(command = ?kind, outcome = ?summary(outcome), "command succeeded");
                Notice::success(messages::success(kind))
            }
            Err(e) => {
                tracing::warn!(command = ?kind, error = %e, "command failed");
                Notice::error(failure_message(kind, e))
            }
        };

        match self.notifier.lock() {
            Ok(mut notifier) => notifier.notify(notice.clone()),
            Err(_) => tracing::error!("notifier lock poisoned; dropping notice"),
        }
        (result, notice)
    }

    async fn execute(&self, command: Command) -> Result<Outcome, AppError> {
        match command {
            Command::Reconcile => self.reconcile().await,
            Command::Search(query) => {
                let query = query.trim();
                if query.is_empty() {
                    return self.reconcile().await;
                }
                let results = self.backend.search_books(query).await?;
                self.view()?.replace_all(&results);
                Ok(Outcome::Searched(results))
            }
            Command::Add(draft) => {
                let draft = validation::validate_draft(&draft)?;
                let record = self.backend.add_book(&draft).await?;
                let mut view = self.view()?;
                self.books.apply_mutation(Mutation::Add(record.clone()))?;
                view.upsert(&record);
                Ok(Outcome::Added(record))
            }
            Command::Update { id, draft } => {
                require_id(&id)?;
                let draft = validation::validate_draft(&draft)?;
                let record = self.backend.update_book(&id, &draft).await?;
                let mut view = self.view()?;
                self.books.apply_mutation(Mutation::Update(record.clone()))?;
                view.upsert(&record);
                Ok(Outcome::Updated(record))
            }
            Command::Delete(id) => {
                require_id(&id)?;
                self.backend.delete_book(&id).await?;
                let mut view = self.view()?;
                self.books.apply_mutation(Mutation::Delete(id.clone()))?;
                view.remove(&id);
                Ok(Outcome::Deleted(id))
            }
            Command::Register(registration) => {
                let registration = validation::validate_registration(&registration)?;
                self.backend.register_user(&registration).await?;
                Ok(Outcome::Registered)
            }
            Command::Loan(action, request) => {
                let request = validation::validate_loan(&request)?;
                self.backend.loan_action(action, &request).await?;
                // 状態はサーバーの一覧からのみ反映する。ローカルで遷移を推測しない。
                if let Err(e) = self.reconcile().await {
                    tracing::warn!(?action, error = %e, "refresh after loan action failed");
                }
                Ok(Outcome::Loaned(action))
            }
        }
    }

    async fn reconcile(&self) -> Result<Outcome, AppError> {
        let books = self.backend.list_books().await?;
        let count = books.len();
        let mut view = self.view()?;
        self.books.reconcile_full_list(books)?;
        view.replace_all(&self.books.snapshot()?);
        Ok(Outcome::Listed(count))
    }

    /// キャッシュを更新する処理は、先にこのロックを取ってから表示と一緒に更新する。
    fn view(&self) -> Result<MutexGuard<'_, V>, AppError> {
        self.view.lock().map_err(|_| AppError::LockPoisoned)
    }
}

fn require_id(id: &BookId) -> Result<(), ValidationError> {
    if id.as_str().trim().is_empty() {
        return Err(ValidationError::MissingField("book"));
    }
    Ok(())
}

fn failure_message(kind: CommandKind, e: &AppError) -> String {
    match e {
        AppError::Validation(v) => format!("{}\nError: {}", messages::failure(kind), v),
        AppError::Network(_) => format!("{}\n{}", messages::failure(kind), messages::NETWORK_ERROR),
        other => format!("{}\nError: {}", messages::failure(kind), other),
    }
}

fn summary(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Listed(n) => format!("{n} books"),
        Outcome::Searched(r) => format!("{} matches", r.len()),
        Outcome::Added(r) | Outcome::Updated(r) => r.id.to_string(),
        Outcome::Deleted(id) => id.to_string(),
        Outcome::Registered => "registered".to_string(),
        Outcome::Loaned(action) => format!("{action:?}"),
    }
}
