//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use library_dashboard::application::backend::{BackendError, LibraryBackend};
use library_dashboard::application::dashboard::{Dashboard, Role};
use library_dashboard::application::service::BookCacheService;
use library_dashboard::domain::model::book::{BookDraft, BookRecord, BookStatus, LoanAction};
use library_dashboard::domain::model::id::BookId;
use library_dashboard::domain::model::patron::{LoanRequest, PatronRef, Registration};
use library_dashboard::domain::repository::CacheStore;
use library_dashboard::infra::notice_log::NoticeLog;
use library_dashboard::infra::text_view::TextView;

// =============================================================================
// InMemoryStore — テスト用の永続化先
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("in-memory store error")]
pub struct InMemoryError;

/// ファイルI/O不要のインメモリストア。書き込み失敗を注入できる。
pub struct InMemoryStore {
    key: String,
    entries: Mutex<HashMap<String, String>>,
    fail_writes: Mutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            key: "books".to_string(),
            entries: Mutex::new(HashMap::new()),
            fail_writes: Mutex::new(false),
        }
    }

    pub fn with_books(books: &[BookRecord]) -> Self {
        let store = Self::new();
        store.save(books).unwrap();
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// 保存されている生のJSON文字列
    pub fn raw(&self) -> Option<String> {
        self.entries.lock().unwrap().get(&self.key).cloned()
    }

    pub fn stored(&self) -> Option<Vec<BookRecord>> {
        self.raw().map(|json| serde_json::from_str(&json).unwrap())
    }
}

impl CacheStore for InMemoryStore {
    type Error = InMemoryError;

    fn load(&self) -> Result<Option<Vec<BookRecord>>, Self::Error> {
        Ok(self.stored())
    }

    fn save(&self, books: &[BookRecord]) -> Result<(), Self::Error> {
        if *self.fail_writes.lock().unwrap() {
            return Err(InMemoryError);
        }
        let json = serde_json::to_string(books).unwrap();
        self.entries.lock().unwrap().insert(self.key.clone(), json);
        Ok(())
    }

    fn clear(&self) -> Result<(), Self::Error> {
        if *self.fail_writes.lock().unwrap() {
            return Err(InMemoryError);
        }
        self.entries.lock().unwrap().remove(&self.key);
        Ok(())
    }
}

// =============================================================================
// FakeBackend — 図書館サーバーのインメモリ実装
// =============================================================================

/// 状態遷移・利用者確認をサーバーと同じ規則で行うバックエンド。
pub struct FakeBackend {
    books: Mutex<Vec<BookRecord>>,
    users: Mutex<Vec<Registration>>,
    loans: Mutex<Vec<(BookId, String)>>,
    fail_next: Mutex<Option<BackendError>>,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_books(Vec::new())
    }

    pub fn with_books(books: Vec<BookRecord>) -> Self {
        Self {
            books: Mutex::new(books),
            users: Mutex::new(Vec::new()),
            loans: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// 次の1回の呼び出しを失敗させる。
    pub fn fail_next(&self, error: BackendError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn server_books(&self) -> Vec<BookRecord> {
        self.books.lock().unwrap().clone()
    }

    pub fn add_user(&self, name: &str, email: &str) {
        self.users.lock().unwrap().push(Registration {
            name: name.into(),
            email: email.into(),
        });
    }

    /// 他の利用者による変更を模擬する（クライアントを通さない）。
    pub fn set_status(&self, id: &str, status: BookStatus) {
        let mut books = self.books.lock().unwrap();
        if let Some(book) = books.iter_mut().find(|b| b.id.as_str() == id) {
            book.status = status;
        }
    }

    pub fn remove_directly(&self, id: &str) {
        self.books.lock().unwrap().retain(|b| b.id.as_str() != id);
    }

    fn enter(&self) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_next.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn find_patron(&self, patron: &PatronRef) -> Option<String> {
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| match patron {
                PatronRef::Email(email) => u.email.eq_ignore_ascii_case(email),
                PatronRef::UserName(name) => u.name.eq_ignore_ascii_case(name),
            })
            .map(|u| u.email.clone())
    }
}

#[async_trait]
impl LibraryBackend for FakeBackend {
    async fn list_books(&self) -> Result<Vec<BookRecord>, BackendError> {
        self.enter()?;
        Ok(self.server_books())
    }

    async fn search_books(&self, query: &str) -> Result<Vec<BookRecord>, BackendError> {
        self.enter()?;
        let q = query.to_lowercase();
        Ok(self
            .server_books()
            .into_iter()
            .filter(|b| {
                b.title.to_lowercase().contains(&q)
                    || b.author.to_lowercase().contains(&q)
                    || b.isbn.contains(&q)
            })
            .collect())
    }

    async fn add_book(&self, draft: &BookDraft) -> Result<BookRecord, BackendError> {
        self.enter()?;
        let mut books = self.books.lock().unwrap();
        if books.iter().any(|b| b.isbn == draft.isbn) {
            return Err(BackendError::Server("book with this ISBN already exists".into()));
        }
        let record = BookRecord::new(
            uuid::Uuid::new_v4().to_string(),
            draft.title.clone(),
            draft.author.clone(),
            draft.isbn.clone(),
            BookStatus::Available,
        );
        books.push(record.clone());
        Ok(record)
    }

    async fn update_book(
        &self,
        id: &BookId,
        draft: &BookDraft,
    ) -> Result<BookRecord, BackendError> {
        self.enter()?;
        let mut books = self.books.lock().unwrap();
        let book = books
            .iter_mut()
            .find(|b| b.id == *id)
            .ok_or_else(|| BackendError::Server("Book not found".into()))?;
        book.title = draft.title.clone();
        book.author = draft.author.clone();
        book.isbn = draft.isbn.clone();
        Ok(book.clone())
    }

    async fn delete_book(&self, id: &BookId) -> Result<(), BackendError> {
        self.enter()?;
        let mut books = self.books.lock().unwrap();
        let before = books.len();
        books.retain(|b| b.id != *id);
        if books.len() == before {
            return Err(BackendError::Server("Book not found".into()));
        }
        Ok(())
    }

    async fn register_user(&self, registration: &Registration) -> Result<(), BackendError> {
        self.enter()?;
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&registration.email))
        {
            return Err(BackendError::Server("email already registered".into()));
        }
        users.push(registration.clone());
        Ok(())
    }

    async fn loan_action(
        &self,
        action: LoanAction,
        request: &LoanRequest,
    ) -> Result<(), BackendError> {
        self.enter()?;
        let patron = self
            .find_patron(&request.patron)
            .ok_or_else(|| BackendError::Server("User not found".into()))?;

        let mut books = self.books.lock().unwrap();
        let book = books
            .iter_mut()
            .find(|b| b.id == request.book_id)
            .ok_or_else(|| BackendError::Server("Book not found".into()))?;
        let mut loans = self.loans.lock().unwrap();

        match action {
            LoanAction::Checkout => {
                if book.status != BookStatus::Available {
                    return Err(BackendError::Server(format!(
                        "Book is currently {} and cannot be checked out",
                        book.status
                    )));
                }
                book.status = BookStatus::Borrowed;
                loans.push((book.id.clone(), patron));
            }
            LoanAction::Return => {
                let pos = loans
                    .iter()
                    .position(|(id, who)| *id == book.id && *who == patron)
                    .ok_or_else(|| BackendError::Server("Loan Record Not Found".into()))?;
                loans.remove(pos);
                book.status = BookStatus::Available;
            }
            LoanAction::Reserve => {
                if book.status != BookStatus::Available {
                    return Err(BackendError::Server("Book is not Available".into()));
                }
                book.status = BookStatus::Reserved;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub type TestDashboard = Dashboard<FakeBackend, InMemoryStore, TextView, NoticeLog>;

pub fn book(id: &str, title: &str, author: &str, isbn: &str, status: BookStatus) -> BookRecord {
    BookRecord::new(id, title, author, isbn, status)
}

/// 標準的なサーバー側の蔵書:
/// ```text
/// 1. Dune (available)
/// 2. Emma (borrowed)
/// 3. Ulysses (reserved)
/// ```
pub fn standard_books() -> Vec<BookRecord> {
    vec![
        book("1", "Dune", "Frank Herbert", "0441172717", BookStatus::Available),
        book("2", "Emma", "Jane Austen", "9780141439587", BookStatus::Borrowed),
        book("3", "Ulysses", "James Joyce", "9780199535675", BookStatus::Reserved),
    ]
}

pub fn dashboard_with(role: Role, backend: FakeBackend, store: InMemoryStore) -> TestDashboard {
    let books = BookCacheService::open(store).unwrap();
    Dashboard::new(
        role,
        backend,
        books,
        TextView::new(role),
        NoticeLog::new(Duration::from_secs(60)),
    )
    .unwrap()
}

pub fn librarian(backend: FakeBackend) -> TestDashboard {
    dashboard_with(Role::Librarian, backend, InMemoryStore::new())
}

pub fn patron(backend: FakeBackend) -> TestDashboard {
    dashboard_with(Role::Patron, backend, InMemoryStore::new())
}

/// キャッシュ内のID（順序どおり）
pub fn cached_ids(dashboard: &TestDashboard) -> Vec<String> {
    dashboard
        .books()
        .snapshot()
        .unwrap()
        .into_iter()
        .map(|b| b.id.to_string())
        .collect()
}

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}
