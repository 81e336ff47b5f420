use crate::application::dashboard::Role;
use crate::application::view::BookView;
use crate::domain::model::book::{BookRecord, BookStatus, LoanAction};
use crate::domain::model::id::BookId;

/// テキストで描画するBookView実装（DOMのbooks-container相当）。
///
/// 利用者ダッシュボードでは貸出・予約・返却の候補一覧も描画する。
/// 候補は最後に取得した状態からのヒントであり、可否はサーバーが判定する。
#[derive(Debug, Clone)]
pub struct TextView {
    role: Role,
    books: Vec<BookRecord>,
}

impl TextView {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            books: Vec::new(),
        }
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    /// 指定操作の候補になる本（最後に取得した状態に基づく）
    pub fn candidates(&self, action: LoanAction) -> impl Iterator<Item = &BookRecord> + '_ {
        self.books
            .iter()
            .filter(move |b| b.status.transition(action).is_some())
    }

    fn render_options(&self, heading: &str, books: Vec<&BookRecord>, out: &mut String) {
        out.push_str(&format!("\n## {heading}\n"));
        if books.is_empty() {
            out.push_str("(none)\n");
        }
        for book in books {
            out.push_str(&format!("- [{}] {} by {}\n", book.id, book.title, book.author));
        }
    }
}

/// 1冊分の描画
pub fn render_book(book: &BookRecord) -> String {
    format!(
        "- [{}] {} by {} (ISBN: {}) Status: {}",
        book.id, book.title, book.author, book.isbn, book.status
    )
}

impl BookView for TextView {
    fn replace_all(&mut self, books: &[BookRecord]) {
        self.books = books.to_vec();
    }

    fn upsert(&mut self, book: &BookRecord) {
        match self.books.iter_mut().find(|b| b.id == book.id) {
            Some(existing) => *existing = book.clone(),
            None => self.books.push(book.clone()),
        }
    }

    fn remove(&mut self, id: &BookId) {
        self.books.retain(|b| b.id != *id);
    }

    fn render(&self) -> String {
        if self.books.is_empty() {
            return "No books to display.".to_string();
        }

        let mut out = format!("# Books ({})\n\n", self.books.len());
        for book in &self.books {
            out.push_str(&render_book(book));
            out.push('\n');
        }

        if self.role == Role::Patron {
            let checkout: Vec<&BookRecord> = self.candidates(LoanAction::Checkout).collect();
            self.render_options("Available to check out or reserve", checkout, &mut out);
            let borrowed: Vec<&BookRecord> = self
                .books
                .iter()
                .filter(|b| b.status == BookStatus::Borrowed)
                .collect();
            self.render_options("Available to return", borrowed, &mut out);
        }
        out
    }
}
