use std::collections::HashMap;

use super::book::BookRecord;
use super::id::BookId;
use crate::domain::error::DomainError;

/// サーバー応答に基づくキャッシュへの変更
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Add(BookRecord),
    Update(BookRecord),
    Delete(BookId),
}

/// Book一覧のクライアント側キャッシュ — 集約ルート。
///
/// IDは一意で、挿入順を保持する。最後の全件取得に存在しないIDは保持しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookListCache {
    records: HashMap<BookId, BookRecord>,
    order: Vec<BookId>,
}

impl BookListCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 永続化済みの一覧から復元する。重複IDは後勝ち。
    pub fn from_records(records: impl IntoIterator<Item = BookRecord>) -> Self {
        let mut cache = Self::new();
        cache.reconcile_full_list(records);
        cache
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &BookId) -> Option<&BookRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &BookId) -> bool {
        self.records.contains_key(id)
    }

    /// 挿入順の全レコード
    pub fn records(&self) -> impl Iterator<Item = &BookRecord> + Clone + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn to_vec(&self) -> Vec<BookRecord> {
        self.records().cloned().collect()
    }

    /// キャッシュ全体をサーバーの一覧で置き換える。入力が正なのでエラーはない。
    ///
    /// 同じIDが複数回現れた場合、後のレコードが最初の位置を置き換える。
    pub fn reconcile_full_list(&mut self, server_books: impl IntoIterator<Item = BookRecord>) {
        self.records.clear();
        self.order.clear();
        for record in server_books {
            let id = record.id.clone();
            if self.records.insert(id.clone(), record).is_none() {
                self.order.push(id);
            }
        }
    }

    /// 変更を適用する。失敗時はキャッシュを変更しない。
    pub fn apply_mutation(&mut self, mutation: Mutation) -> Result<(), DomainError> {
        match mutation {
            Mutation::Add(record) => {
                if self.records.contains_key(&record.id) {
                    return Err(DomainError::DuplicateId(record.id));
                }
                self.order.push(record.id.clone());
                self.records.insert(record.id.clone(), record);
            }
            Mutation::Update(record) => {
                let slot = self
                    .records
                    .get_mut(&record.id)
                    .ok_or_else(|| DomainError::NotFound(record.id.clone()))?;
                *slot = record;
            }
            Mutation::Delete(id) => {
                // サーバー側で削除済みなので、未知のIDは無視する
                if self.records.remove(&id).is_some() {
                    self.order.retain(|existing| *existing != id);
                }
            }
        }
        Ok(())
    }

    /// 条件に一致するレコードを遅延評価で返す。キャッシュは変更しない。
    pub fn filter_by_search<'a>(&'a self, filter: &'a BookFilter) -> SearchResults<'a> {
        SearchResults {
            cache: self,
            ids: self.order.iter(),
            filter,
        }
    }
}

/// 検索条件。指定された条件はすべて一致する必要がある（AND）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    title: Option<String>,
    author: Option<String>,
    isbn: Option<String>,
    text: Option<String>,
}

impl BookFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// title / author / isbn のいずれかに一致するフリーテキスト条件
    pub fn text(query: impl AsRef<str>) -> Self {
        Self::new().with_text(query)
    }

    pub fn with_title(mut self, title: impl AsRef<str>) -> Self {
        self.title = non_empty(title.as_ref().to_lowercase());
        self
    }

    pub fn with_author(mut self, author: impl AsRef<str>) -> Self {
        self.author = non_empty(author.as_ref().to_lowercase());
        self
    }

    pub fn with_isbn(mut self, isbn: impl AsRef<str>) -> Self {
        self.isbn = non_empty(normalize_isbn(isbn.as_ref()));
        self
    }

    pub fn with_text(mut self, query: impl AsRef<str>) -> Self {
        self.text = non_empty(query.as_ref().to_lowercase());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.isbn.is_none() && self.text.is_none()
    }

    pub fn matches(&self, record: &BookRecord) -> bool {
        let title = record.title.to_lowercase();
        let author = record.author.to_lowercase();
        let isbn = normalize_isbn(&record.isbn);

        if let Some(q) = &self.title {
            if !title.contains(q.as_str()) {
                return false;
            }
        }
        if let Some(q) = &self.author {
            if !author.contains(q.as_str()) {
                return false;
            }
        }
        if let Some(q) = &self.isbn {
            if !isbn.contains(q.as_str()) {
                return false;
            }
        }
        if let Some(q) = &self.text {
            let q = q.as_str();
            // ハイフンだけのクエリはISBNとしては空なので比較しない
            let q_isbn = normalize_isbn(q);
            let isbn_hit = !q_isbn.is_empty() && isbn.contains(&q_isbn);
            if !(title.contains(q) || author.contains(q) || isbn_hit) {
                return false;
            }
        }
        true
    }
}

/// `filter_by_search` の結果。有限で、`clone()` すれば先頭からやり直せる。
#[derive(Debug, Clone)]
pub struct SearchResults<'a> {
    cache: &'a BookListCache,
    ids: std::slice::Iter<'a, BookId>,
    filter: &'a BookFilter,
}

impl<'a> Iterator for SearchResults<'a> {
    type Item = &'a BookRecord;

    fn next(&mut self) -> Option<Self::Item> {
        for id in self.ids.by_ref() {
            if let Some(record) = self.cache.records.get(id) {
                if self.filter.matches(record) {
                    return Some(record);
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len()))
    }
}

/// ハイフンと空白を除去し、末尾の`x`を大文字にそろえたISBN
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
