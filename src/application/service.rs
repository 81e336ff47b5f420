use std::sync::Mutex;

use crate::domain::model::book::BookRecord;
use crate::domain::model::cache::{BookFilter, BookListCache, Mutation};
use crate::domain::repository::CacheStore;

use super::error::AppError;

/// Book一覧キャッシュと永続化先をまとめて扱うユースケース。
/// clone → mutate → save → 差し替え の順で操作するため、失敗時はキャッシュも保存内容も変わらない。
pub struct BookCacheService<S: CacheStore> {
    store: S,
    cache: Mutex<BookListCache>,
}

impl<S: CacheStore> BookCacheService<S> {
    /// 保存済みの一覧があれば復元する。なければ空で開始する。
    pub fn open(store: S) -> Result<Self, AppError> {
        let cache = match store.load().map_err(|e| AppError::Storage(Box::new(e)))? {
            Some(books) => BookListCache::from_records(books),
            None => BookListCache::new(),
        };
        tracing::debug!(cached = cache.len(), "book cache opened");
        Ok(Self {
            store,
            cache: Mutex::new(cache),
        })
    }

    /// サーバーの全件でキャッシュを置き換える。空なら保存先もクリアする。
    pub fn reconcile_full_list(&self, server_books: Vec<BookRecord>) -> Result<(), AppError> {
        let next = BookListCache::from_records(server_books);
        let mut guard = self.lock()?;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// サーバーの変更結果を1件適用する。
    pub fn apply_mutation(&self, mutation: Mutation) -> Result<(), AppError> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        next.apply_mutation(mutation)?;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// キャッシュを読み取り専用で参照する。
    pub fn read<T>(&self, f: impl FnOnce(&BookListCache) -> T) -> Result<T, AppError> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    /// 一致するレコードの複製。キャッシュは変更しない。
    pub fn filter_by_search(&self, filter: &BookFilter) -> Result<Vec<BookRecord>, AppError> {
        self.read(|cache| cache.filter_by_search(filter).cloned().collect())
    }

    pub fn snapshot(&self) -> Result<Vec<BookRecord>, AppError> {
        self.read(BookListCache::to_vec)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- private ---

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BookListCache>, AppError> {
        self.cache.lock().map_err(|_| AppError::LockPoisoned)
    }

    fn persist(&self, cache: &BookListCache) -> Result<(), AppError> {
        let result = if cache.is_empty() {
            self.store.clear()
        } else {
            self.store.save(&cache.to_vec())
        };
        result.map_err(|e| AppError::Storage(Box::new(e)))
    }
}
