use super::model::book::BookRecord;

/// キャッシュの永続化先（ブラウザのlocalStorage相当）。Infra層が実装する。
///
/// 1つのキーに一覧全体を保持する。書き込むのはBookCacheServiceのみ。
pub trait CacheStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self) -> Result<Option<Vec<BookRecord>>, Self::Error>;
    fn save(&self, books: &[BookRecord]) -> Result<(), Self::Error>;
    fn clear(&self) -> Result<(), Self::Error>;
}
