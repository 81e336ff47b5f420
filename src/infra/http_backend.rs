use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::application::backend::{BackendError, LibraryBackend};
use crate::config::Endpoints;
use crate::domain::model::book::{BookDraft, BookRecord, LoanAction};
use crate::domain::model::id::BookId;
use crate::domain::model::patron::{LoanRequest, Registration};

/// `{"error": "..."}` 形式のエラーボディ
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// reqwestによるLibraryBackend実装。
pub struct HttpBackend {
    client: Client,
    base_url: String,
    endpoints: Endpoints,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, endpoints: Endpoints) -> Result<Self, BackendError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url, endpoints))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, endpoints: Endpoints) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            endpoints,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn url_with_id(&self, path: &str, id: &BookId) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            path.trim_end_matches('/'),
            urlencoding::encode(id.as_str())
        )
    }

    fn loan_path(&self, action: LoanAction) -> &str {
        match action {
            LoanAction::Checkout => self.endpoints.checkout.as_str(),
            LoanAction::Return => self.endpoints.return_book.as_str(),
            LoanAction::Reserve => self.endpoints.reserve.as_str(),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, BackendError> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "backend response");

        // ステータスに関わらず {error} ボディはサーバーエラーとして扱う
        if let Ok(ErrorBody { error }) = serde_json::from_slice::<ErrorBody>(&body) {
            return Err(BackendError::Server(error));
        }
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LibraryBackend for HttpBackend {
    async fn list_books(&self) -> Result<Vec<BookRecord>, BackendError> {
        tracing::debug!(path = %self.endpoints.list, "GET books");
        self.send_json(self.client.get(self.url(&self.endpoints.list)))
            .await
    }

    async fn search_books(&self, query: &str) -> Result<Vec<BookRecord>, BackendError> {
        tracing::debug!(path = %self.endpoints.search, query, "GET search");
        let request = self
            .client
            .get(self.url(&self.endpoints.search))
            .query(&[("query", query)]);
        self.send_json(request).await
    }

    async fn add_book(&self, draft: &BookDraft) -> Result<BookRecord, BackendError> {
        tracing::debug!(path = %self.endpoints.add, isbn = %draft.isbn, "POST book");
        let request = self.client.post(self.url(&self.endpoints.add)).json(draft);
        self.send_json(request).await
    }

    async fn update_book(
        &self,
        id: &BookId,
        draft: &BookDraft,
    ) -> Result<BookRecord, BackendError> {
        tracing::debug!(path = %self.endpoints.update, %id, "PUT book");
        let request = self
            .client
            .put(self.url_with_id(&self.endpoints.update, id))
            .json(draft);
        self.send_json(request).await
    }

    async fn delete_book(&self, id: &BookId) -> Result<(), BackendError> {
        tracing::debug!(path = %self.endpoints.remove, %id, "DELETE book");
        let request = self
            .client
            .delete(self.url_with_id(&self.endpoints.remove, id));
        self.send(request).await?;
        Ok(())
    }

    async fn register_user(&self, registration: &Registration) -> Result<(), BackendError> {
        tracing::debug!(path = %self.endpoints.register, "POST register");
        let request = self
            .client
            .post(self.url(&self.endpoints.register))
            .json(registration);
        self.send(request).await?;
        Ok(())
    }

    async fn loan_action(
        &self,
        action: LoanAction,
        request: &LoanRequest,
    ) -> Result<(), BackendError> {
        let path = self.loan_path(action);
        tracing::debug!(path, book_id = %request.book_id, ?action, "POST loan action");
        let builder = self.client.post(self.url(path)).json(request);
        self.send(builder).await?;
        Ok(())
    }
}
