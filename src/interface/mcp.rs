//! MCP Server for library-dashboard
//!
//! MCP Protocol (stdio) <-> application::Dashboard <-> library REST backend
//!
//! 11 tools: load_books, search_books, show_books, add_book, update_book, delete_book,
//! register_user, checkout_book, return_book, reserve_book, notices

use std::sync::Arc;

use rmcp::{
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::application::dashboard::{Command, Dashboard, Role};
use crate::application::error::AppError;
use crate::application::service::BookCacheService;
use crate::config::Config;
use crate::domain::model::book::{BookDraft, LoanAction};
use crate::domain::model::cache::BookFilter;
use crate::domain::model::id::BookId;
use crate::domain::model::patron::{LoanRequest, PatronRef, Registration};
use crate::infra::http_backend::HttpBackend;
use crate::infra::json_store::JsonFileStorage;
use crate::infra::notice_log::NoticeLog;
use crate::infra::text_view::{render_book, TextView};

pub type LibraryDashboard = Dashboard<HttpBackend, JsonFileStorage, TextView, NoticeLog>;

// =============================================================================
// Public entry point
// =============================================================================

/// 設定からダッシュボードを組み立てる。保存済みキャッシュがあれば復元する。
pub fn build_dashboard(config: &Config) -> anyhow::Result<LibraryDashboard> {
    let backend = HttpBackend::new(&config.base_url, config.endpoints.clone())?;
    let store = JsonFileStorage::new(&config.storage.path, &config.storage.key);
    let books = BookCacheService::open(store)?;
    let dashboard = Dashboard::new(
        config.role,
        backend,
        books,
        TextView::new(config.role),
        NoticeLog::new(config.notification_duration()),
    )?;
    Ok(dashboard)
}

/// MCP Serverを起動する。起動時に一覧を取得し、失敗しても保存済みキャッシュで継続する。
pub async fn run(config: Config) -> anyhow::Result<()> {
    let dashboard = build_dashboard(&config)?;
    tracing::info!(
        base_url = %config.base_url,
        role = %config.role,
        storage = %config.storage.path.display(),
        "library dashboard starting"
    );

    let initial = dashboard.handle(Command::Reconcile).await;
    if initial.is_error() {
        tracing::warn!(message = %initial.message, "initial load failed; serving cached books");
    }

    let server = LibraryMcpServer::new(Arc::new(dashboard));
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

// =============================================================================
// MCP Server
// =============================================================================

#[derive(Clone)]
struct LibraryMcpServer {
    dashboard: Arc<LibraryDashboard>,
    tool_router: ToolRouter<Self>,
}

impl LibraryMcpServer {
    fn new(dashboard: Arc<LibraryDashboard>) -> Self {
        Self {
            dashboard,
            tool_router: Self::tool_router(),
        }
    }

    fn to_mcp_error(e: AppError) -> McpError {
        McpError::internal_error(format!("{e}"), None)
    }

    /// コマンドを実行し、通知と現在の表示を返す。エラー通知はツールエラーとして返す。
    async fn run_command(&self, command: Command) -> Result<CallToolResult, McpError> {
        let notice = self.dashboard.handle(command).await;
        if notice.is_error() {
            return Ok(CallToolResult::error(vec![Content::text(notice.message)]));
        }
        let view = self.dashboard.render().map_err(Self::to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "{}\n\n{}",
            notice.message, view
        ))]))
    }
}

// =============================================================================
// ServerHandler impl
// =============================================================================

impl ServerHandler for LibraryMcpServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = match self.dashboard.role() {
            Role::Librarian => {
                "Librarian dashboard.\n\
                 \n\
                 Tools: `load_books` → `add_book`/`update_book`/`delete_book`, \
                 `search_books` (server search), `show_books` (filter cached list). \
                 Book IDs are shown in brackets, e.g. `[3f2b8c1e-...]`."
            }
            Role::Patron => {
                "Patron dashboard.\n\
                 \n\
                 Tools: `register_user` first, then `load_books` → `checkout_book`/`return_book`/`reserve_book`. \
                 Candidate lists are hints from the last listing; the library decides availability."
            }
        };
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "library-dashboard".to_string(),
                title: Some("Library Dashboard".to_string()),
                description: Some(
                    "Manage and borrow books from the library backend. \
                     The book list is cached locally and reconciled after every change."
                        .to_string(),
                ),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(instructions.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_ctx).await
    }
}

// =============================================================================
// Request types
// =============================================================================

/// email / user_name のどちらかで利用者を指定する。両方あればemailを優先。
fn parse_patron(email: Option<String>, user_name: Option<String>) -> Result<PatronRef, McpError> {
    match (email, user_name) {
        (Some(email), _) if !email.trim().is_empty() => Ok(PatronRef::Email(email)),
        (_, Some(name)) if !name.trim().is_empty() => Ok(PatronRef::UserName(name)),
        _ => Err(McpError::invalid_params(
            "Either `email` or `user_name` is required",
            None,
        )),
    }
}

fn loan_command(action: LoanAction, req: McpLoanRequest) -> Result<Command, McpError> {
    let patron = parse_patron(req.email, req.user_name)?;
    Ok(Command::Loan(
        action,
        LoanRequest {
            book_id: BookId::new(req.book_id),
            patron,
        },
    ))
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpEmptyRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpSearchRequest {
    #[schemars(description = "Search text sent to the library (title, author or ISBN). Empty reloads the full list.")]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpShowRequest {
    #[schemars(description = "Free text matched against title, author and ISBN")]
    pub query: Option<String>,
    #[schemars(description = "Title substring (case-insensitive)")]
    pub title: Option<String>,
    #[schemars(description = "Author substring (case-insensitive)")]
    pub author: Option<String>,
    #[schemars(description = "ISBN (hyphens ignored)")]
    pub isbn: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookRequest {
    #[schemars(description = "Book title (required)")]
    pub title: String,
    #[schemars(description = "Author (required)")]
    pub author: String,
    #[schemars(description = "ISBN-10 or ISBN-13; hyphens allowed")]
    pub isbn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpUpdateRequest {
    #[schemars(description = "Book ID shown in brackets by `load_books`")]
    pub book_id: String,
    #[schemars(description = "New title")]
    pub title: String,
    #[schemars(description = "New author")]
    pub author: String,
    #[schemars(description = "New ISBN")]
    pub isbn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpDeleteRequest {
    #[schemars(description = "Book ID shown in brackets by `load_books`")]
    pub book_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpRegisterRequest {
    #[schemars(description = "Full name")]
    pub name: String,
    #[schemars(description = "Email address")]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpLoanRequest {
    #[schemars(description = "Book ID shown in brackets by `load_books`")]
    pub book_id: String,
    #[schemars(description = "Registered email address")]
    pub email: Option<String>,
    #[schemars(description = "Registered user name (used when email is omitted)")]
    pub user_name: Option<String>,
}

// =============================================================================
// Tool implementations
// =============================================================================

#[tool_router]
impl LibraryMcpServer {
    #[tool(
        name = "load_books",
        description = "Fetch the full book list from the library and replace the local cache with it.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn load_books(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpEmptyRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run_command(Command::Reconcile).await
    }

    #[tool(
        name = "search_books",
        description = "Search the library by title, author or ISBN. Results are displayed only; the local cache is not changed.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = true
        )
    )]
    async fn search_books(
        &self,
        Parameters(req): Parameters<McpSearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run_command(Command::Search(req.query)).await
    }

    #[tool(
        name = "show_books",
        description = "Show cached books, optionally filtered. No request is sent to the library.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn show_books(
        &self,
        Parameters(req): Parameters<McpShowRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut filter = BookFilter::new();
        if let Some(q) = req.query {
            filter = filter.with_text(q);
        }
        if let Some(t) = req.title {
            filter = filter.with_title(t);
        }
        if let Some(a) = req.author {
            filter = filter.with_author(a);
        }
        if let Some(i) = req.isbn {
            filter = filter.with_isbn(i);
        }

        if filter.is_empty() {
            let view = self.dashboard.render().map_err(Self::to_mcp_error)?;
            return Ok(CallToolResult::success(vec![Content::text(view)]));
        }

        let hits = self
            .dashboard
            .local_search(&filter)
            .map_err(Self::to_mcp_error)?;
        if hits.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "No cached books match.",
            )]));
        }
        let mut output = format!("# Matches ({})\n\n", hits.len());
        for book in &hits {
            output.push_str(&render_book(book));
            output.push('\n');
        }
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        name = "add_book",
        description = "Add a book to the library (librarian). Title, author and a valid ISBN are required.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn add_book(
        &self,
        Parameters(req): Parameters<McpBookRequest>,
    ) -> Result<CallToolResult, McpError> {
        let draft = BookDraft::new(req.title, req.author, req.isbn);
        self.run_command(Command::Add(draft)).await
    }

    #[tool(
        name = "update_book",
        description = "Update a book's title, author and ISBN (librarian). Status is managed by the library.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn update_book(
        &self,
        Parameters(req): Parameters<McpUpdateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let command = Command::Update {
            id: BookId::new(req.book_id),
            draft: BookDraft::new(req.title, req.author, req.isbn),
        };
        self.run_command(command).await
    }

    #[tool(
        name = "delete_book",
        description = "Remove a book from the library (librarian).",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn delete_book(
        &self,
        Parameters(req): Parameters<McpDeleteRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run_command(Command::Delete(BookId::new(req.book_id)))
            .await
    }

    #[tool(
        name = "register_user",
        description = "Register as a library patron with name and email.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn register_user(
        &self,
        Parameters(req): Parameters<McpRegisterRequest>,
    ) -> Result<CallToolResult, McpError> {
        let registration = Registration {
            name: req.name,
            email: req.email,
        };
        self.run_command(Command::Register(registration)).await
    }

    #[tool(
        name = "checkout_book",
        description = "Check out a book. Identify yourself by email (or user_name).",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn checkout_book(
        &self,
        Parameters(req): Parameters<McpLoanRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run_command(loan_command(LoanAction::Checkout, req)?)
            .await
    }

    #[tool(
        name = "return_book",
        description = "Return a borrowed book. Identify yourself by email (or user_name).",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn return_book(
        &self,
        Parameters(req): Parameters<McpLoanRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run_command(loan_command(LoanAction::Return, req)?)
            .await
    }

    #[tool(
        name = "reserve_book",
        description = "Reserve an available book. Identify yourself by email (or user_name).",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn reserve_book(
        &self,
        Parameters(req): Parameters<McpLoanRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run_command(loan_command(LoanAction::Reserve, req)?)
            .await
    }

    #[tool(
        name = "notices",
        description = "Show notifications that have not yet been dismissed.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn notices(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpEmptyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let notices = self.dashboard.notices().map_err(Self::to_mcp_error)?;
        if notices.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text("No notifications.")]));
        }
        let output = notices
            .iter()
            .map(|n| {
                let marker = if n.is_error() { "✗" } else { "✓" };
                format!("{marker} {}", n.message)
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }
}

// =============================================================================
// Tests
// =============================================================================
