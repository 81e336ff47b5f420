pub mod http_backend;
pub mod json_store;
pub mod notice_log;
pub mod text_view;
