pub mod book;
pub mod cache;
pub mod id;
pub mod patron;
