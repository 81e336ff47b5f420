pub mod backend;
pub mod dashboard;
pub mod error;
pub mod service;
pub mod view;
