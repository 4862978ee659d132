pub mod app;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod naming;
pub mod output;
pub mod render;
pub mod seatable;
pub mod store;
