pub mod auth;
pub mod completions;
pub mod config;
pub mod docs;
pub mod drive;
pub mod folders;
