pub mod audit;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod search;
pub mod security;
pub mod taxonomy;
