pub mod api;
pub mod config;
pub mod error;
pub mod estimation;
pub mod geo;
pub mod state;
pub mod storage;
