pub mod api;
pub mod badge;
pub mod config;
pub mod geo;
pub mod store;
