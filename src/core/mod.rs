//! Core building blocks: the prompt data model, the in-memory repository,
//! the view engine, and the storage/sync machinery underneath the API.

pub mod bus;
pub mod config;
pub mod filter;
pub mod prompt;
pub mod repository;
pub mod store;
pub mod sync;
pub mod utils;
