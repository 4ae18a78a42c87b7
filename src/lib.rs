pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod models;
pub mod query;
pub mod routes;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
