//! Storage layer for meal plans: schema migrations, connection pool, row
//! models, and per-table queries.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
