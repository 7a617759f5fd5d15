//! Tuckshop Storefront library.
//!
//! The HTTP service, its store seams and the services behind them. The
//! services run against [`db::PgStore`] in production and
//! [`db::MemoryStore`] in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
