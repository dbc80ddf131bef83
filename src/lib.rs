//! Weather-station reporting: measurement reads, cached trend analyses,
//! date-keyed notes and the bearer-token login that guards them.
pub mod analysis;
pub mod auth;
pub mod cache;
pub mod clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod repo;
pub mod routes;
pub mod services;
pub mod utils;

#[cfg(test)]
mod testing;
