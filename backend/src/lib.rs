//! Auth Service Backend Library
//!
//! Credential login, signed bearer tokens and the per-request
//! authentication gate. Modules are public for tests and other crates.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
