//! Libris - a book catalog, library registry and blog sharing one user base
//!
//! This library provides the core functionality of the Libris service:
//! persistence, the role-based access gate, business services and the HTTP
//! API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
