//! Blog Platform - a minimal blogging service
//!
//! This library provides CRUD over blog posts stored in SQLite or MySQL,
//! exposed as a JSON REST API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
