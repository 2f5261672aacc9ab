//! `GameVault` API - Backend for a game marketplace
//!
//! This crate provides the REST API for `GameVault`, covering:
//! - Account registration, login, and token-based sessions
//! - Game listings with search, genres, platforms, and reviews
//! - Per-user wishlist and owned collections
//! - User and game image storage

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod images;
pub mod routes;
pub mod search;
pub mod state;
