//! # Flecto
//!
//! Multi-tenant management backend for HTTP redirects and static pages.
//! Operators stage changes as drafts and publish them atomically per project;
//! edge agents poll the published set.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! flecto = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use flecto::config::Config;
//! use flecto::server::{AppState, create_router};
//! use flecto::store::SqliteStore;
//!
//! let config = Config::load(None)?;
//! let store = SqliteStore::open(&config.db)?;
//! store.initialize()?;
//!
//! let state = Arc::new(AppState::new(Arc::new(store), config)?);
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `flecto` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod permission;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
pub mod validate;
