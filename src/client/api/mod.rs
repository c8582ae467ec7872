//! # Backend API
//!
//! - **`client`** - `ApiClient`: bearer auth, `data` envelope, one-shot refresh on 401
//! - **`tokens`** - `TokenStore`: access/refresh tokens and user profile in durable storage

pub mod client;
pub mod tokens;

pub use client::ApiClient;
pub use tokens::{TokenPair, TokenStore};
