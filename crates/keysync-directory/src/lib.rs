//! Directory service client and data models for key synchronization.
//!
//! Provides strongly typed models and an asynchronous client for the
//! directory admin API (group membership and per-user SSH-key attributes),
//! plus the token sources that authenticate against it.

#![deny(missing_docs)]

pub mod auth;
pub mod client;
pub mod models;
pub mod oauth;

pub use auth::{ServiceAccountKey, ServiceAccountTokenSource, StaticTokenSource, TokenSource};
pub use client::{Directory, DirectoryClient, DirectoryClientBuilder};
pub use models::{KeyAttribute, Member, MemberList, UpdateUserRequest};
pub use oauth::{OauthClient, TokenResponse};

/// Convenient result alias using the shared error type.
pub type Result<T> = keysync_core::Result<T>;
