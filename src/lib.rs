//! Container image synchronisation between a local engine and registries.
//!
//! `regsync` pulls images with retry and doubling backoff, pushes and tags
//! them, and copies an image from one registry to another by chaining the
//! three. It can also run a container from a freshly pulled image and
//! force-remove it again.
//!
//! # Modules
//!
//! - [`auth`]: Registry credentials and the provider seam
//! - [`client`]: The synchronisation client and its retry policy
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`engine`]: Container engine connection and trait seams over its API
//! - [`error`]: Semantic error types for the application
//! - [`reference`]: Image reference parsing and registry host resolution

pub mod auth;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod reference;
