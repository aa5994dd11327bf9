//! Digistore Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested end-to-end and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
