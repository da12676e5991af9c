//! # comesol
//!
//! The async half of the COMESOL cadastro: the backend port and its
//! adapters, the registration service, the HTTP API and the CLI. The rules
//! themselves live in `comesol-core`.

pub mod api;
pub mod backend;
pub mod cli;
pub mod config;
pub mod service;
