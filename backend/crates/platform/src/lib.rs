//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, HMAC-SHA256, Base64, keyed `Signer`)
//! - Cookie attributes, extraction and update coalescing

pub mod cookie;
pub mod crypto;
