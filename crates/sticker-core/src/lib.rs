//! Sticker Core - Foundational types for the sticker pipeline
//!
//! This crate provides the types every other sticker crate depends on:
//! - `StickerError` - The error taxonomy shared by adapters, workflow and export
//! - `ContentHash` - SHA-256 based content hashing for produced archives
//! - `Result` alias

mod error;
mod hash;

pub use error::{Result, StickerError};
pub use hash::ContentHash;
