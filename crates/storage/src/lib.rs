//! Storage backends for appstruct
//!
//! This crate implements the `Storage` / `StorageProvider` contract from
//! `appstruct-core` with:
//! - MemStorage: ordered in-memory rows behind a `parking_lot::RwLock`
//! - MemStorageProvider: one MemStorage per application, kept in a DashMap
//! - testing: fault-injecting wrapper for error-path tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mem;
pub mod provider;
pub mod testing;

pub use mem::MemStorage;
pub use provider::MemStorageProvider;
