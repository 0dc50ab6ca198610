//! Concrete collaborators for the search core: the HTTP engine client and an
//! in-memory read-through response cache.

pub mod cache;
pub mod client;

pub use cache::MemoryCache;
pub use client::HttpEngineClient;
