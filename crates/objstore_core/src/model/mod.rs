//! Storable domain entities.
//!
//! # Responsibility
//! - Define the identity/timestamp/dictionary contract (`entity`).
//! - Provide the built-in variants shipped with the store.
//!
//! # Invariants
//! - Every entity is identified by a stable string `id`.
//! - Variants are dispatched through `Entity`/`EntityKind`, never by downcast.

pub mod base_model;
pub mod entity;
pub mod user;
