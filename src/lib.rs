//! Local store for project ideas and their checklist tasks.
//!
//! The whole collection is one JSON blob under a single storage key. Every
//! [`store::Store`] operation reads it, changes it and writes it back.

pub mod db;
pub mod entities;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod storage;
pub mod store;
pub mod util;
pub mod watch;
