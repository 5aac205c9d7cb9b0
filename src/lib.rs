//! fightgraph - fighter discovery and offline name index
//!
//! Walks the opponent links between fighter profiles breadth-first, pacing
//! every fetch through a rate limiter, and keeps a local normalized-name to
//! identifier index that can be searched without touching the network.

pub mod cache;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod persist;
pub mod ratelimit;
pub mod source;
pub mod store;

pub use discovery::{DiscoveryEngine, DiscoveryOptions, DiscoveryResult};
pub use error::{FightgraphError, Result};
pub use store::{Entity, EntityStore};
