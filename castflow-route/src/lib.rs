//! Routing of molten metal from a crucible through channels into mold tables.
//!
//! One activation runs the whole pipeline synchronously:
//! 1. Discover the channel network and adjacent mold tables (flood fill)
//! 2. Drop mold tables that cannot take the fluid
//! 3. Build a dense graph and run A* from the root channel to every mold table
//! 4. Write flow direction, distance and path counts onto the nodes
//!
//! Link maintenance ([`link`]) and the per-tick draining of mold tables
//! ([`Router::tick`]) keep that state consistent afterwards.

pub mod astar;
pub mod config;
pub mod discover;
pub mod error;
pub mod flow;
pub mod graph;
pub mod link;
pub mod router;

pub use config::RouteConfig;
pub use error::RouteError;
pub use router::{Activation, Router};

#[cfg(test)]
pub(crate) mod testing;
