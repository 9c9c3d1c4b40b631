//! Core engine: league mapping, cell location, execution, settlement and
//! the cycle that ties them together.

pub mod cycle;
pub mod executor;
pub mod league;
pub mod locator;
pub mod reconciler;
