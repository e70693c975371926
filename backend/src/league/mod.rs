//! League progression engine
//!
//! Every function below `manager` takes the request's connection explicitly,
//! so one [`LeagueManager`] call is one transaction.

pub mod bracket;
pub mod fixtures;
pub mod manager;
pub mod ranking;
pub mod results;
pub mod schedule;
pub mod scoring;
pub mod sets;
pub mod standings;

#[cfg(test)]
pub(crate) mod testing;

pub use manager::LeagueManager;
