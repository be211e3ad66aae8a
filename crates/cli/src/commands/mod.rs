//! CLI Commands

pub mod booking;
pub mod env;
pub mod graphql;
pub mod objects;
pub mod ping;
