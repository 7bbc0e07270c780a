//! Route tables

pub mod search;
