pub mod abi;
pub mod api;
pub mod chain;
pub mod config;
pub mod contract;
pub mod error;
pub mod models;
