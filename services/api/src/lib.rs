pub mod adapters;
pub mod archive;
pub mod config;
pub mod error;
pub mod web;
