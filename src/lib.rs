// src/lib.rs

//! anisync: seasonal anime catalog sync and cache

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
