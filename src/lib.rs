// src/lib.rs

//! FIA documents announcement bot
//!
//! Watches the FIA decision document listings for F1, F2 and F3, and
//! announces every newly published document exactly once.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
