//! alertrix — stateful evaluation core for trading alert rules.
//!
//! Evaluates user-defined alert conditions against streaming candles
//! and derived indicators, bar by bar, and decides whether an alert
//! should fire. Market data, indicator math, persistence, and
//! notification dispatch stay behind collaborator traits in
//! [`services`].

pub mod cache;
pub mod config;
pub mod core;
pub mod evaluation;
pub mod logging;
pub mod models;
pub mod services;
