#![forbid(unsafe_code)]

//! Library half of the viral shorts tooling: resolves a channel, walks its
//! most viewed uploads through the YouTube Data API and keeps the short ones
//! that crossed the view threshold.

pub mod api;
pub mod channel;
pub mod config;
pub mod details;
pub mod enumerate;
pub mod error;
pub mod export;
pub mod filter;
pub mod models;
pub mod pacing;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod security;

#[cfg(test)]
mod testing;
