//! Runefall Engine - headless host for the Runefall combat core.
//!
//! This crate provides the runner's configuration, frame timing and the
//! demo arena that plays the part of a physics engine and input layer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod arena;
pub mod config;
pub mod timing;
