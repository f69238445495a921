//! Core types and logic for droidpilot.
//!
//! This crate provides the pure, I/O-free building blocks for Android
//! device automation. The device crate layers transports, connection
//! management and screen polling on top of it.
//!
//! # Modules
//!
//! - [`error`]: the error taxonomy (transport vs. fatal takeover errors)
//! - [`geometry`]: points, regions, randomized strike-point sampling
//! - [`color`]: RGB color and the Euclidean similarity predicate
//! - [`frame`]: one captured screen image with its timestamp
//! - [`button`]: named regions with an expected appearance
//! - [`timer`]: debounced poll timer (elapsed time + confirmation count)
//!
//! # Matching model
//!
//! A [`button::Button`] is considered visible when the mean color of its
//! detection region is within a Euclidean threshold of the expected color.
//! Buttons that cannot be reduced to a flat color (icons, text) carry a
//! template patch instead and are matched through the external
//! image-similarity contract in the device crate.

pub mod button;
pub mod color;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod timer;
