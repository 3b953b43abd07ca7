//! Unit Command - per-tick command controller for RTS units
//!
//! A `UnitController` turns player or AI orders (move, attack, queued
//! waypoints, patrol routes, payload commands) into steering and targeting
//! intents, one tick at a time, against a world it only reads through traits.

pub mod command;
pub mod controller;
pub mod core;
pub mod simulation;
pub mod world;
