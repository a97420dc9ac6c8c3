//! ANA Online Judge plugin harness
//!
//! Runs problem-setter plugins (test generators, checkers, interactors) as
//! one-shot drivers, and the host-side layer that spawns them.

pub mod components;
pub mod config;
pub mod core;
pub mod drivers;
pub mod plugin;
pub mod runner;
