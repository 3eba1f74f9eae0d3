//! Step definitions for story illustration scenarios.

pub mod world;

mod given;
mod then;
mod when;
