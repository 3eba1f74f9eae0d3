//! Step definitions for master character reference scenarios.

pub mod world;

mod given;
mod then;
mod when;
