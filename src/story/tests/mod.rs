//! Unit tests for the story context.
