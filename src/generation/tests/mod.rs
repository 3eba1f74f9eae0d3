//! Unit tests for the generation context.
