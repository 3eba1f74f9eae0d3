//! Orchestration services for master references.

pub mod character_reference;

pub use character_reference::CharacterReferenceService;
