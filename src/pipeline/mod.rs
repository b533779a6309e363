pub mod extraction;
pub mod remote;
pub mod translation;
pub mod recorder;
pub mod processor; // Batch orchestrator: classify → extract → translate → record
