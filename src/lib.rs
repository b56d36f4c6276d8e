pub mod capability;
pub mod core;
pub mod nlp;
pub mod research;

// --- Primary core exports ---
pub use core::types;
pub use core::types::*;
pub use core::AppState;

// --- Research loop entry points ---
pub use research::{run_research, ResearchOptions, ResearchState};
