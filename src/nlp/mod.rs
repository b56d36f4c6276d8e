pub mod key_terms;
pub mod salvage;
