//! Level/pattern adaptation (ITU-R BS.1387-1 §3.3) and modulation pattern
//! processing (§3.2): the stages between the ear models and the MOV
//! extractors.

#![deny(unsafe_code)]

pub mod level_adapter;
pub mod modulation_processor;

pub use level_adapter::{LevelAdapter, LevelAdapterOutput};
pub use modulation_processor::ModulationProcessor;
