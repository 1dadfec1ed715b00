//! Schedule generation and civil-time helpers

pub mod calendar;
pub mod generator;

pub use generator::{Candidate, GenerationSummary, GeneratorInput, PlannedShift, generate_schedule, summarize};
