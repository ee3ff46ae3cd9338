//! Basis Sentinel Strategy
//!
//! Entry, hold and re-hedge decisions for the basis/funding strategy.

pub mod engine;

pub use engine::{EntrySignal, PositionState, StrategyDecisionEngine, Trigger};
