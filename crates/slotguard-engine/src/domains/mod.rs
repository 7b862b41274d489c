//! Contract models shipped with the engine.

pub mod arithmetic;
pub mod threshold;

pub use arithmetic::{ArithmeticConfig, ArithmeticModel, GuardKind};
pub use threshold::{ThresholdConfig, ThresholdModel};
