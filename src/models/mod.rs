//! Shared data models spanning the engine layers.

pub mod alert;
pub mod candle;
pub mod evaluation;

pub use alert::{
    Alert, AlertId, AlertStatus, CompareWith, Condition, ConditionSource, ConditionState,
    FireMode, IndicatorParams, LogicOp, Operator,
};
pub use candle::{Candle, EventKind, MarketEvent, Timeframe};
pub use evaluation::{
    ConditionOutcome, EvaluationResult, FireDecision, FiringEvent, SnapshotEntry,
};
