//! 探索サポートモジュール
//!
//! - `history`: 着手オーダリング用のHistory統計
//! - `movepicker`: 段階的な着手生成と順序付け
//!
//! 探索ドライバ本体（Alpha-Beta・時間管理）はこのクレートの範囲外。

pub mod history;
pub mod movepicker;

pub use history::{
    ContHistWeights, ContinuationHistory, CounterMoveHistory, HistKind, MainHistory, MoveHistory,
    StatsEntry,
};
pub use movepicker::{
    fast_partial_sort, main_initial_stage, MainArgs, MovePicker, QvcfArgs, Stage,
};
