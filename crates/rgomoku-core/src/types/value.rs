//! スコアと探索深さ
//!
//! 着手オーダリングのスコアは静的セルスコア・方策スコア・履歴ボーナスを
//! 同一の整数スケールで合成するため、プレーンな `i32` を使う。

/// 着手オーダリングのスコア
pub type Score = i32;

/// 探索深さ（QVCF 探索では負値）
pub type Depth = i32;

/// QVCF 探索の打ち切り深さ
pub const DEPTH_QVCF: Depth = -5;

/// これ以上浅い（0に近い）QVCF 深さでは単独の止め四も攻め手に含める
pub const DEPTH_QVCF_FULL: Depth = -2;
