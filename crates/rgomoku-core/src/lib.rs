//! rgomoku-core
//!
//! Gomoku/Renju エンジンのコアライブラリ。
//!
//! - `types`: 座標・色・ルール・脅威パターンなどの基本型
//! - `board`: 盤面と空点ごとの脅威分類
//! - `movegen`: バケット別の着手生成
//! - `eval`: 方策評価器の接続点
//! - `search`: History統計と MovePicker（着手オーダリング）

pub mod board;
pub mod eval;
pub mod movegen;
pub mod search;
pub mod types;

pub use board::{Board, Cell};
pub use types::{Color, Depth, Pattern4, Pos, Rule, Score};
