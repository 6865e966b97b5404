//! 基本型
//!
//! 盤面座標・石の色・ルール・脅威パターン・評価スコアなど、
//! クレート全体で共有する型を集約する。

mod color;
mod pattern;
mod pos;
mod rule;
mod value;

pub use color::Color;
pub use pattern::Pattern4;
pub use pos::{Pos, MAX_BOARD_SIZE, MAX_MOVES, MOVE_INDEX_SIZE};
pub use rule::Rule;
pub use value::{Depth, Score, DEPTH_QVCF, DEPTH_QVCF_FULL};
