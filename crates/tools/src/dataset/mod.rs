//! 学習データセット
//!
//! 訓練エントリ（`DataEntry`）のストリーミング読み出しを提供する。
//! 2つの形式があり、どちらも同じ `Dataset` トレイトで消費できる：
//!
//! - `PackedBinaryDataset`: ビットパックヘッダ + 着手列のバイナリレコード
//!   （LZ4フレーム圧縮を自動判別）
//! - `KatagoNumpyDataset`: npzアーカイブ（盤面ビットプレーン + 価値/方策ターゲット）
//!
//! フォーマット異常はすべて致命的で、`anyhow::Error` に原因を載せて返す。
//! ファイル末尾への到達はエラーではなく、次のファイルへ透過的に進む。

mod numpy;
mod packed_binary;

use anyhow::Result;
use rgomoku_core::{Pos, Rule};

pub use numpy::KatagoNumpyDataset;
pub use packed_binary::{PackedBinaryDataset, PackedBinaryWriter};

/// 対局結果（手番側から見た値）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GameResult {
    Loss = 0,
    Draw = 1,
    Win = 2,
}

impl GameResult {
    /// ワイヤ値（0=loss, 1=draw, 2=win）から変換
    #[inline]
    pub const fn from_wire(v: u8) -> Option<GameResult> {
        match v {
            0 => Some(GameResult::Loss),
            1 => Some(GameResult::Draw),
            2 => Some(GameResult::Win),
            _ => None,
        }
    }

    /// ワイヤ値へ変換
    #[inline]
    pub const fn to_wire(self) -> u8 {
        self as u8
    }
}

/// 訓練エントリ1件
///
/// `position` は初手（黒）から交互に並ぶ着手列。
/// `best_move` が無い場合は `Pos::NONE`。
/// `policy` はセルごとの方策分布（npz由来のエントリのみ）。
#[derive(Debug, Clone, PartialEq)]
pub struct DataEntry {
    pub board_size: u8,
    pub rule: Rule,
    pub result: GameResult,
    pub position: Vec<Pos>,
    pub best_move: Pos,
    pub policy: Option<Box<[f32]>>,
}

impl Default for DataEntry {
    fn default() -> Self {
        DataEntry {
            board_size: 15,
            rule: Rule::Freestyle,
            result: GameResult::Draw,
            position: Vec::new(),
            best_move: Pos::NONE,
            policy: None,
        }
    }
}

/// データセットのストリーミング読み出し
pub trait Dataset {
    /// 次のエントリを読む
    ///
    /// `entry` が `None` のときはレコード本体を読み飛ばす（高速カウント用）。
    /// 全ファイルを読み終えたら `Ok(false)`。フォーマット異常は `Err`。
    fn next(&mut self, entry: Option<&mut DataEntry>) -> Result<bool>;

    /// 先頭から読み直す
    fn reset(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_result_wire() {
        for result in [GameResult::Loss, GameResult::Draw, GameResult::Win] {
            assert_eq!(GameResult::from_wire(result.to_wire()), Some(result));
        }
        assert_eq!(GameResult::from_wire(3), None);
    }
}
