//! 脅威パターン（Pattern4）
//!
//! 空点に石を置いたときに生じる脅威を、4方向のライン形状の組み合わせで
//! 分類したもの。値の順序が脅威の深刻度を表す（`Five` が最大）。

/// セルごと・色ごとの脅威分類
///
/// 順序は深刻度昇順。`Forbid` は連珠ルールで黒のみ付き、
/// 四系パターン（`BlockFour` 以上）より下に位置する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Pattern4 {
    /// 脅威なし
    None,
    /// 活二
    FlexTwo,
    /// 止め三
    BlockThree,
    /// 二連×2
    DoubleFlexTwo,
    /// 止め三＋別の脅威
    BlockThreePlus,
    /// 活三
    FlexThree,
    /// 活三＋別の脅威
    FlexThreePlus,
    /// 活三×2（ダブル三）
    DoubleFlexThree,
    /// 禁手（連珠・黒のみ）
    Forbid,
    /// 止め四
    BlockFour,
    /// 止め四＋別の脅威
    BlockFourPlus,
    /// 四三
    BlockFourFlexThree,
    /// 活四（またはダブル四）
    FlexFour,
    /// 五連（即勝ち）
    Five,
}

impl Pattern4 {
    /// パターン数
    pub const NUM: usize = 14;

    /// テーブルインデックス
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}
