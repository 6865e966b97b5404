//! ライン形状の分類
//!
//! 空点に石を置いたと仮定して、1方向9マスの窓から五連・四・三・二を
//! 判定し、4方向の組み合わせで `Pattern4` を決める。
//!
//! - 四: 窓内の空点1つで中心を通る五連が完成する（完成点2つ以上で活四）
//! - 三: 窓内の空点1つで四（活四なら活三、止め四なら止め三）になる
//! - 二: 窓内の空点1つで活三になる
//!
//! `exact_five` が真のとき五連は「ちょうど5」のみで、6連以上は長連
//! （`Overline`）として区別する（連珠の黒と standard ルール）。

use crate::types::Pattern4;

/// 窓の長さ（中心 ± 4）
pub(crate) const LINE_WINDOW: usize = 9;

/// 窓の中心インデックス
pub(crate) const LINE_CENTER: usize = 4;

/// 窓内の1マスの状態（中心は常に `Own` として渡す）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellKind {
    Own,
    Oppo,
    Empty,
    Wall,
}

/// 1方向のライン形状（昇順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum LineShape {
    None,
    FlexTwo,
    BlockThree,
    FlexThree,
    BlockFour,
    FlexFour,
    Overline,
    Five,
}

/// 中心を通る連の長さから五連/長連を判定
fn five_through_center(line: &[CellKind; LINE_WINDOW], exact_five: bool) -> Option<LineShape> {
    debug_assert_eq!(line[LINE_CENTER], CellKind::Own);

    let mut lo = LINE_CENTER;
    while lo > 0 && line[lo - 1] == CellKind::Own {
        lo -= 1;
    }
    let mut hi = LINE_CENTER;
    while hi + 1 < LINE_WINDOW && line[hi + 1] == CellKind::Own {
        hi += 1;
    }

    let run = hi - lo + 1;
    if exact_five {
        match run {
            5 => Some(LineShape::Five),
            r if r > 5 => Some(LineShape::Overline),
            _ => None,
        }
    } else if run >= 5 {
        Some(LineShape::Five)
    } else {
        None
    }
}

/// 五連完成点の数から四を判定（五連/長連はそのまま返す）
fn four_level(line: &[CellKind; LINE_WINDOW], exact_five: bool) -> LineShape {
    if let Some(shape) = five_through_center(line, exact_five) {
        return shape;
    }

    let mut completions = 0;
    for i in 0..LINE_WINDOW {
        if line[i] != CellKind::Empty {
            continue;
        }
        let mut next = *line;
        next[i] = CellKind::Own;
        if five_through_center(&next, exact_five) == Some(LineShape::Five) {
            completions += 1;
        }
    }

    match completions {
        0 => LineShape::None,
        1 => LineShape::BlockFour,
        _ => LineShape::FlexFour,
    }
}

/// 窓からライン形状を求める
pub(crate) fn line_shape(line: &[CellKind; LINE_WINDOW], exact_five: bool) -> LineShape {
    // 中心以外に自石がなければ二にもならない
    let own_extra = line.iter().filter(|&&k| k == CellKind::Own).count() - 1;
    if own_extra == 0 {
        return LineShape::None;
    }

    if own_extra >= 2 {
        let four = four_level(line, exact_five);
        if four != LineShape::None {
            return four;
        }

        // 三: 石1つ追加で四になるか
        let mut has_flex_four = false;
        let mut has_block_four = false;
        for i in 0..LINE_WINDOW {
            if line[i] != CellKind::Empty {
                continue;
            }
            let mut next = *line;
            next[i] = CellKind::Own;
            match four_level(&next, exact_five) {
                LineShape::FlexFour => has_flex_four = true,
                LineShape::BlockFour => has_block_four = true,
                _ => {}
            }
        }
        if has_flex_four {
            return LineShape::FlexThree;
        }
        if has_block_four {
            return LineShape::BlockThree;
        }
    }

    // 二: 石1つ追加で活三になるか
    for i in 0..LINE_WINDOW {
        if line[i] != CellKind::Empty {
            continue;
        }
        let mut next = *line;
        next[i] = CellKind::Own;
        if is_flex_three(&next, exact_five) {
            return LineShape::FlexTwo;
        }
    }

    LineShape::None
}

fn is_flex_three(line: &[CellKind; LINE_WINDOW], exact_five: bool) -> bool {
    for i in 0..LINE_WINDOW {
        if line[i] != CellKind::Empty {
            continue;
        }
        let mut next = *line;
        next[i] = CellKind::Own;
        if four_level(&next, exact_five) == LineShape::FlexFour {
            return true;
        }
    }
    false
}

// =============================================================================
// 4方向の組み合わせ
// =============================================================================

/// 4方向のライン形状の集計
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ShapeCounts {
    pub five: u8,
    pub overline: u8,
    pub flex_four: u8,
    pub block_four: u8,
    pub flex_three: u8,
    pub block_three: u8,
    pub flex_two: u8,
}

impl ShapeCounts {
    pub(crate) fn add(&mut self, shape: LineShape) {
        match shape {
            LineShape::Five => self.five += 1,
            LineShape::Overline => self.overline += 1,
            LineShape::FlexFour => self.flex_four += 1,
            LineShape::BlockFour => self.block_four += 1,
            LineShape::FlexThree => self.flex_three += 1,
            LineShape::BlockThree => self.block_three += 1,
            LineShape::FlexTwo => self.flex_two += 1,
            LineShape::None => {}
        }
    }
}

/// 集計から `Pattern4` を決定する
///
/// `forbidden_applies` は連珠の黒のみ真。五連は禁手に優先する
/// （五を作る手は常に合法で即勝ち）。
pub(crate) fn combine_shapes(c: &ShapeCounts, forbidden_applies: bool) -> Pattern4 {
    if c.five > 0 {
        return Pattern4::Five;
    }

    if forbidden_applies
        && (c.overline > 0 || c.flex_four + c.block_four >= 2 || c.flex_three >= 2)
    {
        return Pattern4::Forbid;
    }

    if c.flex_four >= 1 || c.flex_four + c.block_four >= 2 {
        return Pattern4::FlexFour;
    }
    if c.block_four == 1 {
        if c.flex_three >= 1 {
            return Pattern4::BlockFourFlexThree;
        }
        if c.block_three >= 1 || c.flex_two >= 1 {
            return Pattern4::BlockFourPlus;
        }
        return Pattern4::BlockFour;
    }

    if c.flex_three >= 2 {
        return Pattern4::DoubleFlexThree;
    }
    if c.flex_three == 1 {
        if c.block_three >= 1 || c.flex_two >= 1 {
            return Pattern4::FlexThreePlus;
        }
        return Pattern4::FlexThree;
    }

    if c.block_three >= 2 || (c.block_three >= 1 && c.flex_two >= 1) {
        return Pattern4::BlockThreePlus;
    }
    if c.flex_two >= 2 {
        return Pattern4::DoubleFlexTwo;
    }
    if c.block_three == 1 {
        return Pattern4::BlockThree;
    }
    if c.flex_two == 1 {
        return Pattern4::FlexTwo;
    }

    Pattern4::None
}
