//! 着手生成器
//!
//! MovePicker の各ステージが使うバケット別の生成器。
//! 生成器は脅威パターンで空点をフィルタして `MoveBuffer` に追記する。
//! 同じバッファへ複数の生成器を重ねても座標は重複しない。

use crate::board::Board;
use crate::types::{Color, Pattern4, Pos, Rule, Score, MAX_MOVES};

/// 静穏手生成の候補範囲（既存の石からのチェビシェフ距離）
const CANDIDATE_RANGE: i8 = 3;

/// QVCF 用の近傍テンプレート: 半径2の正方形 + 8方向の直線延長（距離3,4）
pub const RANGE_SQUARE2_LINE4: [(i8, i8); 40] = [
    // 半径2の正方形（中心を除く24マス）
    (-2, -2), (-1, -2), (0, -2), (1, -2), (2, -2),
    (-2, -1), (-1, -1), (0, -1), (1, -1), (2, -1),
    (-2, 0), (-1, 0), (1, 0), (2, 0),
    (-2, 1), (-1, 1), (0, 1), (1, 1), (2, 1),
    (-2, 2), (-1, 2), (0, 2), (1, 2), (2, 2),
    // 8方向の直線延長
    (-3, 0), (3, 0), (0, -3), (0, 3), (-3, -3), (3, -3), (-3, 3), (3, 3),
    (-4, 0), (4, 0), (0, -4), (0, 4), (-4, -4), (4, -4), (-4, 4), (4, 4),
];

/// スコア付き着手
#[derive(Debug, Clone, Copy)]
pub struct ExtMove {
    pub pos: Pos,
    /// 並べ替えに使う実効スコア
    pub score: Score,
    /// 履歴・ボーナス合成前のスコア（方策が有効なら方策スコア）
    pub raw_score: Score,
}

impl ExtMove {
    #[inline]
    pub fn new(pos: Pos) -> ExtMove {
        ExtMove { pos, score: 0, raw_score: 0 }
    }
}

impl Default for ExtMove {
    fn default() -> Self {
        ExtMove::new(Pos::NONE)
    }
}

/// 固定容量の着手バッファ
///
/// MovePicker がスタック上に1つ持つ。容量は最大盤面のセル数。
pub struct MoveBuffer {
    moves: [ExtMove; MAX_MOVES],
    len: usize,
}

impl MoveBuffer {
    pub fn new() -> MoveBuffer {
        MoveBuffer { moves: [ExtMove::default(); MAX_MOVES], len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// 座標を追加する（既に含まれていれば何もしない）
    pub fn push_unique(&mut self, pos: Pos) {
        if self.moves[..self.len].iter().any(|m| m.pos == pos) {
            return;
        }
        debug_assert!(self.len < MAX_MOVES);
        self.moves[self.len] = ExtMove::new(pos);
        self.len += 1;
    }

    #[inline]
    pub fn as_slice(&self) -> &[ExtMove] {
        &self.moves[..self.len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [ExtMove] {
        &mut self.moves[..self.len]
    }
}

impl Default for MoveBuffer {
    fn default() -> Self {
        MoveBuffer::new()
    }
}

/// 生成する着手の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenType {
    /// 候補範囲内の全空点
    All,
    /// 即勝ちの手（自分の五連完成点・活四点）
    Winning,
    /// 相手の五連完成点の防御
    DefendFive,
    /// 相手の活四への対抗点（ブロック）
    DefendFour,
    /// 相手の四三への対抗点（四の側・三の側の両方）
    ///
    /// 連珠では相手（黒）の禁手点は継続手にならないため防御対象から外れる。
    DefendB4F3(Rule),
    /// 自分の四を作る手（VCF 攻撃手）
    Vcf,
    /// 複合脅威の四のみ（単独の止め四を除く）
    VcfComb,
}

#[inline]
fn accepts(gen: GenType, board: &Board, self_color: Color, pos: Pos) -> bool {
    let cell = board.cell(pos);
    let oppo = !self_color;
    match gen {
        GenType::All => {
            // 禁手点は黒番の連珠でのみ除外される
            !(board.rule() == Rule::Renju
                && self_color == Color::Black
                && cell.pattern4[Color::Black.index()] == Pattern4::Forbid)
        }
        GenType::Winning => {
            cell.pattern4[self_color.index()] == Pattern4::Five
                || cell.pattern4[self_color.index()] == Pattern4::FlexFour
        }
        GenType::DefendFive => cell.pattern4[oppo.index()] == Pattern4::Five,
        GenType::DefendFour => cell.pattern4[oppo.index()] >= Pattern4::BlockFour,
        GenType::DefendB4F3(rule) => {
            let p4 = cell.pattern4[oppo.index()];
            match rule {
                // 相手の禁手点に継続手は来ない
                Rule::Renju => p4 >= Pattern4::FlexThree && p4 != Pattern4::Forbid,
                Rule::Freestyle | Rule::Standard => p4 >= Pattern4::FlexThree,
            }
        }
        GenType::Vcf => cell.pattern4[self_color.index()] >= Pattern4::BlockFour,
        GenType::VcfComb => cell.pattern4[self_color.index()] >= Pattern4::BlockFourPlus,
    }
}

/// バケット別の着手生成
///
/// 生成した着手を `out` に追記する。`All` は候補範囲
/// （石から距離 `CANDIDATE_RANGE` 以内、空の盤面なら中央のみ）に限る。
pub fn generate(board: &Board, gen: GenType, out: &mut MoveBuffer) {
    let self_color = board.side_to_move();

    if gen == GenType::All && board.ply() == 0 {
        out.push_unique(board.center());
        return;
    }

    for pos in board.each_empty() {
        if gen == GenType::All && !board.has_neighbor_stone(pos, CANDIDATE_RANGE) {
            continue;
        }
        if accepts(gen, board, self_color, pos) {
            out.push_unique(pos);
        }
    }
}

/// 近傍テンプレートに限定した着手生成
///
/// `center` から `offsets` の各オフセット先のみを調べる。
/// `center` が盤内でなければ何も生成しない。
pub fn generate_neighbors(
    board: &Board,
    gen: GenType,
    out: &mut MoveBuffer,
    center: Pos,
    offsets: &[(i8, i8)],
) {
    if !center.is_in_board(board.size()) {
        return;
    }

    let self_color = board.side_to_move();
    for &(dx, dy) in offsets {
        let pos = center.offset(dx, dy);
        if !pos.is_in_board(board.size()) || !board.is_empty(pos) {
            continue;
        }
        if accepts(gen, board, self_color, pos) {
            out.push_unique(pos);
        }
    }
}

/// 連珠で相手の四三（`BlockFourFlexThree`）が実脅威かを確かめる
///
/// 白の四三は常に実脅威。黒（相手が黒のとき）は禁手で打てない点が
/// 分類段階で `Forbid` に落ちているため、四三点が残っていれば実脅威とみなす。
pub fn validate_opponent_c_move(board: &Board) -> bool {
    let oppo = !board.side_to_move();
    if oppo != Color::Black {
        return true;
    }
    board.p4_count(oppo, Pattern4::BlockFourFlexThree) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with_moves(size: u8, rule: Rule, moves: &[(u8, u8)]) -> Board {
        let mut board = Board::new(size, rule);
        for &(x, y) in moves {
            board.make_move(Pos::new(x, y));
        }
        board
    }

    #[test]
    fn test_generate_all_empty_board() {
        let board = Board::new(15, Rule::Freestyle);
        let mut buf = MoveBuffer::new();
        generate(&board, GenType::All, &mut buf);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.as_slice()[0].pos, board.center());
    }

    #[test]
    fn test_generate_all_candidate_range() {
        let board = board_with_moves(15, Rule::Freestyle, &[(7, 7)]);
        let mut buf = MoveBuffer::new();
        generate(&board, GenType::All, &mut buf);
        // (7,7) から距離3以内の空点のみ
        assert!(buf.as_slice().iter().all(|m| {
            let dx = (m.pos.x() as i32 - 7).abs();
            let dy = (m.pos.y() as i32 - 7).abs();
            dx.max(dy) <= CANDIDATE_RANGE as i32 && board.is_empty(m.pos)
        }));
        assert_eq!(buf.len(), 7 * 7 - 1);
    }

    #[test]
    fn test_generate_defend_five() {
        // 白に黒の四連 → 白番の防御点は五連完成点
        let board = board_with_moves(
            15,
            Rule::Freestyle,
            &[(3, 7), (3, 0), (4, 7), (4, 0), (5, 7), (5, 0), (6, 7)],
        );
        assert_eq!(board.side_to_move(), Color::White);
        let mut buf = MoveBuffer::new();
        generate(&board, GenType::DefendFive, &mut buf);
        let mut positions: Vec<Pos> = buf.as_slice().iter().map(|m| m.pos).collect();
        positions.sort_by_key(|p| p.move_index());
        assert_eq!(positions, vec![Pos::new(2, 7), Pos::new(7, 7)]);
    }

    #[test]
    fn test_generate_vcf() {
        // 黒に三連 → 黒の四を作る点が VCF 候補
        let board = board_with_moves(
            15,
            Rule::Freestyle,
            &[(5, 7), (0, 0), (6, 7), (0, 1), (7, 7), (0, 2)],
        );
        assert_eq!(board.side_to_move(), Color::Black);
        let mut buf = MoveBuffer::new();
        generate(&board, GenType::Vcf, &mut buf);
        assert!(!buf.is_empty());
        for m in buf.as_slice() {
            assert!(board.cell(m.pos).pattern4[Color::Black.index()] >= Pattern4::BlockFour);
        }
    }

    #[test]
    fn test_defend_b4f3_renju_excludes_forbidden_points() {
        // (7,7) が黒のダブル活三＝禁手。白の四三防御バケットに含めない。
        let board = board_with_moves(
            15,
            Rule::Renju,
            &[
                (6, 7), (0, 0), (8, 7), (0, 5), (7, 6), (5, 0), (7, 8), (14, 14), (2, 2),
            ],
        );
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(
            board.cell(Pos::new(7, 7)).pattern4[Color::Black.index()],
            Pattern4::Forbid
        );

        let mut buf = MoveBuffer::new();
        generate(&board, GenType::DefendB4F3(Rule::Renju), &mut buf);
        assert!(buf.as_slice().iter().all(|m| m.pos != Pos::new(7, 7)));

        // ルール指定なし（freestyle扱い）の述語はパターン順序だけで判定する
        let mut buf = MoveBuffer::new();
        generate(&board, GenType::DefendB4F3(Rule::Freestyle), &mut buf);
        assert!(buf.as_slice().iter().any(|m| m.pos == Pos::new(7, 7)));
    }

    #[test]
    fn test_push_unique() {
        let mut buf = MoveBuffer::new();
        buf.push_unique(Pos::new(1, 1));
        buf.push_unique(Pos::new(2, 2));
        buf.push_unique(Pos::new(1, 1));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_generate_neighbors_template() {
        let board = board_with_moves(15, Rule::Freestyle, &[(7, 7)]);
        let mut buf = MoveBuffer::new();
        generate_neighbors(&board, GenType::All, &mut buf, Pos::new(7, 7), &RANGE_SQUARE2_LINE4);
        assert_eq!(buf.len(), RANGE_SQUARE2_LINE4.len());

        // 盤外中心なら何も生成しない
        let mut buf = MoveBuffer::new();
        generate_neighbors(&board, GenType::All, &mut buf, Pos::NONE, &RANGE_SQUARE2_LINE4);
        assert!(buf.is_empty());
    }
}
