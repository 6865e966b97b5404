//! 盤面表現モジュール
//!
//! 盤面状態と、空点ごとの脅威分類（`Pattern4`）・静的セルスコアを保持する。
//!
//! - `Board`: 盤面本体（セル配列・手番・着手履歴・パターン集計）
//! - `Cell`: セル状態（石・色ごとの `Pattern4`・色ごとの静的スコア）
//! - `make_move` / `make_pass` / `undo_move`: 着手の実行と巻き戻し
//!
//! セル配列・パターン・`p4_count` は `make_move` 系のメソッドを通じて
//! 更新されることを前提とし、常に互いに整合しているように保つ。
//! パターンは着手のたびに全空点を再分類する（差分更新は行わない）。

mod pattern;

use std::rc::Rc;

use crate::eval::PolicyEvaluator;
use crate::types::{Color, Pattern4, Pos, Rule, Score, MAX_BOARD_SIZE};

use pattern::{combine_shapes, line_shape, CellKind, ShapeCounts, LINE_CENTER, LINE_WINDOW};

/// パターン分類に使う4方向
const DIRECTIONS: [(i8, i8); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// 自分の脅威パターンに対する静的スコア
const SELF_P4_SCORES: [Score; Pattern4::NUM] = [0, 2, 5, 8, 12, 20, 32, 45, 0, 60, 82, 120, 300, 500];

/// 相手の脅威パターン（= その点の防御価値）に対する静的スコア
const OPPO_P4_SCORES: [Score; Pattern4::NUM] = [0, 1, 3, 5, 8, 16, 24, 36, 0, 50, 64, 90, 200, 400];

/// セル状態
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    /// 石（空点は `Color::Empty`）
    pub piece: Color,
    /// 色ごとの脅威分類（空点のみ有効）
    pub pattern4: [Pattern4; Color::NUM],
    /// 色ごとの静的着手スコア（空点のみ有効、非負）
    pub score: [Score; Color::NUM],
}

impl Cell {
    const EMPTY: Cell = Cell {
        piece: Color::Empty,
        pattern4: [Pattern4::None; Color::NUM],
        score: [0; Color::NUM],
    };
}

/// 盤面
#[derive(Clone)]
pub struct Board {
    size: u8,
    rule: Rule,
    side_to_move: Color,
    cells: Vec<Cell>,
    /// 着手履歴（パスは `Pos::PASS`）
    history: Vec<(Pos, Color)>,
    /// 空点のパターン集計 [色][Pattern4]
    p4_count: [[u16; Pattern4::NUM]; Color::NUM],
    evaluator: Option<Rc<dyn PolicyEvaluator>>,
}

impl Board {
    /// 空の盤面を作る（黒番から開始）
    pub fn new(size: u8, rule: Rule) -> Board {
        debug_assert!((5..=MAX_BOARD_SIZE as u8).contains(&size));
        Board {
            size,
            rule,
            side_to_move: Color::Black,
            cells: vec![Cell::EMPTY; size as usize * size as usize],
            history: Vec::new(),
            p4_count: [[0; Pattern4::NUM]; Color::NUM],
            evaluator: None,
        }
    }

    /// 盤面サイズ
    #[inline]
    pub fn size(&self) -> u8 {
        self.size
    }

    /// ルール
    #[inline]
    pub fn rule(&self) -> Rule {
        self.rule
    }

    /// 手番
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// 着手数（パスを含む）
    #[inline]
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    /// 盤の中央
    #[inline]
    pub fn center(&self) -> Pos {
        Pos::new(self.size / 2, self.size / 2)
    }

    #[inline]
    fn cell_index(&self, pos: Pos) -> usize {
        debug_assert!(pos.is_in_board(self.size));
        pos.y() as usize * self.size as usize + pos.x() as usize
    }

    /// セル状態を取得
    ///
    /// `pos` は盤内であること。
    #[inline]
    pub fn cell(&self, pos: Pos) -> &Cell {
        &self.cells[self.cell_index(pos)]
    }

    /// 盤内の空点か
    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        pos.is_in_board(self.size) && self.cell(pos).piece == Color::Empty
    }

    /// 指定パターンを持つ空点の数
    #[inline]
    pub fn p4_count(&self, color: Color, p4: Pattern4) -> u16 {
        self.p4_count[color.index()][p4.index()]
    }

    /// 連珠の禁手点か（黒の着手についてのみ意味を持つ）
    #[inline]
    pub fn check_forbidden_point(&self, pos: Pos) -> bool {
        self.rule == Rule::Renju
            && self.is_empty(pos)
            && self.cell(pos).pattern4[Color::Black.index()] == Pattern4::Forbid
    }

    /// 直前の着手（未着手なら `Pos::NONE`、パスは `Pos::PASS`）
    #[inline]
    pub fn get_last_move(&self) -> Pos {
        self.history.last().map_or(Pos::NONE, |&(pos, _)| pos)
    }

    /// 指定した側の最後の実着手（パスを除く）
    pub fn get_last_actual_move_of_side(&self, side: Color) -> Pos {
        self.history
            .iter()
            .rev()
            .find(|&&(pos, color)| color == side && pos != Pos::PASS)
            .map_or(Pos::NONE, |&(pos, _)| pos)
    }

    /// 方策評価器
    #[inline]
    pub fn evaluator(&self) -> Option<&dyn PolicyEvaluator> {
        self.evaluator.as_deref()
    }

    /// 方策評価器を設定
    pub fn set_evaluator(&mut self, evaluator: Rc<dyn PolicyEvaluator>) {
        self.evaluator = Some(evaluator);
    }

    /// 着手する
    ///
    /// `pos` は盤内の空点であること。
    pub fn make_move(&mut self, pos: Pos) {
        debug_assert!(self.is_empty(pos));
        let idx = self.cell_index(pos);
        self.cells[idx].piece = self.side_to_move;
        self.history.push((pos, self.side_to_move));
        self.side_to_move = !self.side_to_move;
        self.refresh_patterns();
    }

    /// パスする
    pub fn make_pass(&mut self) {
        self.history.push((Pos::PASS, self.side_to_move));
        self.side_to_move = !self.side_to_move;
    }

    /// 直前の着手を巻き戻す
    pub fn undo_move(&mut self) {
        let (pos, color) = self.history.pop().expect("no move to undo");
        self.side_to_move = color;
        if pos != Pos::PASS {
            let idx = self.cell_index(pos);
            self.cells[idx].piece = Color::Empty;
            self.refresh_patterns();
        }
    }

    /// 盤内の全空点を走査
    pub fn each_empty(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.size).flat_map(move |y| {
            (0..self.size).filter_map(move |x| {
                let pos = Pos::new(x, y);
                if self.cell(pos).piece == Color::Empty {
                    Some(pos)
                } else {
                    None
                }
            })
        })
    }

    /// チェビシェフ距離 `radius` 以内に石があるか
    pub fn has_neighbor_stone(&self, pos: Pos, radius: i8) -> bool {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let p = pos.offset(dx, dy);
                if p.is_in_board(self.size) && self.cell(p).piece != Color::Empty {
                    return true;
                }
            }
        }
        false
    }

    // =========================================================================
    // パターン再分類
    // =========================================================================

    /// 全空点のパターン・スコア・集計を再計算する
    fn refresh_patterns(&mut self) {
        self.p4_count = [[0; Pattern4::NUM]; Color::NUM];

        for y in 0..self.size {
            for x in 0..self.size {
                let pos = Pos::new(x, y);
                let idx = self.cell_index(pos);
                if self.cells[idx].piece != Color::Empty {
                    self.cells[idx].pattern4 = [Pattern4::None; Color::NUM];
                    self.cells[idx].score = [0; Color::NUM];
                    continue;
                }

                let black = self.classify(pos, Color::Black);
                let white = self.classify(pos, Color::White);
                self.cells[idx].pattern4 = [black, white];
                self.cells[idx].score = [
                    SELF_P4_SCORES[black.index()] + OPPO_P4_SCORES[white.index()],
                    SELF_P4_SCORES[white.index()] + OPPO_P4_SCORES[black.index()],
                ];
                self.p4_count[Color::Black.index()][black.index()] += 1;
                self.p4_count[Color::White.index()][white.index()] += 1;
            }
        }
    }

    /// 空点 `pos` に `color` の石を置いたときの脅威を分類
    fn classify(&self, pos: Pos, color: Color) -> Pattern4 {
        // 連珠の黒と standard では五連は「ちょうど5」
        let exact_five = match self.rule {
            Rule::Freestyle => false,
            Rule::Standard => true,
            Rule::Renju => color == Color::Black,
        };

        let mut counts = ShapeCounts::default();
        for &(dx, dy) in &DIRECTIONS {
            let line = self.line_window(pos, dx, dy, color);
            counts.add(line_shape(&line, exact_five));
        }

        let forbidden_applies = self.rule == Rule::Renju && color == Color::Black;
        combine_shapes(&counts, forbidden_applies)
    }

    /// `pos` を中心に方向 `(dx, dy)` の9マス窓を切り出す
    fn line_window(&self, pos: Pos, dx: i8, dy: i8, color: Color) -> [CellKind; LINE_WINDOW] {
        let mut line = [CellKind::Wall; LINE_WINDOW];
        for (i, slot) in line.iter_mut().enumerate() {
            let k = i as i8 - LINE_CENTER as i8;
            if k == 0 {
                *slot = CellKind::Own;
                continue;
            }
            let p = pos.offset(dx * k, dy * k);
            *slot = if !p.is_in_board(self.size) {
                CellKind::Wall
            } else {
                match self.cell(p).piece {
                    Color::Empty => CellKind::Empty,
                    c if c == color => CellKind::Own,
                    _ => CellKind::Oppo,
                }
            };
        }
        line
    }
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
    fn test_five_threat() {
        // 黒: (3,7)..(6,7) の横四連（両端は空）→ 白番で黒の五連完成点が2つ
        let board = board_with_moves(
            15,
            Rule::Freestyle,
            &[(3, 7), (3, 0), (4, 7), (4, 0), (5, 7), (5, 0), (6, 7)],
        );
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.p4_count(Color::Black, Pattern4::Five), 2);
        assert_eq!(
            board.cell(Pos::new(2, 7)).pattern4[Color::Black.index()],
            Pattern4::Five
        );
        assert_eq!(
            board.cell(Pos::new(7, 7)).pattern4[Color::Black.index()],
            Pattern4::Five
        );
    }

    #[test]
    fn test_flex_four_threat() {
        // 黒三連（両端とその先が空）→ 黒の着手で活四になる点がある
        let board = board_with_moves(
            15,
            Rule::Freestyle,
            &[(5, 7), (0, 0), (6, 7), (0, 1), (7, 7), (0, 2)],
        );
        assert_eq!(
            board.cell(Pos::new(8, 7)).pattern4[Color::Black.index()],
            Pattern4::FlexFour
        );
        assert_eq!(
            board.cell(Pos::new(4, 7)).pattern4[Color::Black.index()],
            Pattern4::FlexFour
        );
    }

    #[test]
    fn test_block_four_threat() {
        // 白が片端を止めた黒三連 → 黒の四は止め四
        let board = board_with_moves(
            15,
            Rule::Freestyle,
            &[(5, 7), (4, 7), (6, 7), (0, 0), (7, 7), (0, 1)],
        );
        assert_eq!(
            board.cell(Pos::new(8, 7)).pattern4[Color::Black.index()],
            Pattern4::BlockFour
        );
    }

    #[test]
    fn test_renju_double_three_forbidden() {
        // 黒の活二を2本交差させ、交点がダブル活三になる形
        // 横: (6,7), (8,7) / 縦: (7,6), (7,8) → (7,7) が交点
        let board = board_with_moves(
            15,
            Rule::Renju,
            &[(6, 7), (0, 0), (8, 7), (0, 1), (7, 6), (0, 2), (7, 8), (0, 3)],
        );
        let p4 = board.cell(Pos::new(7, 7)).pattern4[Color::Black.index()];
        assert_eq!(p4, Pattern4::Forbid);
        assert!(board.check_forbidden_point(Pos::new(7, 7)));

        // 同じ形でも freestyle では禁手にならない
        let board = board_with_moves(
            15,
            Rule::Freestyle,
            &[(6, 7), (0, 0), (8, 7), (0, 1), (7, 6), (0, 2), (7, 8), (0, 3)],
        );
        assert_eq!(
            board.cell(Pos::new(7, 7)).pattern4[Color::Black.index()],
            Pattern4::DoubleFlexThree
        );
        assert!(!board.check_forbidden_point(Pos::new(7, 7)));
    }

    #[test]
    fn test_standard_overline_not_five() {
        // 黒: X X X X _ X → 間を埋めると6連（standard では五連にならない）
        let board = board_with_moves(
            15,
            Rule::Standard,
            &[(2, 7), (0, 0), (3, 7), (2, 0), (4, 7), (4, 0), (5, 7), (6, 0), (7, 7), (8, 0)],
        );
        let p4 = board.cell(Pos::new(6, 7)).pattern4[Color::Black.index()];
        assert_ne!(p4, Pattern4::Five);

        // freestyle なら5連以上で勝ち
        let board = board_with_moves(
            15,
            Rule::Freestyle,
            &[(2, 7), (0, 0), (3, 7), (2, 0), (4, 7), (4, 0), (5, 7), (6, 0), (7, 7), (8, 0)],
        );
        assert_eq!(
            board.cell(Pos::new(6, 7)).pattern4[Color::Black.index()],
            Pattern4::Five
        );
    }

    #[test]
    fn test_undo_restores_patterns() {
        let mut board = board_with_moves(
            15,
            Rule::Freestyle,
            &[(5, 7), (0, 0), (6, 7), (0, 1), (7, 7), (0, 2)],
        );
        let before = board.cell(Pos::new(8, 7)).pattern4;
        board.make_move(Pos::new(8, 7));
        board.undo_move();
        assert_eq!(board.cell(Pos::new(8, 7)).pattern4, before);
        assert_eq!(board.side_to_move(), Color::Black);
        assert!(board.is_empty(Pos::new(8, 7)));
    }

    #[test]
    fn test_last_moves() {
        let mut board = board_with_moves(15, Rule::Freestyle, &[(7, 7), (8, 8)]);
        assert_eq!(board.get_last_move(), Pos::new(8, 8));
        assert_eq!(
            board.get_last_actual_move_of_side(Color::Black),
            Pos::new(7, 7)
        );
        board.make_pass();
        assert_eq!(board.get_last_move(), Pos::PASS);
        assert_eq!(
            board.get_last_actual_move_of_side(Color::Black),
            Pos::new(7, 7)
        );
    }

    #[test]
    fn test_score_nonnegative() {
        let board = board_with_moves(15, Rule::Freestyle, &[(7, 7), (8, 8), (6, 7)]);
        for pos in board.each_empty() {
            let cell = board.cell(pos);
            assert!(cell.score[0] >= 0 && cell.score[1] >= 0);
        }
    }
}
