//! MovePicker（着手オーダリング）
//!
//! 探索中に着手を効率的に順序付けして返すコンポーネント。
//! Alpha-Beta探索の効率を最大化するため、カットオフを起こしやすい手を先に返す。
//!
//! ## Stage
//!
//! 着手生成は TT手 → バケット生成 → ストリームの段階（Stage）で行う。
//! 初期ステージは構築時の相手の脅威状況で決まる：
//!
//! ### 通常探索（MAIN）
//! - 相手に五連完成点 → DefendFiveTt
//! - 相手に活四 → DefendFourTt
//! - 相手に実脅威の四三 → DefendB4F3Tt
//! - それ以外 → MainTt
//!
//! ### 静止VCF探索（QVCF）
//! - 相手に五連完成点 → DefendFiveTt
//! - それ以外 → QvcfTt
//!
//! ### ルート（ROOT）
//! TT手は使わず、同じ脅威トリアージで1つのバケットを即時生成して
//! スコア降順にストリームする。
//!
//! ## 不変条件
//!
//! - TT手は専用ステージ以外で返さない（重複なし）
//! - 連珠の黒番では禁手点を返さない
//! - 1ノード内で同じ座標は高々1回しか返さない

use crate::board::Board;
use crate::eval::PolicyBuffer;
use crate::movegen::{
    generate, generate_neighbors, validate_opponent_c_move, ExtMove, GenType, MoveBuffer,
    RANGE_SQUARE2_LINE4,
};
use crate::types::{
    Color, Depth, Pattern4, Pos, Rule, Score, MAX_MOVES, DEPTH_QVCF_FULL,
};

use super::history::{
    ContHistWeights, CounterMoveHistory, HistKind, MainHistory, MoveHistory,
};

// =============================================================================
// Stage（着手生成の段階）
// =============================================================================

/// 着手生成の段階
///
/// TT手のステージと対応するバケット生成ステージが対になっている。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Stage {
    /// 置換表の手（通常）
    MainTt,
    /// 全候補手の生成
    MainMoves,
    /// 置換表の手（五連防御）
    DefendFiveTt,
    /// 五連防御手の生成
    DefendFiveMoves,
    /// 置換表の手（活四防御）
    DefendFourTt,
    /// 活四防御手の生成
    DefendFourMoves,
    /// 置換表の手（四三防御）
    DefendB4F3Tt,
    /// 四三防御手の生成
    DefendB4F3Moves,
    /// 置換表の手（QVCF）
    QvcfTt,
    /// QVCF攻撃手の生成
    QvcfMoves,
    /// 準備済みスパンのストリーム
    AllMoves,
}

impl Stage {
    /// 次のステージを取得
    pub fn next(self) -> Self {
        match self {
            Stage::MainTt => Stage::MainMoves,
            Stage::DefendFiveTt => Stage::DefendFiveMoves,
            Stage::DefendFourTt => Stage::DefendFourMoves,
            Stage::DefendB4F3Tt => Stage::DefendB4F3Moves,
            Stage::QvcfTt => Stage::QvcfMoves,
            Stage::MainMoves
            | Stage::DefendFiveMoves
            | Stage::DefendFourMoves
            | Stage::DefendB4F3Moves
            | Stage::QvcfMoves
            | Stage::AllMoves => Stage::AllMoves,
        }
    }
}

// =============================================================================
// スコアリング仕様
// =============================================================================

/// 静的スコアの基底
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseScore {
    /// 自セルスコアをそのまま使う
    Balanced,
    /// 攻め寄り: (2*self + oppo) / 3
    Attack,
    /// 受け寄り: (self + 2*oppo) / 3
    Defend,
}

/// スコアの合成内容
///
/// 方策が有効なときは静的基底を方策スコアで置き換える（履歴ボーナスは加算のまま）。
#[derive(Debug, Clone, Copy)]
pub struct ScoreType {
    pub base: BaseScore,
    pub policy: bool,
    pub main_history: bool,
    pub counter_move: bool,
    pub cont_history: bool,
}

impl ScoreType {
    /// 静的セルスコアのみ
    pub const BALANCED: ScoreType = ScoreType {
        base: BaseScore::Balanced,
        policy: false,
        main_history: false,
        counter_move: false,
        cont_history: false,
    };

    /// 通常探索の全候補手向け
    pub const MAIN: ScoreType = ScoreType {
        base: BaseScore::Balanced,
        policy: true,
        main_history: true,
        counter_move: true,
        cont_history: true,
    };

    /// 防御バケット向け
    pub const DEFEND: ScoreType = ScoreType {
        base: BaseScore::Balanced,
        policy: true,
        main_history: true,
        counter_move: false,
        cont_history: false,
    };
}

/// CounterMoveHistory が一致したときの加点
const COUNTER_MOVE_BONUS: Score = 21;

// =============================================================================
// 構築時引数
// =============================================================================

/// 通常探索（MAIN）の構築時引数
pub struct MainArgs<'a> {
    pub tt_move: Pos,
    pub main_history: &'a MainHistory,
    pub counter_move_history: &'a CounterMoveHistory,
    /// 探索スタックが選んだ継続履歴スライス（1,2,...,6手前）
    pub continuation_history: [&'a MoveHistory; 6],
    /// 継続履歴の合成重み（既定はすべて0）
    pub cont_hist_weights: ContHistWeights,
}

/// 静止VCF探索（QVCF）の構築時引数
pub struct QvcfArgs {
    pub tt_move: Pos,
    /// QVCF探索の深さ（負値）
    pub depth: Depth,
    /// 直近2回の自着手時点の自パターン
    pub previous_self_p4: [Pattern4; 2],
}

// =============================================================================
// MovePicker
// =============================================================================

/// 着手オーダリング器
///
/// 1探索ノード内で使い捨てるスタック上のオブジェクト。盤面・履歴・評価器は
/// 借用で保持し、ピッカーの生存中はすべて読み取り専用。
pub struct MovePicker<'a> {
    board: &'a Board,
    main_history: Option<&'a MainHistory>,
    counter_move_history: Option<&'a CounterMoveHistory>,
    continuation_history: Option<[&'a MoveHistory; 6]>,
    cont_hist_weights: ContHistWeights,

    stage: Stage,
    rule: Rule,
    tt_move: Pos,
    allow_plain_b4_in_vcf: bool,
    pick_best: bool,

    has_policy: bool,
    cur_score: Score,
    cur_policy_score: Score,
    max_policy_score: Score,

    cur: usize,
    end: usize,
    moves: MoveBuffer,
}

impl<'a> MovePicker<'a> {
    fn base(rule: Rule, board: &'a Board, stage: Stage, tt_move: Pos) -> MovePicker<'a> {
        MovePicker {
            board,
            main_history: None,
            counter_move_history: None,
            continuation_history: None,
            cont_hist_weights: ContHistWeights::default(),
            stage,
            rule,
            tt_move,
            allow_plain_b4_in_vcf: false,
            pick_best: false,
            has_policy: false,
            cur_score: 0,
            cur_policy_score: 0,
            max_policy_score: 0,
            cur: 0,
            end: 0,
            moves: MoveBuffer::new(),
        }
    }

    /// ルートノード用コンストラクタ
    ///
    /// TT手は使わず、脅威トリアージに従って1つのバケットを即時生成する。
    /// バケットは静的スコアで評価し、best-of-tail 方式で降順に返す。
    pub fn new_root(rule: Rule, board: &'a Board) -> MovePicker<'a> {
        let mut picker = Self::base(rule, board, Stage::AllMoves, Pos::NONE);
        picker.pick_best = true;

        let self_color = board.side_to_move();
        let oppo = !self_color;

        if board.p4_count(self_color, Pattern4::Five) > 0 {
            generate(board, GenType::Winning, &mut picker.moves);
        } else if board.p4_count(oppo, Pattern4::Five) > 0 {
            generate(board, GenType::DefendFive, &mut picker.moves);
        } else if board.p4_count(self_color, Pattern4::FlexFour) > 0 {
            generate(board, GenType::Winning, &mut picker.moves);
        } else if board.p4_count(oppo, Pattern4::FlexFour) > 0 {
            generate(board, GenType::DefendFour, &mut picker.moves);
            generate(board, GenType::Vcf, &mut picker.moves);
        } else if board.p4_count(oppo, Pattern4::BlockFourFlexThree) > 0
            && (rule != Rule::Renju || validate_opponent_c_move(board))
        {
            generate(board, GenType::DefendB4F3(rule), &mut picker.moves);
            if picker.moves.is_empty() {
                generate(board, GenType::All, &mut picker.moves);
            } else {
                generate(board, GenType::Vcf, &mut picker.moves);
            }
        } else {
            generate(board, GenType::All, &mut picker.moves);
        }

        picker.score_moves(ScoreType::BALANCED);
        picker.end = picker.moves.len();
        picker
    }

    /// 通常探索用コンストラクタ
    pub fn new_main(rule: Rule, board: &'a Board, args: MainArgs<'a>) -> MovePicker<'a> {
        let tt_stage = main_initial_stage(rule, board);
        let ttm_valid = validate_tt_move(board, tt_stage, args.tt_move);

        let stage = if ttm_valid { tt_stage } else { tt_stage.next() };
        let tt_move = if ttm_valid { args.tt_move } else { Pos::NONE };

        let mut picker = Self::base(rule, board, stage, tt_move);
        picker.main_history = Some(args.main_history);
        picker.counter_move_history = Some(args.counter_move_history);
        picker.continuation_history = Some(args.continuation_history);
        picker.cont_hist_weights = args.cont_hist_weights;
        picker
    }

    /// 静止VCF探索用コンストラクタ
    pub fn new_qvcf(rule: Rule, board: &'a Board, args: QvcfArgs) -> MovePicker<'a> {
        let oppo = !board.side_to_move();

        let tt_stage = if board.p4_count(oppo, Pattern4::Five) > 0 {
            Stage::DefendFiveTt
        } else {
            Stage::QvcfTt
        };
        let ttm_valid = validate_tt_move(board, tt_stage, args.tt_move);

        let stage = if ttm_valid { tt_stage } else { tt_stage.next() };
        let tt_move = if ttm_valid { args.tt_move } else { Pos::NONE };

        let mut picker = Self::base(rule, board, stage, tt_move);
        picker.allow_plain_b4_in_vcf = args.depth >= DEPTH_QVCF_FULL
            || (args.previous_self_p4[0] >= Pattern4::BlockFourPlus
                && args.previous_self_p4[1] >= Pattern4::BlockFourPlus);
        picker
    }

    /// 現在のステージを取得（デバッグ用）
    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// 方策スコアが有効か
    #[inline]
    pub fn has_policy_score(&self) -> bool {
        self.has_policy
    }

    /// バケット内の最大方策スコア
    #[inline]
    pub fn max_move_policy(&self) -> Score {
        self.max_policy_score
    }

    /// 直前に返した手の方策スコア
    #[inline]
    pub fn cur_move_policy(&self) -> Score {
        self.cur_policy_score
    }

    /// 直前に返した手の実効スコア
    #[inline]
    pub fn cur_move_score(&self) -> Score {
        self.cur_score
    }

    /// 最大方策スコアとの差（方策スコア基準）
    #[inline]
    pub fn cur_move_policy_diff(&self) -> Score {
        self.max_policy_score - self.cur_policy_score
    }

    /// 最大方策スコアとの差（実効スコア基準）
    #[inline]
    pub fn cur_move_score_diff(&self) -> Score {
        self.max_policy_score - self.cur_score
    }

    /// 次の手を返す
    ///
    /// 手が尽きたら `Pos::NONE` を返す。TT手は専用ステージで1回だけ返し、
    /// それ以降のステージでは常にスキップする。
    pub fn next(&mut self) -> Pos {
        loop {
            match self.stage {
                // ==============================
                // TT手を返す
                // ==============================
                Stage::MainTt
                | Stage::DefendFiveTt
                | Stage::DefendFourTt
                | Stage::DefendB4F3Tt
                | Stage::QvcfTt => {
                    debug_assert!(self.tt_move != Pos::NONE);
                    self.stage = self.stage.next();
                    return self.tt_move;
                }

                // ==============================
                // 全候補手の生成
                // ==============================
                Stage::MainMoves => {
                    let oppo = !self.board.side_to_move();
                    debug_assert_eq!(self.board.p4_count(oppo, Pattern4::Five), 0);
                    debug_assert_eq!(self.board.p4_count(oppo, Pattern4::FlexFour), 0);

                    self.moves.clear();
                    self.cur = 0;
                    generate(self.board, GenType::All, &mut self.moves);

                    self.score_moves(ScoreType::MAIN);
                    fast_partial_sort(self.moves.as_mut_slice(), 0);
                    self.end = self.moves.len();

                    self.stage = Stage::AllMoves;
                }

                // ==============================
                // 五連防御手の生成
                // ==============================
                Stage::DefendFiveMoves => {
                    debug_assert!(
                        self.board.p4_count(!self.board.side_to_move(), Pattern4::Five) > 0
                    );

                    self.moves.clear();
                    self.cur = 0;
                    // TTステージが唯一の防御手を返した場合は生成しない
                    if self.tt_move == Pos::NONE {
                        generate(self.board, GenType::DefendFive, &mut self.moves);
                    }
                    self.end = self.moves.len();

                    self.stage = Stage::AllMoves;
                }

                // ==============================
                // 活四防御手の生成
                // ==============================
                Stage::DefendFourMoves => {
                    debug_assert!(
                        self.board.p4_count(!self.board.side_to_move(), Pattern4::FlexFour) > 0
                    );

                    self.moves.clear();
                    self.cur = 0;
                    generate(self.board, GenType::DefendFour, &mut self.moves);
                    generate(self.board, GenType::Vcf, &mut self.moves);

                    self.score_moves(ScoreType::DEFEND);
                    fast_partial_sort(self.moves.as_mut_slice(), 0);
                    self.end = self.moves.len();

                    self.stage = Stage::AllMoves;
                }

                // ==============================
                // 四三防御手の生成
                // ==============================
                Stage::DefendB4F3Moves => {
                    debug_assert!(
                        self.board
                            .p4_count(!self.board.side_to_move(), Pattern4::BlockFourFlexThree)
                            > 0
                    );

                    self.moves.clear();
                    self.cur = 0;
                    generate(self.board, GenType::DefendB4F3(self.rule), &mut self.moves);

                    // 防御手が生成できない稀なケースは全候補手へフォールバック
                    if self.moves.is_empty() {
                        self.stage = Stage::MainMoves;
                        continue;
                    }

                    generate(self.board, GenType::Vcf, &mut self.moves);

                    self.score_moves(ScoreType::DEFEND);
                    fast_partial_sort(self.moves.as_mut_slice(), 0);
                    self.end = self.moves.len();

                    self.stage = Stage::AllMoves;
                }

                // ==============================
                // QVCF攻撃手の生成
                // ==============================
                Stage::QvcfMoves => {
                    self.moves.clear();
                    self.cur = 0;

                    let self_last = self
                        .board
                        .get_last_actual_move_of_side(self.board.side_to_move());
                    let gen = if self.allow_plain_b4_in_vcf {
                        GenType::Vcf
                    } else {
                        GenType::VcfComb
                    };
                    generate_neighbors(
                        self.board,
                        gen,
                        &mut self.moves,
                        self_last,
                        &RANGE_SQUARE2_LINE4,
                    );

                    self.score_moves(ScoreType::BALANCED);
                    fast_partial_sort(self.moves.as_mut_slice(), 0);
                    self.end = self.moves.len();

                    self.stage = Stage::AllMoves;
                }

                // ==============================
                // 準備済みスパンのストリーム
                // ==============================
                Stage::AllMoves => {
                    return if self.pick_best {
                        self.pick_next_move::<true, _>(|_| true)
                    } else {
                        self.pick_next_move::<false, _>(|_| true)
                    };
                }
            }
        }
    }

    // =========================================================================
    // 選択
    // =========================================================================

    /// 条件を満たす次の手を返す
    ///
    /// TT手と連珠黒番の禁手点は常にスキップする。`BEST` が真なら
    /// 残りの中で最大スコアの手を先頭に入れ替えてから返す
    /// （ソート済みでないスパンを正確な降順で消費する）。
    fn pick_next_move<const BEST: bool, F: Fn(&ExtMove) -> bool>(&mut self, filter: F) -> Pos {
        let forbidden =
            self.rule == Rule::Renju && self.board.side_to_move() == Color::Black;

        while self.cur < self.end {
            if BEST {
                let moves = self.moves.as_mut_slice();
                let mut best = self.cur;
                for i in self.cur + 1..self.end {
                    if moves[i].score > moves[best].score {
                        best = i;
                    }
                }
                moves.swap(self.cur, best);
            }

            let m = self.moves.as_slice()[self.cur];
            self.cur += 1;

            if m.pos != self.tt_move
                && (!forbidden || !self.board.check_forbidden_point(m.pos))
                && filter(&m)
            {
                self.cur_score = m.score;
                self.cur_policy_score = m.raw_score;
                return m.pos;
            }
        }

        Pos::NONE
    }

    // =========================================================================
    // スコアリング
    // =========================================================================

    /// 残りの手を `score_type` に従って採点する
    fn score_moves(&mut self, score_type: ScoreType) {
        let board = self.board;
        let self_color = board.side_to_move();
        let oppo = !self_color;

        // 方策バッファはこの呼び出しの間だけスタック上に存在する
        let policy_buf = if score_type.policy {
            board.evaluator().map(|evaluator| {
                let mut buf = PolicyBuffer::new(board.size());
                for m in self.moves.as_slice()[self.cur..].iter() {
                    buf.set_compute_flag(m.pos);
                }
                evaluator.evaluate_policy(board, &mut buf);
                buf
            })
        } else {
            None
        };

        if policy_buf.is_some() {
            self.has_policy = true;
            self.max_policy_score = Score::MIN / 2; // 差分計算時のアンダーフロー回避
        }

        let main_history = self.main_history;
        let counter_move_history = self.counter_move_history;
        let continuation_history = self.continuation_history;
        let weights = self.cont_hist_weights;
        let last_move = board.get_last_move();
        let mut max_policy_score = self.max_policy_score;

        for m in self.moves.as_mut_slice()[self.cur..].iter_mut() {
            let cell = board.cell(m.pos);

            if let Some(buf) = &policy_buf {
                // 方策が有効なときは静的スコアを置き換える
                let score = buf.score(m.pos);
                m.score = score;
                m.raw_score = score;
                max_policy_score = max_policy_score.max(score);
            } else {
                let score = match score_type.base {
                    BaseScore::Balanced => cell.score[self_color.index()],
                    BaseScore::Attack => {
                        (cell.score[self_color.index()] * 2 + cell.score[oppo.index()]) / 3
                    }
                    BaseScore::Defend => {
                        (cell.score[self_color.index()] + cell.score[oppo.index()] * 2) / 3
                    }
                };
                m.score = score;
                m.raw_score = score;
            }

            if score_type.main_history {
                debug_assert!(main_history.is_some());
                if let Some(mh) = main_history {
                    if cell.pattern4[self_color.index()] >= Pattern4::FlexThree {
                        m.score += mh.get(self_color, m.pos, HistKind::Attack) as Score / 128;
                    } else {
                        m.score += mh.get(self_color, m.pos, HistKind::Quiet) as Score / 256;
                    }
                }
            }

            if score_type.counter_move {
                debug_assert!(counter_move_history.is_some());
                if let Some(cmh) = counter_move_history {
                    if last_move.is_in_board(board.size()) {
                        let (counter, counter_p4) = cmh.get(oppo, last_move.move_index());
                        if counter == m.pos && counter_p4 <= cell.pattern4[self_color.index()] {
                            m.score += COUNTER_MOVE_BONUS;
                        }
                    }
                }
            }

            if score_type.cont_history {
                debug_assert!(continuation_history.is_some());
                if let Some(tables) = continuation_history {
                    for (table, &weight) in tables.iter().zip(weights.0.iter()) {
                        if weight != 0 {
                            m.score += weight * table.get(m.pos) as Score / 1024;
                        }
                    }
                }
            }
        }

        self.max_policy_score = max_policy_score;
    }
}

// =============================================================================
// 初期ステージの決定と TT手の検証
// =============================================================================

/// 通常探索の初期TTステージを決める（純粋関数）
pub fn main_initial_stage(rule: Rule, board: &Board) -> Stage {
    let oppo = !board.side_to_move();

    if board.p4_count(oppo, Pattern4::Five) > 0 {
        Stage::DefendFiveTt
    } else if board.p4_count(oppo, Pattern4::FlexFour) > 0 {
        Stage::DefendFourTt
    } else if board.p4_count(oppo, Pattern4::BlockFourFlexThree) > 0
        && (rule != Rule::Renju || validate_opponent_c_move(board))
    {
        Stage::DefendB4F3Tt
    } else {
        Stage::MainTt
    }
}

/// TT手がステージの戦術的前提と矛盾しないか検証する
///
/// 空点でないTT手は常に不採用。ステージ別の条件：
/// - `DefendFiveTt`: その点が相手の五連完成点
/// - `DefendFourTt`: その点が四（自他いずれか）・止め四・または禁手による封じ
/// - `QvcfTt`: その点が自分の四（VCF攻撃手）
/// - `MainTt` / `DefendB4F3Tt`: 追加条件なし
fn validate_tt_move(board: &Board, tt_stage: Stage, tt_move: Pos) -> bool {
    if !board.is_empty(tt_move) {
        return false;
    }

    let cell = board.cell(tt_move);
    let self_color = board.side_to_move();
    let oppo = !self_color;

    match tt_stage {
        Stage::DefendFiveTt => cell.pattern4[oppo.index()] == Pattern4::Five,
        Stage::DefendFourTt => {
            cell.pattern4[Color::Black.index()] >= Pattern4::BlockFour
                || cell.pattern4[Color::Black.index()] == Pattern4::Forbid
                || cell.pattern4[Color::White.index()] >= Pattern4::BlockFour
        }
        Stage::QvcfTt => cell.pattern4[self_color.index()] >= Pattern4::BlockFour,
        Stage::MainTt | Stage::DefendB4F3Tt => true,
        _ => {
            debug_assert!(false, "not a TT stage: {:?}", tt_stage);
            false
        }
    }
}

// =============================================================================
// 部分ソート
// =============================================================================

/// 挿入ソートを使う上限
const INSERTION_SORT_LIMIT: usize = MAX_MOVES / 4;

/// 全体ソートを使う上限（超えたら上位のみ選択ソート）
const SORT_LIMIT: usize = MAX_MOVES * 2 / 3;

/// スコア閾値付きの部分ソート
///
/// `limit` 以上のスコアの手が閾値未満の手より前に来て、かつ降順に
/// 並ぶようにする。閾値未満の手の順序は不定。
/// 要素数に応じてアルゴリズムを切り替える：
///
/// - `INSERTION_SORT_LIMIT` 以下: 閾値以上の手だけを前方に挿入していく1パス
/// - `SORT_LIMIT` 以下: 全体を降順ソート
/// - それ以上: 上位 `SORT_LIMIT` 件のみ選択して降順ソート
pub fn fast_partial_sort(moves: &mut [ExtMove], limit: Score) {
    let n = moves.len();

    if n <= INSERTION_SORT_LIMIT {
        let mut sorted_end = 0usize;
        for p in 1..n {
            if moves[p].score >= limit {
                let tmp = moves[p];
                sorted_end += 1;
                moves[p] = moves[sorted_end];
                let mut q = sorted_end;
                while q > 0 && moves[q - 1].score < tmp.score {
                    moves[q] = moves[q - 1];
                    q -= 1;
                }
                moves[q] = tmp;
            }
        }
    } else if n <= SORT_LIMIT {
        moves.sort_unstable_by(|a, b| b.score.cmp(&a.score));
    } else {
        moves.select_nth_unstable_by(SORT_LIMIT, |a, b| b.score.cmp(&a.score));
        moves[..SORT_LIMIT].sort_unstable_by(|a, b| b.score.cmp(&a.score));
    }
}

// =============================================================================
// テスト
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(score: Score) -> ExtMove {
        ExtMove {
            pos: Pos::NONE,
            score,
            raw_score: score,
        }
    }

    #[test]
    fn test_stage_next() {
        assert_eq!(Stage::MainTt.next(), Stage::MainMoves);
        assert_eq!(Stage::DefendFiveTt.next(), Stage::DefendFiveMoves);
        assert_eq!(Stage::DefendFourTt.next(), Stage::DefendFourMoves);
        assert_eq!(Stage::DefendB4F3Tt.next(), Stage::DefendB4F3Moves);
        assert_eq!(Stage::QvcfTt.next(), Stage::QvcfMoves);

        assert_eq!(Stage::MainMoves.next(), Stage::AllMoves);
        assert_eq!(Stage::QvcfMoves.next(), Stage::AllMoves);
        assert_eq!(Stage::AllMoves.next(), Stage::AllMoves);
    }

    #[test]
    fn test_fast_partial_sort() {
        let mut moves = vec![ext(100), ext(50), ext(200), ext(10), ext(150)];
        fast_partial_sort(&mut moves, 100);

        // 閾値(100)以上の手が降順で先頭に並ぶ
        assert_eq!(moves[0].score, 200);
        assert_eq!(moves[1].score, 150);
        assert_eq!(moves[2].score, 100);
    }

    #[test]
    fn test_fast_partial_sort_boundary_value() {
        // value == limit の手は閾値以上として扱われる
        let mut moves = vec![ext(99), ext(100), ext(101)];
        fast_partial_sort(&mut moves, 100);

        assert_eq!(moves[0].score, 101);
        assert_eq!(moves[1].score, 100);
    }

    #[test]
    fn test_fast_partial_sort_full_sort_branch() {
        // INSERTION_SORT_LIMIT を超える要素数では全体ソートに切り替わる
        let n = INSERTION_SORT_LIMIT + 10;
        let mut moves: Vec<ExtMove> = (0..n).map(|i| ext((i as Score * 7) % 97)).collect();
        fast_partial_sort(&mut moves, 0);

        for pair in moves.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_fast_partial_sort_selection_branch() {
        // SORT_LIMIT 超は上位 SORT_LIMIT 件のみ降順が保証される
        let n = SORT_LIMIT + 20;
        let mut moves: Vec<ExtMove> = (0..n).map(|i| ext((i as Score * 13) % 401)).collect();
        fast_partial_sort(&mut moves, 0);

        for pair in moves[..SORT_LIMIT].windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // 上位ブロックの最小値は残りのどの値よりも小さくない
        let min_top = moves[..SORT_LIMIT].iter().map(|m| m.score).min().unwrap();
        assert!(moves[SORT_LIMIT..].iter().all(|m| m.score <= min_top));
    }

    #[test]
    fn test_fast_partial_sort_empty_and_single() {
        let mut moves: Vec<ExtMove> = vec![];
        fast_partial_sort(&mut moves, 100);
        assert!(moves.is_empty());

        let mut moves = vec![ext(50)];
        fast_partial_sort(&mut moves, 100);
        assert_eq!(moves[0].score, 50);
    }

    #[test]
    fn test_fast_partial_sort_postcondition() {
        // 閾値以上の要素は互いに降順、かつそれより前の要素はすべて同等以上
        let mut moves = vec![ext(5), ext(80), ext(-3), ext(40), ext(120), ext(40), ext(7)];
        let limit = 40;
        fast_partial_sort(&mut moves, limit);

        let scores: Vec<Score> = moves.iter().map(|m| m.score).collect();
        for i in 0..scores.len() {
            if scores[i] < limit {
                continue;
            }
            for j in i + 1..scores.len() {
                if scores[j] >= limit {
                    assert!(
                        scores[i] >= scores[j],
                        "postcondition violated: {:?}",
                        scores
                    );
                }
            }
        }
    }
}
