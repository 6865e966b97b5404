//! MovePicker の性質テスト
//!
//! ランダムな局面を生成し、MAIN / QVCF / ROOT 各バリアントの
//! 不変条件を検査する:
//!
//! 1. 同じ座標を2回返さない
//! 2. 返る座標はすべて着手前の空点
//! 3. TT手は採用時にちょうど1回（先頭で）、不採用時は0回
//! 4. 連珠の黒番で禁手点を返さない
//! 5. スコア付きバケットの返却順はスコア非増加

use proptest::prelude::*;
use rand::RngCore;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use rgomoku_core::search::{ContHistWeights, CounterMoveHistory, MainHistory, MoveHistory};
use rgomoku_core::search::{MainArgs, MovePicker, QvcfArgs, Stage};
use rgomoku_core::types::DEPTH_QVCF_FULL;
use rgomoku_core::{Board, Color, Pattern4, Pos, Rule, Score};

const BOARD_SIZE: u8 = 15;

fn random_board(seed: u64, n_moves: usize, rule: Rule) -> Board {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut board = Board::new(BOARD_SIZE, rule);

    for _ in 0..n_moves {
        let empties: Vec<Pos> = board
            .each_empty()
            .filter(|&p| !(rule == Rule::Renju
                && board.side_to_move() == Color::Black
                && board.check_forbidden_point(p)))
            .collect();
        if empties.is_empty() {
            break;
        }
        let pos = empties[(rng.next_u32() as usize) % empties.len()];
        board.make_move(pos);
    }
    board
}

fn rule_from_index(i: u8) -> Rule {
    match i {
        0 => Rule::Freestyle,
        1 => Rule::Standard,
        _ => Rule::Renju,
    }
}

struct Yielded {
    positions: Vec<Pos>,
    scores: Vec<Score>,
}

fn drain(picker: &mut MovePicker<'_>) -> Yielded {
    let mut yielded = Yielded {
        positions: Vec::new(),
        scores: Vec::new(),
    };
    // 盤面のセル数を超えたら必ずバグ
    for _ in 0..(BOARD_SIZE as usize * BOARD_SIZE as usize + 1) {
        let pos = picker.next();
        if pos == Pos::NONE {
            break;
        }
        yielded.positions.push(pos);
        yielded.scores.push(picker.cur_move_score());
    }
    yielded
}

fn drain_main_picker(board: &Board, rule: Rule, tt_move: Pos) -> (Stage, Yielded) {
    let main = MainHistory::new();
    let counter_move = CounterMoveHistory::new();
    let cont = MoveHistory::new();

    let mut picker = MovePicker::new_main(
        rule,
        board,
        MainArgs {
            tt_move,
            main_history: &main,
            counter_move_history: &counter_move,
            continuation_history: [&cont; 6],
            cont_hist_weights: ContHistWeights::default(),
        },
    );
    let initial_stage = picker.stage();
    let yielded = drain(&mut picker);
    (initial_stage, yielded)
}

fn drain_qvcf_picker(board: &Board, rule: Rule, tt_move: Pos, depth: i32) -> (Stage, Yielded) {
    let mut picker = MovePicker::new_qvcf(
        rule,
        board,
        QvcfArgs {
            tt_move,
            depth,
            previous_self_p4: [Pattern4::None; 2],
        },
    );
    let initial_stage = picker.stage();
    let yielded = drain(&mut picker);
    (initial_stage, yielded)
}

/// バケットがスコア降順で返るステージか（五連防御だけはスコア無しで任意順）
fn is_scored_stage(stage: Stage) -> bool {
    !matches!(stage, Stage::DefendFiveTt | Stage::DefendFiveMoves)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 24, .. ProptestConfig::default() })]

    #[test]
    fn prop_picker_invariants(
        seed in any::<u64>(),
        n_moves in 0usize..24,
        rule_idx in 0u8..3,
        tt_seed in any::<u64>(),
    ) {
        let rule = rule_from_index(rule_idx);
        let board = random_board(seed, n_moves, rule);

        // TT候補: 空点かNONEをランダムに選ぶ
        let tt_move = if tt_seed % 3 == 0 {
            Pos::NONE
        } else {
            let empties: Vec<Pos> = board.each_empty().collect();
            if empties.is_empty() {
                Pos::NONE
            } else {
                empties[(tt_seed as usize / 3) % empties.len()]
            }
        };

        let (initial_stage, yielded) = drain_main_picker(&board, rule, tt_move);

        // 1. 重複なし
        let mut dedup = yielded.positions.clone();
        dedup.sort_by_key(|p| p.move_index());
        dedup.dedup();
        prop_assert_eq!(dedup.len(), yielded.positions.len(), "duplicate yields");

        // 2. すべて空点
        for &pos in &yielded.positions {
            prop_assert!(board.is_empty(pos), "yielded non-empty cell {}", pos);
        }

        // 3. TT手の一意性: 採用されたならちょうど1回・先頭、不採用なら0回…ではなく
        //    バケットにも含まれ得るが返るのは高々1回
        let tt_yield_count = yielded.positions.iter().filter(|&&p| p == tt_move).count();
        let tt_accepted = matches!(
            initial_stage,
            Stage::MainTt | Stage::DefendFiveTt | Stage::DefendFourTt | Stage::DefendB4F3Tt
        );
        if tt_accepted {
            prop_assert_eq!(tt_yield_count, 1);
            prop_assert_eq!(yielded.positions[0], tt_move);
        } else {
            prop_assert_eq!(tt_yield_count, 0, "tt move yielded outside TT stage");
        }

        // 4. 連珠の黒番では禁手点を返さない
        if rule == Rule::Renju && board.side_to_move() == Color::Black {
            for &pos in &yielded.positions {
                prop_assert!(!board.check_forbidden_point(pos), "forbidden point {}", pos);
            }
        }

        // 5. スコア付きバケットは非増加順（履歴が空なのでスコアは非負で完全に整列）
        if is_scored_stage(initial_stage) {
            let skip = if tt_accepted { 1 } else { 0 };
            for pair in yielded.scores[skip..].windows(2) {
                prop_assert!(
                    pair[0] >= pair[1],
                    "bucket not sorted: {:?}",
                    &yielded.scores
                );
            }
        }
    }

    #[test]
    fn prop_qvcf_picker_invariants(
        seed in any::<u64>(),
        n_moves in 0usize..24,
        rule_idx in 0u8..3,
        tt_seed in any::<u64>(),
        full_depth in any::<bool>(),
    ) {
        let rule = rule_from_index(rule_idx);
        let board = random_board(seed, n_moves, rule);
        let depth = if full_depth { DEPTH_QVCF_FULL } else { DEPTH_QVCF_FULL - 3 };

        let tt_move = if tt_seed % 3 == 0 {
            Pos::NONE
        } else {
            let empties: Vec<Pos> = board.each_empty().collect();
            if empties.is_empty() {
                Pos::NONE
            } else {
                empties[(tt_seed as usize / 3) % empties.len()]
            }
        };

        let (initial_stage, yielded) = drain_qvcf_picker(&board, rule, tt_move, depth);

        // 重複なし・すべて空点
        let mut dedup = yielded.positions.clone();
        dedup.sort_by_key(|p| p.move_index());
        dedup.dedup();
        prop_assert_eq!(dedup.len(), yielded.positions.len(), "duplicate yields");
        for &pos in &yielded.positions {
            prop_assert!(board.is_empty(pos), "yielded non-empty cell {}", pos);
        }

        // TT手の一意性
        let tt_yield_count = yielded.positions.iter().filter(|&&p| p == tt_move).count();
        let tt_accepted = matches!(initial_stage, Stage::QvcfTt | Stage::DefendFiveTt);
        if tt_accepted {
            prop_assert_eq!(tt_yield_count, 1);
            prop_assert_eq!(yielded.positions[0], tt_move);
        } else {
            prop_assert_eq!(tt_yield_count, 0, "tt move yielded outside TT stage");
        }

        // 連珠の黒番では禁手点を返さない
        if rule == Rule::Renju && board.side_to_move() == Color::Black {
            for &pos in &yielded.positions {
                prop_assert!(!board.check_forbidden_point(pos), "forbidden point {}", pos);
            }
        }

        // QVCFバケットはスコア非増加（五連防御に落ちた場合を除く）
        if is_scored_stage(initial_stage) {
            let skip = if tt_accepted { 1 } else { 0 };
            for pair in yielded.scores[skip..].windows(2) {
                prop_assert!(
                    pair[0] >= pair[1],
                    "qvcf bucket not sorted: {:?}",
                    &yielded.scores
                );
            }
        }
    }

    #[test]
    fn prop_root_picker_descending(
        seed in any::<u64>(),
        n_moves in 0usize..24,
        rule_idx in 0u8..3,
    ) {
        let rule = rule_from_index(rule_idx);
        let board = random_board(seed, n_moves, rule);

        let mut picker = MovePicker::new_root(rule, &board);
        let yielded = drain(&mut picker);

        let mut dedup = yielded.positions.clone();
        dedup.sort_by_key(|p| p.move_index());
        dedup.dedup();
        prop_assert_eq!(dedup.len(), yielded.positions.len(), "duplicate yields");
        for &pos in &yielded.positions {
            prop_assert!(board.is_empty(pos), "yielded non-empty cell {}", pos);
        }
        if rule == Rule::Renju && board.side_to_move() == Color::Black {
            for &pos in &yielded.positions {
                prop_assert!(!board.check_forbidden_point(pos), "forbidden point {}", pos);
            }
        }

        // ルートは best-of-tail で常にスコア降順
        for pair in yielded.scores.windows(2) {
            prop_assert!(
                pair[0] >= pair[1],
                "root stream not sorted: {:?}",
                &yielded.scores
            );
        }
    }

    #[test]
    fn prop_picker_deterministic(seed in any::<u64>(), n_moves in 0usize..16) {
        // 同じ局面からは同じ列が返る
        let board = random_board(seed, n_moves, Rule::Freestyle);
        let (_, a) = drain_main_picker(&board, Rule::Freestyle, Pos::NONE);
        let (_, b) = drain_main_picker(&board, Rule::Freestyle, Pos::NONE);
        prop_assert_eq!(a.positions, b.positions);
    }

    #[test]
    fn prop_fast_partial_sort_postcondition(
        scores in prop::collection::vec(-1000i32..1000, 0..200),
        limit in -1000i32..1000,
    ) {
        use rgomoku_core::movegen::ExtMove;
        use rgomoku_core::search::fast_partial_sort;

        let mut moves: Vec<ExtMove> = scores
            .iter()
            .map(|&s| ExtMove { pos: Pos::NONE, score: s, raw_score: s })
            .collect();
        fast_partial_sort(&mut moves, limit);

        let sorted: Vec<Score> = moves.iter().map(|m| m.score).collect();

        // 並べ替え前後で多重集合は不変
        let mut before = scores.clone();
        let mut after = sorted.clone();
        before.sort_unstable();
        after.sort_unstable();
        prop_assert_eq!(before, after);

        // 閾値以上の要素は互いに降順、かつそれより前の要素はすべて同等以上
        for i in 0..sorted.len() {
            if sorted[i] < limit {
                continue;
            }
            for k in 0..i {
                prop_assert!(
                    sorted[k] >= sorted[i],
                    "element {} above limit preceded by smaller one: {:?}",
                    i,
                    &sorted
                );
            }
        }
    }
}
