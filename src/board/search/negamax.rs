//! The negamax search.
//!
//! Principal-variation-split alpha-beta over the staged move picker,
//! with transposition cutoffs, reverse futility, null-move pruning with
//! verification, razoring, probcut, internal iterative reductions,
//! singular extensions with multi-cut, late-move reductions and
//! pruning, futility and SEE pruning of individual moves, and the
//! history updates on fail-high.

use crate::board::types::{MoveList, NOMOVE};
use crate::board::MAX_PLY;
use crate::tt::{score_from_tt, Bound};

use super::constants::*;
use super::history::history_bonus;
use super::picker::MovePicker;
use super::quiescence::quiescence;
use super::{SharedContext, ThreadData};

/// Margin for reverse futility / static null pruning
fn futility_margin(depth: i32, improving: bool, can_iir: bool) -> i32 {
    RFP_DEPTH_MARGIN * depth
        - RFP_IMPROVING_MARGIN * i32::from(improving)
        - RFP_IIR_MARGIN * i32::from(can_iir)
}

#[allow(clippy::too_many_lines)]
pub(super) fn negamax(
    td: &mut ThreadData,
    shared: &SharedContext,
    mut alpha: i32,
    mut beta: i32,
    mut depth: i32,
    cut_node: bool,
    ply: usize,
    is_pv: bool,
) -> i32 {
    let root = ply == 0;
    let in_check = td.pos.in_check();
    let excluded = td.stack.excluded(ply);

    td.pv.reset_ply(ply);

    if ply + 1 > td.info.seldepth {
        td.info.seldepth = ply + 1;
    }

    if !root {
        if td.pos.is_draw(ply) {
            // Tiny jitter steers the search away from dead-drawn lines
            return ((td.info.nodes & 2) as i32) - 1;
        }

        // The side to move can force a repetition: this node is worth at
        // least a draw, which may already be enough for a cutoff
        if alpha < 0 && td.pos.has_game_cycle(ply) {
            alpha = 0;
            if alpha >= beta {
                return alpha;
            }
        }

        if ply >= MAX_PLY - 1 {
            return if in_check {
                0
            } else {
                td.pos.evaluate(&shared.net)
            };
        }
    }

    if depth <= 0 {
        return quiescence(td, shared, alpha, beta, ply, is_pv);
    }

    if shared.check_stop(td) {
        return 0;
    }

    if !root {
        // Mate distance pruning
        alpha = alpha.max(-MATE_SCORE + ply as i32);
        beta = beta.min(MATE_SCORE - ply as i32 - 1);
        if alpha >= beta {
            return alpha;
        }
    }

    // Transposition table probe, skipped inside a singular search
    let tte = if excluded == NOMOVE {
        shared.tt.probe(td.pos.key())
    } else {
        None
    };
    let tt_hit = tte.is_some();
    let tt_score = tte.map_or(SCORE_NONE, |e| score_from_tt(i32::from(e.score), ply));
    let tt_move = tte.and_then(|e| e.full_move(&td.pos)).unwrap_or(NOMOVE);
    let tt_bound = tte.map_or(Bound::None, |e| e.bound());
    let tt_depth = tte.map_or(0, |e| i32::from(e.depth));
    let tt_eval = tte.map_or(SCORE_NONE, |e| i32::from(e.eval));

    if !is_pv
        && tt_score != SCORE_NONE
        && tt_depth >= depth
        && match tt_bound {
            Bound::Upper => tt_score <= alpha,
            Bound::Lower => tt_score >= beta,
            Bound::Exact => true,
            Bound::None => false,
        }
    {
        return tt_score;
    }

    let tt_pv = is_pv || tte.is_some_and(|e| e.was_pv());
    let can_iir = depth >= IIR_MIN_DEPTH && tt_bound == Bound::None;

    td.stack.clear_child(ply);

    // Static evaluation, corrected by the correction histories
    let raw_eval;
    let mut eval;
    if in_check {
        raw_eval = SCORE_NONE;
        eval = SCORE_NONE;
        td.stack.set_static_eval(ply, SCORE_NONE);
    } else if excluded != NOMOVE {
        // Singular re-search of the same node: the eval is already there
        eval = td.stack.static_eval(ply);
        raw_eval = eval;
    } else if tt_hit {
        let raw = if tt_eval != SCORE_NONE {
            tt_eval
        } else {
            td.pos.evaluate(&shared.net)
        };
        raw_eval = raw;
        eval = td.sd.adjust_eval(&td.pos, &td.stack, ply, raw);
        td.stack.set_static_eval(ply, eval);

        // The TT score is a tighter bound on the true eval when usable
        if tt_score != SCORE_NONE
            && match tt_bound {
                Bound::Upper => tt_score < eval,
                Bound::Lower => tt_score > eval,
                Bound::Exact => true,
                Bound::None => false,
            }
        {
            eval = tt_score;
        }
    } else {
        let raw = td.pos.evaluate(&shared.net);
        raw_eval = raw;
        eval = td.sd.adjust_eval(&td.pos, &td.stack, ply, raw);
        td.stack.set_static_eval(ply, eval);
        shared
            .tt
            .store(td.pos.key(), 0, SCORE_NONE, raw, Bound::None, 0, ply, tt_pv);
    }

    // A quiet previous move that led to a worse eval for the opponent
    // deserves an ordering bonus on their butterfly table
    if ply >= 1 {
        let prev = td.stack.move_at(ply - 1);
        let prev_eval = td.stack.static_eval_back(ply, 1);
        let cur_eval = td.stack.static_eval(ply);
        if prev != NOMOVE && prev.is_quiet() && prev_eval != SCORE_NONE && cur_eval != SCORE_NONE {
            let bonus = (-10 * (prev_eval + cur_eval)).clamp(-1830, 1427) + 624;
            let opponent = td.pos.side_to_move().opponent();
            td.sd.update_opponent_butterfly(opponent, prev, bonus);
        }
    }

    // How far the corrected eval drifts from the raw one; complex
    // positions get reduced less
    let complexity = if eval != SCORE_NONE && eval != 0 && raw_eval != 0 {
        100 * (eval - raw_eval).abs() / eval.abs()
    } else {
        0
    };

    // Improving: the static eval is better than the one we had the last
    // time we were to move (2 plies ago, falling back to 4)
    let static_eval_now = td.stack.static_eval(ply);
    let improving = if in_check {
        false
    } else if td.stack.static_eval_back(ply, 2) != SCORE_NONE {
        static_eval_now > td.stack.static_eval_back(ply, 2)
    } else if td.stack.static_eval_back(ply, 4) != SCORE_NONE {
        static_eval_now > td.stack.static_eval_back(ply, 4)
    } else {
        true
    };

    if !is_pv && excluded == NOMOVE && !in_check {
        // Reverse futility: eval is so far above beta that a reduced
        // margin still beats it
        if depth < RFP_MAX_DEPTH
            && eval.abs() < MATE_FOUND
            && (tt_move == NOMOVE || !tt_move.is_tactical())
            && eval - futility_margin(depth, improving, can_iir) >= beta
        {
            return eval - futility_margin(depth, improving, can_iir);
        }

        // Null move pruning: hand over the move and search reduced; a
        // fail-high means the position is good enough to cut
        let static_eval = td.stack.static_eval(ply);
        if eval >= static_eval
            && eval >= beta
            && static_eval >= beta - NMP_STATIC_COEFF * depth + NMP_STATIC_BASE
            && depth >= NMP_MIN_DEPTH
            && ply >= td.nmp_min_ply
            && td.stack.move_at(ply - 1) != NOMOVE
            && td.pos.has_non_pawns(td.pos.side_to_move())
        {
            let reduction = 4 + depth / 3 + ((eval - beta) / NMP_EVAL_DIVISOR).min(3);

            td.stack.set_null_move(ply);
            let undo = td.pos.make_null_nnue();
            let mut null_score = -negamax(
                td,
                shared,
                -beta,
                -beta + 1,
                depth - reduction - i32::from(can_iir),
                !cut_node,
                ply + 1,
                false,
            );
            td.pos.unmake_null_nnue(undo);

            if td.info.stopped {
                return 0;
            }

            if null_score >= beta {
                // Never return an unproven mate
                if null_score > MATE_FOUND {
                    null_score = beta;
                }

                if td.nmp_min_ply > 0 || depth < NMP_VERIFICATION_DEPTH {
                    return null_score;
                }

                // Verification search with null moves disabled around
                // this subtree, against zugzwang
                td.nmp_min_ply = ply + ((depth - reduction) * 2 / 3) as usize;
                let verified = negamax(
                    td,
                    shared,
                    beta - 1,
                    beta,
                    depth - reduction,
                    false,
                    ply,
                    false,
                );
                td.nmp_min_ply = 0;

                if verified >= beta {
                    return null_score;
                }
            }
        }

        // Razoring: eval is hopeless, check whether quiescence agrees
        if depth <= RAZORING_MAX_DEPTH && eval + RAZORING_COEFF * depth < alpha {
            let razor_score = quiescence(td, shared, alpha, beta, ply, false);
            if razor_score <= alpha {
                return razor_score;
            }
        }
    }

    // Probcut: a tactical move clearing a raised beta at reduced depth
    // almost certainly clears beta at full depth
    let pc_beta = beta + PROBCUT_MARGIN - PROBCUT_IMPROVING_MARGIN * i32::from(improving);
    if !is_pv
        && !in_check
        && excluded == NOMOVE
        && depth > PROBCUT_MIN_DEPTH
        && beta.abs() < MATE_FOUND
        && (tt_score == SCORE_NONE || tt_depth < depth - PROBCUT_DEPTH_REDUCTION || tt_score >= pc_beta)
    {
        let mut picker =
            MovePicker::new_probcut(&td.pos, pc_beta - td.stack.static_eval(ply));
        while let Some(mv) = picker.next(&td.pos, &td.sd, &td.stack, ply, true) {
            shared.tt.prefetch(td.pos.key_after(mv));
            td.stack.set_move(ply, mv);
            td.info.nodes += 1;

            let undo = td.pos.make_move_nnue(mv, &shared.net);
            let mut pc_score =
                -quiescence(td, shared, -pc_beta, -pc_beta + 1, ply + 1, false);
            if pc_score >= pc_beta {
                pc_score = -negamax(
                    td,
                    shared,
                    -pc_beta,
                    -pc_beta + 1,
                    depth - PROBCUT_DEPTH_REDUCTION - 1,
                    !cut_node,
                    ply + 1,
                    false,
                );
            }
            td.pos.unmake_move_nnue(mv, undo);

            if td.info.stopped {
                return 0;
            }

            if pc_score >= pc_beta {
                shared.tt.store(
                    td.pos.key(),
                    mv.to_tt(),
                    pc_score,
                    raw_eval,
                    Bound::Lower,
                    depth - PROBCUT_DEPTH_REDUCTION,
                    ply,
                    tt_pv,
                );
                return pc_score;
            }
        }
    }

    // Internal iterative reductions: no TT bound at decent depth means
    // this node is cheap to come back to
    if can_iir {
        depth -= 1;
    }

    let old_alpha = alpha;
    let mut best_score = -MAX_SCORE;
    let mut best_move = NOMOVE;
    let mut total_moves = 0i32;
    let mut skip_quiets = false;

    let mut quiets_tried = MoveList::new();
    let mut noisies_tried = MoveList::new();

    let mut picker = MovePicker::new(&td.pos, &td.sd, &td.stack, ply, tt_move);

    while let Some(mv) = picker.next(&td.pos, &td.sd, &td.stack, ply, skip_quiets) {
        if mv == excluded || (root && td.root_excluded.contains(&mv)) {
            continue;
        }

        total_moves += 1;
        let is_quiet = mv.is_quiet();
        let move_history = td.sd.move_score(&td.pos, &td.stack, ply, mv);

        if !root && best_score > -MATE_FOUND {
            let quiet_idx = usize::from(is_quiet);
            let base_reduction =
                REDUCTIONS[quiet_idx][depth.min(63) as usize][total_moves.min(63) as usize];
            let lmr_depth =
                (depth - base_reduction + move_history / LMR_DEPTH_HISTORY_DIVISOR).max(0);

            if !skip_quiets {
                // Move-count pruning: enough moves seen at this depth
                if total_moves > LMP_MARGIN[depth.min(63) as usize][usize::from(improving)] {
                    skip_quiets = true;
                }

                // Futility: the eval is so far below alpha that quiet
                // moves can't save the node
                if !in_check
                    && lmr_depth < FUTILITY_MAX_DEPTH
                    && td.stack.static_eval(ply) + FUTILITY_BASE + FUTILITY_SCALE * lmr_depth
                        <= alpha
                {
                    skip_quiets = true;
                }
            }

            // SEE pruning of individual moves
            let see_margin = if is_quiet {
                SEE_QUIET_MARGIN * lmr_depth
            } else {
                SEE_NOISY_MARGIN * lmr_depth * lmr_depth
            };
            if !td.pos.see(mv, see_margin) {
                continue;
            }
        }

        // Extensions are throttled deep in the tree to curb explosions
        let mut extension = 0;
        if (ply as i32) * 2 < td.root_depth * 5 {
            // Singular extension: is the TT move much better than every
            // alternative at reduced depth?
            if !root
                && depth >= SE_MIN_DEPTH
                && mv == tt_move
                && excluded == NOMOVE
                && matches!(tt_bound, Bound::Lower | Bound::Exact)
                && tt_score.abs() < MATE_FOUND
                && tt_depth >= depth - SE_TT_DEPTH_MARGIN
            {
                let singular_beta = tt_score - depth * 5 / 8;
                let singular_depth = (depth - 1) / 2;

                td.stack.set_excluded(ply, tt_move);
                let singular_score = negamax(
                    td,
                    shared,
                    singular_beta - 1,
                    singular_beta,
                    singular_depth,
                    cut_node,
                    ply,
                    false,
                );
                td.stack.set_excluded(ply, NOMOVE);

                if singular_score < singular_beta {
                    extension = 1;
                    if !is_pv && singular_score < singular_beta - SE_DOUBLE_MARGIN {
                        extension = 2
                            + i32::from(
                                !tt_move.is_tactical()
                                    && singular_score < singular_beta - SE_TRIPLE_MARGIN,
                            );
                        depth += i32::from(depth < 10);
                    }
                } else if singular_score >= beta {
                    // Multi-cut: even without the TT move this node
                    // fails high
                    return singular_score;
                } else if tt_score >= beta {
                    extension = -2;
                } else if cut_node {
                    extension = -1;
                }
            }
        }

        let mut new_depth = depth - 1 + extension;

        shared.tt.prefetch(td.pos.key_after(mv));
        td.stack.set_move(ply, mv);
        td.info.nodes += 1;
        let nodes_before = td.info.nodes;

        let undo = td.pos.make_move_nnue(mv, &shared.net);

        if is_quiet {
            quiets_tried.push(mv);
        } else {
            noisies_tried.push(mv);
        }

        let gives_check = td.pos.in_check();
        let mut score;

        if total_moves > 1 && depth >= 3 && (is_quiet || !tt_pv) {
            // Late move reductions
            let quiet_idx = usize::from(is_quiet);
            let mut reduction =
                REDUCTIONS[quiet_idx][depth.min(63) as usize][total_moves.min(63) as usize];

            if is_quiet {
                if cut_node {
                    reduction += 2;
                }
                if !improving {
                    reduction += 1;
                }
                if mv == picker.killers[0] || mv == picker.killers[1] || mv == picker.counter {
                    reduction -= 1;
                }
                if gives_check {
                    reduction -= 1;
                }
                if tt_pv {
                    reduction -= 1 + i32::from(cut_node);
                }
                if complexity > 50 {
                    reduction -= 1;
                }
                reduction -= move_history / HISTORY_LMR_DIVISOR_QUIET;
            } else {
                if cut_node {
                    reduction += 2;
                }
                reduction -= move_history / HISTORY_LMR_DIVISOR_NOISY;
            }

            reduction = reduction.clamp(0, (new_depth - 1).max(0));
            let reduced_depth = new_depth - reduction;

            score = -negamax(
                td,
                shared,
                -alpha - 1,
                -alpha,
                reduced_depth,
                true,
                ply + 1,
                false,
            );

            // The reduced search beat alpha: re-search at full depth,
            // nudged deeper or shallower by how decisively it did
            if score > alpha && new_depth > reduced_depth {
                let do_deeper = score > best_score + DO_DEEPER_BASE_MARGIN + 2 * new_depth;
                let do_shallower = score < best_score + new_depth;
                new_depth += i32::from(do_deeper) - i32::from(do_shallower);

                if new_depth > reduced_depth {
                    score = -negamax(
                        td,
                        shared,
                        -alpha - 1,
                        -alpha,
                        new_depth,
                        !cut_node,
                        ply + 1,
                        false,
                    );
                }

                let bonus = if score > alpha {
                    history_bonus(depth)
                } else {
                    -history_bonus(depth)
                };
                td.sd.update_cont_single(&td.stack, ply, mv, bonus);
            }
        } else if !is_pv || total_moves > 1 {
            score = -negamax(
                td,
                shared,
                -alpha - 1,
                -alpha,
                new_depth,
                !cut_node,
                ply + 1,
                false,
            );
        } else {
            score = -MAX_SCORE;
        }

        // PV search: the first move, and any move that beat alpha, gets
        // the full window
        if is_pv && (total_moves == 1 || score > alpha) {
            score = -negamax(td, shared, -beta, -alpha, new_depth, false, ply + 1, true);
        }

        td.pos.unmake_move_nnue(mv, undo);

        if root && td.is_main() {
            td.node_spent[mv.from_to()] += td.info.nodes - nodes_before;
        }

        if td.info.stopped {
            return 0;
        }

        if score > best_score {
            best_score = score;

            if score > alpha {
                best_move = mv;

                if is_pv {
                    td.pv.update(ply, mv);
                }

                if score >= beta {
                    let bonus_depth = depth + i32::from(eval != SCORE_NONE && eval <= alpha);
                    td.sd.update_histories(
                        &td.pos,
                        &mut td.stack,
                        ply,
                        bonus_depth,
                        best_move,
                        quiets_tried.as_slice(),
                        noisies_tried.as_slice(),
                    );
                    break;
                }
                alpha = score;
            }
        }
    }

    if total_moves == 0 {
        // Singular search with no alternative: a sentinel below every
        // real score. Otherwise checkmate or stalemate.
        return if excluded != NOMOVE {
            -MAX_SCORE
        } else if in_check {
            -MATE_SCORE + ply as i32
        } else {
            0
        };
    }

    let bound = if best_score >= beta {
        Bound::Lower
    } else if alpha != old_alpha {
        Bound::Exact
    } else {
        Bound::Upper
    };

    if excluded == NOMOVE {
        let static_eval = td.stack.static_eval(ply);
        if !in_check
            && (best_move == NOMOVE || !best_move.is_tactical())
            && !(bound == Bound::Lower && best_score <= static_eval)
            && !(bound == Bound::Upper && best_score >= static_eval)
        {
            td.sd.update_correction(
                &td.pos,
                &td.stack,
                ply,
                depth,
                best_score - static_eval,
            );
        }
        shared.tt.store(
            td.pos.key(),
            best_move.to_tt(),
            best_score,
            raw_eval,
            bound,
            depth,
            ply,
            tt_pv,
        );
    }

    best_score
}
