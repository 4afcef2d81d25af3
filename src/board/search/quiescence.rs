//! Quiescence search.
//!
//! Resolves captures (and evasions while in check) at the horizon so the
//! static eval is only ever trusted in quiet positions. Stand-pat
//! cutoffs, SEE-based futility of individual captures, and
//! upper/lower-bound-only TT stores.

use crate::board::types::NOMOVE;
use crate::board::MAX_PLY;
use crate::tt::{score_from_tt, Bound};

use super::constants::{MATE_FOUND, MATE_SCORE, MAX_SCORE, QS_FUTILITY_MARGIN, SCORE_NONE};
use super::picker::MovePicker;
use super::{SharedContext, ThreadData};

pub(super) fn quiescence(
    td: &mut ThreadData,
    shared: &SharedContext,
    mut alpha: i32,
    beta: i32,
    ply: usize,
    is_pv: bool,
) -> i32 {
    let in_check = td.pos.in_check();

    td.pv.reset_ply(ply);

    if shared.check_stop(td) {
        return 0;
    }

    if td.pos.is_insufficient_material() {
        return ((td.info.nodes & 2) as i32) - 1;
    }

    if ply >= MAX_PLY - 1 {
        return if in_check {
            0
        } else {
            td.pos.evaluate(&shared.net)
        };
    }

    if alpha < 0 && td.pos.has_game_cycle(ply) {
        alpha = 0;
        if alpha >= beta {
            return alpha;
        }
    }

    let tte = shared.tt.probe(td.pos.key());
    let tt_score = tte.map_or(SCORE_NONE, |e| score_from_tt(i32::from(e.score), ply));
    let tt_move = tte.and_then(|e| e.full_move(&td.pos)).unwrap_or(NOMOVE);
    let tt_bound = tte.map_or(Bound::None, |e| e.bound());
    let tt_eval = tte.map_or(SCORE_NONE, |e| i32::from(e.eval));

    if !is_pv
        && tt_score != SCORE_NONE
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

    let raw_eval;
    let mut best_score;
    if in_check {
        raw_eval = SCORE_NONE;
        best_score = -MAX_SCORE;
        td.stack.set_static_eval(ply, SCORE_NONE);
    } else if tte.is_some() {
        let raw = if tt_eval != SCORE_NONE {
            tt_eval
        } else {
            td.pos.evaluate(&shared.net)
        };
        raw_eval = raw;
        let adjusted = td.sd.adjust_eval(&td.pos, &td.stack, ply, raw);
        td.stack.set_static_eval(ply, adjusted);
        best_score = adjusted;

        if tt_score != SCORE_NONE
            && match tt_bound {
                Bound::Upper => tt_score < best_score,
                Bound::Lower => tt_score > best_score,
                Bound::Exact => true,
                Bound::None => false,
            }
        {
            best_score = tt_score;
        }
    } else {
        let raw = td.pos.evaluate(&shared.net);
        raw_eval = raw;
        best_score = td.sd.adjust_eval(&td.pos, &td.stack, ply, raw);
        td.stack.set_static_eval(ply, best_score);
        shared
            .tt
            .store(td.pos.key(), 0, SCORE_NONE, raw, Bound::None, 0, ply, tt_pv);
    }

    // Stand pat
    if best_score >= beta {
        return best_score;
    }
    alpha = alpha.max(best_score);

    let mut picker = MovePicker::new_qsearch(&td.pos, tt_move);
    let mut best_move = NOMOVE;
    let mut total_moves = 0;

    loop {
        // Once any real score exists, remaining quiet evasions are skipped
        let skip_quiets = !in_check || best_score > -MATE_FOUND;
        let Some(mv) = picker.next(&td.pos, &td.sd, &td.stack, ply, skip_quiets) else {
            break;
        };

        total_moves += 1;

        // Futility: the eval is so far below alpha that only a clearly
        // winning capture is worth resolving
        if best_score > -MATE_FOUND && !in_check {
            let futility_base = td.stack.static_eval(ply) + QS_FUTILITY_MARGIN;
            if futility_base <= alpha && !td.pos.see(mv, 1) {
                best_score = best_score.max(futility_base);
                continue;
            }
        }

        shared.tt.prefetch(td.pos.key_after(mv));
        td.stack.set_move(ply, mv);
        td.info.nodes += 1;

        let undo = td.pos.make_move_nnue(mv, &shared.net);
        let score = -quiescence(td, shared, -beta, -alpha, ply + 1, is_pv);
        td.pos.unmake_move_nnue(mv, undo);

        if td.info.stopped {
            return 0;
        }

        if score > best_score {
            best_score = score;

            if score > alpha {
                best_move = mv;
                if score >= beta {
                    break;
                }
                alpha = score;
            }
        }
    }

    // All evasions searched and none exists: checkmate
    if total_moves == 0 && in_check {
        return -MATE_SCORE + ply as i32;
    }

    // Quiescence depth semantics never justify an exact bound
    let bound = if best_score >= beta {
        Bound::Lower
    } else {
        Bound::Upper
    };
    shared.tt.store(
        td.pos.key(),
        best_move.to_tt(),
        best_score,
        raw_eval,
        bound,
        0,
        ply,
        tt_pv,
    );

    best_score
}
