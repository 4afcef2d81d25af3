//! Iterative deepening and aspiration windows.

use crate::board::types::{Move, NOMOVE};

use super::constants::{
    ASPIRATION_DELTA, ASPIRATION_MIN_DEPTH, MAX_SCORE, SCORE_NONE,
};
use super::negamax::negamax;
use super::{SharedContext, ThreadData};

/// One completed iteration, as handed to the UCI reporter
pub struct IterationReport {
    pub depth: i32,
    pub seldepth: usize,
    pub score: i32,
    pub nodes: u64,
    pub time_ms: u64,
    pub hashfull: u32,
    pub pv: Vec<Move>,
    pub multipv: u32,
}

/// Depth from which the time manager starts rescaling budgets
const TM_SCALE_MIN_DEPTH: i32 = 8;

/// Eval swings inside this window count as stable
const EVAL_STABILITY_WINDOW: i32 = 10;

/// Sink for per-iteration reports; only the main worker feeds it
pub type Reporter<'a> = Option<&'a (dyn Fn(IterationReport) + Sync)>;

/// Iterative deepening driver for one worker. Only the main worker
/// touches the clock, the stop flag, and the reporter.
pub(super) fn iterative_deepening(
    td: &mut ThreadData,
    shared: &SharedContext,
    max_depth: i32,
    multipv_index: u32,
    reporter: Reporter,
) {
    let mut average_score = SCORE_NONE;
    let mut previous_best = NOMOVE;
    let mut bm_stability = 0usize;
    let mut eval_stability = 0usize;

    for depth in 1..=max_depth {
        let score = aspiration_search(td, shared, average_score, depth);

        if td.info.stopped {
            break;
        }

        average_score = if average_score == SCORE_NONE {
            score
        } else {
            (average_score + score) / 2
        };

        if td.is_main() {
            shared.publish_nodes(td);

            let best = td.pv.best_move();
            if best == previous_best {
                bm_stability = (bm_stability + 1).min(4);
            } else {
                bm_stability = 0;
                previous_best = best;
            }

            if (score - average_score).abs() < EVAL_STABILITY_WINDOW {
                eval_stability = (eval_stability + 1).min(4);
            } else {
                eval_stability = 0;
            }

            if let Some(report) = reporter {
                report(IterationReport {
                    depth,
                    seldepth: td.info.seldepth,
                    score,
                    nodes: shared.total_nodes(),
                    time_ms: shared.time.elapsed_ms(),
                    hashfull: shared.tt.hashfull(),
                    pv: td.pv.line().to_vec(),
                    multipv: multipv_index,
                });
            }

            if depth >= TM_SCALE_MIN_DEPTH {
                let share = if td.info.nodes > 0 && best != NOMOVE {
                    td.node_spent[best.from_to()] * 1000 / td.info.nodes
                } else {
                    0
                };
                shared.time.scale(bm_stability, eval_stability, share);
            }

            // A cleared depth past the optimum budget, or an exhausted
            // node budget, ends the whole search
            if shared.time.stop_early() || shared.time.nodes_over(shared.total_nodes()) {
                shared
                    .stop
                    .store(true, std::sync::atomic::Ordering::Relaxed);
                break;
            }
        }

        td.info.seldepth = 0;
    }

    // The main worker finishing (depth budget, time, nodes) ends the
    // whole search; helpers observe the flag at their next poll
    if td.is_main() {
        shared
            .stop
            .store(true, std::sync::atomic::Ordering::Relaxed);
    }
    shared.publish_nodes(td);
}

/// Search one depth inside an aspiration window around the running
/// average score, widening geometrically on failure. Fail-lows reset the
/// depth; fail-highs may give back up to five plies.
fn aspiration_search(
    td: &mut ThreadData,
    shared: &SharedContext,
    prev_score: i32,
    depth: i32,
) -> i32 {
    td.root_depth = depth;
    td.stack.reset();

    let mut delta = ASPIRATION_DELTA;
    let mut alpha = -MAX_SCORE;
    let mut beta = MAX_SCORE;
    let mut search_depth = depth;

    if depth >= ASPIRATION_MIN_DEPTH && prev_score != SCORE_NONE {
        alpha = (prev_score - delta).max(-MAX_SCORE);
        beta = (prev_score + delta).min(MAX_SCORE);
    }

    loop {
        let score = negamax(td, shared, alpha, beta, search_depth, false, 0, true);

        if td.info.stopped {
            return score;
        }

        if score <= alpha {
            // Fail low: pull beta in, drop alpha, restart at full depth
            beta = (alpha + beta) / 2;
            alpha = (score - delta).max(-MAX_SCORE);
            search_depth = depth;
        } else if score >= beta {
            beta = (score + delta).min(MAX_SCORE);
            search_depth = (search_depth - 1).max(depth - 5);
        } else {
            return score;
        }

        delta += delta * 44 / 100;
    }
}
