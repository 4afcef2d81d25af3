//! Lazy-SMP worker pool.
//!
//! All workers run the identical iterative-deepening search over a
//! shared transposition table; divergence in move ordering does the work
//! splitting. The main worker (id 0) owns every time decision and all
//! UCI reporting, and its principal variation provides the final best
//! move. Helpers observe the shared stop flag at their poll points and
//! unwind; the pool joins every worker before returning.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::board::movegen::GenMode;
use crate::board::nnue::NnueNetwork;
use crate::board::types::{Move, MoveList, NOMOVE};
use crate::board::Position;
use crate::engine::time::TimeManager;
use crate::tt::TranspositionTable;

use super::iterative::{iterative_deepening, Reporter};
use super::{SharedContext, ThreadData};

/// Worker stack size: deep recursion with per-frame move lists
const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Limits and knobs for one `go`
#[derive(Clone)]
pub struct SearchSettings {
    /// Maximum iterative-deepening depth
    pub depth: i32,
    /// Number of principal variations to report
    pub multipv: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            depth: crate::board::MAX_PLY as i32 - 1,
            multipv: 1,
        }
    }
}

/// Outcome of a completed search
pub struct SearchOutcome {
    pub best_move: Move,
    pub ponder_move: Option<Move>,
}

/// Run a search over `root` with the given worker pool. Blocks until
/// every worker has unwound; the caller decides what thread to run this
/// on and how to deliver the `bestmove`.
#[allow(clippy::too_many_arguments)]
pub fn search_position(
    tds: &mut [ThreadData],
    root: &Position,
    tt: &Arc<TranspositionTable>,
    net: &Arc<NnueNetwork>,
    stop: &Arc<AtomicBool>,
    time: Arc<TimeManager>,
    settings: &SearchSettings,
    reporter: Reporter,
) -> SearchOutcome {
    let mut legal = MoveList::new();
    root.generate_moves(&mut legal, GenMode::All);
    if legal.is_empty() {
        return SearchOutcome {
            best_move: NOMOVE,
            ponder_move: None,
        };
    }

    tt.new_search();

    let max_depth = settings.depth.clamp(1, crate::board::MAX_PLY as i32 - 1);
    let multipv = settings.multipv.clamp(1, legal.len() as u32);

    let shared = SharedContext {
        tt: Arc::clone(tt),
        net: Arc::clone(net),
        stop: AtomicBool::new(false),
        halt: Arc::clone(stop),
        time,
        worker_nodes: Arc::new((0..tds.len()).map(|_| AtomicU64::new(0)).collect()),
    };

    let mut best_move = NOMOVE;
    let mut ponder_move = None;
    let mut excluded_roots: Vec<Move> = Vec::new();

    for pv_index in 1..=multipv {
        for td in tds.iter_mut() {
            td.pos = root.clone();
            td.pos.refresh_accumulator(&shared.net);
            td.clear_for_search();
            td.root_excluded = excluded_roots.clone();
        }
        for nodes in shared.worker_nodes.iter() {
            nodes.store(0, Ordering::Relaxed);
        }
        shared.stop.store(false, Ordering::Relaxed);

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(tds.len());
            for td in tds.iter_mut() {
                let shared_ref = &shared;
                let handle = thread::Builder::new()
                    .name(format!("search-{}", td.id))
                    .stack_size(WORKER_STACK_SIZE)
                    .spawn_scoped(scope, move || {
                        let worker_reporter = if td.id == 0 { reporter } else { None };
                        iterative_deepening(td, shared_ref, max_depth, pv_index, worker_reporter);
                    })
                    .expect("failed to spawn search worker");
                handles.push(handle);
            }
            for handle in handles {
                let _ = handle.join();
            }
        });

        let main = &tds[0];
        let mut line_best = main.pv.best_move();
        if line_best == NOMOVE || excluded_roots.contains(&line_best) {
            // The search was cut off before finishing a single depth:
            // fall back to the first not-yet-reported legal move
            line_best = legal
                .iter()
                .copied()
                .find(|mv| !excluded_roots.contains(mv))
                .unwrap_or(NOMOVE);
        }

        if pv_index == 1 {
            best_move = line_best;
            ponder_move = main.pv.line().get(1).copied();
        }
        excluded_roots.push(line_best);

        // A user halt ends the whole go; later PV lines otherwise get
        // whatever budget remains
        if shared.halt.load(Ordering::Relaxed)
            || shared.time.stop_early()
            || shared.time.time_over()
        {
            break;
        }
    }

    SearchOutcome {
        best_move,
        ponder_move,
    }
}
