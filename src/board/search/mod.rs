//! Search.
//!
//! Iterative deepening with aspiration windows around a principal
//! variation negamax with transposition table, staged move ordering,
//! history heuristics, and the usual pruning/reduction/extension suite;
//! quiescence resolves tactics at the leaves. Parallelism is Lazy-SMP:
//! identical workers over a shared transposition table, with the main
//! worker owning all time decisions and UCI output.

pub mod constants;
mod history;
mod iterative;
mod negamax;
mod picker;
mod quiescence;
mod smp;
mod stack;

pub use history::SearchData;
pub use iterative::{IterationReport, Reporter};
pub use smp::{search_position, SearchOutcome, SearchSettings};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::board::nnue::NnueNetwork;
use crate::board::state::MAX_PLY;
use crate::board::types::{Move, NOMOVE};
use crate::board::Position;
use crate::engine::time::TimeManager;
use crate::tt::TranspositionTable;

use stack::SearchStack;

/// Node interval between stop-flag and clock polls
const POLL_INTERVAL_MASK: u64 = 1023;

/// Triangular principal variation table
pub struct PvTable {
    length: [usize; MAX_PLY + 1],
    moves: [[Move; MAX_PLY]; MAX_PLY],
}

impl PvTable {
    fn new() -> Box<Self> {
        Box::new(PvTable {
            length: [0; MAX_PLY + 1],
            moves: [[NOMOVE; MAX_PLY]; MAX_PLY],
        })
    }

    /// Begin a fresh line at `ply`
    #[inline]
    fn reset_ply(&mut self, ply: usize) {
        self.length[ply] = ply;
    }

    /// Record `mv` as best at `ply` and pull up the child line
    fn update(&mut self, ply: usize, mv: Move) {
        self.moves[ply][ply] = mv;
        for next in (ply + 1)..self.length[ply + 1] {
            self.moves[ply][next] = self.moves[ply + 1][next];
        }
        self.length[ply] = self.length[ply + 1];
    }

    /// The root line
    #[must_use]
    pub fn line(&self) -> &[Move] {
        &self.moves[0][..self.length[0]]
    }

    /// The current best root move
    #[must_use]
    pub fn best_move(&self) -> Move {
        if self.length[0] > 0 {
            self.moves[0][0]
        } else {
            NOMOVE
        }
    }
}

/// Per-worker counters
#[derive(Default)]
pub struct SearchInfo {
    pub nodes: u64,
    pub seldepth: usize,
    pub stopped: bool,
}

/// Everything one Lazy-SMP worker owns: its position clone, counters,
/// histories, search stack, and PV table. Only the transposition table
/// is shared between workers.
pub struct ThreadData {
    pub id: usize,
    pub pos: Position,
    pub info: SearchInfo,
    pub sd: SearchData,
    pub(crate) stack: SearchStack,
    pub(crate) pv: Box<PvTable>,
    /// Nodes spent below each root (from, to), feeding time scaling
    node_spent: Box<[u64; 4096]>,
    /// Depth of the current iterative-deepening iteration
    root_depth: i32,
    /// Null-move verification floor: no NMP at plies below this
    nmp_min_ply: usize,
    /// Root moves excluded from this search (MultiPV re-searches)
    root_excluded: Vec<Move>,
}

impl ThreadData {
    #[must_use]
    pub fn new(id: usize) -> Self {
        ThreadData {
            id,
            pos: Position::startpos(),
            info: SearchInfo::default(),
            sd: SearchData::new(),
            stack: SearchStack::new(),
            pv: PvTable::new(),
            node_spent: Box::new([0; 4096]),
            root_depth: 0,
            nmp_min_ply: 0,
            root_excluded: Vec::new(),
        }
    }

    #[inline]
    fn is_main(&self) -> bool {
        self.id == 0
    }

    /// Reset per-search state, keeping the history tables warm
    fn clear_for_search(&mut self) {
        self.info = SearchInfo::default();
        self.stack.reset();
        self.node_spent.fill(0);
        self.nmp_min_ply = 0;
    }

    /// Reset everything that persists between games
    pub fn new_game(&mut self) {
        self.sd.clear();
        self.clear_for_search();
    }
}

/// Search-wide state shared by all workers
pub struct SharedContext {
    pub tt: Arc<TranspositionTable>,
    pub net: Arc<NnueNetwork>,
    /// Internal stop: one iterative-deepening run (one PV line) is over
    pub stop: AtomicBool,
    /// External stop: the user halted the whole `go`
    pub halt: Arc<AtomicBool>,
    pub time: Arc<TimeManager>,
    /// Exact node count per worker, published at poll points
    pub worker_nodes: Arc<Vec<AtomicU64>>,
}

impl SharedContext {
    /// Publish this worker's node count for reporting and node limits
    fn publish_nodes(&self, td: &ThreadData) {
        self.worker_nodes[td.id].store(td.info.nodes, Ordering::Relaxed);
    }

    #[inline]
    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.halt.load(Ordering::Relaxed)
    }

    /// Periodic poll: the main worker enforces the clock and node budget
    /// for everyone; helpers just observe the stop flags.
    fn check_stop(&self, td: &mut ThreadData) -> bool {
        if td.info.stopped {
            return true;
        }
        if td.info.nodes & POLL_INTERVAL_MASK != 0 {
            return false;
        }

        self.publish_nodes(td);

        if td.is_main()
            && (self.time.time_over() || self.time.nodes_over(self.total_nodes()))
        {
            self.stop.store(true, Ordering::Relaxed);
        }
        if self.stop_requested() {
            td.info.stopped = true;
        }
        td.info.stopped
    }

    /// Total nodes across all workers
    #[must_use]
    pub fn total_nodes(&self) -> u64 {
        self.worker_nodes
            .iter()
            .map(|nodes| nodes.load(Ordering::Relaxed))
            .sum()
    }
}
