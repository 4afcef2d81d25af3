//! Time management.
//!
//! Turns the `go` parameters into an optimum and a maximum budget. The
//! optimum is consulted at iteration boundaries (stop early once a depth
//! completes past it); the maximum is polled every ~1024 nodes inside
//! the search. Between iterations the main worker rescales the optimum
//! by best-move stability, eval stability, and the node share of the
//! current best move. Fixed `movetime` budgets are never scaled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Reserve subtracted from every external clock to cover I/O latency
pub const DEFAULT_MOVE_OVERHEAD_MS: u64 = 50;

/// Time controls understood by the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControl {
    /// No limits at all (`go infinite`, or depth/nodes limits only)
    #[default]
    Infinite,
    /// Exactly this many milliseconds for the move
    MoveTime { time_ms: u64 },
    /// Remaining clock plus increment, optionally with moves to go
    Clock {
        time_ms: u64,
        inc_ms: u64,
        movestogo: Option<u64>,
    },
}

/// Scale factors by best-move stability: an unstable best move buys
/// more time, a long-stable one gives some back. Monotone decreasing,
/// bounded inside [0.5, 1.5] as percentages.
const BM_STABILITY_SCALE: [u64; 5] = [140, 120, 105, 94, 88];

/// Scale factors by eval stability
const EVAL_STABILITY_SCALE: [u64; 5] = [125, 113, 102, 95, 90];

pub struct TimeManager {
    start: Instant,
    /// Optimum budget in ms; 0 means unlimited. Atomic so the main
    /// worker can rescale it between iterations.
    opt_ms: AtomicU64,
    /// Hard budget in ms; 0 means unlimited
    max_ms: AtomicU64,
    /// Fixed movetime budgets are exempt from scaling
    fixed: bool,
    /// Node budget; 0 means unlimited
    node_limit: u64,
}

impl TimeManager {
    /// Compute budgets for a search starting now
    #[must_use]
    pub fn new(control: TimeControl, node_limit: u64, overhead_ms: u64) -> Self {
        let (opt, max, fixed) = match control {
            TimeControl::Infinite => (0, 0, false),
            TimeControl::MoveTime { time_ms } => {
                let budget = time_ms.saturating_sub(overhead_ms).max(1);
                (budget, budget, true)
            }
            TimeControl::Clock {
                time_ms,
                inc_ms,
                movestogo,
            } => {
                let safe = time_ms.saturating_sub(overhead_ms).max(1);
                match movestogo {
                    Some(mtg) => {
                        let slot = (safe / mtg.max(1)).max(1);
                        (slot, slot, false)
                    }
                    None => {
                        let base = safe / 20 + inc_ms / 2;
                        let opt = (base * 6 / 10).max(1);
                        let max = base.saturating_mul(2).min(safe).max(1);
                        (opt, max, false)
                    }
                }
            }
        };

        TimeManager {
            start: Instant::now(),
            opt_ms: AtomicU64::new(opt),
            max_ms: AtomicU64::new(max),
            fixed,
            node_limit,
        }
    }

    /// A manager with no limits (ponderless `go infinite`)
    #[must_use]
    pub fn infinite() -> Self {
        TimeManager::new(TimeControl::Infinite, 0, 0)
    }

    #[inline]
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Checked at iteration boundaries: enough time spent, don't start
    /// another depth
    #[must_use]
    pub fn stop_early(&self) -> bool {
        let opt = self.opt_ms.load(Ordering::Relaxed);
        opt != 0 && self.elapsed_ms() >= opt
    }

    /// Polled inside the search: the hard budget is gone
    #[must_use]
    pub fn time_over(&self) -> bool {
        let max = self.max_ms.load(Ordering::Relaxed);
        max != 0 && self.elapsed_ms() >= max
    }

    /// The node budget is gone
    #[must_use]
    pub fn nodes_over(&self, nodes: u64) -> bool {
        self.node_limit != 0 && nodes >= self.node_limit
    }

    #[must_use]
    pub fn node_limit(&self) -> u64 {
        self.node_limit
    }

    /// Rescale the optimum budget from search feedback. `bm_stability`
    /// and `eval_stability` saturate at 4; `bm_node_share` is the
    /// fraction of all nodes spent on the current best move in permille.
    pub fn scale(&self, bm_stability: usize, eval_stability: usize, bm_node_share: u64) {
        if self.fixed {
            return;
        }
        let opt = self.opt_ms.load(Ordering::Relaxed);
        if opt == 0 {
            return;
        }

        let bm = BM_STABILITY_SCALE[bm_stability.min(4)];
        let eval = EVAL_STABILITY_SCALE[eval_stability.min(4)];
        // More effort already sunk into the best move -> less time needed
        let effort = (152u64.saturating_sub(bm_node_share / 10)).clamp(50, 150);

        let scaled = (opt * bm / 100 * eval / 100 * effort / 100)
            .clamp(opt / 2, opt * 3 / 2)
            .min(self.max_ms.load(Ordering::Relaxed).max(1));
        self.opt_ms.store(scaled.max(1), Ordering::Relaxed);
    }
}
