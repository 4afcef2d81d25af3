//! History heuristics.
//!
//! Butterfly history `[side][from][to]`, continuation history indexed by
//! (piece, to) pairs at offsets 1, 2 and 4 plies, capture history
//! `[piece][to][victim]`, counter moves, and the correction histories
//! that nudge the static eval toward observed search results. All
//! bounded tables update with the gravity formula
//! `v += bonus - v * |bonus| / MAX`, which saturates at +/-MAX.

use crate::board::state::Position;
use crate::board::types::{Color, Move, Piece};

use super::stack::SearchStack;

/// Saturation bound of the gravity-updated tables
pub const HISTORY_MAX: i32 = 16384;

/// History bonus awarded at a fail-high (malus is its negation)
#[inline]
#[must_use]
pub fn history_bonus(depth: i32) -> i32 {
    (16 * (depth + 1) * (depth + 1)).min(1200)
}

/// Number of (piece, to) cells: 12 colored pieces x 64 squares
const PIECE_TO: usize = 12 * 64;
/// Extra row for "no previous move" (null move, root)
pub(crate) const CONT_NONE: usize = PIECE_TO;

/// Correction history sizing
const CORR_SIZE: usize = 16384;
const CORR_GRAIN: i32 = 256;
const CORR_WEIGHT_SCALE: i32 = 256;
const CORR_MAX: i32 = CORR_GRAIN * 64;

#[inline]
fn gravity(entry: &mut i16, bonus: i32) {
    let bonus = bonus.clamp(-HISTORY_MAX, HISTORY_MAX);
    let updated = i32::from(*entry) + bonus - i32::from(*entry) * bonus.abs() / HISTORY_MAX;
    *entry = updated as i16;
}

/// Per-worker history state. Workers never share these; only the TT is
/// shared under Lazy-SMP.
pub struct SearchData {
    /// Butterfly history `[side][from * 64 + to]`
    butterfly: Box<[[i16; 4096]; 2]>,
    /// Continuation history `[prev piece-to or CONT_NONE][piece-to]`
    cont_hist: Vec<[i16; PIECE_TO]>,
    /// Capture history `[piece][to][victim type]`
    capture: Box<[[[i16; 6]; 64]; 12]>,
    /// Counter move per opponent (from, to)
    counters: Box<[Move; 4096]>,
    /// Static-eval correction keyed by the pawn hash
    pawn_corr: Box<[[i32; CORR_SIZE]; 2]>,
    /// Correction keyed by each color's non-pawn hash, per side to move
    nonpawn_corr: Box<[[[i32; CORR_SIZE]; 2]; 2]>,
    /// Correction keyed by the move made two plies up
    cont_corr: Box<[[i32; 64]; 12]>,
}

impl SearchData {
    #[must_use]
    pub fn new() -> Self {
        SearchData {
            butterfly: Box::new([[0; 4096]; 2]),
            cont_hist: vec![[0; PIECE_TO]; PIECE_TO + 1],
            capture: Box::new([[[0; 6]; 64]; 12]),
            counters: Box::new([Move::null(); 4096]),
            pawn_corr: Box::new([[0; CORR_SIZE]; 2]),
            nonpawn_corr: Box::new([[[0; CORR_SIZE]; 2]; 2]),
            cont_corr: Box::new([[0; 64]; 12]),
        }
    }

    /// Reset every table (ucinewgame)
    pub fn clear(&mut self) {
        *self = SearchData::new();
    }

    #[inline]
    #[must_use]
    pub fn butterfly_score(&self, side: Color, mv: Move) -> i32 {
        i32::from(self.butterfly[side.index()][mv.from_to()])
    }

    fn update_butterfly(&mut self, side: Color, mv: Move, bonus: i32) {
        gravity(&mut self.butterfly[side.index()][mv.from_to()], bonus);
    }

    /// Summed continuation score at offsets 1, 2, and 4
    #[inline]
    #[must_use]
    pub fn cont_score(&self, stack: &SearchStack, ply: usize, mv: Move) -> i32 {
        let cell = piece_to(mv);
        [1usize, 2, 4]
            .iter()
            .map(|&offset| {
                let prev = stack.prev_piece_to(ply, offset);
                i32::from(self.cont_hist[prev][cell])
            })
            .sum()
    }

    fn update_cont(&mut self, stack: &SearchStack, ply: usize, mv: Move, bonus: i32) {
        let cell = piece_to(mv);
        for offset in [1usize, 2, 4] {
            if ply >= offset {
                let prev = stack.prev_piece_to(ply, offset);
                if prev != CONT_NONE {
                    gravity(&mut self.cont_hist[prev][cell], bonus);
                }
            }
        }
    }

    /// Victim type for capture history; non-capturing promotions reuse the
    /// pawn slot (a pawn can never be captured on a back rank).
    fn victim_of(pos: &Position, mv: Move) -> Piece {
        if mv.is_en_passant() {
            Piece::Pawn
        } else {
            pos.piece_at(mv.to()).map_or(Piece::Pawn, |(_, p)| p)
        }
    }

    #[inline]
    #[must_use]
    pub fn capture_score(&self, pos: &Position, mv: Move) -> i32 {
        let victim = Self::victim_of(pos, mv);
        i32::from(self.capture[mv.piece_index()][mv.to().index()][victim.index()])
    }

    fn update_capture(&mut self, pos: &Position, mv: Move, bonus: i32) {
        let victim = Self::victim_of(pos, mv);
        gravity(
            &mut self.capture[mv.piece_index()][mv.to().index()][victim.index()],
            bonus,
        );
    }

    /// Combined ordering/pruning score of a move
    #[inline]
    #[must_use]
    pub fn move_score(&self, pos: &Position, stack: &SearchStack, ply: usize, mv: Move) -> i32 {
        if mv.is_tactical() {
            self.capture_score(pos, mv)
        } else {
            self.butterfly_score(pos.side_to_move(), mv) + 2 * self.cont_score(stack, ply, mv)
        }
    }

    #[inline]
    #[must_use]
    pub fn counter(&self, prev: Move) -> Move {
        if prev == Move::null() {
            Move::null()
        } else {
            self.counters[prev.from_to()]
        }
    }

    fn set_counter(&mut self, prev: Move, mv: Move) {
        if prev != Move::null() {
            self.counters[prev.from_to()] = mv;
        }
    }

    /// Bonus to the opponent's butterfly entry for the previous move,
    /// derived from consecutive static evals (quiet ordering refinement)
    pub fn update_opponent_butterfly(&mut self, side: Color, prev: Move, bonus: i32) {
        self.update_butterfly(side, prev, bonus);
    }

    /// Apply the fail-high history updates: reward the cutoff move,
    /// penalize everything else that was tried first.
    #[allow(clippy::too_many_arguments)]
    pub fn update_histories(
        &mut self,
        pos: &Position,
        stack: &mut SearchStack,
        ply: usize,
        depth: i32,
        best_move: Move,
        quiets_tried: &[Move],
        noisies_tried: &[Move],
    ) {
        let bonus = history_bonus(depth);
        let side = pos.side_to_move();

        if best_move.is_quiet() {
            self.update_butterfly(side, best_move, bonus);
            self.update_cont(stack, ply, best_move, bonus);
            stack.push_killer(ply, best_move);
            if ply >= 1 {
                self.set_counter(stack.move_at(ply - 1), best_move);
            }

            for &quiet in quiets_tried {
                if quiet != best_move {
                    self.update_butterfly(side, quiet, -bonus);
                    self.update_cont(stack, ply, quiet, -bonus);
                }
            }
        } else {
            self.update_capture(pos, best_move, bonus);
        }

        for &noisy in noisies_tried {
            if noisy != best_move {
                self.update_capture(pos, noisy, -bonus);
            }
        }
    }

    /// Direct continuation-history update for a single move (used after
    /// LMR re-searches)
    pub fn update_cont_single(
        &mut self,
        stack: &SearchStack,
        ply: usize,
        mv: Move,
        bonus: i32,
    ) {
        self.update_cont(stack, ply, mv, bonus);
    }

    fn corr_update(entry: &mut i32, scaled_diff: i32, weight: i32) {
        let updated =
            (*entry * (CORR_WEIGHT_SCALE - weight) + scaled_diff * weight) / CORR_WEIGHT_SCALE;
        *entry = updated.clamp(-CORR_MAX, CORR_MAX);
    }

    /// Record the signed error between the search result and the static
    /// eval, weighted by depth.
    pub fn update_correction(
        &mut self,
        pos: &Position,
        stack: &SearchStack,
        ply: usize,
        depth: i32,
        diff: i32,
    ) {
        let scaled = diff * CORR_GRAIN;
        let weight = (depth + 1).min(16);
        let stm = pos.side_to_move().index();

        Self::corr_update(
            &mut self.pawn_corr[stm][(pos.pawnkey % CORR_SIZE as u64) as usize],
            scaled,
            weight,
        );
        for color in [Color::White, Color::Black] {
            Self::corr_update(
                &mut self.nonpawn_corr[stm][color.index()]
                    [(pos.nonpawn_key[color.index()] % CORR_SIZE as u64) as usize],
                scaled,
                weight,
            );
        }
        if ply >= 2 {
            let prev = stack.prev_piece_to(ply, 2);
            if prev != CONT_NONE {
                Self::corr_update(&mut self.cont_corr[prev / 64][prev % 64], scaled, weight);
            }
        }
    }

    /// Adjust a raw static eval by the accumulated corrections, clamped
    /// away from the mate range.
    #[must_use]
    pub fn adjust_eval(
        &self,
        pos: &Position,
        stack: &SearchStack,
        ply: usize,
        raw_eval: i32,
    ) -> i32 {
        use super::constants::MATE_FOUND;

        let stm = pos.side_to_move().index();
        let mut adjustment = self.pawn_corr[stm][(pos.pawnkey % CORR_SIZE as u64) as usize];
        for color in [Color::White, Color::Black] {
            adjustment += self.nonpawn_corr[stm][color.index()]
                [(pos.nonpawn_key[color.index()] % CORR_SIZE as u64) as usize];
        }
        if ply >= 2 {
            let prev = stack.prev_piece_to(ply, 2);
            if prev != CONT_NONE {
                adjustment += self.cont_corr[prev / 64][prev % 64];
            }
        }

        (raw_eval + adjustment / CORR_GRAIN).clamp(-MATE_FOUND + 1, MATE_FOUND - 1)
    }
}

impl Default for SearchData {
    fn default() -> Self {
        SearchData::new()
    }
}

/// (piece, to) cell of a move for the continuation tables
#[inline]
#[must_use]
pub(crate) fn piece_to(mv: Move) -> usize {
    mv.piece_index() * 64 + mv.to().index()
}
