//! Make / unmake / null move.
//!
//! All board state (bitboards, mailbox, occupancies, the three Zobrist
//! keys, checkers/pins) updates incrementally under make and reverses
//! exactly under unmake. The `_nnue` variants additionally snapshot the
//! accumulator per ply and apply the network's incremental feature
//! updates; the plain variants are for perft and position setup where
//! evaluation is never consulted.

use super::nnue::NnueNetwork;
use super::state::{Position, UnmakeInfo};
use super::types::{Bitboard, Color, Move, Piece, Square};
use super::zobrist;

impl Position {
    /// Remove a piece without touching any hash
    #[inline]
    fn clear_piece_raw(&mut self, color: Color, piece: Piece, sq: Square) {
        let bit = Bitboard::from_square(sq);
        self.bitboards[color.index()][piece.index()] ^= bit;
        self.occupancies[color.index()] ^= bit;
        self.all_occupied ^= bit;
        self.mailbox[sq.index()] = None;
    }

    /// Add a piece without touching any hash
    #[inline]
    fn add_piece_raw(&mut self, color: Color, piece: Piece, sq: Square) {
        let bit = Bitboard::from_square(sq);
        self.bitboards[color.index()][piece.index()] |= bit;
        self.occupancies[color.index()] |= bit;
        self.all_occupied |= bit;
        self.mailbox[sq.index()] = Some((color, piece));
    }

    /// XOR a piece-square key into the main hash and whichever of the
    /// pawn / non-pawn hashes it belongs to
    #[inline]
    fn hash_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        let key = zobrist::piece_key(color, piece, sq);
        self.poskey ^= key;
        if piece == Piece::Pawn {
            self.pawnkey ^= key;
        } else {
            self.nonpawn_key[color.index()] ^= key;
        }
    }

    /// Remove a piece, updating hashes and (when given) the accumulator
    #[inline]
    fn clear_piece(&mut self, color: Color, piece: Piece, sq: Square, net: Option<&NnueNetwork>) {
        self.hash_piece(color, piece, sq);
        self.clear_piece_raw(color, piece, sq);
        if let Some(net) = net {
            self.accumulator.remove_piece(net, color, piece, sq);
        }
    }

    /// Add a piece, updating hashes and (when given) the accumulator
    #[inline]
    fn add_piece(&mut self, color: Color, piece: Piece, sq: Square, net: Option<&NnueNetwork>) {
        self.hash_piece(color, piece, sq);
        self.add_piece_raw(color, piece, sq);
        if let Some(net) = net {
            self.accumulator.add_piece(net, color, piece, sq);
        }
    }

    /// Move a piece, updating hashes and (when given) the accumulator
    #[inline]
    fn move_piece(
        &mut self,
        color: Color,
        piece: Piece,
        from: Square,
        to: Square,
        net: Option<&NnueNetwork>,
    ) {
        self.hash_piece(color, piece, from);
        self.hash_piece(color, piece, to);
        self.clear_piece_raw(color, piece, from);
        self.add_piece_raw(color, piece, to);
        if let Some(net) = net {
            self.accumulator.move_piece(net, color, piece, from, to);
        }
    }

    /// Make a move without accumulator maintenance (perft, setup)
    pub fn make_move(&mut self, mv: Move) -> UnmakeInfo {
        self.make_move_impl(mv, None)
    }

    /// Make a move, snapshotting and incrementally updating the NNUE
    /// accumulator. The search always uses this variant.
    pub fn make_move_nnue(&mut self, mv: Move, net: &NnueNetwork) -> UnmakeInfo {
        self.accumulator_stack.push(self.accumulator.clone());
        self.make_move_impl(mv, Some(net))
    }

    fn make_move_impl(&mut self, mv: Move, net: Option<&NnueNetwork>) -> UnmakeInfo {
        let mut info = UnmakeInfo {
            captured: None,
            prev_ep_square: self.ep_square,
            prev_castling: self.castling,
            prev_fifty_move: self.fifty_move,
            prev_ply_from_null: self.ply_from_null,
            prev_checkers: self.checkers,
            prev_pinned: self.pinned,
            prev_poskey: self.poskey,
            prev_pawnkey: self.pawnkey,
            prev_nonpawn_key: self.nonpawn_key,
        };
        self.played_positions.push(self.poskey);

        let from = mv.from();
        let to = mv.to();
        let (color, piece) = mv.piece();
        let enemy = color.opponent();

        self.fifty_move += 1;
        self.ply_from_null += 1;

        if mv.is_en_passant() {
            // The captured pawn sits behind the target square
            let victim_sq = to.pawn_push(color == Color::Black);
            self.clear_piece(enemy, Piece::Pawn, victim_sq, net);
            info.captured = Some((enemy, Piece::Pawn));
            self.fifty_move = 0;
        } else if mv.is_capture() {
            let (cap_color, cap_piece) = self.mailbox[to.index()]
                .expect("capture move targets an occupied square");
            self.clear_piece(cap_color, cap_piece, to, net);
            info.captured = Some((cap_color, cap_piece));
            self.fifty_move = 0;
        }

        if piece == Piece::Pawn {
            self.fifty_move = 0;
        }

        match mv.promoted_piece() {
            Some(promoted) => {
                self.clear_piece(color, Piece::Pawn, from, net);
                self.add_piece(color, promoted, to, net);
            }
            None => self.move_piece(color, piece, from, to, net),
        }

        if mv.is_castling() {
            let (rook_from, rook_to) = rook_castle_squares(to);
            self.move_piece(color, Piece::Rook, rook_from, rook_to, net);
        }

        // Clear the stale en passant square, set a fresh one on double push
        if let Some(old_ep) = self.ep_square.take() {
            self.poskey ^= zobrist::en_passant_key(old_ep);
        }
        if mv.is_double_pawn_push() {
            let ep = from.pawn_push(color == Color::White);
            self.ep_square = Some(ep);
            self.poskey ^= zobrist::en_passant_key(ep);
        }

        self.poskey ^= zobrist::castling_key(self.castling.as_u8());
        self.castling.apply_move(from, to);
        self.poskey ^= zobrist::castling_key(self.castling.as_u8());

        if self.side == Color::Black {
            self.fullmove += 1;
        }
        self.side = enemy;
        self.poskey ^= zobrist::side_key();

        self.update_checkers_and_pins();
        info
    }

    /// Reverse a move made with `make_move`
    pub fn unmake_move(&mut self, mv: Move, info: UnmakeInfo) {
        self.unmake_move_impl(mv, info);
    }

    /// Reverse a move made with `make_move_nnue`
    pub fn unmake_move_nnue(&mut self, mv: Move, info: UnmakeInfo) {
        self.unmake_move_impl(mv, info);
        self.accumulator = self
            .accumulator_stack
            .pop()
            .expect("accumulator stack underflow");
    }

    fn unmake_move_impl(&mut self, mv: Move, info: UnmakeInfo) {
        let from = mv.from();
        let to = mv.to();
        let (color, piece) = mv.piece();

        // Material changes reverse with raw operations; the hashes are
        // restored wholesale from the undo frame below.
        match mv.promoted_piece() {
            Some(promoted) => {
                self.clear_piece_raw(color, promoted, to);
                self.add_piece_raw(color, Piece::Pawn, from);
            }
            None => {
                self.clear_piece_raw(color, piece, to);
                self.add_piece_raw(color, piece, from);
            }
        }

        if mv.is_castling() {
            let (rook_from, rook_to) = rook_castle_squares(to);
            self.clear_piece_raw(color, Piece::Rook, rook_to);
            self.add_piece_raw(color, Piece::Rook, rook_from);
        }

        if let Some((cap_color, cap_piece)) = info.captured {
            let cap_sq = if mv.is_en_passant() {
                to.pawn_push(color == Color::Black)
            } else {
                to
            };
            self.add_piece_raw(cap_color, cap_piece, cap_sq);
        }

        if self.side == Color::White {
            self.fullmove -= 1;
        }
        self.side = color;
        self.ep_square = info.prev_ep_square;
        self.castling = info.prev_castling;
        self.fifty_move = info.prev_fifty_move;
        self.ply_from_null = info.prev_ply_from_null;
        self.checkers = info.prev_checkers;
        self.pinned = info.prev_pinned;
        self.poskey = info.prev_poskey;
        self.pawnkey = info.prev_pawnkey;
        self.nonpawn_key = info.prev_nonpawn_key;
        self.played_positions.pop();
    }

    /// Make a null move: flip the side, clear en passant, reset the
    /// null-move ply counter. The board itself does not change.
    pub fn make_null(&mut self) -> UnmakeInfo {
        let info = UnmakeInfo {
            captured: None,
            prev_ep_square: self.ep_square,
            prev_castling: self.castling,
            prev_fifty_move: self.fifty_move,
            prev_ply_from_null: self.ply_from_null,
            prev_checkers: self.checkers,
            prev_pinned: self.pinned,
            prev_poskey: self.poskey,
            prev_pawnkey: self.pawnkey,
            prev_nonpawn_key: self.nonpawn_key,
        };
        self.played_positions.push(self.poskey);

        if let Some(ep) = self.ep_square.take() {
            self.poskey ^= zobrist::en_passant_key(ep);
        }
        self.side = self.side.opponent();
        self.poskey ^= zobrist::side_key();
        self.ply_from_null = 0;

        self.update_checkers_and_pins();
        info
    }

    /// Reverse a null move
    pub fn unmake_null(&mut self, info: UnmakeInfo) {
        self.side = self.side.opponent();
        self.ep_square = info.prev_ep_square;
        self.fifty_move = info.prev_fifty_move;
        self.ply_from_null = info.prev_ply_from_null;
        self.checkers = info.prev_checkers;
        self.pinned = info.prev_pinned;
        self.poskey = info.prev_poskey;
        self.pawnkey = info.prev_pawnkey;
        self.nonpawn_key = info.prev_nonpawn_key;
        self.played_positions.pop();
    }

    /// Null move with an identical accumulator snapshot, so the stack
    /// depth always matches the search ply
    pub fn make_null_nnue(&mut self) -> UnmakeInfo {
        self.accumulator_stack.push(self.accumulator.clone());
        self.make_null()
    }

    /// Reverse a null move made with `make_null_nnue`
    pub fn unmake_null_nnue(&mut self, info: UnmakeInfo) {
        self.unmake_null(info);
        self.accumulator = self
            .accumulator_stack
            .pop()
            .expect("accumulator stack underflow");
    }
}

/// Rook source and destination for a castle, keyed by the king's target
fn rook_castle_squares(king_to: Square) -> (Square, Square) {
    match king_to.index() {
        6 => (Square::from_index(7), Square::from_index(5)), // g1: h1 -> f1
        2 => (Square::from_index(0), Square::from_index(3)), // c1: a1 -> d1
        62 => (Square::from_index(63), Square::from_index(61)), // g8: h8 -> f8
        58 => (Square::from_index(56), Square::from_index(59)), // c8: a8 -> d8
        _ => unreachable!("castle move with non-castle king target"),
    }
}
