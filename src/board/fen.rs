//! FEN parsing and formatting.
//!
//! Six space-separated fields; the halfmove clock and fullmove number are
//! optional and default to 0 and 1. `to_fen` round-trips exactly for any
//! syntactically valid six-field FEN.

use super::error::FenError;
use super::state::Position;
use super::types::{castle_bits, CastlingRights, Color, Piece, Square};

/// FEN of the standard starting position
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Position {
    /// Parse a FEN string into a position.
    ///
    /// The board, side, castling, and en passant fields are required; the
    /// halfmove clock and fullmove number default when absent.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(FenError::TooFewFields {
                found: fields.len(),
            });
        }

        let mut pos = Position::empty();

        // Field 1: piece placement, rank 8 first
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::BadRankCount {
                found: ranks.len(),
            });
        }
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let piece =
                        Piece::from_char(c).ok_or(FenError::InvalidPiece { char: c })?;
                    let color = if c.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    if file >= 8 {
                        return Err(FenError::BadRank { rank });
                    }
                    pos.put_piece_unhashed(color, piece, Square::new(rank, file));
                    file += 1;
                }
            }
            if file != 8 {
                return Err(FenError::BadRank { rank });
            }
        }

        // Field 2: side to move
        pos.side = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        };

        // Field 3: castling rights
        let mut castling = 0u8;
        if fields[2] != "-" {
            for c in fields[2].chars() {
                let bit = castle_bits(c);
                if bit == 0 {
                    return Err(FenError::InvalidCastling { char: c });
                }
                castling |= bit;
            }
        }
        pos.castling = CastlingRights::from_u8(castling);

        // Field 4: en passant square
        pos.ep_square = match fields[3] {
            "-" => None,
            notation => Some(notation.parse::<Square>().map_err(|_| {
                FenError::InvalidEnPassant {
                    found: notation.to_string(),
                }
            })?),
        };

        // Fields 5 and 6: halfmove clock and fullmove number, optional
        pos.fifty_move = fields
            .get(4)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        pos.fullmove = fields
            .get(5)
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        // Checker/pin maintenance assumes exactly one king per side
        for color in [Color::White, Color::Black] {
            if pos.piece_bb(color, Piece::King).popcount() != 1 {
                return Err(FenError::BadKingCount);
            }
        }

        pos.refresh_keys();
        pos.update_checkers_and_pins();
        Ok(pos)
    }

    /// Format the position as a six-field FEN string
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);

        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_at(Square::new(rank, file)) {
                    Some((color, piece)) => {
                        if empty > 0 {
                            fen.push(char::from_digit(empty, 10).unwrap_or('0'));
                            empty = 0;
                        }
                        fen.push(piece.to_fen_char(color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push(char::from_digit(empty, 10).unwrap_or('0'));
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side == Color::White { 'w' } else { 'b' });

        fen.push(' ');
        if self.castling.as_u8() == 0 {
            fen.push('-');
        } else {
            for (c, color, kingside) in [
                ('K', Color::White, true),
                ('Q', Color::White, false),
                ('k', Color::Black, true),
                ('q', Color::Black, false),
            ] {
                if self.castling.has(color, kingside) {
                    fen.push(c);
                }
            }
        }

        fen.push(' ');
        match self.ep_square {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.fifty_move, self.fullmove));
        fen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIWIPETE: &str =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn test_startpos_fields() {
        let pos = Position::from_fen(START_FEN).unwrap();
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.castling, CastlingRights::all());
        assert_eq!(pos.ep_square(), None);
        assert_eq!(pos.halfmove_clock(), 0);
        assert_eq!(pos.all_occupied.popcount(), 32);
        assert_eq!(
            pos.piece_at(Square::new(0, 4)),
            Some((Color::White, Piece::King))
        );
    }

    #[test]
    fn test_round_trip() {
        for fen in [
            START_FEN,
            KIWIPETE,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            "8/8/8/8/8/8/8/4K2k b - - 13 77",
        ] {
            let pos = Position::from_fen(fen).unwrap();
            assert_eq!(pos.to_fen(), fen);
        }
    }

    #[test]
    fn test_optional_fields_default() {
        let pos = Position::from_fen("8/8/8/8/8/8/8/4K2k w - -").unwrap();
        assert_eq!(pos.halfmove_clock(), 0);
        assert_eq!(pos.fullmove, 1);
    }

    #[test]
    fn test_invalid_fens() {
        assert!(matches!(
            Position::from_fen("8/8/8/8"),
            Err(FenError::TooFewFields { .. })
        ));
        assert!(matches!(
            Position::from_fen("8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::BadRankCount { .. })
        ));
        assert!(matches!(
            Position::from_fen("x7/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::InvalidPiece { .. })
        ));
        assert!(matches!(
            Position::from_fen("9/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::BadRank { .. })
        ));
        assert!(matches!(
            Position::from_fen("8/8/8/8/8/8/8/8 x - - 0 1"),
            Err(FenError::InvalidSideToMove { .. })
        ));
        assert!(matches!(
            Position::from_fen(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KXkq - 0 1"
            ),
            Err(FenError::InvalidCastling { .. })
        ));
        assert!(matches!(
            Position::from_fen("8/8/8/8/8/8/8/4K2k w - z9 0 1"),
            Err(FenError::InvalidEnPassant { .. })
        ));
        assert!(matches!(
            Position::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1"),
            Err(FenError::BadKingCount)
        ));
    }

    #[test]
    fn test_keys_initialized() {
        let pos = Position::from_fen(KIWIPETE).unwrap();
        assert_eq!(pos.key(), pos.key_from_scratch());
        assert_ne!(pos.key(), 0);
        assert_ne!(pos.pawnkey, 0);
    }

    #[test]
    fn test_checkers_initialized() {
        // Black king on h1 is not in check; white rook gives check after
        // loading a check position
        let pos =
            Position::from_fen("4k3/8/8/8/8/8/8/4R1K1 b - - 0 1").unwrap();
        assert!(pos.in_check());
        assert_eq!(pos.checkers().popcount(), 1);
    }
}
