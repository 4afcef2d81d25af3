//! Draw detection: repetition, fifty-move rule, insufficient material.

use crate::board::Position;

fn play(pos: &mut Position, moves: &[&str]) {
    for text in moves {
        let mv = pos
            .parse_move(text)
            .unwrap_or_else(|| panic!("move {text} should be legal"));
        pos.make_move(mv);
    }
}

#[test]
fn test_threefold_across_game_history() {
    let mut pos = Position::startpos();
    // Knight shuffle: the start position occurs three times in total
    play(
        &mut pos,
        &[
            "g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8",
        ],
    );
    assert!(pos.is_draw(0), "third occurrence is a draw at the root");
}

#[test]
fn test_twofold_inside_search_tree() {
    let mut pos = Position::startpos();
    play(&mut pos, &["g1f3", "g8f6", "f3g1", "f6g8"]);
    // Only the second occurrence overall: not a draw at the root...
    assert!(!pos.is_draw(0));
    // ...but with the whole shuffle inside the search subtree it is
    assert!(pos.is_draw(5));
}

#[test]
fn test_fifty_move_rule() {
    let mut pos = Position::from_fen("7k/8/8/8/8/8/R7/7K w - - 99 80").unwrap();
    assert!(!pos.is_draw(0));
    play(&mut pos, &["a2a3"]);
    assert_eq!(pos.halfmove_clock(), 100);
    assert!(pos.is_draw(0));
}

#[test]
fn test_pawn_move_resets_fifty() {
    let mut pos = Position::from_fen("7k/8/8/8/8/P7/8/R6K w - - 99 80").unwrap();
    play(&mut pos, &["a3a4"]);
    assert_eq!(pos.halfmove_clock(), 0);
    assert!(!pos.is_draw(0));
}

#[test]
fn test_hundred_halfmoves_in_checkmate_is_not_a_draw() {
    // Back-rank mate delivered exactly as the counter hits 100
    let mut pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/R6K w - - 99 80").unwrap();
    play(&mut pos, &["a1a8"]);
    assert_eq!(pos.halfmove_clock(), 100);
    assert!(pos.in_check());
    assert!(!pos.has_legal_moves());
    assert!(!pos.is_draw(0), "checkmate takes precedence over the counter");
}

#[test]
fn test_hundred_halfmoves_in_check_with_escape_is_a_draw() {
    let mut pos = Position::from_fen("7k/5pp1/8/8/8/8/8/R6K w - - 99 80").unwrap();
    play(&mut pos, &["a1a8"]);
    assert!(pos.in_check());
    assert!(pos.has_legal_moves());
    assert!(pos.is_draw(0));
}

#[test]
fn test_insufficient_material() {
    for fen in [
        "8/8/8/8/8/8/8/K6k w - - 0 1",        // bare kings
        "8/8/8/8/8/8/8/KN5k w - - 0 1",       // lone knight
        "8/8/8/8/8/8/8/KB5k w - - 0 1",       // lone bishop
        "8/1b6/8/8/8/8/B7/K6k w - - 0 1",     // same-colored bishops
    ] {
        let pos = Position::from_fen(fen).unwrap();
        assert!(pos.is_draw(0), "{fen} should be drawn");
    }

    for fen in [
        "8/8/8/8/8/8/P7/K6k w - - 0 1",  // a pawn can still win
        "8/8/8/8/8/8/8/KR5k w - - 0 1",  // a rook mates
        "8/8/8/8/8/8/N7/KN5k w - - 0 1", // two knights are kept
        "8/b7/8/8/8/8/B7/K6k w - - 0 1", // opposite-colored bishops
    ] {
        let pos = Position::from_fen(fen).unwrap();
        assert!(!pos.is_draw(0), "{fen} should not be drawn");
    }
}
