//! UCI front end.
//!
//! Reads commands from stdin on the main thread and runs searches on a
//! dedicated coordinator thread, so `stop` and `isready` stay responsive
//! mid-search. The engine state (position, worker pool, TT, network,
//! options) lives behind one mutex that the coordinator holds for the
//! duration of a search.

mod command;
mod options;

pub use command::{parse_go_params, parse_setoption, parse_uci_command, GoParams, UciCommand};
pub use options::{EngineOptions, OptionUpdate};

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;

use crate::board::nnue::NnueNetwork;
use crate::board::search::{
    search_position, IterationReport, SearchSettings, ThreadData,
};
use crate::board::search::constants::{MATE_FOUND, MATE_SCORE};
use crate::board::{Color, Position};
use crate::engine::time::{TimeControl, TimeManager};
use crate::tt::TranspositionTable;

const ENGINE_NAME: &str = "Basalt 0.1.0";
const ENGINE_AUTHOR: &str = "the Basalt developers";

struct EngineState {
    pos: Position,
    tds: Vec<ThreadData>,
    tt: Arc<TranspositionTable>,
    net: Arc<NnueNetwork>,
    options: EngineOptions,
}

/// Run the UCI loop until `quit` or EOF. A configured network file that
/// fails to load is a startup error.
pub fn run_uci_loop(eval_file: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    crate::init();

    let net = match eval_file {
        Some(path) => Arc::new(
            NnueNetwork::load(path)
                .map_err(|err| format!("cannot load network file '{path}': {err}"))?,
        ),
        None => Arc::new(NnueNetwork::zeroed()),
    };

    let options = EngineOptions::default();
    let state = Arc::new(Mutex::new(EngineState {
        pos: Position::startpos(),
        tds: vec![ThreadData::new(0)],
        tt: Arc::new(TranspositionTable::new(options.hash_mb)),
        net,
        options,
    }));
    let stop = Arc::new(AtomicBool::new(false));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let Some(cmd) = parse_uci_command(&line) else {
            continue;
        };

        match cmd {
            UciCommand::Uci => {
                println!("id name {ENGINE_NAME}");
                println!("id author {ENGINE_AUTHOR}");
                state.lock().options.print_all();
                println!("uciok");
            }
            UciCommand::IsReady => println!("readyok"),
            UciCommand::UciNewGame => {
                let mut st = state.lock();
                st.pos = Position::startpos();
                st.tt.clear();
                for td in &mut st.tds {
                    td.new_game();
                }
            }
            UciCommand::Position(parts) => handle_position(&state, &parts),
            UciCommand::Go(parts) => handle_go(&state, &stop, &parts),
            UciCommand::SetOption(parts) => handle_setoption(&state, &parts),
            UciCommand::Stop => stop.store(true, Ordering::Relaxed),
            UciCommand::Display => println!("{}", state.lock().pos),
            UciCommand::Quit => {
                stop.store(true, Ordering::Relaxed);
                // Wait for a running search to unwind before exiting
                drop(state.lock());
                break;
            }
            UciCommand::Unknown(text) => log::debug!("ignoring unknown command '{text}'"),
        }
    }

    Ok(())
}

/// `position [startpos | fen <fen>] [moves <m1> <m2> ...]`
fn handle_position(state: &Arc<Mutex<EngineState>>, parts: &[String]) {
    let mut st = state.lock();
    let mut idx = 1;

    match parts.get(idx).map(String::as_str) {
        Some("startpos") => {
            st.pos = Position::startpos();
            idx += 1;
        }
        Some("fen") => {
            idx += 1;
            let fen_end = parts[idx..]
                .iter()
                .position(|p| p == "moves")
                .map_or(parts.len(), |offset| idx + offset);
            let fen = parts[idx..fen_end].join(" ");
            match Position::from_fen(&fen) {
                Ok(pos) => st.pos = pos,
                Err(err) => {
                    log::warn!("bad FEN '{fen}': {err}; resetting to start position");
                    st.pos = Position::startpos();
                }
            }
            idx = fen_end;
        }
        _ => return,
    }

    if parts.get(idx).map(String::as_str) == Some("moves") {
        for text in &parts[idx + 1..] {
            match st.pos.parse_move(text) {
                Some(mv) => {
                    st.pos.make_move(mv);
                }
                None => {
                    // Keep the position as of the last good move
                    log::warn!("illegal move '{text}' in position command");
                    break;
                }
            }
        }
    }
}

fn handle_setoption(state: &Arc<Mutex<EngineState>>, parts: &[String]) {
    let Some((name, value)) = parse_setoption(parts) else {
        log::warn!("malformed setoption");
        return;
    };

    let mut st = state.lock();
    match st.options.set(&name, &value) {
        Some(OptionUpdate::Hash) => {
            let mb = st.options.hash_mb;
            match Arc::get_mut(&mut st.tt) {
                Some(tt) => {
                    if tt.resize(mb).is_err() {
                        println!("info string hash allocation of {mb} MB failed, keeping previous size");
                    }
                }
                None => log::warn!("hash resize requested while the table is in use"),
            }
        }
        Some(OptionUpdate::EvalFile) => {
            if let Some(path) = st.options.eval_file.clone() {
                match NnueNetwork::load(&path) {
                    Ok(net) => st.net = Arc::new(net),
                    Err(err) => {
                        println!("info string cannot load network file '{path}': {err}");
                    }
                }
            }
        }
        Some(_) => {}
        None => log::info!("unknown or invalid option '{name}'"),
    }
}

fn handle_go(state: &Arc<Mutex<EngineState>>, stop: &Arc<AtomicBool>, parts: &[String]) {
    let str_parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    let params = parse_go_params(&str_parts);

    if let Some(depth) = params.perft {
        run_perft(state, depth);
        return;
    }

    let state = Arc::clone(state);
    let stop = Arc::clone(stop);
    thread::spawn(move || {
        let mut st = state.lock();
        let st = &mut *st;

        let control = pick_time_control(&params, st.pos.side_to_move());
        let time = Arc::new(TimeManager::new(
            control,
            params.nodes.unwrap_or(0),
            st.options.move_overhead_ms,
        ));

        // Grow or shrink the worker pool to the Threads option
        while st.tds.len() < st.options.threads {
            let id = st.tds.len();
            st.tds.push(ThreadData::new(id));
        }
        st.tds.truncate(st.options.threads);

        let settings = SearchSettings {
            depth: params.depth.unwrap_or(crate::board::MAX_PLY as i32 - 1),
            multipv: st.options.multipv,
        };

        let outcome = search_position(
            &mut st.tds,
            &st.pos,
            &st.tt,
            &st.net,
            &stop,
            time,
            &settings,
            Some(&print_iteration),
        );

        match (outcome.best_move, outcome.ponder_move) {
            (best, Some(ponder)) if best != crate::board::Move::null() => {
                println!("bestmove {best} ponder {ponder}");
            }
            (best, _) if best != crate::board::Move::null() => println!("bestmove {best}"),
            _ => println!("bestmove 0000"),
        }
    });
}

fn pick_time_control(params: &GoParams, side: Color) -> TimeControl {
    if params.infinite {
        return TimeControl::Infinite;
    }
    if let Some(movetime) = params.movetime {
        return TimeControl::MoveTime { time_ms: movetime };
    }

    let (time, inc) = match side {
        Color::White => (params.wtime, params.winc),
        Color::Black => (params.btime, params.binc),
    };
    match time {
        Some(time_ms) => TimeControl::Clock {
            time_ms,
            inc_ms: inc.unwrap_or(0),
            movestogo: params.movestogo,
        },
        None => TimeControl::Infinite,
    }
}

fn run_perft(state: &Arc<Mutex<EngineState>>, depth: usize) {
    let mut pos = state.lock().pos.clone();
    let start = Instant::now();

    let mut total = 0u64;
    for (mv, nodes) in pos.perft_divide(depth) {
        println!("{mv}: {nodes}");
        total += nodes;
    }

    let elapsed = start.elapsed().as_millis().max(1) as u64;
    println!();
    println!("Nodes searched: {total}");
    println!("Time: {elapsed} ms ({} nps)", total * 1000 / elapsed);
}

/// Emit one `info` line for a completed iteration
fn print_iteration(report: IterationReport) {
    let elapsed = report.time_ms.max(1);
    let nps = report.nodes * 1000 / elapsed;
    let pv: Vec<String> = report.pv.iter().map(ToString::to_string).collect();

    println!(
        "info depth {} seldepth {} multipv {} score {} nodes {} nps {} hashfull {} time {} pv {}",
        report.depth,
        report.seldepth,
        report.multipv,
        format_score(report.score),
        report.nodes,
        nps,
        report.hashfull,
        report.time_ms,
        pv.join(" ")
    );
}

/// `cp N` for normal scores, `mate N` (moves, signed) for forced mates
fn format_score(score: i32) -> String {
    if score > MATE_FOUND {
        format!("mate {}", (MATE_SCORE - score + 1) / 2)
    } else if score < -MATE_FOUND {
        format!("mate -{}", (MATE_SCORE + score) / 2)
    } else {
        format!("cp {score}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(25), "cp 25");
        assert_eq!(format_score(-140), "cp -140");
        // Mate in one: we deliver mate at ply 1
        assert_eq!(format_score(MATE_SCORE - 1), "mate 1");
        // Mate in two
        assert_eq!(format_score(MATE_SCORE - 3), "mate 2");
        // We get mated next move
        assert_eq!(format_score(-(MATE_SCORE - 2)), "mate -1");
    }

    #[test]
    fn test_pick_time_control() {
        let mut params = GoParams::default();
        assert_eq!(
            pick_time_control(&params, Color::White),
            TimeControl::Infinite
        );

        params.movetime = Some(500);
        assert_eq!(
            pick_time_control(&params, Color::White),
            TimeControl::MoveTime { time_ms: 500 }
        );

        params.movetime = None;
        params.wtime = Some(60_000);
        params.btime = Some(50_000);
        params.winc = Some(1000);
        assert_eq!(
            pick_time_control(&params, Color::White),
            TimeControl::Clock {
                time_ms: 60_000,
                inc_ms: 1000,
                movestogo: None
            }
        );
        assert_eq!(
            pick_time_control(&params, Color::Black),
            TimeControl::Clock {
                time_ms: 50_000,
                inc_ms: 0,
                movestogo: None
            }
        );
    }
}
