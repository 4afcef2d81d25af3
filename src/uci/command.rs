//! UCI command parsing.

/// A parsed input line. Malformed tokens inside a recognized command are
/// skipped rather than failing the whole line.
#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    Position(Vec<String>),
    Go(Vec<String>),
    SetOption(Vec<String>),
    Stop,
    Quit,
    Display,
    Unknown(String),
}

/// Limits carried by a `go` command
#[derive(Default, Debug, Clone)]
pub struct GoParams {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movetime: Option<u64>,
    pub movestogo: Option<u64>,
    pub depth: Option<i32>,
    pub nodes: Option<u64>,
    pub infinite: bool,
    pub perft: Option<usize>,
}

/// Parse the next parameter value as type T.
#[inline]
fn parse_next<T: std::str::FromStr>(parts: &[&str], i: usize) -> Option<T> {
    parts.get(i + 1).and_then(|v| v.parse::<T>().ok())
}

#[must_use]
pub fn parse_go_params(parts: &[&str]) -> GoParams {
    let mut params = GoParams::default();
    let mut i = 1;

    while i < parts.len() {
        let consumed = match parts[i] {
            "wtime" => {
                params.wtime = parse_next(parts, i);
                2
            }
            "btime" => {
                params.btime = parse_next(parts, i);
                2
            }
            "winc" => {
                params.winc = parse_next(parts, i);
                2
            }
            "binc" => {
                params.binc = parse_next(parts, i);
                2
            }
            "movetime" => {
                params.movetime = parse_next(parts, i);
                2
            }
            "movestogo" => {
                params.movestogo = parse_next(parts, i);
                2
            }
            "depth" => {
                params.depth = parse_next(parts, i);
                2
            }
            "nodes" => {
                params.nodes = parse_next(parts, i);
                2
            }
            "perft" => {
                params.perft = parse_next(parts, i);
                2
            }
            "infinite" => {
                params.infinite = true;
                1
            }
            // Unknown token - skip it and continue
            _ => 1,
        };
        i += consumed;
    }
    params
}

#[must_use]
pub fn parse_uci_command(line: &str) -> Option<UciCommand> {
    let trimmed = line.trim();
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }

    let owned_parts = || {
        parts
            .iter()
            .map(|p| (*p).to_string())
            .collect::<Vec<String>>()
    };

    let cmd = match parts[0] {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned_parts()),
        "go" => UciCommand::Go(owned_parts()),
        "setoption" => UciCommand::SetOption(owned_parts()),
        "stop" => UciCommand::Stop,
        "quit" => UciCommand::Quit,
        "d" | "display" => UciCommand::Display,
        _ => UciCommand::Unknown(trimmed.to_string()),
    };

    Some(cmd)
}

/// Split a `setoption name <X> value <Y>` token list into name and value
#[must_use]
pub fn parse_setoption(parts: &[String]) -> Option<(String, String)> {
    let name_idx = parts.iter().position(|p| p == "name")? + 1;
    let value_idx = parts.iter().position(|p| p == "value");

    let name_end = value_idx.unwrap_or(parts.len());
    if name_idx >= name_end {
        return None;
    }
    let name = parts[name_idx..name_end].join(" ");
    let value = value_idx
        .map(|idx| parts[idx + 1..].join(" "))
        .unwrap_or_default();
    Some((name, value))
}
