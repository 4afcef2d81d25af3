//! UCI surface tests against the public API.

use basalt::uci::{parse_go_params, parse_setoption, parse_uci_command, EngineOptions, UciCommand};

#[test]
fn test_command_dispatch() {
    assert!(matches!(parse_uci_command("uci"), Some(UciCommand::Uci)));
    assert!(matches!(
        parse_uci_command("ucinewgame"),
        Some(UciCommand::UciNewGame)
    ));
    assert!(matches!(
        parse_uci_command("position startpos moves e2e4"),
        Some(UciCommand::Position(_))
    ));
    assert!(matches!(
        parse_uci_command("go wtime 1000 btime 1000"),
        Some(UciCommand::Go(_))
    ));
    assert!(matches!(parse_uci_command("d"), Some(UciCommand::Display)));
}

#[test]
fn test_go_parameter_grid() {
    let line = "go wtime 300000 btime 300000 winc 2000 binc 2000 movestogo 40 depth 20 nodes 123456";
    let parts: Vec<&str> = line.split_whitespace().collect();
    let params = parse_go_params(&parts);

    assert_eq!(params.wtime, Some(300_000));
    assert_eq!(params.btime, Some(300_000));
    assert_eq!(params.winc, Some(2000));
    assert_eq!(params.binc, Some(2000));
    assert_eq!(params.movestogo, Some(40));
    assert_eq!(params.depth, Some(20));
    assert_eq!(params.nodes, Some(123_456));
    assert!(!params.infinite);
    assert!(params.perft.is_none());
}

#[test]
fn test_go_infinite_and_perft() {
    let parts: Vec<&str> = "go infinite".split_whitespace().collect();
    assert!(parse_go_params(&parts).infinite);

    let parts: Vec<&str> = "go perft 5".split_whitespace().collect();
    assert_eq!(parse_go_params(&parts).perft, Some(5));
}

#[test]
fn test_setoption_flow() {
    let parts: Vec<String> = "name Threads value 4"
        .split_whitespace()
        .map(String::from)
        .collect();
    let (name, value) = parse_setoption(&parts).unwrap();

    let mut options = EngineOptions::default();
    assert!(options.set(&name, &value).is_some());
    assert_eq!(options.threads, 4);
}
