use std::process::ExitCode;

fn main() -> ExitCode {
    basalt::init();

    // An optional network path on the command line must load, otherwise
    // starting up would silently play with a blank evaluator.
    let eval_file = std::env::args().nth(1);
    match basalt::uci::run_uci_loop(eval_file.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}
