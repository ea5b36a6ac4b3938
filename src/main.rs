use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::error;

use ctl_sat::checker::CtlSatChecker;
use ctl_sat::error::CtlSatError;
use ctl_sat::formula::Formula;
use ctl_sat::qbf::{CancelToken, ExternalSolver, SolverConfig, DEFAULT_SOLVER, SOLVER_ENV_VAR};

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[derive(Parser, Debug)]
#[command(name = "ctlsat")]
#[command(about = "Decide satisfiability of CTL formulas with a QBF solver")]
struct Args {
    /// Formulas to check, one per argument.  Read from stdin, one per line,
    /// when none are given.
    formulas: Vec<String>,

    /// QDIMACS solver to run; must exit with 10 (SAT) or 20 (UNSAT)
    #[arg(long, env = SOLVER_ENV_VAR, default_value = DEFAULT_SOLVER)]
    solver: String,

    /// Argument passed to the solver before the query file (repeatable)
    #[arg(long = "solver-arg", allow_hyphen_values = true)]
    solver_args: Vec<String>,

    /// How often to poll the running solver, in milliseconds
    #[arg(long, default_value_t = 10)]
    poll_ms: u64,

    /// Keep every query as query-<n>.qdimacs in this directory
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Give up on a formula after this many seconds
    #[arg(long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Print the normalized formula and its positive elementary formulas
    /// instead of solving
    #[arg(long)]
    normalize: bool,
}

impl Args {
    fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            command: self.solver.clone(),
            args: self.solver_args.clone(),
            poll_interval: Duration::from_millis(self.poll_ms),
            dump_dir: self.dump_dir.clone(),
        }
    }
}

fn parse_timeout(arg: &str) -> Result<Duration, String> {
    let seconds: f64 = arg.parse().map_err(|err| format!("{err}"))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("expected a positive number of seconds, got {arg}"));
    }
    Duration::try_from_secs_f64(seconds).map_err(|err| format!("{err}"))
}

fn watchdog(timeout: Duration, cancel: CancelToken) -> mpsc::Sender<()> {
    // Cancels `cancel` after `timeout` unless the returned sender is dropped
    // first.
    let (done, finished) = mpsc::channel::<()>();
    thread::spawn(move || {
        if let Err(RecvTimeoutError::Timeout) = finished.recv_timeout(timeout) {
            cancel.cancel();
        }
    });
    done
}

fn run(input: &str, args: &Args) -> Result<(), CtlSatError> {
    let formula = Formula::parse(input)?;
    let engine = ExternalSolver::new(args.solver_config());
    let cancel = CancelToken::new();
    let mut checker = CtlSatChecker::new(&formula, engine)?.with_cancel_token(cancel.clone());

    if args.normalize {
        println!("{input}: {}", checker.normalized());
        for elementary in checker.positive_elementary() {
            println!("  {elementary}");
        }
        return Ok(());
    }

    let guard = args.timeout.map(|timeout| watchdog(timeout, cancel));
    let report = checker.check();
    drop(guard);
    match report {
        Ok(report) => println!("{input}: {report}"),
        Err(err) if err.is_cancelled() => println!("{input}: TIMEOUT"),
        Err(err) => return Err(err),
    }
    Ok(())
}

fn main() -> ExitCode {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let inputs: Vec<String> = if args.formulas.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .map_while(|line| line.ok())
            .map(|line| line.trim().to_owned())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect()
    } else {
        args.formulas.clone()
    };

    let mut failed = false;
    for input in &inputs {
        if let Err(err) = run(input, &args) {
            error!("{input}: {err}");
            eprintln!("{input}: {err}");
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("2.5"), Ok(Duration::from_millis(2500)));
        assert_eq!(parse_timeout("30"), Ok(Duration::from_secs(30)));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("-1").is_err());
        assert!(parse_timeout("NaN").is_err());
        assert!(parse_timeout("inf").is_err());
        assert!(parse_timeout("1e300").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_bad_timeout_is_a_usage_error() {
        let result = Args::try_parse_from(["ctlsat", "--timeout", "-3", "p"]);
        assert!(result.is_err());
        let args = Args::try_parse_from(["ctlsat", "--timeout", "0.5", "--solver", "depqbf", "p"]).unwrap();
        assert_eq!(args.timeout, Some(Duration::from_millis(500)));
        assert_eq!(args.solver_config().command, "depqbf");
        assert_eq!(args.formulas, vec!["p".to_string()]);
    }

    #[test]
    fn test_watchdog_cancels_only_on_expiry() {
        let cancel = CancelToken::new();
        let done = watchdog(Duration::from_secs(60), cancel.clone());
        drop(done);
        thread::sleep(Duration::from_millis(50));
        assert!(!cancel.is_cancelled());

        let cancel = CancelToken::new();
        let _done = watchdog(Duration::from_millis(10), cancel.clone());
        thread::sleep(Duration::from_millis(500));
        assert!(cancel.is_cancelled());
    }
}
