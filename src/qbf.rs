// The QBF decision engine seam.  Queries are decided by an external solver
// process reading QDIMACS; `QbfEngine` lets tests plug in something else.

use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::cnf::QuantifiedCnf;
use crate::error::{CtlSatError, Result};
use crate::formula::Formula;
use crate::utils::Tickets;

pub const SOLVER_ENV_VAR: &str = "CTLSAT_SOLVER";
pub const DEFAULT_SOLVER: &str = "solver";

const EXIT_SAT: i32 = 10;
const EXIT_UNSAT: i32 = 20;

/// Shared flag that aborts the running satisfiability query.  Clones share
/// the flag, so one can be handed to a timer thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CtlSatError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    pub command: String,
    pub args: Vec<String>,
    pub poll_interval: Duration,
    // When set, every query is kept here as `query-<n>.qdimacs`.
    pub dump_dir: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            command: env::var(SOLVER_ENV_VAR).unwrap_or_else(|_| String::from(DEFAULT_SOLVER)),
            args: Vec::new(),
            poll_interval: Duration::from_millis(10),
            dump_dir: None,
        }
    }
}

impl SolverConfig {
    pub fn new(command: &str) -> SolverConfig {
        SolverConfig {
            command: String::from(command),
            ..SolverConfig::default()
        }
    }

    /// The configuration named by `CTLSAT_SOLVER`, if the variable is set.
    pub fn from_env() -> Option<SolverConfig> {
        env::var(SOLVER_ENV_VAR)
            .ok()
            .filter(|command| !command.is_empty())
            .map(|command| SolverConfig::new(&command))
    }
}

pub trait QbfEngine {
    /// Decides `cnf`: `Ok(true)` when the closed QBF is true.
    fn solve(&mut self, cnf: &QuantifiedCnf, cancel: &CancelToken) -> Result<bool>;

    /// Truth of the closed quantified formula `formula`, by way of prenex
    /// and clausal form.  Engines that decide formulas directly override it.
    fn decide(
        &mut self,
        formula: &Formula,
        tickets: &mut Tickets,
        cancel: &CancelToken,
    ) -> Result<bool> {
        let prenex = formula.to_nnf().to_pnf(tickets)?;
        let cnf = QuantifiedCnf::from_prenex(&prenex)?;
        self.solve(&cnf, cancel)
    }
}

/// Runs a QDIMACS solver as a child process per query.  The file path is the
/// last argument; exit status 10 means true and 20 means false.
#[derive(Debug)]
pub struct ExternalSolver {
    config: SolverConfig,
    queries: usize,
}

impl ExternalSolver {
    pub fn new(config: SolverConfig) -> ExternalSolver {
        ExternalSolver { config, queries: 0 }
    }

    fn write_query(&self, qdimacs: &str) -> Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("ctlsat-")
            .suffix(".qdimacs")
            .tempfile()?;
        file.write_all(qdimacs.as_bytes())?;
        file.flush()?;
        if let Some(dir) = &self.config.dump_dir {
            fs::create_dir_all(dir)?;
            fs::write(dir.join(format!("query-{}.qdimacs", self.queries)), qdimacs)?;
        }
        Ok(file)
    }
}

impl QbfEngine for ExternalSolver {
    fn solve(&mut self, cnf: &QuantifiedCnf, cancel: &CancelToken) -> Result<bool> {
        cancel.check()?;
        self.queries += 1;
        let file = self.write_query(&cnf.to_qdimacs())?;

        let command = &self.config.command;
        let mut child = Command::new(command)
            .args(&self.config.args)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| CtlSatError::SolverFault(format!("failed to start {command}: {err}")))?;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    stop(&mut child);
                    return Err(err.into());
                }
            }
            if cancel.is_cancelled() {
                stop(&mut child);
                debug!("query {} cancelled", self.queries);
                return Err(CtlSatError::Cancelled);
            }
            thread::sleep(self.config.poll_interval);
        };

        debug!("query {}: {command} exited with {status}", self.queries);
        match status.code() {
            Some(EXIT_SAT) => Ok(true),
            Some(EXIT_UNSAT) => Ok(false),
            Some(code) => Err(CtlSatError::SolverFault(format!(
                "{command} exited with status {code}"
            ))),
            None => Err(CtlSatError::SolverFault(format!(
                "{command} was terminated by a signal"
            ))),
        }
    }
}

fn stop(child: &mut Child) {
    // Kill and reap, so no solver outlives its query.
    let _ = child.kill();
    let _ = child.wait();
}

pub fn qbf_sat(
    formula: &Formula,
    engine: &mut dyn QbfEngine,
    tickets: &mut Tickets,
    cancel: &CancelToken,
) -> Result<bool> {
    engine.decide(formula, tickets, cancel)
}
