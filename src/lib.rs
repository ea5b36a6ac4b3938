//! Satisfiability of CTL formulas, decided by a symbolic tableau whose
//! fixpoint computations are discharged as quantified boolean queries.

#[cfg(test)]
mod bdd;
pub mod checker;
pub mod closure;
pub mod cnf;
pub mod error;
pub mod formula;
pub mod normal_form;
mod parse;
pub mod qbf;
pub mod symbolic_state;
mod token;
pub mod utils;

pub use checker::{CheckReport, CtlSatChecker};
pub use cnf::QuantifiedCnf;
pub use error::{CtlSatError, Result};
pub use formula::Formula;
pub use qbf::{CancelToken, ExternalSolver, QbfEngine, SolverConfig};
pub use utils::Tickets;
