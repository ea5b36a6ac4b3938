// Errors shared by every stage of a satisfiability query.

use std::io;

use thiserror::Error;

use crate::formula::{BinaryOp, Operator};

#[derive(Error, Debug)]
pub enum CtlSatError {
    #[error("parse error: {0}")]
    Parse(String),

    // Structural faults.  These mean an invariant was broken upstream,
    // never that the user wrote a bad formula.
    #[error("expected a formula in negation normal form, found {0}")]
    NotInNnf(String),

    #[error("operator {0:?} is not supported here: {1}")]
    UnsupportedOperator(Operator, String),

    #[error("{0} is not in the elementary closure of the state")]
    NotInClosure(String),

    #[error("expected a quantifier-free propositional body, found {0}")]
    NotPropositional(String),

    #[error("variable {0} is free in a formula sent to the QBF encoder")]
    FreeVariable(String),

    #[error("invalid state prefix {0:?}: must be non-empty and must not contain '_'")]
    InvalidStatePrefix(String),

    #[error("cannot join terms with {0:?}")]
    UnsupportedJoin(BinaryOp),

    #[error("QBF solver fault: {0}")]
    SolverFault(String),

    #[error("query cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CtlSatError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CtlSatError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, CtlSatError>;
