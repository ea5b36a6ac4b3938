// Satisfiability of CTL formulas by symbolic tableau refinement.
//
// The candidate states start as every assignment to the positive elementary
// variables.  Each round removes states that have no successor, that promise
// an EX formula no successor fulfils, or that promise an eventuality no
// finite fragment of the remaining states can fulfil.  Once a round removes
// nothing, the formula is satisfiable iff some remaining state satisfies it.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::error::Result;
use crate::formula::{BinaryOp, Formula, Quantifier, UnaryOp};
use crate::qbf::{qbf_sat, CancelToken, QbfEngine};
use crate::symbolic_state::SymbolicState;
use crate::utils::Tickets;

const STATE_PREFIX: &str = "v";
const SUCCESSOR_PREFIX: &str = "succ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub satisfiable: bool,
    // Outer refinement rounds, including the one that found the fixpoint.
    pub iterations: usize,
    pub queries: usize,
    pub elapsed: Duration,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.satisfiable { "SAT" } else { "UNSAT" };
        write!(
            f,
            "{verdict} (iterations: {}, queries: {}, time: {:.3}s)",
            self.iterations,
            self.queries,
            self.elapsed.as_secs_f64()
        )
    }
}

pub struct CtlSatChecker<E: QbfEngine> {
    normalized: Formula,
    elementary: BTreeSet<Formula>,
    engine: E,
    cancel: CancelToken,
    tickets: Tickets,
    queries: usize,
}

impl<E: QbfEngine> CtlSatChecker<E> {
    pub fn new(formula: &Formula, engine: E) -> Result<CtlSatChecker<E>> {
        let normalized = formula.eliminate_derived_operators().to_nnf();
        let elementary = normalized.positive_elementary()?;
        debug!("normalized {formula} to {normalized}");
        Ok(CtlSatChecker {
            normalized,
            elementary,
            engine,
            cancel: CancelToken::new(),
            tickets: Tickets::new(),
            queries: 0,
        })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> CtlSatChecker<E> {
        self.cancel = cancel;
        self
    }

    pub fn normalized(&self) -> &Formula {
        &self.normalized
    }

    pub fn positive_elementary(&self) -> &BTreeSet<Formula> {
        &self.elementary
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn check(&mut self) -> Result<CheckReport> {
        self.tickets.reset();
        self.queries = 0;
        let start = Instant::now();
        let v = SymbolicState::new(&self.elementary, STATE_PREFIX)?;

        let mut states = Formula::truth();
        let mut iterations = 0;
        loop {
            self.cancel.check()?;
            iterations += 1;
            info!(
                "iteration {iterations}: state set formula of size {}",
                states.size()
            );
            let succ = self.successor_exists(&states, &v)?;
            let lc1 = self.next_promises(&states, &v)?;
            let e = self.existential_eventualities(&states, &v)?;
            let a = self.universal_eventualities(&states, &v)?;
            let refined =
                Formula::join_terms(BinaryOp::And, vec![states.clone(), succ, lc1, e, a])?;
            let fixpoint = self.is_fixpoint(&states, &refined, &v)?;
            states = refined;
            if fixpoint {
                break;
            }
        }

        info!("reached a fixpoint after {iterations} iterations, checking for a satisfying state");
        let value = v.value_of(&self.normalized)?;
        let query = v.quantify(Quantifier::Exists, Formula::and(states, value));
        let satisfiable = self.query(&query)?;
        let report = CheckReport {
            satisfiable,
            iterations,
            queries: self.queries,
            elapsed: start.elapsed(),
        };
        info!("{}: {report}", self.normalized);
        Ok(report)
    }

    fn query(&mut self, formula: &Formula) -> Result<bool> {
        self.cancel.check()?;
        self.queries += 1;
        debug!("query {} of size {}", self.queries, formula.size());
        qbf_sat(formula, &mut self.engine, &mut self.tickets, &self.cancel)
    }

    fn is_fixpoint(&mut self, old: &Formula, new: &Formula, v: &SymbolicState) -> Result<bool> {
        // No state of `old` was removed.
        let removed = Formula::and(old.clone(), Formula::not(new.clone()));
        Ok(!self.query(&v.quantify(Quantifier::Exists, removed))?)
    }

    fn fresh_state(&mut self) -> Result<SymbolicState> {
        let prefix = format!("{SUCCESSOR_PREFIX}{}", self.tickets.take());
        SymbolicState::new(&self.elementary, &prefix)
    }

    fn next_formulas(&self) -> impl Iterator<Item = &Formula> {
        self.elementary
            .iter()
            .filter(|formula| matches!(formula, Formula::Unary(UnaryOp::EX, _)))
    }

    pub fn transition(&self, from: &SymbolicState, to: &SymbolicState) -> Result<Formula> {
        // `to` is a possible successor of `from`: it satisfies no `g` for which
        // `from` denies EX(g).
        let mut terms = Vec::new();
        for ex in self.next_formulas() {
            if let Formula::Unary(_, g) = ex {
                terms.push(Formula::or(
                    from.value_of(ex)?,
                    Formula::not(to.value_of(g)?),
                ));
            }
        }
        Formula::join_terms(BinaryOp::And, terms)
    }

    fn successor_in(
        &mut self,
        states: &Formula,
        v: &SymbolicState,
        extra: impl FnOnce(&SymbolicState) -> Result<Vec<Formula>>,
    ) -> Result<Formula> {
        // EXISTS t. R(v, t) & states(t) & extra(t), over a fresh state t.
        let next = self.fresh_state()?;
        let mut terms = vec![
            self.transition(v, &next)?,
            SymbolicState::substitute(states, v, &next)?,
        ];
        terms.extend(extra(&next)?);
        let body = Formula::join_terms(BinaryOp::And, terms)?;
        Ok(next.quantify(Quantifier::Exists, body))
    }

    fn successor_exists(&mut self, states: &Formula, v: &SymbolicState) -> Result<Formula> {
        self.successor_in(states, v, |_| Ok(Vec::new()))
    }

    fn next_promises(&mut self, states: &Formula, v: &SymbolicState) -> Result<Formula> {
        // Every promised EX(g) has a successor among `states` satisfying g.
        let promises: Vec<Formula> = self.next_formulas().cloned().collect();
        let mut terms = Vec::new();
        for ex in promises {
            let Formula::Unary(_, g) = &ex else {
                continue;
            };
            let fulfilled = self.successor_in(states, v, |next| Ok(vec![next.value_of(g)?]))?;
            terms.push(Formula::or(Formula::not(v.value_of(&ex)?), fulfilled));
        }
        Formula::join_terms(BinaryOp::And, terms)
    }

    fn existential_eventualities(
        &mut self,
        states: &Formula,
        v: &SymbolicState,
    ) -> Result<Formula> {
        // Every promised EU(p, q) is fulfilled along some path of `states`.
        let promises: Vec<Formula> = self
            .next_formulas()
            .filter(|ex| matches!(ex.left(), Some(Formula::Binary(BinaryOp::EU, _, _))))
            .cloned()
            .collect();
        let mut terms = Vec::new();
        for ex in promises {
            let Some(Formula::Binary(_, p, q)) = ex.left() else {
                continue;
            };
            let fragment = self.eu_fragment(states, v, p, q)?;
            terms.push(Formula::join_terms(
                BinaryOp::Or,
                vec![
                    Formula::not(v.value_of(&ex)?),
                    Formula::not(v.value_of(p)?),
                    fragment,
                ],
            )?);
        }
        Formula::join_terms(BinaryOp::And, terms)
    }

    fn eu_fragment(
        &mut self,
        states: &Formula,
        v: &SymbolicState,
        p: &Formula,
        q: &Formula,
    ) -> Result<Formula> {
        // Least fixpoint of F(s) = q(s) | (p(s) & EXISTS t. R(s, t) & states(t) & F(t)).
        let mut fragment = Formula::falsity();
        let mut rounds = 0;
        loop {
            rounds += 1;
            let previous = fragment.clone();
            let step = self.successor_in(states, v, |next| {
                Ok(vec![SymbolicState::substitute(&previous, v, next)?])
            })?;
            let next = Formula::or(v.value_of(q)?, Formula::and(v.value_of(p)?, step));
            if !self.grows(&fragment, &next, v)? {
                debug!("EU({p}, {q}) fragment converged after {rounds} rounds");
                return Ok(fragment);
            }
            fragment = next;
        }
    }

    fn universal_eventualities(
        &mut self,
        states: &Formula,
        v: &SymbolicState,
    ) -> Result<Formula> {
        // A state denying EX(ER(p, q)) promises AU(~p, ~q), which must be
        // fulfilled on every path of `states`.
        let escapes: Vec<Formula> = self
            .next_formulas()
            .filter(|ex| matches!(ex.left(), Some(Formula::Binary(BinaryOp::ER, _, _))))
            .cloned()
            .collect();
        let mut terms = Vec::new();
        for ex in escapes {
            let Some(Formula::Binary(_, p, q)) = ex.left() else {
                continue;
            };
            let fragment = self.au_fragment(states, v, &p.nnf_negate(), &q.nnf_negate())?;
            terms.push(Formula::join_terms(
                BinaryOp::Or,
                vec![v.value_of(&ex)?, v.value_of(p)?, fragment],
            )?);
        }
        Formula::join_terms(BinaryOp::And, terms)
    }

    fn au_fragment(
        &mut self,
        states: &Formula,
        v: &SymbolicState,
        p: &Formula,
        q: &Formula,
    ) -> Result<Formula> {
        // Least fixpoint of F(s) = q(s) | (p(s) & EXISTS t. R & states(t) & F(t)
        //                          & AND_{EX(g)} (~EX(g)(s) | EXISTS t. R & states(t) & F(t) & g(t))).
        let promises: Vec<Formula> = self.next_formulas().cloned().collect();
        let mut fragment = Formula::falsity();
        let mut rounds = 0;
        loop {
            rounds += 1;
            let previous = fragment.clone();
            let in_fragment = |next: &SymbolicState| -> Result<Vec<Formula>> {
                Ok(vec![SymbolicState::substitute(&previous, v, next)?])
            };
            let mut conjuncts = vec![v.value_of(p)?, self.successor_in(states, v, in_fragment)?];
            for ex in &promises {
                let Formula::Unary(_, g) = ex else {
                    continue;
                };
                let fulfilled = self.successor_in(states, v, |next| {
                    Ok(vec![
                        SymbolicState::substitute(&previous, v, next)?,
                        next.value_of(g)?,
                    ])
                })?;
                conjuncts.push(Formula::or(Formula::not(v.value_of(ex)?), fulfilled));
            }
            let next = Formula::or(
                v.value_of(q)?,
                Formula::join_terms(BinaryOp::And, conjuncts)?,
            );
            if !self.grows(&fragment, &next, v)? {
                debug!("AU({p}, {q}) fragment converged after {rounds} rounds");
                return Ok(fragment);
            }
            fragment = next;
        }
    }

    fn grows(&mut self, previous: &Formula, next: &Formula, v: &SymbolicState) -> Result<bool> {
        // Some state is in `next` but not in `previous`.
        let added = Formula::and(next.clone(), Formula::not(previous.clone()));
        self.query(&v.quantify(Quantifier::Exists, added))
    }
}
