// Quantified CNF: definitional (Tseytin) CNF of a prenex formula, with every
// variable renamed to a positive integer, and its QDIMACS rendering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use itertools::Itertools;
use log::{debug, trace};

use crate::error::{CtlSatError, Result};
use crate::formula::{BinaryOp, Formula, Quantifier, UnaryOp};

pub type Clause = BTreeSet<i32>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantifiedCnf {
    pub prefix: Vec<(Quantifier, u32)>,
    pub clauses: BTreeSet<Clause>,
    pub num_vars: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Symbol {
    Bound(String),
    True,
    Label(usize),
}

// A symbol and its polarity.
type Literal = (Symbol, bool);

fn negate(literal: &Literal) -> Literal {
    (literal.0.clone(), !literal.1)
}

// Operations whose output gets a label.  The operands are already literals,
// so structurally identical sub-terms map to the same gate.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Gate {
    Not(Literal),
    And(Literal, Literal),
    Or(Literal, Literal),
}

#[derive(Default)]
struct Definitions {
    defs: BTreeMap<Gate, usize>,
    clauses: Vec<Vec<Literal>>,
    uses_true: bool,
}

impl Definitions {
    fn literal(&mut self, formula: &Formula) -> Result<Literal> {
        // The literal standing for `formula`, defining labels for its internal
        // nodes as we go.
        match formula {
            Formula::Atom(_) if formula.is_true() => {
                self.uses_true = true;
                Ok((Symbol::True, true))
            }
            Formula::Atom(name) => Ok((Symbol::Bound(name.clone()), true)),
            Formula::Unary(UnaryOp::Not, p) => {
                let a = self.literal(p)?;
                Ok(self.define(Gate::Not(a)))
            }
            Formula::Binary(BinaryOp::And, p, q) => {
                let a = self.literal(p)?;
                let b = self.literal(q)?;
                Ok(self.define(Gate::And(a, b)))
            }
            Formula::Binary(BinaryOp::Or, p, q) => {
                let a = self.literal(p)?;
                let b = self.literal(q)?;
                Ok(self.define(Gate::Or(a, b)))
            }
            _ => Err(CtlSatError::NotPropositional(formula.to_string())),
        }
    }

    fn define(&mut self, gate: Gate) -> Literal {
        if let Some(label) = self.defs.get(&gate) {
            return (Symbol::Label(*label), true);
        }
        let label = self.defs.len();
        let x = (Symbol::Label(label), true);
        let not_x = (Symbol::Label(label), false);
        match &gate {
            // x <-> ~a
            Gate::Not(a) => {
                self.clauses.push(vec![not_x, negate(a)]);
                self.clauses.push(vec![x.clone(), a.clone()]);
            }
            // x <-> a & b
            Gate::And(a, b) => {
                self.clauses.push(vec![not_x.clone(), a.clone()]);
                self.clauses.push(vec![not_x, b.clone()]);
                self.clauses.push(vec![x.clone(), negate(a), negate(b)]);
            }
            // x <-> a | b
            Gate::Or(a, b) => {
                self.clauses.push(vec![not_x, a.clone(), b.clone()]);
                self.clauses.push(vec![x.clone(), negate(a)]);
                self.clauses.push(vec![x.clone(), negate(b)]);
            }
        }
        self.defs.insert(gate, label);
        x
    }
}

impl QuantifiedCnf {
    pub fn from_prenex(formula: &Formula) -> Result<QuantifiedCnf> {
        let (raw_prefix, body) = formula.strip_quantifiers();

        // A name bound more than once keeps its innermost binder only.
        let mut seen = BTreeSet::new();
        let mut prefix: Vec<(Quantifier, String)> = raw_prefix
            .into_iter()
            .rev()
            .filter(|(_, name)| seen.insert(name.clone()))
            .collect();
        prefix.reverse();

        let mut definitions = Definitions::default();
        let root = definitions.literal(body)?;
        let mut symbolic_clauses = definitions.clauses;
        symbolic_clauses.push(vec![root]);
        if definitions.uses_true {
            symbolic_clauses.push(vec![(Symbol::True, true)]);
        }

        let used: BTreeSet<&String> = symbolic_clauses
            .iter()
            .flatten()
            .filter_map(|(symbol, _)| match symbol {
                Symbol::Bound(name) => Some(name),
                _ => None,
            })
            .collect();
        let bound: BTreeSet<&String> = prefix.iter().map(|(_, name)| name).collect();
        if let Some(free) = used.difference(&bound).next() {
            return Err(CtlSatError::FreeVariable((*free).clone()));
        }

        // Bound variables in prefix order, then TRUE, then the labels.
        let mut ids: BTreeMap<Symbol, u32> = BTreeMap::new();
        let mut qprefix = Vec::new();
        for (kind, name) in &prefix {
            if used.contains(name) {
                let id = ids.len() as u32 + 1;
                ids.insert(Symbol::Bound(name.clone()), id);
                qprefix.push((*kind, id));
            }
        }
        let mut innermost = Vec::new();
        if definitions.uses_true {
            innermost.push(Symbol::True);
        }
        innermost.extend((0..definitions.defs.len()).map(Symbol::Label));
        for symbol in innermost {
            let id = ids.len() as u32 + 1;
            ids.insert(symbol, id);
            qprefix.push((Quantifier::Exists, id));
        }

        let clauses: BTreeSet<Clause> = symbolic_clauses
            .iter()
            .map(|clause| {
                clause
                    .iter()
                    .map(|(symbol, positive)| {
                        let id = ids.get(symbol).copied().unwrap_or_default() as i32;
                        if *positive {
                            id
                        } else {
                            -id
                        }
                    })
                    .collect()
            })
            .collect();

        let cnf = QuantifiedCnf {
            prefix: qprefix,
            clauses,
            num_vars: ids.len() as u32,
        };
        debug!(
            "quantified CNF of a formula of size {}: {} variables, {} clauses",
            formula.size(),
            cnf.num_vars,
            cnf.clauses.len()
        );
        Ok(cnf)
    }

    pub fn to_qdimacs(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "p cnf {} {}", self.num_vars, self.clauses.len());
        for (kind, block) in &self.prefix.iter().group_by(|(kind, _)| *kind) {
            let letter = match kind {
                Quantifier::Exists => 'e',
                Quantifier::All => 'a',
            };
            let _ = writeln!(out, "{letter} {} 0", block.map(|(_, id)| id).join(" "));
        }
        for clause in &self.clauses {
            let _ = writeln!(out, "{} 0", clause.iter().join(" "));
        }
        trace!("QDIMACS:\n{out}");
        out
    }
}

#[cfg(test)]
impl QuantifiedCnf {
    /// Decides the QBF by expansion over the prefix, with unit propagation.
    /// Exponential, so only for small test queries.
    pub(crate) fn evaluate(&self) -> bool {
        let clauses: Vec<Vec<i32>> = self
            .clauses
            .iter()
            .map(|clause| clause.iter().copied().collect())
            .collect();
        let kinds: BTreeMap<u32, Quantifier> = self.prefix.iter().map(|(k, v)| (*v, *k)).collect();
        let mut assignment = vec![None; self.num_vars as usize + 1];
        QuantifiedCnf::expand(&clauses, &self.prefix, &kinds, &mut assignment)
    }

    fn expand(
        clauses: &[Vec<i32>],
        prefix: &[(Quantifier, u32)],
        kinds: &BTreeMap<u32, Quantifier>,
        assignment: &mut Vec<Option<bool>>,
    ) -> bool {
        let mut forced = Vec::new();
        let result = loop {
            let mut unit = None;
            let mut all_satisfied = true;
            let mut conflict = false;
            for clause in clauses {
                let mut open = Vec::new();
                let mut satisfied = false;
                for &lit in clause {
                    match assignment[lit.unsigned_abs() as usize] {
                        Some(value) if value == (lit > 0) => {
                            satisfied = true;
                            break;
                        }
                        Some(_) => {}
                        None => open.push(lit),
                    }
                }
                if satisfied {
                    continue;
                }
                all_satisfied = false;
                // Universal literals can be set false by the opponent.
                let existential: Vec<i32> = open
                    .iter()
                    .copied()
                    .filter(|lit| kinds.get(&lit.unsigned_abs()) != Some(&Quantifier::All))
                    .collect();
                match existential.as_slice() {
                    [] => {
                        conflict = true;
                        break;
                    }
                    [lit] if open.len() == 1 && unit.is_none() => unit = Some(*lit),
                    _ => {}
                }
            }
            if conflict {
                break false;
            }
            if all_satisfied {
                break true;
            }
            match unit {
                Some(lit) => {
                    assignment[lit.unsigned_abs() as usize] = Some(lit > 0);
                    forced.push(lit.unsigned_abs() as usize);
                }
                None => {
                    let next = prefix
                        .iter()
                        .position(|(_, var)| assignment[*var as usize].is_none());
                    let Some(index) = next else {
                        break false;
                    };
                    let (kind, var) = prefix[index];
                    let branch = |value: bool, assignment: &mut Vec<Option<bool>>| {
                        assignment[var as usize] = Some(value);
                        let result =
                            QuantifiedCnf::expand(clauses, &prefix[index + 1..], kinds, assignment);
                        assignment[var as usize] = None;
                        result
                    };
                    break match kind {
                        Quantifier::Exists => branch(true, assignment) || branch(false, assignment),
                        Quantifier::All => branch(true, assignment) && branch(false, assignment),
                    };
                }
            }
        };
        for var in forced {
            assignment[var] = None;
        }
        result
    }
}
