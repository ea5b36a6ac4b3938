// Elementary closure of a CTL formula in negation normal form.
//
// A formula is elementary when it is an atom other than TRUE, or rooted at
// EX or AX.  The elementary closure of `f` holds the elementary formulas a
// tableau state has to decide in order to evaluate `f`, together with their
// negations.

use std::collections::BTreeSet;

use log::debug;

use crate::error::{CtlSatError, Result};
use crate::formula::{BinaryOp, Formula, UnaryOp};

impl Formula {
    pub fn elementary_formulas(&self) -> Result<BTreeSet<Formula>> {
        let mut closure = BTreeSet::new();
        self.collect_elementary(&mut closure)?;
        Ok(closure)
    }

    fn collect_elementary(&self, closure: &mut BTreeSet<Formula>) -> Result<()> {
        match self {
            Formula::Atom(_) if self.is_true() => {}
            Formula::Atom(_) => Formula::add_with_negation(self.clone(), closure),
            Formula::Unary(UnaryOp::Not, p) => match **p {
                Formula::Atom(_) => p.collect_elementary(closure)?,
                _ => return Err(CtlSatError::NotInNnf(self.to_string())),
            },
            Formula::Unary(UnaryOp::EX | UnaryOp::AX, p) => {
                Formula::add_with_negation(self.clone(), closure);
                p.collect_elementary(closure)?;
            }
            Formula::Binary(op, p, q) => {
                match op {
                    BinaryOp::And | BinaryOp::Or => {}
                    BinaryOp::EU | BinaryOp::ER => {
                        Formula::add_with_negation(Formula::ex(self.clone()), closure)
                    }
                    BinaryOp::AU | BinaryOp::AR => {
                        Formula::add_with_negation(Formula::ax(self.clone()), closure)
                    }
                    BinaryOp::Implies => {
                        return Err(CtlSatError::UnsupportedOperator(
                            (*op).into(),
                            format!("no elementary closure for {self}"),
                        ))
                    }
                }
                p.collect_elementary(closure)?;
                q.collect_elementary(closure)?;
            }
            Formula::Unary(op, _) => {
                return Err(CtlSatError::UnsupportedOperator(
                    (*op).into(),
                    format!("no elementary closure for {self}"),
                ))
            }
            Formula::Quantified(kind, _, _) => {
                return Err(CtlSatError::UnsupportedOperator(
                    (*kind).into(),
                    format!("quantifiers have no elementary closure: {self}"),
                ))
            }
        }
        Ok(())
    }

    fn add_with_negation(formula: Formula, closure: &mut BTreeSet<Formula>) {
        closure.insert(formula.nnf_negate());
        closure.insert(formula);
    }

    pub fn is_positive_elementary(&self) -> bool {
        matches!(self, Formula::Atom(_) | Formula::Unary(UnaryOp::EX, _)) && !self.is_true()
    }

    pub fn positive_elementary(&self) -> Result<BTreeSet<Formula>> {
        let positive: BTreeSet<Formula> = self
            .elementary_formulas()?
            .into_iter()
            .filter(Formula::is_positive_elementary)
            .collect();
        debug!(
            "{} positive elementary formulas for {self}: {}",
            positive.len(),
            itertools::join(&positive, ", ")
        );
        Ok(positive)
    }
}
