// A tableau state represented symbolically: one boolean variable per
// positive elementary formula.  An assignment to the variables picks out the
// elementary formulas true in the state, and `value_of` extends that to every
// formula of the closure through the CTL expansion laws.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CtlSatError, Result};
use crate::formula::{BinaryOp, Formula, Quantifier, UnaryOp};

#[derive(Debug, Clone)]
pub struct SymbolicState {
    // Variable names in index order, `<prefix>_0` first.
    names: Vec<String>,
    name_of: BTreeMap<Formula, String>,
    elementary_of: BTreeMap<String, Formula>,
}

impl SymbolicState {
    pub fn new(positive_elementary: &BTreeSet<Formula>, prefix: &str) -> Result<SymbolicState> {
        // The `_` separator must be unambiguous, or `a_1` of one state could
        // collide with the variables of a state with prefix `a_`.
        if prefix.is_empty() || prefix.contains('_') {
            return Err(CtlSatError::InvalidStatePrefix(prefix.to_owned()));
        }
        let mut names = Vec::with_capacity(positive_elementary.len());
        let mut name_of = BTreeMap::new();
        let mut elementary_of = BTreeMap::new();
        for (index, elementary) in positive_elementary.iter().enumerate() {
            let name = format!("{prefix}_{index}");
            names.push(name.clone());
            name_of.insert(elementary.clone(), name.clone());
            elementary_of.insert(name, elementary.clone());
        }
        Ok(SymbolicState {
            names,
            name_of,
            elementary_of,
        })
    }

    pub fn variable_names(&self) -> &[String] {
        &self.names
    }

    pub fn owns(&self, name: &str) -> bool {
        self.elementary_of.contains_key(name)
    }

    pub fn variable(&self, elementary: &Formula) -> Result<Formula> {
        // The atom standing for a positive elementary formula.
        self.name_of
            .get(elementary)
            .map(|name| Formula::atom(name))
            .ok_or_else(|| CtlSatError::NotInClosure(elementary.to_string()))
    }

    pub fn value_of(&self, formula: &Formula) -> Result<Formula> {
        // A propositional formula over this state's variables that is true
        // exactly when `formula` holds in the state.  `formula` must be in NNF
        // and within the closure the state was built from.
        match formula {
            Formula::Atom(_) if formula.is_true() => Ok(Formula::truth()),
            Formula::Atom(_) | Formula::Unary(UnaryOp::EX, _) => self.variable(formula),
            Formula::Unary(UnaryOp::AX, p) => {
                let ex = Formula::ex(p.nnf_negate());
                Ok(Formula::not(self.value_of(&ex)?))
            }
            Formula::Unary(UnaryOp::Not, p) => match **p {
                Formula::Atom(_) if p.is_true() => Ok(Formula::falsity()),
                Formula::Atom(_) => Ok(Formula::not(self.variable(p)?)),
                _ => Err(CtlSatError::NotInNnf(formula.to_string())),
            },
            Formula::Binary(op @ (BinaryOp::And | BinaryOp::Or), p, q) => Ok(Formula::binary(
                *op,
                self.value_of(p)?,
                self.value_of(q)?,
            )),
            Formula::Binary(BinaryOp::EU, p, q) => {
                // EU(p, q) = q | (p & EX(EU(p, q)))
                let next = self.value_of(&Formula::ex(formula.clone()))?;
                Ok(Formula::or(
                    self.value_of(q)?,
                    Formula::and(self.value_of(p)?, next),
                ))
            }
            Formula::Binary(BinaryOp::AU, p, q) => {
                // AU(p, q) = q | (p & ~EX(ER(~p, ~q)))
                let escape = Formula::er(p.nnf_negate(), q.nnf_negate());
                let next = self.value_of(&Formula::ex(escape))?;
                Ok(Formula::or(
                    self.value_of(q)?,
                    Formula::and(self.value_of(p)?, Formula::not(next)),
                ))
            }
            Formula::Binary(BinaryOp::ER, p, q) => {
                // ER(p, q) = q & (p | EX(ER(p, q)))
                let next = self.value_of(&Formula::ex(formula.clone()))?;
                Ok(Formula::and(
                    self.value_of(q)?,
                    Formula::or(self.value_of(p)?, next),
                ))
            }
            Formula::Binary(BinaryOp::AR, p, q) => {
                // AR(p, q) = q & (p | ~EX(EU(~p, ~q)))
                let escape = Formula::eu(p.nnf_negate(), q.nnf_negate());
                let next = self.value_of(&Formula::ex(escape))?;
                Ok(Formula::and(
                    self.value_of(q)?,
                    Formula::or(self.value_of(p)?, Formula::not(next)),
                ))
            }
            _ => Err(CtlSatError::UnsupportedOperator(
                formula.operator(),
                format!("cannot evaluate {formula} in a symbolic state"),
            )),
        }
    }

    pub fn substitute(
        formula: &Formula,
        from: &SymbolicState,
        to: &SymbolicState,
    ) -> Result<Formula> {
        // Rewrites `formula`, stated over the variables of `from`, to talk
        // about `to` instead.  Names `from` does not own pass through.
        let rename = |name: &String| -> Result<String> {
            match from.elementary_of.get(name) {
                Some(elementary) => to
                    .name_of
                    .get(elementary)
                    .cloned()
                    .ok_or_else(|| CtlSatError::NotInClosure(elementary.to_string())),
                None => Ok(name.clone()),
            }
        };
        SymbolicState::substitute_with(formula, &rename)
    }

    fn substitute_with(
        formula: &Formula,
        rename: &dyn Fn(&String) -> Result<String>,
    ) -> Result<Formula> {
        Ok(match formula {
            Formula::Atom(name) => Formula::Atom(rename(name)?),
            Formula::Unary(op, p) => Formula::unary(*op, SymbolicState::substitute_with(p, rename)?),
            Formula::Binary(op, p, q) => Formula::binary(
                *op,
                SymbolicState::substitute_with(p, rename)?,
                SymbolicState::substitute_with(q, rename)?,
            ),
            Formula::Quantified(kind, name, p) => Formula::Quantified(
                *kind,
                rename(name)?,
                Box::new(SymbolicState::substitute_with(p, rename)?),
            ),
        })
    }

    pub fn quantify(&self, kind: Quantifier, formula: Formula) -> Formula {
        // One binder per variable, `<prefix>_0` outermost.
        self.names
            .iter()
            .rev()
            .fold(formula, |body, name| Formula::quantified(kind, name, body))
    }
}

#[cfg(test)]
mod symbolic_state_tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn parse(input: &str) -> Formula {
        Formula::parse(input).unwrap()
    }

    fn normalized(input: &str) -> Formula {
        parse(input).eliminate_derived_operators().to_nnf()
    }

    fn state_for(input: &str, prefix: &str) -> SymbolicState {
        let positive = normalized(input).positive_elementary().unwrap();
        SymbolicState::new(&positive, prefix).unwrap()
    }

    #[test]
    fn test_prefix_validation() {
        let positive = BTreeSet::from([parse("p")]);
        assert!(matches!(
            SymbolicState::new(&positive, ""),
            Err(CtlSatError::InvalidStatePrefix(_))
        ));
        assert!(matches!(
            SymbolicState::new(&positive, "v_1"),
            Err(CtlSatError::InvalidStatePrefix(_))
        ));
        assert!(SymbolicState::new(&positive, "succ1").is_ok());
    }

    #[test]
    fn test_variable_naming() {
        // Positive set in order: p, q.
        let state = state_for("p & q", "v");
        assert_eq!(state.variable_names(), &["v_0".to_string(), "v_1".to_string()]);
        assert_eq!(state.variable(&parse("q")).unwrap(), parse("v_1"));
        assert!(state.owns("v_0"));
        assert!(!state.owns("v0"));
        assert!(matches!(
            state.variable(&parse("r")),
            Err(CtlSatError::NotInClosure(_))
        ));
    }

    #[test]
    fn test_value_of_literals() {
        init();
        let state = state_for("p & ~q", "v");
        assert_eq!(state.value_of(&parse("TRUE")).unwrap(), Formula::truth());
        assert_eq!(state.value_of(&parse("~TRUE")).unwrap(), Formula::falsity());
        assert_eq!(state.value_of(&parse("p & ~q")).unwrap(), parse("v_0 & ~v_1"));
    }

    #[test]
    fn test_value_of_next() {
        // Positive set in order: p, EX(p).
        let state = state_for("EX(p) & AX(~p)", "v");
        assert_eq!(state.value_of(&parse("EX(p)")).unwrap(), parse("v_1"));
        assert_eq!(state.value_of(&parse("AX(~p)")).unwrap(), parse("~v_1"));
    }

    #[test]
    fn test_value_of_until() {
        // Positive set in order: p, q, EX(EU(p, q)).
        let state = state_for("EU(p, q)", "v");
        assert_eq!(
            state.value_of(&parse("EU(p, q)")).unwrap(),
            parse("v_1 | v_0 & v_2")
        );
        // The AR dual refers to the same EX variable.
        assert_eq!(
            state.value_of(&parse("AR(~p, ~q)")).unwrap(),
            parse("~v_1 & (~v_0 | ~v_2)")
        );
    }

    #[test]
    fn test_value_of_universal_until() {
        // Positive set in order: p, q, EX(ER(~p, ~q)).
        let state = state_for("AU(p, q)", "v");
        assert_eq!(
            state.value_of(&parse("AU(p, q)")).unwrap(),
            parse("v_1 | v_0 & ~v_2")
        );
        assert_eq!(
            state.value_of(&parse("ER(~p, ~q)")).unwrap(),
            parse("~v_1 & (~v_0 | v_2)")
        );
    }

    #[test]
    fn test_value_of_faults() {
        let state = state_for("p", "v");
        assert!(matches!(
            state.value_of(&parse("EX(p)")),
            Err(CtlSatError::NotInClosure(_))
        ));
        assert!(matches!(
            state.value_of(&parse("~(p & p)")),
            Err(CtlSatError::NotInNnf(_))
        ));
        assert!(matches!(
            state.value_of(&parse("E(x, p)")),
            Err(CtlSatError::UnsupportedOperator(_, _))
        ));
    }

    #[test]
    fn test_substitute_matches_encoding() {
        let input = "AU(p, EX(q)) & ER(~p, q)";
        let formula = normalized(input);
        let a = state_for(input, "a");
        let b = state_for(input, "b");
        let under_a = a.value_of(&formula).unwrap();
        let under_b = b.value_of(&formula).unwrap();
        assert_eq!(SymbolicState::substitute(&under_a, &a, &b).unwrap(), under_b);
    }

    #[test]
    fn test_substitute_binders_and_foreign_names() {
        let a = state_for("p & q", "a");
        let b = state_for("p & q", "b");
        let formula = parse("E(a_0, a_0 & x) | A(y, a_1 | y)");
        let desired = parse("E(b_0, b_0 & x) | A(y, b_1 | y)");
        assert_eq!(SymbolicState::substitute(&formula, &a, &b).unwrap(), desired);
    }

    #[test]
    fn test_quantify() {
        let state = state_for("p & q", "v");
        let result = state.quantify(Quantifier::Exists, parse("v_0 & ~v_1"));
        assert_eq!(result, parse("E(v_0, E(v_1, v_0 & ~v_1))"));
    }
}
