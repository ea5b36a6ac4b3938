// Formula AST for CTL formulas and the quantified boolean formulas built
// from them, together with builders, printing and variable utilities.
// Normal forms live in `normal_form`, the closure in `closure`.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{CtlSatError, Result};

/// Name of the reserved constant atom.  FALSE is written `~TRUE`.
pub const TRUE_LITERAL: &str = "TRUE";

//### Operators ###

/// The flat operator tag of a node, one per connective.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum Operator {
    Exists,
    All,
    And,
    Or,
    Not,
    Implies,
    EF,
    AF,
    EG,
    AG,
    EX,
    AX,
    EU,
    AU,
    ER,
    AR,
    Var,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum UnaryOp {
    Not,
    EX,
    AX,
    EF,
    AF,
    EG,
    AG,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum BinaryOp {
    And,
    Or,
    Implies,
    EU,
    AU,
    ER,
    AR,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum Quantifier {
    Exists,
    All,
}

impl From<UnaryOp> for Operator {
    fn from(op: UnaryOp) -> Operator {
        match op {
            UnaryOp::Not => Operator::Not,
            UnaryOp::EX => Operator::EX,
            UnaryOp::AX => Operator::AX,
            UnaryOp::EF => Operator::EF,
            UnaryOp::AF => Operator::AF,
            UnaryOp::EG => Operator::EG,
            UnaryOp::AG => Operator::AG,
        }
    }
}

impl From<BinaryOp> for Operator {
    fn from(op: BinaryOp) -> Operator {
        match op {
            BinaryOp::And => Operator::And,
            BinaryOp::Or => Operator::Or,
            BinaryOp::Implies => Operator::Implies,
            BinaryOp::EU => Operator::EU,
            BinaryOp::AU => Operator::AU,
            BinaryOp::ER => Operator::ER,
            BinaryOp::AR => Operator::AR,
        }
    }
}

impl From<Quantifier> for Operator {
    fn from(kind: Quantifier) -> Operator {
        match kind {
            Quantifier::Exists => Operator::Exists,
            Quantifier::All => Operator::All,
        }
    }
}

impl Quantifier {
    pub fn dual(self) -> Quantifier {
        match self {
            Quantifier::Exists => Quantifier::All,
            Quantifier::All => Quantifier::Exists,
        }
    }
}

//### Formula AST ###

/// A CTL / QBF formula.  Equality, ordering and hashing are structural, so
/// formulas can be used directly as set and map keys.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub enum Formula {
    Atom(String),
    Unary(UnaryOp, Box<Formula>),
    Binary(BinaryOp, Box<Formula>, Box<Formula>),
    Quantified(Quantifier, String, Box<Formula>),
}

// General Builders and utilities.
impl Formula {
    pub fn atom(name: &str) -> Formula {
        Formula::Atom(String::from(name))
    }

    pub fn truth() -> Formula {
        Formula::atom(TRUE_LITERAL)
    }

    pub fn falsity() -> Formula {
        Formula::not(Formula::truth())
    }

    pub fn unary(op: UnaryOp, formula: Formula) -> Formula {
        Formula::Unary(op, Box::new(formula))
    }

    pub fn binary(op: BinaryOp, formula1: Formula, formula2: Formula) -> Formula {
        Formula::Binary(op, Box::new(formula1), Box::new(formula2))
    }

    pub fn quantified(kind: Quantifier, var: &str, formula: Formula) -> Formula {
        Formula::Quantified(kind, String::from(var), Box::new(formula))
    }

    pub fn not(formula: Formula) -> Formula {
        Formula::unary(UnaryOp::Not, formula)
    }

    pub fn and(formula1: Formula, formula2: Formula) -> Formula {
        Formula::binary(BinaryOp::And, formula1, formula2)
    }

    pub fn or(formula1: Formula, formula2: Formula) -> Formula {
        Formula::binary(BinaryOp::Or, formula1, formula2)
    }

    pub fn imp(formula1: Formula, formula2: Formula) -> Formula {
        Formula::binary(BinaryOp::Implies, formula1, formula2)
    }

    pub fn ex(formula: Formula) -> Formula {
        Formula::unary(UnaryOp::EX, formula)
    }

    pub fn ax(formula: Formula) -> Formula {
        Formula::unary(UnaryOp::AX, formula)
    }

    pub fn ef(formula: Formula) -> Formula {
        Formula::unary(UnaryOp::EF, formula)
    }

    pub fn af(formula: Formula) -> Formula {
        Formula::unary(UnaryOp::AF, formula)
    }

    pub fn eg(formula: Formula) -> Formula {
        Formula::unary(UnaryOp::EG, formula)
    }

    pub fn ag(formula: Formula) -> Formula {
        Formula::unary(UnaryOp::AG, formula)
    }

    pub fn eu(formula1: Formula, formula2: Formula) -> Formula {
        Formula::binary(BinaryOp::EU, formula1, formula2)
    }

    pub fn au(formula1: Formula, formula2: Formula) -> Formula {
        Formula::binary(BinaryOp::AU, formula1, formula2)
    }

    pub fn er(formula1: Formula, formula2: Formula) -> Formula {
        Formula::binary(BinaryOp::ER, formula1, formula2)
    }

    pub fn ar(formula1: Formula, formula2: Formula) -> Formula {
        Formula::binary(BinaryOp::AR, formula1, formula2)
    }

    pub fn exists(var: &str, formula: Formula) -> Formula {
        Formula::quantified(Quantifier::Exists, var, formula)
    }

    pub fn forall(var: &str, formula: Formula) -> Formula {
        Formula::quantified(Quantifier::All, var, formula)
    }

    pub fn operator(&self) -> Operator {
        match self {
            Formula::Atom(_) => Operator::Var,
            Formula::Unary(op, _) => Operator::from(*op),
            Formula::Binary(op, _, _) => Operator::from(*op),
            Formula::Quantified(kind, _, _) => Operator::from(*kind),
        }
    }

    pub fn name(&self) -> Option<&str> {
        // The atom's identifier, or the variable bound by a quantifier.
        match self {
            Formula::Atom(name) | Formula::Quantified(_, name, _) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn left(&self) -> Option<&Formula> {
        match self {
            Formula::Atom(_) => None,
            Formula::Unary(_, p) | Formula::Quantified(_, _, p) => Some(&**p),
            Formula::Binary(_, p, _) => Some(&**p),
        }
    }

    pub fn right(&self) -> Option<&Formula> {
        match self {
            Formula::Binary(_, _, q) => Some(&**q),
            _ => None,
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Formula::Atom(name) if name == TRUE_LITERAL)
    }

    pub fn negative(&self) -> bool {
        matches!(self, Formula::Unary(UnaryOp::Not, _))
    }

    pub fn size(&self) -> usize {
        // Number of nodes in the tree.
        match self {
            Formula::Atom(_) => 1,
            Formula::Unary(_, p) | Formula::Quantified(_, _, p) => 1 + p.size(),
            Formula::Binary(_, p, q) => 1 + p.size() + q.size(),
        }
    }

    pub fn join_terms(op: BinaryOp, terms: Vec<Formula>) -> Result<Formula> {
        // Left fold of `terms` under `op`.  The empty conjunction is TRUE and
        // the empty disjunction is ~TRUE.
        if !matches!(op, BinaryOp::And | BinaryOp::Or) {
            return Err(CtlSatError::UnsupportedJoin(op));
        }
        let folded = terms
            .into_iter()
            .reduce(|acc, term| Formula::binary(op, acc, term));
        Ok(match (folded, op) {
            (Some(formula), _) => formula,
            (None, BinaryOp::And) => Formula::truth(),
            (None, _) => Formula::falsity(),
        })
    }
}


// ### Variables and substitution ###

impl Formula {
    pub fn variables(&self) -> BTreeSet<String> {
        // Every name occurring in `self`, free or bound.
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<String>) {
        match self {
            Formula::Atom(name) => {
                vars.insert(name.clone());
            }
            Formula::Unary(_, p) => p.collect_variables(vars),
            Formula::Binary(_, p, q) => {
                p.collect_variables(vars);
                q.collect_variables(vars);
            }
            Formula::Quantified(_, name, p) => {
                vars.insert(name.clone());
                p.collect_variables(vars);
            }
        }
    }

    pub fn free_variables(&self) -> BTreeSet<String> {
        match self {
            Formula::Atom(name) => BTreeSet::from([name.clone()]),
            Formula::Unary(_, p) => p.free_variables(),
            Formula::Binary(_, p, q) => &p.free_variables() | &q.free_variables(),
            Formula::Quantified(_, name, p) => {
                let mut vars = p.free_variables();
                vars.remove(name);
                vars
            }
        }
    }

    pub fn mentions(&self, var: &str) -> bool {
        // Whether `var` occurs anywhere in `self`, free or bound.
        match self {
            Formula::Atom(name) => name == var,
            Formula::Unary(_, p) => p.mentions(var),
            Formula::Binary(_, p, q) => p.mentions(var) || q.mentions(var),
            Formula::Quantified(_, name, p) => name == var || p.mentions(var),
        }
    }

    pub fn substitute(&self, old: &str, new: &str) -> Formula {
        // Rename every occurrence of `old`, atoms and binders alike.  With a
        // fresh `new` this is an alpha-renaming.
        match self {
            Formula::Atom(name) if name == old => Formula::atom(new),
            Formula::Atom(_) => self.clone(),
            Formula::Unary(op, p) => Formula::unary(*op, p.substitute(old, new)),
            Formula::Binary(op, p, q) => {
                Formula::binary(*op, p.substitute(old, new), q.substitute(old, new))
            }
            Formula::Quantified(kind, name, p) => {
                let binder = if name == old { new } else { name.as_str() };
                Formula::quantified(*kind, binder, p.substitute(old, new))
            }
        }
    }

    pub fn strip_quantifiers(&self) -> (Vec<(Quantifier, String)>, &Formula) {
        // Split off the leading quantifier prefix, outermost first.
        let mut prefix = Vec::new();
        let mut body = self;
        while let Formula::Quantified(kind, name, p) = body {
            prefix.push((*kind, name.clone()));
            body = &**p;
        }
        (prefix, body)
    }

    pub fn get_propositional(&self) -> &Formula {
        self.strip_quantifiers().1
    }
}


// ### Formula Printing ###

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            UnaryOp::Not => "~",
            UnaryOp::EX => "EX",
            UnaryOp::AX => "AX",
            UnaryOp::EF => "EF",
            UnaryOp::AF => "AF",
            UnaryOp::EG => "EG",
            UnaryOp::AG => "AG",
        };
        write!(f, "{symbol}")
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Implies => "->",
            BinaryOp::EU => "EU",
            BinaryOp::AU => "AU",
            BinaryOp::ER => "ER",
            BinaryOp::AR => "AR",
        };
        write!(f, "{symbol}")
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::Exists => write!(f, "E"),
            Quantifier::All => write!(f, "A"),
        }
    }
}

// Operator precedences for the infix connectives.  Prefix `~` binds tighter
// than all of them; function-style operators never need brackets.
const PREC_IMPLIES: u32 = 1;
const PREC_OR: u32 = 2;
const PREC_AND: u32 = 3;
const PREC_PREFIX: u32 = 4;

impl Formula {
    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, prec: u32) -> fmt::Result {
        match self {
            Formula::Atom(name) => write!(f, "{name}"),
            Formula::Unary(UnaryOp::Not, p) => {
                write!(f, "~")?;
                p.fmt_prec(f, PREC_PREFIX)
            }
            Formula::Unary(op, p) => write!(f, "{op}({p})"),
            Formula::Binary(op @ (BinaryOp::And | BinaryOp::Or | BinaryOp::Implies), p, q) => {
                // & and | associate to the left, -> to the right.
                let (own, left_prec, right_prec) = match op {
                    BinaryOp::And => (PREC_AND, PREC_AND, PREC_AND + 1),
                    BinaryOp::Or => (PREC_OR, PREC_OR, PREC_OR + 1),
                    _ => (PREC_IMPLIES, PREC_IMPLIES + 1, PREC_IMPLIES),
                };
                let bracket = own < prec;
                if bracket {
                    write!(f, "(")?;
                }
                p.fmt_prec(f, left_prec)?;
                write!(f, " {op} ")?;
                q.fmt_prec(f, right_prec)?;
                if bracket {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Formula::Binary(op, p, q) => write!(f, "{op}({p}, {q})"),
            Formula::Quantified(kind, name, p) => write!(f, "{kind}({name}, {p})"),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}
