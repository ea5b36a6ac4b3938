// Normal forms: derived-operator elimination, negation normal form and
// prenex normal form.

use crate::error::{CtlSatError, Result};
use crate::formula::{BinaryOp, Formula, Quantifier, UnaryOp};
use crate::utils::Tickets;

impl UnaryOp {
    /// The operator `op'` with `~op(f) == op'(~f)`.  `None` for `Not`.
    pub fn dual(self) -> Option<UnaryOp> {
        match self {
            UnaryOp::Not => None,
            UnaryOp::EX => Some(UnaryOp::AX),
            UnaryOp::AX => Some(UnaryOp::EX),
            UnaryOp::EF => Some(UnaryOp::AG),
            UnaryOp::AG => Some(UnaryOp::EF),
            UnaryOp::AF => Some(UnaryOp::EG),
            UnaryOp::EG => Some(UnaryOp::AF),
        }
    }
}

impl BinaryOp {
    /// The operator `op'` with `~op(p, q) == op'(~p, ~q)`.  `None` for
    /// `Implies`.
    pub fn dual(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::And => Some(BinaryOp::Or),
            BinaryOp::Or => Some(BinaryOp::And),
            BinaryOp::EU => Some(BinaryOp::AR),
            BinaryOp::AR => Some(BinaryOp::EU),
            BinaryOp::AU => Some(BinaryOp::ER),
            BinaryOp::ER => Some(BinaryOp::AU),
            BinaryOp::Implies => None,
        }
    }
}

// Derived operators.
impl Formula {
    pub fn eliminate_derived_operators(&self) -> Formula {
        // Rewrites IMPLIES, EF, EG, AF and AG in terms of the core operators.
        match self {
            Formula::Atom(_) => self.clone(),
            Formula::Unary(op, p) => {
                let p = p.eliminate_derived_operators();
                match op {
                    UnaryOp::EF => Formula::eu(Formula::truth(), p),
                    UnaryOp::AF => Formula::au(Formula::truth(), p),
                    UnaryOp::EG => Formula::er(Formula::falsity(), p),
                    UnaryOp::AG => Formula::ar(Formula::falsity(), p),
                    _ => Formula::unary(*op, p),
                }
            }
            Formula::Binary(BinaryOp::Implies, p, q) => Formula::or(
                Formula::not(p.eliminate_derived_operators()),
                q.eliminate_derived_operators(),
            ),
            Formula::Binary(op, p, q) => Formula::binary(
                *op,
                p.eliminate_derived_operators(),
                q.eliminate_derived_operators(),
            ),
            Formula::Quantified(kind, name, p) => {
                Formula::quantified(*kind, name, p.eliminate_derived_operators())
            }
        }
    }
}


// Negation normal form.
impl Formula {
    pub fn to_nnf(&self) -> Formula {
        // Pushes every negation down to an atom.
        match self {
            Formula::Atom(_) => self.clone(),
            Formula::Unary(UnaryOp::Not, p) => p.negated_nnf(),
            Formula::Unary(op, p) => Formula::unary(*op, p.to_nnf()),
            Formula::Binary(BinaryOp::Implies, p, q) => {
                Formula::or(p.negated_nnf(), q.to_nnf())
            }
            Formula::Binary(op, p, q) => Formula::binary(*op, p.to_nnf(), q.to_nnf()),
            Formula::Quantified(kind, name, p) => Formula::quantified(*kind, name, p.to_nnf()),
        }
    }

    fn negated_nnf(&self) -> Formula {
        // NNF of `~self`.
        match self {
            Formula::Atom(_) => Formula::not(self.clone()),
            Formula::Unary(UnaryOp::Not, p) => p.to_nnf(),
            Formula::Unary(op, p) => match op.dual() {
                Some(dual) => Formula::unary(dual, p.negated_nnf()),
                None => Formula::not(self.clone()),
            },
            Formula::Binary(BinaryOp::Implies, p, q) => Formula::and(p.to_nnf(), q.negated_nnf()),
            Formula::Binary(op, p, q) => match op.dual() {
                Some(dual) => Formula::binary(dual, p.negated_nnf(), q.negated_nnf()),
                None => Formula::not(self.clone()),
            },
            Formula::Quantified(kind, name, p) => {
                Formula::quantified(kind.dual(), name, p.negated_nnf())
            }
        }
    }

    pub fn nnf_negate(&self) -> Formula {
        self.negated_nnf()
    }

    pub fn is_nnf(&self) -> bool {
        match self {
            Formula::Atom(_) => true,
            Formula::Unary(UnaryOp::Not, p) => matches!(**p, Formula::Atom(_)),
            Formula::Unary(_, p) | Formula::Quantified(_, _, p) => p.is_nnf(),
            Formula::Binary(BinaryOp::Implies, _, _) => false,
            Formula::Binary(_, p, q) => p.is_nnf() && q.is_nnf(),
        }
    }
}


// Prenex normal form.
impl Formula {
    pub fn to_pnf(&self, tickets: &mut Tickets) -> Result<Formula> {
        // Result is `Q_1 x_1 ... Q_n x_n. p` with `p` quantifier free.
        // Assumes `self` is in NNF over AND, OR, NOT, atoms and quantifiers.
        match self {
            Formula::Atom(_) => Ok(self.clone()),
            Formula::Unary(UnaryOp::Not, p) => match **p {
                Formula::Atom(_) => Ok(self.clone()),
                _ => Err(CtlSatError::NotInNnf(self.to_string())),
            },
            Formula::Unary(op, _) => Err(CtlSatError::UnsupportedOperator(
                (*op).into(),
                format!("cannot convert {self} to prenex form"),
            )),
            Formula::Binary(op @ (BinaryOp::And | BinaryOp::Or), p, q) => {
                let p = p.to_pnf(tickets)?;
                let q = q.to_pnf(tickets)?;
                Ok(Formula::pull_quantifiers(*op, p, q, tickets))
            }
            Formula::Binary(op, _, _) => Err(CtlSatError::UnsupportedOperator(
                (*op).into(),
                format!("cannot convert {self} to prenex form"),
            )),
            Formula::Quantified(kind, name, p) => {
                Ok(Formula::quantified(*kind, name, p.to_pnf(tickets)?))
            }
        }
    }

    fn pull_quantifiers(
        op: BinaryOp,
        left: Formula,
        right: Formula,
        tickets: &mut Tickets,
    ) -> Formula {
        // Assumes `left` and `right` are already prenex.  Recursively pulls the
        // leading quantifiers of both sides out over `op`.
        match (left, right) {
            (Formula::Quantified(k1, x, p), Formula::Quantified(k2, y, q))
                if k1 == k2 && x == y && Formula::distributes(k1, op) =>
            {
                Formula::quantified(k1, &x, Formula::pull_quantifiers(op, *p, *q, tickets))
            }
            (Formula::Quantified(kind, x, p), right) => {
                let (x, p) = Formula::rename_apart(x, *p, &right, tickets);
                Formula::quantified(kind, &x, Formula::pull_quantifiers(op, p, right, tickets))
            }
            (left, Formula::Quantified(kind, y, q)) => {
                let (y, q) = Formula::rename_apart(y, *q, &left, tickets);
                Formula::quantified(kind, &y, Formula::pull_quantifiers(op, left, q, tickets))
            }
            (left, right) => Formula::binary(op, left, right),
        }
    }

    fn distributes(kind: Quantifier, op: BinaryOp) -> bool {
        matches!(
            (kind, op),
            (Quantifier::All, BinaryOp::And) | (Quantifier::Exists, BinaryOp::Or)
        )
    }

    fn rename_apart(
        var: String,
        body: Formula,
        other: &Formula,
        tickets: &mut Tickets,
    ) -> (String, Formula) {
        // Renames `var` in `body` when moving its binder over `other` would
        // capture an occurrence.
        if other.mentions(&var) {
            let fresh = tickets.fresh_name(&var);
            let body = body.substitute(&var, &fresh);
            (fresh, body)
        } else {
            (var, body)
        }
    }
}
