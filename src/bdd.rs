// A small reduced ordered BDD, used by the test suite to decide quantified
// queries that are too large for clause-level expansion.  Smaller levels sit
// nearer the root.  There are no complement edges, so negation is an apply.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ref(usize);

pub const FALSE: Ref = Ref(0);
pub const TRUE: Ref = Ref(1);

#[derive(Debug, Clone, Copy)]
struct Node {
    level: usize,
    low: Ref,
    high: Ref,
}

#[derive(Debug)]
pub struct Bdd {
    nodes: Vec<Node>,
    unique: HashMap<(usize, Ref, Ref), Ref>,
    not_cache: HashMap<Ref, Ref>,
    and_cache: HashMap<(Ref, Ref), Ref>,
    exists_cache: HashMap<(Ref, usize), Ref>,
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new()
    }
}

impl Bdd {
    pub fn new() -> Bdd {
        let terminal = Node {
            level: usize::MAX,
            low: FALSE,
            high: FALSE,
        };
        Bdd {
            nodes: vec![terminal, terminal],
            unique: HashMap::new(),
            not_cache: HashMap::new(),
            and_cache: HashMap::new(),
            exists_cache: HashMap::new(),
        }
    }

    pub fn is_terminal(&self, f: Ref) -> bool {
        f == FALSE || f == TRUE
    }

    pub fn mk_node(&mut self, level: usize, low: Ref, high: Ref) -> Ref {
        if low == high {
            return low;
        }
        if let Some(&node) = self.unique.get(&(level, low, high)) {
            return node;
        }
        let node = Ref(self.nodes.len());
        self.nodes.push(Node { level, low, high });
        self.unique.insert((level, low, high), node);
        node
    }

    pub fn mk_var(&mut self, level: usize) -> Ref {
        self.mk_node(level, FALSE, TRUE)
    }

    fn top_cofactors(&self, f: Ref, level: usize) -> (Ref, Ref) {
        let node = self.nodes[f.0];
        if node.level == level {
            (node.low, node.high)
        } else {
            (f, f)
        }
    }

    pub fn apply_not(&mut self, f: Ref) -> Ref {
        if f == FALSE {
            return TRUE;
        }
        if f == TRUE {
            return FALSE;
        }
        if let Some(&result) = self.not_cache.get(&f) {
            return result;
        }
        let node = self.nodes[f.0];
        let low = self.apply_not(node.low);
        let high = self.apply_not(node.high);
        let result = self.mk_node(node.level, low, high);
        self.not_cache.insert(f, result);
        result
    }

    pub fn apply_and(&mut self, f: Ref, g: Ref) -> Ref {
        if f == FALSE || g == FALSE {
            return FALSE;
        }
        if f == TRUE || f == g {
            return g;
        }
        if g == TRUE {
            return f;
        }
        let key = if f.0 < g.0 { (f, g) } else { (g, f) };
        if let Some(&result) = self.and_cache.get(&key) {
            return result;
        }
        let level = self.nodes[f.0].level.min(self.nodes[g.0].level);
        let (f0, f1) = self.top_cofactors(f, level);
        let (g0, g1) = self.top_cofactors(g, level);
        let low = self.apply_and(f0, g0);
        let high = self.apply_and(f1, g1);
        let result = self.mk_node(level, low, high);
        self.and_cache.insert(key, result);
        result
    }

    pub fn apply_or(&mut self, f: Ref, g: Ref) -> Ref {
        let not_f = self.apply_not(f);
        let not_g = self.apply_not(g);
        let both = self.apply_and(not_f, not_g);
        self.apply_not(both)
    }

    pub fn exists(&mut self, f: Ref, level: usize) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        let node = self.nodes[f.0];
        if node.level > level {
            return f;
        }
        if let Some(&result) = self.exists_cache.get(&(f, level)) {
            return result;
        }
        let result = if node.level == level {
            self.apply_or(node.low, node.high)
        } else {
            let low = self.exists(node.low, level);
            let high = self.exists(node.high, level);
            self.mk_node(node.level, low, high)
        };
        self.exists_cache.insert((f, level), result);
        result
    }

    pub fn forall(&mut self, f: Ref, level: usize) -> Ref {
        let not_f = self.apply_not(f);
        let some = self.exists(not_f, level);
        self.apply_not(some)
    }
}

#[cfg(test)]
mod bdd_tests {
    use super::*;

    #[test]
    fn test_terminals_and_vars() {
        let mut bdd = Bdd::new();
        let x = bdd.mk_var(0);
        assert!(!bdd.is_terminal(x));
        assert_eq!(bdd.mk_var(0), x);
        assert_eq!(bdd.mk_node(3, TRUE, TRUE), TRUE);
        assert_eq!(bdd.apply_not(TRUE), FALSE);
    }

    #[test]
    fn test_de_morgan() {
        let mut bdd = Bdd::new();
        let x = bdd.mk_var(0);
        let y = bdd.mk_var(1);
        let and = bdd.apply_and(x, y);
        let not_and = bdd.apply_not(and);
        let not_x = bdd.apply_not(x);
        let not_y = bdd.apply_not(y);
        assert_eq!(bdd.apply_or(not_x, not_y), not_and);
    }

    #[test]
    fn test_excluded_middle() {
        let mut bdd = Bdd::new();
        let x = bdd.mk_var(2);
        let not_x = bdd.apply_not(x);
        assert_eq!(bdd.apply_or(x, not_x), TRUE);
        assert_eq!(bdd.apply_and(x, not_x), FALSE);
    }

    #[test]
    fn test_quantification() {
        let mut bdd = Bdd::new();
        let x = bdd.mk_var(0);
        let y = bdd.mk_var(1);
        let not_x = bdd.apply_not(x);
        // x | y: E x gives TRUE, A x gives y.
        let either = bdd.apply_or(x, y);
        assert_eq!(bdd.exists(either, 0), TRUE);
        assert_eq!(bdd.forall(either, 0), y);
        // A x. E y. x <-> y holds; E y. A x. x <-> y does not.
        let both = bdd.apply_and(x, y);
        let not_y = bdd.apply_not(y);
        let neither = bdd.apply_and(not_x, not_y);
        let iff = bdd.apply_or(both, neither);
        let inner = bdd.exists(iff, 1);
        assert_eq!(bdd.forall(inner, 0), TRUE);
        let inner = bdd.forall(iff, 0);
        assert_eq!(bdd.exists(inner, 1), FALSE);
        // Quantifying an absent variable changes nothing.
        assert_eq!(bdd.exists(y, 0), y);
    }
}
