#[cfg(test)]
use std::collections::BTreeSet;

#[cfg(test)]
pub fn slice_to_set_of_owned(input: &[&str]) -> BTreeSet<String> {
    input.iter().map(|x| x.to_string()).collect()
}

// Monotonic source of fresh numbers for one top-level query.  Every checker
// owns its own, so independent queries never share generated names.
#[derive(Debug)]
pub struct Tickets {
    next: usize,
}

impl Default for Tickets {
    fn default() -> Self {
        Tickets::new()
    }
}

impl Tickets {
    pub fn new() -> Tickets {
        Tickets { next: 1 }
    }

    pub fn take(&mut self) -> usize {
        let ticket = self.next;
        self.next += 1;
        ticket
    }

    pub fn fresh_name(&mut self, base: &str) -> String {
        // `base` followed by a prime and a ticket.  Atoms and state variables
        // never contain a prime, so the result cannot clash with them.
        format!("{base}'{}", self.take())
    }

    pub fn reset(&mut self) {
        self.next = 1;
    }
}
