//! Positional allocation.
//!
//! [`plan`] decides how a run of positional tokens is spread over the unfilled
//! positional slots. It never touches bindings; the matcher applies the plan.

use crate::spec::{ArgumentSpec, Arity};

/// What one slot receives from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The next `n` tokens of the run.
    Take(usize),
    /// The slot's default (or the parser-wide default).
    Default,
    /// No-value action; its constant is written.
    Fire,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// One entry per slot in the window, starting at the cursor.
    pub fills: Vec<Fill>,
    /// Trailing tokens no slot accepted.
    pub leftover: usize,
}

impl Plan {
    pub fn taken(&self) -> usize {
        self.fills
            .iter()
            .map(|fill| match fill {
                Fill::Take(n) => *n,
                _ => 0,
            })
            .sum()
    }
}

/// Spread `n` tokens over `slots`, the positional specs from the cursor onward.
pub fn plan(slots: &[ArgumentSpec], n: usize) -> Plan {
    let mut finish = 0;
    let mut min_args = 0;
    let mut slack = 0;
    let mut open_ended = false;
    for spec in slots {
        if spec.action().takes_value() {
            let arity = spec.arity();
            let need = arity.min();
            if min_args + need > n {
                break;
            }
            min_args += need;
            slack += usize::from(arity == Arity::ZeroOrOne);
            open_ended |= arity.is_open_ended();
        }
        finish += 1;
    }

    let window = &slots[..finish];
    if window.is_empty() {
        return Plan {
            fills: Vec::new(),
            leftover: n,
        };
    }

    let mut surplus = n - min_args;
    let fills: Vec<Fill> = if min_args == n {
        window
            .iter()
            .map(|spec| match fill_for(spec) {
                Some(Arity::ZeroOrOne | Arity::ZeroOrMore) => Fill::Default,
                Some(arity) => Fill::Take(arity.min()),
                None => Fill::Fire,
            })
            .collect()
    } else if open_ended {
        window
            .iter()
            .map(|spec| match fill_for(spec) {
                Some(Arity::ZeroOrOne) => Fill::Default,
                Some(Arity::OneOrMore) => Fill::Take(1 + std::mem::take(&mut surplus)),
                Some(Arity::ZeroOrMore) if surplus > 0 => Fill::Take(std::mem::take(&mut surplus)),
                Some(Arity::ZeroOrMore) => Fill::Default,
                Some(arity) => Fill::Take(arity.min()),
                None => Fill::Fire,
            })
            .collect()
    } else if min_args + slack >= n {
        window
            .iter()
            .map(|spec| match fill_for(spec) {
                Some(Arity::ZeroOrOne) if surplus > 0 => {
                    surplus -= 1;
                    Fill::Take(1)
                }
                Some(Arity::ZeroOrOne) => Fill::Default,
                Some(arity) => Fill::Take(arity.min()),
                None => Fill::Fire,
            })
            .collect()
    } else {
        window
            .iter()
            .map(|spec| match fill_for(spec) {
                Some(Arity::ZeroOrOne) => Fill::Take(1),
                Some(arity) => Fill::Take(arity.min()),
                None => Fill::Fire,
            })
            .collect()
    };

    let mut plan = Plan { fills, leftover: 0 };
    plan.leftover = n - plan.taken();
    plan
}

fn fill_for(spec: &ArgumentSpec) -> Option<Arity> {
    spec.action().takes_value().then(|| spec.arity())
}
