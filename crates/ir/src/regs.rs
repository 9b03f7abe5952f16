//! Register sets of values and patterns
//!
//! Every conflict test in the transformation passes reduces to a question
//! about which registers a value reads or a pattern binds.

use crate::ir::{Pattern, RegisterSet, Value};

impl Value {
    /// The set of registers this value references.
    pub fn registers(&self) -> RegisterSet {
        let mut rs = RegisterSet::new();
        self.collect_registers(&mut rs);
        rs
    }

    fn collect_registers(&self, rs: &mut RegisterSet) {
        match self {
            Value::Tag(_) | Value::Unit => {}
            Value::Reg(r) => {
                rs.insert(r.clone());
            }
            Value::Tuple(vs) => {
                for v in vs {
                    v.collect_registers(rs);
                }
            }
        }
    }

    /// True iff this value reads register `r`.
    pub fn mentions(&self, r: &str) -> bool {
        match self {
            Value::Tag(_) | Value::Unit => false,
            Value::Reg(x) => x == r,
            Value::Tuple(vs) => vs.iter().any(|v| v.mentions(r)),
        }
    }
}

impl Pattern {
    /// The set of registers this pattern binds.
    pub fn registers(&self) -> RegisterSet {
        let mut rs = RegisterSet::new();
        self.collect_registers(&mut rs);
        rs
    }

    fn collect_registers(&self, rs: &mut RegisterSet) {
        match self {
            Pattern::Wildcard => {}
            Pattern::Reg(r) => {
                rs.insert(r.clone());
            }
            Pattern::Tuple(ps) => {
                for p in ps {
                    p.collect_registers(rs);
                }
            }
        }
    }
}

/// The registers that `v` reads from `p`'s bound positions.
///
/// A non-empty result means assigning through `p` would clobber a
/// register that `v` still needs.
pub fn intersection(p: &Pattern, v: &Value) -> RegisterSet {
    let bound = p.registers();
    v.registers().intersection(&bound).cloned().collect()
}
