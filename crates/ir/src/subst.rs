//! Substitutions over registers
//!
//! A substitution is a finite map from registers to values, read as a
//! simultaneous assignment: every right-hand side is evaluated in the
//! machine state before any rule takes effect. The transformation passes
//! carry substitutions instead of emitting definitions eagerly, and
//! restore them only at control-flow boundaries.

use crate::ir::{Block, Pattern, Register, RegisterSet, Value, defs};
use std::collections::BTreeMap;

/// A register-to-value map with composition and restoration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bindings {
    map: BTreeMap<Register, Value>,
}

impl Bindings {
    pub fn empty() -> Bindings {
        Bindings::default()
    }

    pub fn singleton(r: impl Into<Register>, v: Value) -> Bindings {
        let mut b = Bindings::empty();
        b.add(r, v);
        b
    }

    /// Add a rule, overwriting any existing rule for the same register.
    pub fn add(&mut self, r: impl Into<Register>, v: Value) {
        self.map.insert(r.into(), v);
    }

    pub fn get(&self, r: &str) -> Option<&Value> {
        self.map.get(r)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Register, &Value)> {
        self.map.iter()
    }

    /// The registers assigned by this substitution.
    pub fn domain(&self) -> RegisterSet {
        self.map.keys().cloned().collect()
    }

    /// The registers read by the right-hand sides.
    pub fn codomain_registers(&self) -> RegisterSet {
        let mut rs = RegisterSet::new();
        for v in self.map.values() {
            rs.extend(v.registers());
        }
        rs
    }

    /// Remove every rule whose left-hand side is bound by `p`.
    pub fn remove(&mut self, p: &Pattern) {
        for r in p.registers() {
            self.map.remove(&r);
        }
    }

    /// Remove every rule whose left-hand side is referenced by `v`.
    pub fn remove_value(&mut self, v: &Value) {
        for r in v.registers() {
            self.map.remove(&r);
        }
    }

    /// Keep only the rules whose left-hand side is in `rs`.
    pub fn restrict(&self, rs: &RegisterSet) -> Bindings {
        Bindings {
            map: self
                .map
                .iter()
                .filter(|(r, _)| rs.contains(*r))
                .map(|(r, v)| (r.clone(), v.clone()))
                .collect(),
        }
    }

    /// Substitute into a value. Each register is rewritten at most once;
    /// the result is not re-substituted.
    pub fn apply(&self, v: &Value) -> Value {
        match v {
            Value::Tag(_) | Value::Unit => v.clone(),
            Value::Reg(r) => match self.map.get(r) {
                Some(w) => w.clone(),
                None => v.clone(),
            },
            Value::Tuple(vs) => Value::Tuple(vs.iter().map(|v| self.apply(v)).collect()),
        }
    }

    /// Substitute into a pattern.
    ///
    /// # Panics
    ///
    /// A rule crossing a bound register must map it to another register;
    /// anything else would turn a binding position into a computed value,
    /// which has no meaning. Such a rule means an earlier pass is buggy.
    pub fn apply_pattern(&self, p: &Pattern) -> Pattern {
        match p {
            Pattern::Wildcard => Pattern::Wildcard,
            Pattern::Reg(r) => match self.map.get(r) {
                None => p.clone(),
                Some(Value::Reg(r2)) => Pattern::Reg(r2.clone()),
                Some(v) => panic!("substituting non-register value {v:?} into binder {r}"),
            },
            Pattern::Tuple(ps) => {
                Pattern::Tuple(ps.iter().map(|p| self.apply_pattern(p)).collect())
            }
        }
    }

    /// Sequential composition: apply `self` to the right-hand sides of
    /// `other`, then union, with `other` winning on clashes.
    pub fn compose(&self, other: &Bindings) -> Bindings {
        let mut map = self.map.clone();
        for (r, v) in &other.map {
            map.insert(r.clone(), self.apply(v));
        }
        Bindings { map }
    }

    /// The rules that decompose `p` against `v` structurally. Identity
    /// rules are dropped.
    ///
    /// # Panics
    ///
    /// Panics when `p` and `v` do not have compatible shapes.
    pub fn assign(p: &Pattern, v: &Value) -> Bindings {
        let mut b = Bindings::empty();
        b.extend_pattern(p, v);
        b
    }

    /// Add the rules decomposing `p` against `v`.
    pub fn extend_pattern(&mut self, p: &Pattern, v: &Value) {
        match (p, v) {
            (Pattern::Wildcard, _) => {}
            (Pattern::Reg(r), Value::Reg(r2)) if r == r2 => {}
            (Pattern::Reg(r), v) => self.add(r.clone(), v.clone()),
            (Pattern::Tuple(ps), Value::Tuple(vs)) if ps.len() == vs.len() => {
                for (p, v) in ps.iter().zip(vs) {
                    self.extend_pattern(p, v);
                }
            }
            (p, v) => panic!("cannot decompose pattern {p:?} against value {v:?}"),
        }
    }

    /// Prepend this substitution to a block as one simultaneous
    /// definition.
    pub fn restore_defs(self, k: Block) -> Block {
        defs(self, k)
    }

    /// As [`Bindings::restore_defs`], restricted to the rules whose
    /// left-hand side is in `rs`.
    pub fn tight_restore_defs(&self, rs: &RegisterSet, k: Block) -> Block {
        defs(self.restrict(rs), k)
    }
}

impl FromIterator<(Register, Value)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (Register, Value)>>(iter: I) -> Bindings {
        Bindings {
            map: iter.into_iter().collect(),
        }
    }
}
