use gc::Gc;

use crate::runtime::ProcKind;
use crate::value::Value;

/// The two Scheme equality predicates. `identical` is `eq?`: identity for
/// lists and closures, value comparison for atoms (interned symbols make
/// identity and content coincide). `equal` is `equal?`: structural descent
/// through lists.
pub trait LispEq {
    fn identical(&self, other: &Self) -> bool;

    fn equal(&self, other: &Self) -> bool {
        self.identical(other)
    }
}

impl LispEq for Value {
    fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Exact(a), Value::Exact(b)) => a == b,
            (Value::Inexact(a), Value::Inexact(b)) => a == b,
            (Value::Complex(a), Value::Complex(b)) => a == b,
            // Strings are stored inline, so identity degrades to contents.
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Gc::ptr_eq(a, b) || (a.is_empty() && b.is_empty())
            }
            (Value::Procedure(a), Value::Procedure(b)) => match (a.kind(), b.kind()) {
                (ProcKind::Native(x), ProcKind::Native(y)) => x.func == y.func,
                (ProcKind::Closure(x), ProcKind::Closure(y)) => Gc::ptr_eq(x, y),
                (ProcKind::CallCc, ProcKind::CallCc) => true,
                (ProcKind::Escape(x), ProcKind::Escape(y)) => x.is(y),
                _ => false,
            },
            (Value::Unspecified, Value::Unspecified) => true,
            _ => false,
        }
    }

    fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equal(y))
            }
            _ => self.identical(other),
        }
    }
}

// Tests compare by `equal?`; environments are never compared, so there is no
// cycle hazard here.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.equal(other)
    }
}

#[cfg(test)]
mod test {
    use super::LispEq;
    use crate::read::read;
    use crate::value::Value;

    #[test]
    fn symbols_are_identical_by_interning() {
        assert!(read("foo").unwrap().identical(&read("foo").unwrap()));
        assert!(!read("foo").unwrap().identical(&read("bar").unwrap()));
    }

    #[test]
    fn separate_lists_are_equal_but_not_identical() {
        let a = read("(1 (2 3))").unwrap();
        let b = read("(1 (2 3))").unwrap();
        assert!(a.equal(&b));
        assert!(!a.identical(&b));
        assert!(a.identical(&a.clone()));
    }

    #[test]
    fn empty_lists_are_identical() {
        assert!(read("()").unwrap().identical(&Value::list(vec![])));
    }

    #[test]
    fn numbers_compare_by_representation() {
        assert!(Value::Exact(1).identical(&Value::Exact(1)));
        assert!(!Value::Exact(1).identical(&Value::Inexact(1.0)));
    }
}
