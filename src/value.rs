use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use gc::{Finalize, Gc, Trace};
use num::complex::Complex64;

use crate::number;
use crate::runtime::Procedure;

/// An interned identifier. Two symbols spelled the same way share one
/// allocation, so identity comparison doubles as content comparison and
/// symbols hash by pointer.
#[derive(Clone, Debug, Eq)]
pub struct Symbol(Rc<str>);

thread_local! {
    static SYMBOLS: RefCell<HashMap<String, Symbol>> = RefCell::new(HashMap::new());
}

/// Find or create the unique `Symbol` for `name`.
pub fn intern(name: &str) -> Symbol {
    SYMBOLS.with(|table| {
        let mut table = table.borrow_mut();
        if let Some(sym) = table.get(name) {
            return sym.clone();
        }
        let sym = Symbol(Rc::from(name));
        table.insert(name.to_string(), sym.clone());
        sym
    })
}

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Symbol) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const u8 as usize).hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Symbols hold no traced pointers.
impl Finalize for Symbol {}
unsafe impl Trace for Symbol {
    gc::unsafe_empty_trace!();
}

/// The uniform tree value: both source code and runtime data. Lists are the
/// universal structural type; they are shared behind `Gc` but `cons`, `car`
/// and `cdr` always build fresh vectors, so lists behave as independent
/// values.
#[derive(Clone, Debug, Trace, Finalize)]
pub enum Value {
    Symbol(Symbol),
    Bool(bool),
    Exact(i64),
    Inexact(f64),
    Complex(#[unsafe_ignore_trace] Complex64),
    Str(String),
    List(Gc<Vec<Value>>),
    Procedure(Procedure),
    /// Result of forms evaluated for effect (`define`, `set!`).
    Unspecified,
}

impl Value {
    pub fn symbol(name: &str) -> Value {
        Value::Symbol(intern(name))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Gc::new(items))
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        if let Value::Symbol(sym) = self {
            Some(sym)
        } else {
            None
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        if let Value::List(items) = self {
            Some(items.as_slice())
        } else {
            None
        }
    }

    /// Everything except `#f` is true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Symbol(_) => "symbol",
            Value::Bool(_) => "boolean",
            Value::Exact(_) | Value::Inexact(_) | Value::Complex(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Procedure(_) => "procedure",
            Value::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Symbol(sym) => write!(f, "{}", sym),
            Value::Bool(true) => write!(f, "#t"),
            Value::Bool(false) => write!(f, "#f"),
            Value::Exact(n) => write!(f, "{}", n),
            Value::Inexact(x) => number::write_float(f, *x),
            Value::Complex(z) => number::write_complex(f, z),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Procedure(proc) => write!(f, "{}", proc),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

/// Render a value back into Scheme-readable text. Drivers use this (or the
/// `Display` impl it wraps) for output; the core never calls it.
pub fn to_display_string(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod test {
    use super::{intern, to_display_string, Value};
    use crate::read::read;

    fn round_trip(text: &str) {
        let value = read(text).unwrap();
        let rendered = to_display_string(&value);
        assert_eq!(rendered, text);
        let reparsed = read(&rendered).unwrap();
        assert_eq!(to_display_string(&reparsed), text);
    }

    #[test]
    fn atoms_round_trip() {
        round_trip("42");
        round_trip("-17");
        round_trip("2.5");
        round_trip("3.0");
        round_trip("#t");
        round_trip("#f");
        round_trip("\"hi\\nthere\"");
        round_trip("1+2i");
        round_trip("2.5-3i");
    }

    #[test]
    fn symbol_identity() {
        let a = read("foo").unwrap();
        let b = read("foo").unwrap();
        match (&a, &b) {
            (Value::Symbol(a), Value::Symbol(b)) => assert!(a == b),
            _ => panic!("expected symbols"),
        }
        assert!(intern("bar") == intern("bar"));
        assert!(intern("bar") != intern("baz"));
    }

    #[test]
    fn list_display() {
        let value = read("(a (b  c) 1 \"x\")").unwrap();
        assert_eq!(to_display_string(&value), "(a (b c) 1 \"x\")");
        assert_eq!(to_display_string(&read("()").unwrap()), "()");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Exact(0).is_truthy());
        assert!(Value::list(vec![]).is_truthy());
        assert!(Value::Unspecified.is_truthy());
    }
}
