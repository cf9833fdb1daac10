use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use gc::{Finalize, Gc, GcCell, Trace};

use crate::error::Error;
use crate::value::{Symbol, Value};

/// Clone-by-reference environment chain. Cloning aliases the same frame, so
/// a `set!` through one holder is visible to every other holder; this is how
/// closures express mutable lexical state.
#[derive(Clone, Debug, Trace, Finalize)]
pub struct Environment(Gc<GcCell<EnvironmentData>>);

#[derive(Debug, Trace, Finalize)]
struct EnvironmentData {
    parent: Option<Environment>,
    vars: HashMap<Symbol, Value>,
}

impl Environment {
    fn from_data(data: EnvironmentData) -> Environment {
        Environment(Gc::new(GcCell::new(data)))
    }

    pub fn new() -> Environment {
        Environment::from_bindings(HashMap::new())
    }

    pub fn from_bindings(vars: HashMap<Symbol, Value>) -> Environment {
        Environment::from_data(EnvironmentData { parent: None, vars })
    }

    /// A fresh empty frame whose parent is this one. One is created per
    /// closure invocation.
    pub fn child(&self) -> Environment {
        Environment::from_data(EnvironmentData {
            parent: Some(self.clone()),
            vars: HashMap::new(),
        })
    }

    /// Walk outward through parent frames until one defines `name`.
    pub fn lookup(&self, name: &Symbol) -> Option<Value> {
        let mut frame = self.clone();
        loop {
            let next = {
                let data = frame.0.borrow();
                if let Some(value) = data.vars.get(name) {
                    return Some(value.clone());
                }
                data.parent.clone()
            };
            match next {
                Some(parent) => frame = parent,
                None => return None,
            }
        }
    }

    /// Bind `name` in this frame, shadowing any outer binding.
    pub fn define(&self, name: &Symbol, value: Value) {
        self.0.borrow_mut().vars.insert(name.clone(), value);
    }

    /// Mutate the existing binding of `name`, found by walking outward.
    pub fn set(&self, name: &Symbol, value: Value) -> Result<(), Error> {
        let mut frame = self.clone();
        loop {
            let next = {
                let data = frame.0.borrow();
                if data.vars.contains_key(name) {
                    None
                } else {
                    data.parent.clone()
                }
            };
            match next {
                Some(parent) => frame = parent,
                None => {
                    let mut data = frame.0.borrow_mut();
                    if data.vars.contains_key(name) {
                        data.vars.insert(name.clone(), value);
                        return Ok(());
                    }
                    return Err(Error::UnboundVariable(name.to_string()));
                }
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Environment {
        Environment::new()
    }
}

pub type NativeFn = fn(Vec<Value>) -> Result<Value, Error>;

/// A named native operation.
#[derive(Clone, Copy)]
pub struct Native {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#<native {}>", self.name)
    }
}

impl Finalize for Native {}
unsafe impl Trace for Native {
    gc::unsafe_empty_trace!();
}

/// Formal parameters of a closure: a fixed list of names, or one name that
/// binds the whole argument list.
#[derive(Clone, Debug, Trace, Finalize)]
pub enum Params {
    Fixed(Vec<Symbol>),
    Variadic(Symbol),
}

impl Params {
    pub(crate) fn parse(spec: &Value) -> Option<Params> {
        match spec {
            Value::Symbol(name) => Some(Params::Variadic(name.clone())),
            Value::List(items) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items.iter() {
                    names.push(item.as_symbol()?.clone());
                }
                Some(Params::Fixed(names))
            }
            _ => None,
        }
    }

    pub(crate) fn bind(&self, args: Vec<Value>, frame: &Environment) -> Result<(), Error> {
        match self {
            Params::Fixed(names) => {
                if args.len() != names.len() {
                    return Err(Error::Arity {
                        expected: names.len(),
                        got: args.len(),
                    });
                }
                for (name, value) in names.iter().zip(args) {
                    frame.define(name, value);
                }
                Ok(())
            }
            Params::Variadic(name) => {
                frame.define(name, Value::list(args));
                Ok(())
            }
        }
    }
}

/// An immutable (params, body, defining environment) triple. The environment
/// is captured by shared reference, never copied.
#[derive(Debug, Trace, Finalize)]
pub struct Closure {
    pub params: Params,
    pub body: Value,
    pub env: Environment,
}

/// Handle for an escape continuation. It stays armed for the dynamic extent
/// of its capturing `call/cc` and is identified by pointer, so nested
/// captures cannot be confused.
#[derive(Clone, Debug)]
pub struct Escape(Rc<Cell<bool>>);

impl Escape {
    pub(crate) fn new() -> Escape {
        Escape(Rc::new(Cell::new(true)))
    }

    pub(crate) fn disarm(&self) {
        self.0.set(false);
    }

    pub(crate) fn in_extent(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn is(&self, other: &Escape) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Finalize for Escape {}
unsafe impl Trace for Escape {
    gc::unsafe_empty_trace!();
}

/// Anything that can sit in the head of a call.
#[derive(Clone, Debug, Trace, Finalize)]
pub struct Procedure(pub(crate) ProcKind);

#[derive(Clone, Debug, Trace, Finalize)]
pub(crate) enum ProcKind {
    Native(Native),
    Closure(Gc<Closure>),
    /// `call/cc` itself; applied specially by the evaluator.
    CallCc,
    Escape(Escape),
}

impl Procedure {
    pub fn native(name: &'static str, func: NativeFn) -> Procedure {
        Procedure(ProcKind::Native(Native { name, func }))
    }

    pub fn closure(params: Params, body: Value, env: Environment) -> Procedure {
        Procedure(ProcKind::Closure(Gc::new(Closure { params, body, env })))
    }

    pub(crate) fn call_cc() -> Procedure {
        Procedure(ProcKind::CallCc)
    }

    pub(crate) fn escape(escape: Escape) -> Procedure {
        Procedure(ProcKind::Escape(escape))
    }

    pub(crate) fn kind(&self) -> &ProcKind {
        &self.0
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            ProcKind::Native(native) => write!(f, "#<native {}>", native.name),
            ProcKind::Closure(_) => write!(f, "#<closure>"),
            ProcKind::CallCc => write!(f, "#<native call/cc>"),
            ProcKind::Escape(_) => write!(f, "#<continuation>"),
        }
    }
}
