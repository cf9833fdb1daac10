//! Macro expansion: rewrites derived syntax into core forms before
//! evaluation. Expansion is not hygienic: identifiers introduced by a macro
//! can capture identifiers in the input.

use std::collections::HashMap;

use maplit::hashmap;

use crate::error::Error;
use crate::eval;
use crate::runtime::Environment;
use crate::value::{intern, Symbol, Value};

type BuiltinMacro = fn(&[Value]) -> Result<Value, Error>;

#[derive(Clone)]
enum Macro {
    Builtin(BuiltinMacro),
    /// A procedure installed by `define-macro`, applied to the unevaluated
    /// argument forms at expansion time.
    User(Value),
}

/// Rewrites derived syntax against a fixed macro table assembled at
/// construction. `define-macro` is sugar for inserting a user procedure into
/// this table during expansion; the table is not otherwise extensible.
pub struct Expander {
    macros: HashMap<Symbol, Macro>,
    global: Environment,
}

impl Expander {
    pub fn new(global: Environment) -> Expander {
        let macros = hashmap! {
            intern("and") => Macro::Builtin(expand_and as BuiltinMacro),
            intern("let") => Macro::Builtin(expand_let as BuiltinMacro),
        };
        Expander { macros, global }
    }

    /// Return an equivalent core-syntax form. Nothing in `form` itself is
    /// evaluated (user macro procedures run, but on unevaluated forms).
    pub fn expand(&mut self, form: &Value, toplevel: bool) -> Result<Value, Error> {
        let items = match form.as_list() {
            Some(items) if !items.is_empty() => items,
            _ => return Ok(form.clone()),
        };
        if let Some(sym) = items[0].as_symbol().cloned() {
            match sym.as_str() {
                "quote" => {
                    require(form, items.len() == 2)?;
                    return Ok(form.clone());
                }
                "set!" => {
                    require(form, items.len() == 3 && items[1].as_symbol().is_some())?;
                    let exp = self.expand(&items[2], false)?;
                    return Ok(Value::list(vec![items[0].clone(), items[1].clone(), exp]));
                }
                "define" | "define-macro" => {
                    return self.expand_define(&sym, items, form, toplevel)
                }
                "begin" => {
                    // Keep toplevel status for the subforms, so define-macro
                    // works inside a toplevel begin.
                    let mut out = vec![items[0].clone()];
                    for sub in &items[1..] {
                        out.push(self.expand(sub, toplevel)?);
                    }
                    return Ok(Value::list(out));
                }
                "lambda" => return self.expand_lambda(items, form),
                "quasiquote" => {
                    require(form, items.len() == 2)?;
                    let expansion = expand_quasiquote(&items[1])?;
                    // Re-expand so macros inside unquoted forms still
                    // rewrite.
                    return self.expand(&expansion, false);
                }
                _ => {
                    if let Some(mac) = self.macros.get(&sym).cloned() {
                        let expansion = match mac {
                            Macro::Builtin(f) => f(&items[1..])?,
                            Macro::User(proc) => eval::apply(&proc, items[1..].to_vec())?,
                        };
                        return self.expand(&expansion, toplevel);
                    }
                }
            }
        }
        // Ordinary form: expand every element, so macros nested inside calls
        // are still rewritten.
        let mut out = Vec::with_capacity(items.len());
        for sub in items {
            out.push(self.expand(sub, false)?);
        }
        Ok(Value::list(out))
    }

    fn expand_define(
        &mut self,
        head: &Symbol,
        items: &[Value],
        form: &Value,
        toplevel: bool,
    ) -> Result<Value, Error> {
        require(form, items.len() >= 3)?;
        let target = &items[1];
        if let Some(sig) = target.as_list() {
            // (define (f a b) body...) => (define f (lambda (a b) body...))
            require(form, !sig.is_empty())?;
            let mut lambda = vec![Value::symbol("lambda"), Value::list(sig[1..].to_vec())];
            lambda.extend_from_slice(&items[2..]);
            let rewritten = Value::list(vec![
                items[0].clone(),
                sig[0].clone(),
                Value::list(lambda),
            ]);
            return self.expand(&rewritten, toplevel);
        }
        let name = match target.as_symbol() {
            Some(name) => name.clone(),
            None => return Err(syntax_error(form)),
        };
        require(form, items.len() == 3)?;
        let exp = self.expand(&items[2], false)?;
        if head.as_str() == "define-macro" {
            if !toplevel {
                return Err(Error::Syntax(format!(
                    "define-macro is only allowed at top level: {}",
                    form
                )));
            }
            let proc = eval::eval(&exp, &self.global)?;
            if !matches!(proc, Value::Procedure(_)) {
                return Err(Error::Syntax(format!(
                    "define-macro requires a procedure: {}",
                    form
                )));
            }
            self.macros.insert(name, Macro::User(proc));
            return Ok(Value::Unspecified);
        }
        Ok(Value::list(vec![items[0].clone(), target.clone(), exp]))
    }

    fn expand_lambda(&mut self, items: &[Value], form: &Value) -> Result<Value, Error> {
        require(form, items.len() >= 3)?;
        match &items[1] {
            Value::Symbol(_) => {}
            Value::List(params) if params.iter().all(|p| p.as_symbol().is_some()) => {}
            _ => return Err(syntax_error(form)),
        }
        let body = if items.len() == 3 {
            items[2].clone()
        } else {
            let mut body = vec![Value::symbol("begin")];
            body.extend_from_slice(&items[2..]);
            Value::list(body)
        };
        let body = self.expand(&body, false)?;
        Ok(Value::list(vec![items[0].clone(), items[1].clone(), body]))
    }
}

fn require(form: &Value, ok: bool) -> Result<(), Error> {
    if ok {
        Ok(())
    } else {
        Err(syntax_error(form))
    }
}

fn syntax_error(form: &Value) -> Error {
    Error::Syntax(format!("ill-formed special form: {}", form))
}

/// `(and)` is `#t`; `(and x)` is `x`; otherwise nest `if`s so evaluation
/// short-circuits.
fn expand_and(args: &[Value]) -> Result<Value, Error> {
    Ok(match args {
        [] => Value::Bool(true),
        [only] => only.clone(),
        [first, rest @ ..] => {
            let mut tail = vec![Value::symbol("and")];
            tail.extend_from_slice(rest);
            Value::list(vec![
                Value::symbol("if"),
                first.clone(),
                Value::list(tail),
                Value::Bool(false),
            ])
        }
    })
}

/// `(let ((v1 e1) ...) body...)` becomes `((lambda (v1 ...) body...) e1
/// ...)`. Binding entries must be two-element (symbol, expression) lists.
fn expand_let(args: &[Value]) -> Result<Value, Error> {
    let (bindings, body) = match args.split_first() {
        Some(split) => split,
        None => return Err(Error::Syntax("let requires a binding list".to_string())),
    };
    if body.is_empty() {
        return Err(Error::Syntax("let requires a body".to_string()));
    }
    let entries = bindings
        .as_list()
        .ok_or_else(|| bad_binding(bindings))?;
    let mut names = Vec::with_capacity(entries.len());
    let mut exprs = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.as_list() {
            Some([name, expr]) if name.as_symbol().is_some() => {
                names.push(name.clone());
                exprs.push(expr.clone());
            }
            _ => return Err(bad_binding(entry)),
        }
    }
    let mut lambda = vec![Value::symbol("lambda"), Value::list(names)];
    lambda.extend_from_slice(body);
    let mut call = vec![Value::list(lambda)];
    call.extend(exprs);
    Ok(Value::list(call))
}

fn bad_binding(entry: &Value) -> Error {
    Error::Syntax(format!("ill-formed let binding: {}", entry))
}

/// Rewrite `(quasiquote x)` into `cons`/`append`/`quote` calls, honoring
/// `unquote` and `unquote-splicing`.
fn expand_quasiquote(form: &Value) -> Result<Value, Error> {
    let items = match form.as_list() {
        Some(items) if !items.is_empty() => items,
        _ => return Ok(Value::list(vec![Value::symbol("quote"), form.clone()])),
    };
    if items[0].as_symbol().map(Symbol::as_str) == Some("unquote") {
        require(form, items.len() == 2)?;
        return Ok(items[1].clone());
    }
    let rest = Value::list(items[1..].to_vec());
    if let Some(splice) = items[0].as_list() {
        if !splice.is_empty() && splice[0].as_symbol().map(Symbol::as_str) == Some("unquote-splicing")
        {
            require(&items[0], splice.len() == 2)?;
            return Ok(Value::list(vec![
                Value::symbol("append"),
                splice[1].clone(),
                expand_quasiquote(&rest)?,
            ]));
        }
    }
    Ok(Value::list(vec![
        Value::symbol("cons"),
        expand_quasiquote(&items[0])?,
        expand_quasiquote(&rest)?,
    ]))
}
