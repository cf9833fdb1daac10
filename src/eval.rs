//! The trampoline evaluator. Tail positions — the last expression of a
//! `begin`, the chosen branch of an `if`, and the body of an applied closure
//! — continue the loop instead of recursing, so deep tail recursion runs in
//! constant stack.

use either::{Either, Left, Right};

use crate::error::Error;
use crate::runtime::{Environment, Escape, Params, ProcKind, Procedure};
use crate::value::Value;

/// Evaluate a macro-expanded form against an environment chain.
pub fn eval(form: &Value, env: &Environment) -> Result<Value, Error> {
    let mut form = form.clone();
    let mut env = env.clone();
    loop {
        let items = match &form {
            Value::Symbol(name) => {
                return env
                    .lookup(name)
                    .ok_or_else(|| Error::UnboundVariable(name.to_string()));
            }
            Value::List(items) => items.clone(),
            other => return Ok(other.clone()),
        };
        if items.is_empty() {
            return Err(Error::NotApplicable("()".to_string()));
        }
        match items[0].as_symbol().map(|sym| sym.as_str()) {
            Some("quote") => {
                if items.len() != 2 {
                    return Err(ill_formed(&form));
                }
                return Ok(items[1].clone());
            }
            Some("if") => {
                if items.len() != 4 {
                    return Err(ill_formed(&form));
                }
                let test = eval(&items[1], &env)?;
                // The chosen branch is in tail position.
                let branch = if test.is_truthy() { 2 } else { 3 };
                form = items[branch].clone();
            }
            Some("set!") => {
                if items.len() != 3 {
                    return Err(ill_formed(&form));
                }
                let name = match items[1].as_symbol() {
                    Some(name) => name.clone(),
                    None => return Err(ill_formed(&form)),
                };
                let value = eval(&items[2], &env)?;
                env.set(&name, value)?;
                return Ok(Value::Unspecified);
            }
            Some("define") => {
                if items.len() != 3 {
                    return Err(ill_formed(&form));
                }
                let name = match items[1].as_symbol() {
                    Some(name) => name.clone(),
                    None => return Err(ill_formed(&form)),
                };
                let value = eval(&items[2], &env)?;
                env.define(&name, value);
                return Ok(Value::Unspecified);
            }
            Some("lambda") => {
                if items.len() != 3 {
                    return Err(ill_formed(&form));
                }
                let params = match Params::parse(&items[1]) {
                    Some(params) => params,
                    None => return Err(ill_formed(&form)),
                };
                return Ok(Value::Procedure(Procedure::closure(
                    params,
                    items[2].clone(),
                    env.clone(),
                )));
            }
            Some("begin") => {
                if items.len() < 2 {
                    return Err(ill_formed(&form));
                }
                for sub in &items[1..items.len() - 1] {
                    eval(sub, &env)?;
                }
                form = items[items.len() - 1].clone();
            }
            _ => {
                // Procedure call: head and arguments left to right, none in
                // tail position.
                let proc = eval(&items[0], &env)?;
                let mut args = Vec::with_capacity(items.len() - 1);
                for sub in &items[1..] {
                    args.push(eval(sub, &env)?);
                }
                match step(&proc, args)? {
                    Left((body, frame)) => {
                        form = body;
                        env = frame;
                    }
                    Right(value) => return Ok(value),
                }
            }
        }
    }
}

/// One application step. A closure callee becomes the next (body, frame)
/// pair for the loop; a native callee runs to completion (primitives are not
/// trampolined).
fn step(proc: &Value, mut args: Vec<Value>) -> Result<Either<(Value, Environment), Value>, Error> {
    let procedure = match proc {
        Value::Procedure(procedure) => procedure,
        other => return Err(Error::NotApplicable(other.to_string())),
    };
    match procedure.kind() {
        ProcKind::Native(native) => Ok(Right((native.func)(args)?)),
        ProcKind::Closure(closure) => {
            let frame = closure.env.child();
            closure.params.bind(args, &frame)?;
            Ok(Left((closure.body.clone(), frame)))
        }
        ProcKind::CallCc => Ok(Right(call_cc(args)?)),
        ProcKind::Escape(escape) => {
            if args.len() != 1 {
                return Err(Error::Arity {
                    expected: 1,
                    got: args.len(),
                });
            }
            if !escape.in_extent() {
                return Err(Error::ContinuationMisuse);
            }
            Err(Error::ContinuationUnwind {
                escape: escape.clone(),
                value: args.swap_remove(0),
            })
        }
    }
}

/// Apply a procedure to arguments, completing the whole call. Used by
/// `call/cc`, the `apply`/`map` primitives, and user macros; unlike the tail
/// step inside `eval`, this consumes stack proportional to nesting.
pub fn apply(proc: &Value, args: Vec<Value>) -> Result<Value, Error> {
    match step(proc, args)? {
        Left((body, frame)) => eval(&body, &frame),
        Right(value) => Ok(value),
    }
}

/// `(call/cc proc)`: apply `proc` to a one-shot escape procedure. An unwind
/// carrying our own handle is this call's result; any other unwind belongs
/// to an enclosing capture and keeps propagating. The handle is disarmed on
/// the way out, so invoking it later is a misuse error rather than a jump.
fn call_cc(mut args: Vec<Value>) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(Error::Arity {
            expected: 1,
            got: args.len(),
        });
    }
    let proc = args.swap_remove(0);
    let escape = Escape::new();
    let handle = Value::Procedure(Procedure::escape(escape.clone()));
    let result = apply(&proc, vec![handle]);
    escape.disarm();
    match result {
        Err(Error::ContinuationUnwind { escape: thrown, value }) if thrown.is(&escape) => Ok(value),
        other => other,
    }
}

fn ill_formed(form: &Value) -> Error {
    Error::Syntax(format!("ill-formed special form: {}", form))
}

#[cfg(test)]
mod test {
    use super::eval;
    use crate::builtin::standard_environment;
    use crate::error::Error;
    use crate::expand::Expander;
    use crate::read::Reader;
    use crate::value::Value;

    fn run(source: &str) -> Result<Value, Error> {
        let global = standard_environment();
        let mut expander = Expander::new(global.clone());
        let mut reader = Reader::new(source.as_bytes());
        let mut result = Value::Unspecified;
        while let Some(form) = reader.read()? {
            result = eval(&expander.expand(&form, true)?, &global)?;
        }
        Ok(result)
    }

    fn run_ok(source: &str) -> Value {
        match run(source) {
            Ok(value) => value,
            Err(err) => panic!("{} failed: {}", source, err),
        }
    }

    #[test]
    fn self_evaluating_forms() {
        assert_eq!(run_ok("42"), Value::Exact(42));
        assert_eq!(run_ok("#f"), Value::Bool(false));
        assert_eq!(run_ok("\"s\""), Value::Str("s".to_string()));
    }

    #[test]
    fn quote_returns_the_form_unevaluated() {
        assert_eq!(
            run_ok("'(1 x)"),
            Value::list(vec![Value::Exact(1), Value::symbol("x")])
        );
    }

    #[test]
    fn if_branches_and_arity() {
        assert_eq!(run_ok("(if #t 1 2)"), Value::Exact(1));
        assert_eq!(run_ok("(if #f 1 2)"), Value::Exact(2));
        // Only #f is false.
        assert_eq!(run_ok("(if 0 1 2)"), Value::Exact(1));
        assert!(matches!(run("(if #t 1)"), Err(Error::Syntax(_))));
    }

    #[test]
    fn define_and_lexical_scope() {
        assert_eq!(
            run_ok("(begin (define x 1) ((lambda () (define x 2) x)))"),
            Value::Exact(2)
        );
        // The inner define does not leak outward.
        assert_eq!(
            run_ok("(begin (define x 1) ((lambda () (define x 2) x)) x)"),
            Value::Exact(1)
        );
    }

    #[test]
    fn set_walks_to_the_defining_frame() {
        assert_eq!(
            run_ok("(begin (define x 1) (define f (lambda () x)) (set! x 2) (f))"),
            Value::Exact(2)
        );
        assert!(matches!(run("(set! nope 1)"), Err(Error::UnboundVariable(_))));
    }

    #[test]
    fn closures_capture_their_environment() {
        assert_eq!(
            run_ok(
                "(begin
                   (define counter
                     (lambda ()
                       (define n 0)
                       (lambda () (set! n (+ n 1)) n)))
                   (define c (counter))
                   (c) (c) (c))"
            ),
            Value::Exact(3)
        );
    }

    #[test]
    fn variadic_parameters_bind_the_whole_list() {
        assert_eq!(
            run_ok("((lambda args args) 1 2 3)"),
            Value::list(vec![Value::Exact(1), Value::Exact(2), Value::Exact(3)])
        );
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        assert!(matches!(
            run("((lambda (a b) a) 1)"),
            Err(Error::Arity { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn calling_a_non_procedure_fails() {
        assert!(matches!(run("(1 2)"), Err(Error::NotApplicable(_))));
        assert!(matches!(run("()"), Err(Error::NotApplicable(_))));
    }

    #[test]
    fn unbound_variable_leaves_environment_usable() {
        let global = standard_environment();
        let mut expander = Expander::new(global.clone());
        let run_in = |expander: &mut Expander, source: &str| {
            let form = crate::read::read(source)?;
            eval(&expander.expand(&form, true)?, &global)
        };
        assert!(matches!(
            run_in(&mut expander, "(foo)"),
            Err(Error::UnboundVariable(_))
        ));
        assert_eq!(
            run_in(&mut expander, "(begin (define x 7) x)").unwrap(),
            Value::Exact(7)
        );
    }

    #[test]
    fn deep_tail_recursion_runs_in_constant_stack() {
        assert_eq!(
            run_ok(
                "(begin
                   (define countdown
                     (lambda (n) (if (= n 0) 'done (countdown (- n 1)))))
                   (countdown 100000))"
            ),
            Value::symbol("done")
        );
    }

    #[test]
    fn begin_requires_at_least_one_expression() {
        assert!(matches!(run("(begin)"), Err(Error::Syntax(_))));
    }

    #[test]
    fn call_cc_escapes_pending_computation() {
        assert_eq!(
            run_ok("(+ 1 (call/cc (lambda (k) (k 10) 999)))"),
            Value::Exact(11)
        );
        // Normal return works too.
        assert_eq!(
            run_ok("(+ 1 (call/cc (lambda (k) 10)))"),
            Value::Exact(11)
        );
    }

    #[test]
    fn nested_captures_match_by_identity() {
        assert_eq!(
            run_ok(
                "(call/cc (lambda (outer)
                   (+ 1 (call/cc (lambda (inner) (outer 10))))))"
            ),
            Value::Exact(10)
        );
    }

    #[test]
    fn escape_after_extent_is_a_misuse_error() {
        assert!(matches!(
            run(
                "(begin
                   (define saved #f)
                   (+ 1 (call/cc (lambda (k) (set! saved k) 1)))
                   (saved 5))"
            ),
            Err(Error::ContinuationMisuse)
        ));
    }

    #[test]
    fn derived_syntax_evaluates() {
        assert_eq!(run_ok("(and)"), Value::Bool(true));
        assert_eq!(run_ok("(and 1)"), Value::Exact(1));
        assert_eq!(run_ok("(and 1 #f 2)"), Value::Bool(false));
        assert_eq!(run_ok("(let ((a 1) (b 2)) (+ a b))"), Value::Exact(3));
    }

    #[test]
    fn quasiquote_evaluates_unquoted_parts() {
        assert_eq!(
            run_ok("`(1 ,(+ 1 1) ,@(list 3 4))"),
            Value::list(vec![
                Value::Exact(1),
                Value::Exact(2),
                Value::Exact(3),
                Value::Exact(4),
            ])
        );
    }

    #[test]
    fn define_macro_installs_expansion_procedure() {
        assert_eq!(
            run_ok(
                "(begin
                   (define-macro swap-args
                     (lambda (f a b) (list f b a)))
                   (swap-args - 10 1))"
            ),
            Value::Exact(-9)
        );
    }
}
