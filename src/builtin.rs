//! The standard global environment: numeric, list, predicate and
//! higher-order primitives, all installed as native procedures.

use std::cmp::Ordering;

use maplit::hashmap;

use crate::equality::LispEq;
use crate::error::Error;
use crate::eval;
use crate::number::Number;
use crate::runtime::{Environment, NativeFn, Procedure};
use crate::value::{intern, Value};

/// A unary primitive over reals, named after the `f64` method it wraps.
macro_rules! real_fn {
    ($name:expr, $method:ident) => {
        native($name, |args| {
            let x = Number::from_value(&one(args)?)?.to_real()?;
            Ok(Value::Inexact(x.$method()))
        })
    };
}

/// A fresh global environment with every primitive bound. Each call builds
/// an independent toplevel.
pub fn standard_environment() -> Environment {
    Environment::from_bindings(hashmap! {
        intern("+") => native("+", sum),
        intern("-") => native("-", difference),
        intern("*") => native("*", product),
        intern("/") => native("/", quotient),
        intern("=") => native("=", num_eq_chain),
        intern("<") => native("<", |args| numeric_chain(args, |ord| ord == Some(Ordering::Less))),
        intern(">") => native(">", |args| numeric_chain(args, |ord| ord == Some(Ordering::Greater))),
        intern("<=") => native("<=", |args| numeric_chain(args, |ord| matches!(ord, Some(Ordering::Less | Ordering::Equal)))),
        intern(">=") => native(">=", |args| numeric_chain(args, |ord| matches!(ord, Some(Ordering::Greater | Ordering::Equal)))),

        intern("cons") => native("cons", cons),
        intern("car") => native("car", car),
        intern("cdr") => native("cdr", cdr),
        intern("list") => native("list", |args| Ok(Value::list(args))),
        intern("length") => native("length", length),
        intern("append") => native("append", append),
        intern("reverse") => native("reverse", reverse),
        intern("list-ref") => native("list-ref", list_ref),

        intern("null?") => native("null?", |args| {
            Ok(Value::Bool(matches!(one(args)?.as_list(), Some([]))))
        }),
        intern("pair?") => native("pair?", |args| {
            Ok(Value::Bool(matches!(one(args)?.as_list(), Some([_, ..]))))
        }),
        intern("list?") => native("list?", |args| {
            Ok(Value::Bool(one(args)?.as_list().is_some()))
        }),
        intern("symbol?") => native("symbol?", |args| {
            Ok(Value::Bool(matches!(one(args)?, Value::Symbol(_))))
        }),
        intern("string?") => native("string?", |args| {
            Ok(Value::Bool(matches!(one(args)?, Value::Str(_))))
        }),
        intern("boolean?") => native("boolean?", |args| {
            Ok(Value::Bool(matches!(one(args)?, Value::Bool(_))))
        }),
        intern("number?") => native("number?", |args| {
            Ok(Value::Bool(Number::from_value(&one(args)?).is_ok()))
        }),
        intern("procedure?") => native("procedure?", |args| {
            Ok(Value::Bool(matches!(one(args)?, Value::Procedure(_))))
        }),
        intern("not") => native("not", |args| Ok(Value::Bool(!one(args)?.is_truthy()))),
        intern("eq?") => native("eq?", |args| {
            let (a, b) = two(args)?;
            Ok(Value::Bool(a.identical(&b)))
        }),
        intern("equal?") => native("equal?", |args| {
            let (a, b) = two(args)?;
            Ok(Value::Bool(a.equal(&b)))
        }),

        intern("zero?") => native("zero?", |args| {
            Ok(Value::Bool(Number::from_value(&one(args)?)?.num_eq(Number::Exact(0))))
        }),
        intern("positive?") => native("positive?", |args| sign_test(args, Ordering::Greater)),
        intern("negative?") => native("negative?", |args| sign_test(args, Ordering::Less)),
        intern("odd?") => native("odd?", |args| parity_test(args, 1)),
        intern("even?") => native("even?", |args| parity_test(args, 0)),

        intern("abs") => native("abs", |args| {
            Ok(Number::from_value(&one(args)?)?.abs().into_value())
        }),
        intern("min") => native("min", |args| extremum(args, Ordering::Less)),
        intern("max") => native("max", |args| extremum(args, Ordering::Greater)),
        intern("expt") => native("expt", |args| {
            let (base, exp) = two(args)?;
            Ok(Number::from_value(&base)?.expt(Number::from_value(&exp)?).into_value())
        }),
        intern("sqrt") => real_fn!("sqrt", sqrt),
        intern("exp") => real_fn!("exp", exp),
        intern("log") => real_fn!("log", ln),
        intern("sin") => real_fn!("sin", sin),
        intern("cos") => real_fn!("cos", cos),
        intern("tan") => real_fn!("tan", tan),
        intern("asin") => real_fn!("asin", asin),
        intern("acos") => real_fn!("acos", acos),
        intern("atan") => real_fn!("atan", atan),
        intern("floor") => real_fn!("floor", floor),
        intern("ceiling") => real_fn!("ceiling", ceil),
        intern("round") => real_fn!("round", round),
        intern("truncate") => real_fn!("truncate", trunc),
        intern("pi") => Value::Inexact(std::f64::consts::PI),
        intern("e") => Value::Inexact(std::f64::consts::E),

        intern("apply") => native("apply", apply),
        intern("map") => native("map", map),

        intern("call/cc") => Value::Procedure(Procedure::call_cc()),
        intern("call-with-current-continuation") => Value::Procedure(Procedure::call_cc()),
    })
}

fn native(name: &'static str, func: NativeFn) -> Value {
    Value::Procedure(Procedure::native(name, func))
}

fn expect_arity(args: &[Value], expected: usize) -> Result<(), Error> {
    if args.len() != expected {
        return Err(Error::Arity {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn one(mut args: Vec<Value>) -> Result<Value, Error> {
    expect_arity(&args, 1)?;
    Ok(args.swap_remove(0))
}

fn two(mut args: Vec<Value>) -> Result<(Value, Value), Error> {
    expect_arity(&args, 2)?;
    let second = args.swap_remove(1);
    let first = args.swap_remove(0);
    Ok((first, second))
}

fn expect_list<'a>(value: &'a Value, who: &str) -> Result<&'a [Value], Error> {
    value.as_list().ok_or_else(|| {
        Error::TypeMismatch(format!("{}: expected a list, got {} {}", who, value.type_name(), value))
    })
}

fn sum(args: Vec<Value>) -> Result<Value, Error> {
    let mut acc = Number::Exact(0);
    for arg in &args {
        acc = acc.add(Number::from_value(arg)?);
    }
    Ok(acc.into_value())
}

fn product(args: Vec<Value>) -> Result<Value, Error> {
    let mut acc = Number::Exact(1);
    for arg in &args {
        acc = acc.mul(Number::from_value(arg)?);
    }
    Ok(acc.into_value())
}

/// `(- x)` negates; `(- x y ...)` subtracts the rest from `x`.
fn difference(args: Vec<Value>) -> Result<Value, Error> {
    let (first, rest) = split_first(&args)?;
    if rest.is_empty() {
        return Ok(first.neg().into_value());
    }
    let mut acc = first;
    for arg in rest {
        acc = acc.sub(Number::from_value(arg)?);
    }
    Ok(acc.into_value())
}

/// `(/ x)` is the reciprocal; `(/ x y ...)` divides `x` by the rest.
fn quotient(args: Vec<Value>) -> Result<Value, Error> {
    let (first, rest) = split_first(&args)?;
    if rest.is_empty() {
        return Ok(Number::Exact(1).div(first).into_value());
    }
    let mut acc = first;
    for arg in rest {
        acc = acc.div(Number::from_value(arg)?);
    }
    Ok(acc.into_value())
}

fn split_first(args: &[Value]) -> Result<(Number, &[Value]), Error> {
    match args.split_first() {
        Some((first, rest)) => Ok((Number::from_value(first)?, rest)),
        None => Err(Error::Arity {
            expected: 1,
            got: 0,
        }),
    }
}

/// `=` chains across all operands, complex included.
fn num_eq_chain(args: Vec<Value>) -> Result<Value, Error> {
    let mut prev: Option<Number> = None;
    for arg in &args {
        let n = Number::from_value(arg)?;
        if let Some(p) = prev {
            if !p.num_eq(n) {
                return Ok(Value::Bool(false));
            }
        }
        prev = Some(n);
    }
    Ok(Value::Bool(true))
}

/// Shared chain for the ordering comparisons. A `None` ordering (NaN) fails
/// the chain rather than erroring.
fn numeric_chain(args: Vec<Value>, accept: fn(Option<Ordering>) -> bool) -> Result<Value, Error> {
    let mut prev: Option<Number> = None;
    for arg in &args {
        let n = Number::from_value(arg)?;
        if let Some(p) = prev {
            if !accept(p.compare(n)?) {
                return Ok(Value::Bool(false));
            }
        }
        prev = Some(n);
    }
    Ok(Value::Bool(true))
}

fn sign_test(args: Vec<Value>, wanted: Ordering) -> Result<Value, Error> {
    let n = Number::from_value(&one(args)?)?;
    Ok(Value::Bool(n.compare(Number::Exact(0))? == Some(wanted)))
}

fn parity_test(args: Vec<Value>, remainder: i64) -> Result<Value, Error> {
    match one(args)? {
        Value::Exact(n) => Ok(Value::Bool(n.rem_euclid(2) == remainder)),
        other => Err(Error::TypeMismatch(format!(
            "expected an exact integer, got {} {}",
            other.type_name(),
            other
        ))),
    }
}

fn extremum(args: Vec<Value>, wanted: Ordering) -> Result<Value, Error> {
    let (mut best, rest) = split_first(&args)?;
    for arg in rest {
        let n = Number::from_value(arg)?;
        match n.compare(best)? {
            Some(ord) if ord == wanted => best = n,
            Some(_) => {}
            None => {
                return Err(Error::TypeMismatch(
                    "unordered comparison".to_string(),
                ))
            }
        }
    }
    Ok(best.into_value())
}

/// `cons` prepends onto a list, building a fresh vector. There are no
/// improper pairs, so the tail must itself be a list.
fn cons(args: Vec<Value>) -> Result<Value, Error> {
    let (head, tail) = two(args)?;
    let tail = expect_list(&tail, "cons")?;
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(head);
    items.extend_from_slice(tail);
    Ok(Value::list(items))
}

fn car(args: Vec<Value>) -> Result<Value, Error> {
    let value = one(args)?;
    match expect_list(&value, "car")?.first() {
        Some(head) => Ok(head.clone()),
        None => Err(Error::TypeMismatch("car: the empty list has no head".to_string())),
    }
}

fn cdr(args: Vec<Value>) -> Result<Value, Error> {
    let value = one(args)?;
    match expect_list(&value, "cdr")?.split_first() {
        Some((_, tail)) => Ok(Value::list(tail.to_vec())),
        None => Err(Error::TypeMismatch("cdr: the empty list has no tail".to_string())),
    }
}

fn length(args: Vec<Value>) -> Result<Value, Error> {
    let value = one(args)?;
    Ok(Value::Exact(expect_list(&value, "length")?.len() as i64))
}

fn append(args: Vec<Value>) -> Result<Value, Error> {
    let mut items = Vec::new();
    for arg in &args {
        items.extend_from_slice(expect_list(arg, "append")?);
    }
    Ok(Value::list(items))
}

fn reverse(args: Vec<Value>) -> Result<Value, Error> {
    let value = one(args)?;
    let mut items = expect_list(&value, "reverse")?.to_vec();
    items.reverse();
    Ok(Value::list(items))
}

fn list_ref(args: Vec<Value>) -> Result<Value, Error> {
    let (value, index) = two(args)?;
    let items = expect_list(&value, "list-ref")?;
    let index = match index {
        Value::Exact(n) if n >= 0 => n as usize,
        other => {
            return Err(Error::TypeMismatch(format!(
                "list-ref: expected a non-negative index, got {}",
                other
            )))
        }
    };
    items.get(index).cloned().ok_or_else(|| {
        Error::TypeMismatch(format!(
            "list-ref: index {} out of range for a list of {}",
            index,
            items.len()
        ))
    })
}

/// `(apply proc args)`: call `proc` with the elements of `args`.
fn apply(args: Vec<Value>) -> Result<Value, Error> {
    let (proc, arg_list) = two(args)?;
    let arg_list = expect_list(&arg_list, "apply")?.to_vec();
    eval::apply(&proc, arg_list)
}

/// `(map proc list ...)`: apply `proc` elementwise. With several lists the
/// shortest one bounds the result.
fn map(mut args: Vec<Value>) -> Result<Value, Error> {
    if args.len() < 2 {
        return Err(Error::Arity {
            expected: 2,
            got: args.len(),
        });
    }
    let proc = args.remove(0);
    let lists = args
        .iter()
        .map(|arg| expect_list(arg, "map"))
        .collect::<Result<Vec<_>, Error>>()?;
    let len = lists.iter().map(|list| list.len()).min().unwrap_or(0);
    let mut results = Vec::with_capacity(len);
    for i in 0..len {
        let row = lists.iter().map(|list| list[i].clone()).collect();
        results.push(eval::apply(&proc, row)?);
    }
    Ok(Value::list(results))
}

#[cfg(test)]
mod test {
    use super::standard_environment;
    use crate::error::Error;
    use crate::eval::eval;
    use crate::read::read;
    use crate::value::{to_display_string, Value};

    fn run(source: &str) -> Result<Value, Error> {
        eval(&read(source)?, &standard_environment())
    }

    fn run_ok(source: &str) -> String {
        match run(source) {
            Ok(value) => to_display_string(&value),
            Err(err) => panic!("{} failed: {}", source, err),
        }
    }

    #[test]
    fn arithmetic_folds() {
        assert_eq!(run_ok("(+ 1 2 3)"), "6");
        assert_eq!(run_ok("(+)"), "0");
        assert_eq!(run_ok("(*)"), "1");
        assert_eq!(run_ok("(- 10 1 2)"), "7");
        assert_eq!(run_ok("(- 5)"), "-5");
        assert_eq!(run_ok("(/ 1 2)"), "0.5");
        assert_eq!(run_ok("(/ 2)"), "0.5");
    }

    #[test]
    fn mixed_exactness() {
        assert_eq!(run_ok("(+ 1 0.5)"), "1.5");
        assert_eq!(run_ok("(* 2 1+1i)"), "2+2i");
    }

    #[test]
    fn comparison_chains() {
        assert_eq!(run_ok("(< 1 2 3)"), "#t");
        assert_eq!(run_ok("(< 1 3 2)"), "#f");
        assert_eq!(run_ok("(= 2 2.0)"), "#t");
        assert_eq!(run_ok("(>= 3 3 2)"), "#t");
        assert!(matches!(run("(< 1 1+1i)"), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn list_operations() {
        assert_eq!(run_ok("(cons 1 '(2 3))"), "(1 2 3)");
        assert_eq!(run_ok("(car '(1 2))"), "1");
        assert_eq!(run_ok("(cdr '(1 2))"), "(2)");
        assert_eq!(run_ok("(length '(a b c))"), "3");
        assert_eq!(run_ok("(append '(1) '() '(2 3))"), "(1 2 3)");
        assert_eq!(run_ok("(reverse '(1 2 3))"), "(3 2 1)");
        assert_eq!(run_ok("(list-ref '(a b c) 1)"), "b");
    }

    #[test]
    fn cons_rejects_improper_tails() {
        assert!(matches!(run("(cons 1 2)"), Err(Error::TypeMismatch(_))));
        assert!(matches!(run("(car '())"), Err(Error::TypeMismatch(_))));
        assert!(matches!(run("(cdr '())"), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn predicates() {
        assert_eq!(run_ok("(null? '())"), "#t");
        assert_eq!(run_ok("(null? '(1))"), "#f");
        assert_eq!(run_ok("(pair? '(1))"), "#t");
        assert_eq!(run_ok("(pair? '())"), "#f");
        assert_eq!(run_ok("(symbol? 'x)"), "#t");
        assert_eq!(run_ok("(number? 1+2i)"), "#t");
        assert_eq!(run_ok("(procedure? car)"), "#t");
        assert_eq!(run_ok("(not #f)"), "#t");
        assert_eq!(run_ok("(not 0)"), "#f");
    }

    #[test]
    fn numeric_predicates() {
        assert_eq!(run_ok("(zero? 0.0)"), "#t");
        assert_eq!(run_ok("(positive? 2)"), "#t");
        assert_eq!(run_ok("(negative? -2)"), "#t");
        assert_eq!(run_ok("(odd? -3)"), "#t");
        assert_eq!(run_ok("(even? 4)"), "#t");
    }

    #[test]
    fn identity_and_structural_equality() {
        assert_eq!(run_ok("(eq? 'a 'a)"), "#t");
        assert_eq!(run_ok("(eq? '() '())"), "#t");
        assert_eq!(run_ok("(eq? '(1) '(1))"), "#f");
        assert_eq!(run_ok("(equal? '(1 (2)) '(1 (2)))"), "#t");
        assert_eq!(run_ok("(equal? 1 1.0)"), "#f");
    }

    #[test]
    fn math_library() {
        assert_eq!(run_ok("(sqrt 4)"), "2.0");
        assert_eq!(run_ok("(abs -2)"), "2");
        assert_eq!(run_ok("(min 3 1 2)"), "1");
        assert_eq!(run_ok("(max 3 1 2)"), "3");
        assert_eq!(run_ok("(expt 2 10)"), "1024");
        assert_eq!(run_ok("(floor 2.7)"), "2.0");
        assert_eq!(run_ok("(cos 0)"), "1.0");
    }

    #[test]
    fn higher_order_primitives() {
        assert_eq!(run_ok("(apply + '(1 2 3))"), "6");
        assert_eq!(run_ok("(map car '((1 2) (3 4)))"), "(1 3)");
        assert_eq!(run_ok("(map + '(1 2) '(10 20))"), "(11 22)");
    }

    #[test]
    fn arity_errors_from_primitives() {
        assert!(matches!(run("(car)"), Err(Error::Arity { expected: 1, got: 0 })));
        assert!(matches!(run("(-)"), Err(Error::Arity { expected: 1, got: 0 })));
    }
}
