use std::cmp::Ordering;
use std::fmt;

use num::complex::Complex64;

use crate::error::Error;
use crate::value::Value;

/// A Scheme number in one of the three supported representations. There is
/// no full numeric tower: exact integers promote to inexact on overflow, and
/// any operation touching a complex operand stays complex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Exact(i64),
    Inexact(f64),
    Complex(Complex64),
}

/// A pair of numbers brought to a common representation.
enum Widened {
    Exact(i64, i64),
    Inexact(f64, f64),
    Complex(Complex64, Complex64),
}

fn widen(a: Number, b: Number) -> Widened {
    match (a, b) {
        (Number::Complex(_), _) | (_, Number::Complex(_)) => {
            Widened::Complex(a.to_complex(), b.to_complex())
        }
        (Number::Exact(x), Number::Exact(y)) => Widened::Exact(x, y),
        (Number::Exact(x), Number::Inexact(y)) => Widened::Inexact(x as f64, y),
        (Number::Inexact(x), Number::Exact(y)) => Widened::Inexact(x, y as f64),
        (Number::Inexact(x), Number::Inexact(y)) => Widened::Inexact(x, y),
    }
}

impl Number {
    pub fn from_value(value: &Value) -> Result<Number, Error> {
        match value {
            Value::Exact(n) => Ok(Number::Exact(*n)),
            Value::Inexact(x) => Ok(Number::Inexact(*x)),
            Value::Complex(z) => Ok(Number::Complex(*z)),
            other => Err(Error::TypeMismatch(format!(
                "expected a number, got {} {}",
                other.type_name(),
                other
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Number::Exact(n) => Value::Exact(n),
            Number::Inexact(x) => Value::Inexact(x),
            Number::Complex(z) => Value::Complex(z),
        }
    }

    fn to_complex(self) -> Complex64 {
        match self {
            Number::Exact(n) => Complex64::new(n as f64, 0.0),
            Number::Inexact(x) => Complex64::new(x, 0.0),
            Number::Complex(z) => z,
        }
    }

    /// The real value of a non-complex number, for the math-library
    /// primitives.
    pub fn to_real(self) -> Result<f64, Error> {
        match self {
            Number::Exact(n) => Ok(n as f64),
            Number::Inexact(x) => Ok(x),
            Number::Complex(_) => Err(Error::TypeMismatch(
                "expected a real number, got a complex number".to_string(),
            )),
        }
    }

    pub fn add(self, other: Number) -> Number {
        match widen(self, other) {
            Widened::Exact(a, b) => a
                .checked_add(b)
                .map(Number::Exact)
                .unwrap_or_else(|| Number::Inexact(a as f64 + b as f64)),
            Widened::Inexact(a, b) => Number::Inexact(a + b),
            Widened::Complex(a, b) => Number::Complex(a + b),
        }
    }

    pub fn sub(self, other: Number) -> Number {
        match widen(self, other) {
            Widened::Exact(a, b) => a
                .checked_sub(b)
                .map(Number::Exact)
                .unwrap_or_else(|| Number::Inexact(a as f64 - b as f64)),
            Widened::Inexact(a, b) => Number::Inexact(a - b),
            Widened::Complex(a, b) => Number::Complex(a - b),
        }
    }

    pub fn mul(self, other: Number) -> Number {
        match widen(self, other) {
            Widened::Exact(a, b) => a
                .checked_mul(b)
                .map(Number::Exact)
                .unwrap_or_else(|| Number::Inexact(a as f64 * b as f64)),
            Widened::Inexact(a, b) => Number::Inexact(a * b),
            Widened::Complex(a, b) => Number::Complex(a * b),
        }
    }

    /// Division is true division: exact operands still give an inexact
    /// result.
    pub fn div(self, other: Number) -> Number {
        match widen(self, other) {
            Widened::Exact(a, b) => Number::Inexact(a as f64 / b as f64),
            Widened::Inexact(a, b) => Number::Inexact(a / b),
            Widened::Complex(a, b) => Number::Complex(a / b),
        }
    }

    pub fn neg(self) -> Number {
        Number::Exact(0).sub(self)
    }

    pub fn abs(self) -> Number {
        match self {
            Number::Exact(n) => n
                .checked_abs()
                .map(Number::Exact)
                .unwrap_or_else(|| Number::Inexact(-(n as f64))),
            Number::Inexact(x) => Number::Inexact(x.abs()),
            Number::Complex(z) => Number::Inexact(z.norm()),
        }
    }

    pub fn expt(self, other: Number) -> Number {
        match widen(self, other) {
            Widened::Exact(a, b) => {
                if let Ok(exp) = u32::try_from(b) {
                    if let Some(n) = a.checked_pow(exp) {
                        return Number::Exact(n);
                    }
                }
                Number::Inexact((a as f64).powf(b as f64))
            }
            Widened::Inexact(a, b) => Number::Inexact(a.powf(b)),
            Widened::Complex(a, b) => Number::Complex(a.powc(b)),
        }
    }

    /// Numeric equality across representations, for `=` and `zero?`.
    pub fn num_eq(self, other: Number) -> bool {
        match widen(self, other) {
            Widened::Exact(a, b) => a == b,
            Widened::Inexact(a, b) => a == b,
            Widened::Complex(a, b) => a == b,
        }
    }

    /// Ordering for `< > <= >=`. Complex numbers are not ordered; `None`
    /// means the comparison is undefined (NaN involved).
    pub fn compare(self, other: Number) -> Result<Option<Ordering>, Error> {
        match widen(self, other) {
            Widened::Exact(a, b) => Ok(Some(a.cmp(&b))),
            Widened::Inexact(a, b) => Ok(a.partial_cmp(&b)),
            Widened::Complex(..) => Err(Error::TypeMismatch(
                "complex numbers are not ordered".to_string(),
            )),
        }
    }
}

/// Inexact numbers print with a decimal point so they re-read as inexact.
pub(crate) fn write_float(f: &mut fmt::Formatter, x: f64) -> fmt::Result {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{:.1}", x)
    } else {
        write!(f, "{}", x)
    }
}

/// Complex numbers print as `N+Mi`, the same shape the reader accepts.
pub(crate) fn write_complex(f: &mut fmt::Formatter, z: &Complex64) -> fmt::Result {
    if z.im.is_sign_negative() {
        write!(f, "{}{}i", z.re, z.im)
    } else {
        write!(f, "{}+{}i", z.re, z.im)
    }
}
