//! A small Scheme interpreter: reader, macro expander, and a trampoline
//! evaluator with proper tail calls and escape-only continuations.
//!
//! ```
//! use ruse::{eval, read, standard_environment, Expander};
//!
//! let global = standard_environment();
//! let mut expander = Expander::new(global.clone());
//! let form = read("(let ((n 21)) (* n 2))").unwrap();
//! let result = eval(&expander.expand(&form, true).unwrap(), &global).unwrap();
//! assert_eq!(result.to_string(), "42");
//! ```

pub mod builtin;
pub mod equality;
pub mod error;
pub mod eval;
pub mod expand;
pub mod number;
pub mod read;
pub mod runtime;
pub mod value;

pub use builtin::standard_environment;
pub use equality::LispEq;
pub use error::Error;
pub use eval::{apply, eval};
pub use expand::Expander;
pub use number::Number;
pub use read::{read, Reader};
pub use runtime::{Environment, Procedure};
pub use value::{intern, to_display_string, Symbol, Value};
