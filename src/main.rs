use std::env;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use ruse::error::Error;
use ruse::{eval, standard_environment, Environment, Expander, Reader, Value};

fn main() -> ExitCode {
    let global = standard_environment();
    let mut expander = Expander::new(global.clone());
    let result = match env::args().nth(1) {
        Some(path) => load(&path, &global, &mut expander),
        None => repl(&global, &mut expander),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ruse: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Run a source file; the first error aborts the load.
fn load(path: &str, global: &Environment, expander: &mut Expander) -> Result<(), Error> {
    let mut reader = Reader::new(BufReader::new(File::open(path)?));
    while let Some(form) = reader.read()? {
        eval(&expander.expand(&form, true)?, global)?;
    }
    Ok(())
}

/// Read-eval-print loop. Errors are reported and the rest of the offending
/// line dropped; definitions made so far stay usable.
fn repl(global: &Environment, expander: &mut Expander) -> Result<(), Error> {
    let stdin = io::stdin();
    let mut reader = Reader::new(stdin.lock());
    loop {
        eprint!("ruse> ");
        io::stderr().flush()?;
        match reader.read() {
            Ok(None) => return Ok(()),
            Ok(Some(form)) => {
                let evaluated = expander
                    .expand(&form, true)
                    .and_then(|form| eval(&form, global));
                match evaluated {
                    Ok(Value::Unspecified) => {}
                    Ok(value) => println!("{}", value),
                    Err(err) => eprintln!("error: {}", err),
                }
            }
            Err(err) => {
                eprintln!("error: {}", err);
                reader.discard_line();
            }
        }
    }
}
