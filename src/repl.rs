use std::io::{BufRead, Write};

use crate::interpreter::{Environment, Evaluator};
use crate::value::Value;

pub const PROMPT: &str = ">> ";

/// Line-oriented read-eval-print loop. Reads until `exit` or end of input.
/// A single top-level environment persists across lines, so bindings and
/// includes accumulate.
pub fn start(
    input: &mut dyn BufRead,
    output: &mut dyn Write,
    evaluator: &Evaluator,
) -> std::io::Result<()> {
    let env = Environment::new();
    let mut line = String::new();

    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }

        let source = line.trim();
        if source == "exit" {
            return Ok(());
        }
        if source.is_empty() {
            continue;
        }

        match evaluator.run(source, "REPL", &env) {
            Err(errors) => {
                for error in errors {
                    writeln!(output, "\t{}", error)?;
                }
            }
            Ok(Value::Error(err)) => {
                writeln!(output, "ERROR: {}", err.message)?;
                for frame in &err.stack {
                    writeln!(output, "\t{}", frame)?;
                }
            }
            Ok(Value::Null) => {}
            Ok(value) => writeln!(output, "{}", value)?,
        }
    }
}
