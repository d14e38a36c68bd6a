use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use rask::cli::{Args, Commands};
use rask::extensions::Registry;
use rask::interpreter::{Environment, Evaluator};
use rask::loader::FileLoader;
use rask::repl;
use rask::Value;
use std::io;
use std::path::Path;
use std::rc::Rc;

fn main() {
    let args = Args::parse();

    if let Some(Commands::Complete { shell }) = args.command {
        let mut cmd = Args::command();
        clap_complete::generate(shell, &mut cmd, "rask", &mut io::stdout());
        return;
    }

    verbose_log(&args, "Starting rask");

    // Plugin discovery is the host's concern; the registry starts empty
    // and embedding applications register their packages before this point.
    let registry = Rc::new(Registry::new());
    let evaluator = Evaluator::new()
        .with_loader(Rc::new(FileLoader::new()))
        .with_registry(registry);

    match &args.script {
        Some(path) => {
            let code = run_script(path, &evaluator, &args);
            std::process::exit(code);
        }
        None => run_interactive(&evaluator, &args),
    }
}

fn run_script(path: &Path, evaluator: &Evaluator, args: &Args) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            error_message(args, &format!("Failed to read {}: {}", path.display(), e));
            return 1;
        }
    };

    verbose_log(
        args,
        &format!("Read {} bytes from {}", source.len(), path.display()),
    );

    let env = Environment::new();
    match evaluator.run(&source, &path.to_string_lossy(), &env) {
        Err(errors) => {
            for error in errors {
                error_message(args, &error);
            }
            1
        }
        Ok(Value::Error(err)) => {
            error_message(args, &format!("ERROR: {}", err.message));
            for frame in &err.stack {
                eprintln!("\t{}", frame);
            }
            1
        }
        Ok(Value::Null) => 0,
        Ok(value) => {
            println!("{}", value);
            0
        }
    }
}

fn run_interactive(evaluator: &Evaluator, args: &Args) {
    println!("rask {}", env!("CARGO_PKG_VERSION"));
    println!("Type any code. Exit with 'exit' or Ctrl+D (Ctrl+Z on Windows).");
    println!();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();

    if let Err(e) = repl::start(&mut input, &mut output, evaluator) {
        error_message(args, &format!("Error reading input: {}", e));
        std::process::exit(1);
    }
}

fn verbose_log(args: &Args, message: &str) {
    if args.verbose {
        eprintln!("[rask:debug] {}", message);
    }
}

fn error_message(args: &Args, message: &str) {
    if args.color_enabled() {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}
