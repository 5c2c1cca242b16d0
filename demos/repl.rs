use egglang::Value;
use egglang::evaluator::{self, Environment};
use egglang::json::{ast_to_json_string, parse_json_ast};
use egglang::parser::parse;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("EGG_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = std::env::args().nth(1) {
        run_file(&path);
        return;
    }

    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

/// Run a whole program file; the value of the program is not printed
fn run_file(path: &str) {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Cannot read {path}: {e}");
            process::exit(1);
        }
    };

    let global = evaluator::create_global_env();
    if let Err(e) = evaluator::run(&source, &global) {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn run_repl() {
    println!("Egg - a tiny expression language");
    println!("Enter expressions like: +(1, 2)");
    println!("Enter JSON syntax trees like: {{\"type\":\"word\",\"name\":\"true\"}}");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Could not initialize REPL: {e}");
            process::exit(1);
        }
    };

    let global = evaluator::create_global_env();
    // One scope for the whole session so definitions persist across lines
    let scope = Environment::with_parent(&global);

    let mut show_ast = false;
    let mut show_json = false;

    loop {
        match rl.readline("egg> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                // Add the line to history
                let _ = rl.add_history_entry(line);

                // Handle special commands
                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&scope);
                        continue;
                    }
                    ":ast" => {
                        show_ast = !show_ast;
                        println!("Syntax tree display {}", on_off(show_ast));
                        continue;
                    }
                    ":json" => {
                        show_json = !show_json;
                        println!("JSON syntax tree display {}", on_off(show_json));
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                let parsed = if line.starts_with('{') {
                    parse_json_ast(line)
                } else {
                    parse(line)
                };

                let result = parsed.and_then(|node| {
                    if show_ast {
                        println!("→ {node:?}");
                    }
                    if show_json {
                        println!("→ {}", ast_to_json_string(&node));
                    }
                    evaluator::eval(&node, &scope)
                });

                match result {
                    Ok(value) => println!("{value}"),
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn print_help() {
    println!("Egg Interpreter:");
    println!("  :help  - Show this help message");
    println!("  :env   - Show current environment bindings");
    println!("  :ast   - Toggle display of the parsed syntax tree");
    println!("  :json  - Toggle display of the syntax tree as JSON");
    println!("  :quit  - Exit the interpreter");
    println!("  :exit  - Exit the interpreter");
    println!("  Ctrl+C - Exit the interpreter");
    println!();
    println!("Syntax:");
    println!("  Numbers: 42       Strings: \"text\"      Words: x, +, total");
    println!("  Calls: op(arg, arg, ...), chainable as f(1)(2)");
    println!("  Comments: # to end of line");
    println!();
    println!("Special forms:");
    println!("  if(cond, then, else)   while(cond, body)   do(expr, ...)");
    println!("  define(name, value)    set(name, value)    fun(param, ..., body)");
    println!();
    println!("Examples:");
    println!("  define(plusOne, fun(a, +(a, 1)))");
    println!("  plusOne(10)");
    println!("  length(array(1, 2, 3))");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate built-in functions from user-defined values
    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::Builtin { .. } => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Built-in functions ({}):", builtins.len());
        // Print in columns for readability
        let mut col = 0;
        for name in builtins {
            print!("  {name:<15}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("Values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
