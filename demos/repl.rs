use foldlisp::ast::Value;
use foldlisp::definitions::{Definition, DefinitionTable};
use foldlisp::tokenizer::Tokenizer;
use foldlisp::{Diagnostic, Engine};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;

fn main() {
    env_logger::init();

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

fn run_repl() {
    println!("foldlisp - interpret or constant-fold S-expressions");
    println!("Enter expressions like: (+ 1 2) or (define square-of x (* x x))");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let mut engine = Engine::new();

    // Host function callable from user code for demonstration purposes
    if let Err(e) = engine.register_builtin_function("help", |_args| {
        print_help();
        Ok(Value::Unspecified)
    }) {
        println!("Error: {e}");
    }

    let mut table = engine.new_table();
    let mut compile_mode = false;

    loop {
        match rl.readline(if compile_mode { "compile> " } else { "foldlisp> " }) {
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
                    ":defs" => {
                        print_definitions(&table);
                        continue;
                    }
                    ":reset" => {
                        table = engine.new_table();
                        println!("Definitions cleared.");
                        continue;
                    }
                    ":compile" => {
                        compile_mode = !compile_mode;
                        if compile_mode {
                            println!("Compiling mode: each line is folded into PUSH operations");
                            println!("  (definitions do not carry over between lines)");
                        } else {
                            println!("Interpreting mode: results shown as values");
                        }
                        continue;
                    }
                    ":tokenizer" => {
                        engine = engine.with_scanner(Tokenizer);
                        println!("Switched to the combinator tokenizer (no comment syntax).");
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                if compile_mode {
                    report(engine.compile_text(line), |text| {
                        if !text.is_empty() {
                            println!("{text}");
                        }
                    });
                } else {
                    report(engine.evaluate_with_table(line, &mut table), |value| {
                        // Don't print Unspecified values (e.g., from define)
                        if !value.is_unspecified() {
                            println!("{value}");
                        }
                    });
                }
            }

            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
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

fn report<T>(result: Result<T, Diagnostic>, show: impl FnOnce(T)) {
    match result {
        Ok(value) => show(value),
        Err(e) => println!("{e}"),
    }
}

fn print_help() {
    println!("foldlisp REPL:");
    println!("  :help      - Show this help message");
    println!("  :defs      - Show the current definitions");
    println!("  :reset     - Forget user definitions");
    println!("  :compile   - Toggle between interpreting and compiling mode");
    println!("  :tokenizer - Switch to the combinator tokenizer");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Language:");
    println!("  Numbers: 42, -2.5    Strings: \"text\" or 'text'    Comments: # to end of line");
    println!("  Arithmetic: + - * / %  (add subtract multiply divide modular)");
    println!("  Bitwise: & | ^ << >> ~");
    println!("  Relations: = != < > <= >=  (equals differs smaller bigger below above)");
    println!("  Logic: && || !  (and or not)");
    println!("  Misc: zero, square, print");
    println!("  Special forms: define, if");
    println!();
    println!("Examples:");
    println!("  (+ 1 2 3)");
    println!("  (define square-of x (* x x))");
    println!("  (square-of 5)");
    println!("  (if (< 1 2 3) \"yes\" \"no\")");
    println!();
}

fn print_definitions(table: &DefinitionTable) {
    let names = table.names();

    if names.is_empty() {
        println!("No definitions.");
        return;
    }

    println!("Definitions ({} total):", names.len());
    println!();

    // Separate native operators from user functions
    let mut natives = Vec::new();
    let mut user_defined = Vec::new();

    for name in names {
        match table.get(name) {
            Some(Definition::UserFunction { params, body }) => {
                user_defined.push((name, params.join(" "), body.to_string()));
            }
            Some(Definition::NativeOperator(_)) => natives.push(name),
            None => {}
        }
    }

    // Print native operators
    if !natives.is_empty() {
        println!("Native operators ({}):", natives.len());
        // Print in columns for readability
        let mut col = 0;
        for name in natives {
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

    // Print user functions
    if !user_defined.is_empty() {
        println!("User functions ({}):", user_defined.len());
        for (name, params, body) in user_defined {
            println!("  ({name} {params}) = {body}");
        }
    }
}
