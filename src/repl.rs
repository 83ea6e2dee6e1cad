// Interactive read-eval-print loop. One VM instance persists for the whole
// session, so `var` declarations and functions from earlier lines stay
// visible to later ones.

use crate::vm::VM;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut editor = DefaultEditor::new()?;
    let mut vm = VM::new();

    println!("{}", "mossy".bright_cyan().bold());
    println!("{}", "Type `exit` or press Ctrl+D to quit.".dimmed());

    loop {
        match editor.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "exit" {
                    break;
                }
                let _ = editor.add_history_entry(line.as_str());
                if let Err(e) = crate::interpret(&line, &mut vm) {
                    println!("{} {}", "error:".bright_red(), e);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("readline error: {}", err);
                break;
            }
        }
    }

    Ok(())
}
