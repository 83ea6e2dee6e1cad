// Native function registration: installs `print`, `readFile`, and
// `writeTextToFile` into the VM's globals table before any user code runs.
//
// Each native is a plain `(vm, args) -> Result<Value, RuntimeError>`
// function pointer, registered under its name as an `Obj::Native` global.

use crate::errors::RuntimeError;
use crate::table::Table;
use crate::value::{intern, Obj, ObjNative, Value};
use crate::vm::VM;
use std::fs;
use std::rc::Rc;

pub fn install(globals: &mut Table) {
    register(globals, "print", print);
    register(globals, "readFile", read_file);
    register(globals, "writeTextToFile", write_text_to_file);
}

fn register(globals: &mut Table, name: &str, func: crate::value::NativeFn) {
    let native = Value::Obj(Obj::Native(Rc::new(ObjNative { name: name.to_string(), func })));
    globals.set(intern(name), native);
}

fn print(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    println!("{}", rendered.join(" "));
    Ok(Value::Null)
}

fn read_file(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = match args.first().and_then(Value::as_string) {
        Some(s) => s.bytes.clone(),
        None => {
            eprintln!("readFile: expected a string path");
            return Ok(Value::Null);
        }
    };
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(Value::string(contents)),
        Err(e) => {
            eprintln!("Cannot open file '{}': {}", path, e);
            Ok(Value::Null)
        }
    }
}

fn write_text_to_file(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = match args.first().and_then(Value::as_string) {
        Some(s) => s.bytes.clone(),
        None => {
            eprintln!("writeTextToFile: expected a string path");
            return Ok(Value::Null);
        }
    };
    let data = match args.get(1).and_then(Value::as_string) {
        Some(s) => s.bytes.clone(),
        None => {
            eprintln!("writeTextToFile: expected string data");
            return Ok(Value::Null);
        }
    };
    match fs::write(&path, format!("{}\n", data)) {
        Ok(()) => Ok(Value::Bool(true)),
        Err(e) => {
            eprintln!("Cannot write file '{}': {}", path, e);
            Ok(Value::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_registers_all_three_natives() {
        let mut globals = Table::new();
        install(&mut globals);
        assert!(globals.contains("print"));
        assert!(globals.contains("readFile"));
        assert!(globals.contains("writeTextToFile"));
    }

    #[test]
    fn read_file_reports_missing_path_as_null() {
        let mut vm = VM::new();
        let result = read_file(&mut vm, &[Value::string("/nonexistent/path/does-not-exist")]).unwrap();
        assert!(matches!(result, Value::Null));
    }

    #[test]
    fn write_then_read_round_trips_through_the_filesystem() {
        let mut vm = VM::new();
        let path = std::env::temp_dir().join("mossy_natives_test.txt");
        let path_str = path.to_string_lossy().to_string();
        let result =
            write_text_to_file(&mut vm, &[Value::string(path_str.clone()), Value::string("hello")]).unwrap();
        assert!(matches!(result, Value::Bool(true)));
        let contents = read_file(&mut vm, &[Value::string(path_str)]).unwrap();
        assert!(matches!(contents, Value::Obj(Obj::String(s)) if s.bytes == "hello\n"));
        let _ = fs::remove_file(std::env::temp_dir().join("mossy_natives_test.txt"));
    }
}
