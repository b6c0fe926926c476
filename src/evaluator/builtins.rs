use std::io::Write;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use super::value::{Value, NULL};

pub type BuiltinFn = fn(&[Value], &mut dyn Write) -> Value;

/// A native function reachable by name. The output sink is the evaluator's
/// stdout.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    function: BuiltinFn,
}

impl Builtin {
    /// Calls the builtin, checking the arity first. Contract violations come
    /// back as `Value::Error`.
    pub fn call(&self, args: &[Value], stdout: &mut dyn Write) -> Value {
        if args.len() != self.arity {
            return Value::error(format!(
                "wrong number of arguments. got={}, want={}",
                args.len(),
                self.arity
            ));
        }
        (self.function)(args, stdout)
    }
}

static BUILTINS: Lazy<FxHashMap<&'static str, Builtin>> = Lazy::new(|| {
    [
        Builtin {
            name: "len",
            arity: 1,
            function: len,
        },
        Builtin {
            name: "print",
            arity: 1,
            function: print,
        },
    ]
    .into_iter()
    .map(|builtin| (builtin.name, builtin))
    .collect()
});

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.get(name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

fn len(args: &[Value], _: &mut dyn Write) -> Value {
    match &args[0] {
        Value::String(s) => Value::Integer(s.len() as i64),
        Value::Array(elements) => Value::Integer(elements.len() as i64),
        other => Value::error(format!(
            "argument to `len` not supported, got {}",
            other.kind()
        )),
    }
}

fn print(args: &[Value], stdout: &mut dyn Write) -> Value {
    match writeln!(stdout, "{}", args[0]) {
        Ok(()) => NULL,
        Err(e) => Value::error(format!("failed to write output: {}", e)),
    }
}
