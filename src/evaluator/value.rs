use std::{fmt::Display, rc::Rc};

use super::builtins::Builtin;

pub const TRUE: Value = Value::Boolean(true);
pub const FALSE: Value = Value::Boolean(false);
pub const NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Boolean,
    Null,
    String,
    Array,
    Builtin,
    Error,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Integer => write!(f, "INTEGER"),
            ValueKind::Boolean => write!(f, "BOOLEAN"),
            ValueKind::Null => write!(f, "NULL"),
            ValueKind::String => write!(f, "STRING"),
            ValueKind::Array => write!(f, "ARRAY"),
            ValueKind::Builtin => write!(f, "BUILTIN"),
            ValueKind::Error => write!(f, "ERROR"),
        }
    }
}

/// A runtime value.
///
/// Strings, arrays and errors are reference counted: cloning a value shares
/// the allocation, while evaluating a literal again allocates a new one.
/// `is_identical` relies on this to tell the two apart.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Null,
    String(Rc<str>),
    Array(Rc<[Value]>),
    Builtin(&'static Builtin),
    Error(Rc<str>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(elements.into())
    }

    pub fn error(message: impl Into<Rc<str>>) -> Self {
        Value::Error(message.into())
    }

    pub fn from_bool(b: bool) -> Self {
        if b {
            TRUE
        } else {
            FALSE
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Null => ValueKind::Null,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Builtin(_) => ValueKind::Builtin,
            Value::Error(_) => ValueKind::Error,
        }
    }

    /// Only `FALSE` and `NULL` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Identity comparison. Booleans and null compare as the singletons they
    /// are; every other value is only identical to a clone of itself.
    /// Integers never get here since they are compared by value.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Builtin(_) => write!(f, "builtin function"),
            Value::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}
