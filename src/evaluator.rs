pub mod builtins;
mod value;

use std::{
    cell::RefCell,
    fmt::{Debug, Display},
    rc::Rc,
};

use crate::ast::{Block, Expression, InfixOperator, PrefixOperator, Program, Statement};

pub use self::value::{Value, ValueKind, FALSE, NULL, TRUE};

/// Tree-walking evaluator.
///
/// Evaluation never fails at the host level: illegal operations produce
/// `NULL` or a `Value::Error`. Recursion depth follows the nesting depth of
/// the tree unless a ceiling is set with [`Evaluator::with_max_depth`].
#[derive(Clone)]
pub struct Evaluator {
    stdout: Rc<RefCell<dyn std::io::Write>>,
    max_depth: Option<usize>,
    depth: usize,
}

impl Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("max_depth", &self.max_depth)
            .field("depth", &self.depth)
            .finish()
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Rc::new(RefCell::new(std::io::stdout())))
    }
}

impl Evaluator {
    pub fn new(stdout: Rc<RefCell<dyn std::io::Write>>) -> Self {
        Self {
            stdout,
            max_depth: None,
            depth: 0,
        }
    }

    /// Turns nesting deeper than `max_depth` nodes into an error value
    /// instead of exhausting the stack.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Evaluates every statement in order and returns the value of the last
    /// one, or `NULL` for an empty program.
    pub fn evaluate(&mut self, program: &Program) -> Value {
        self.depth = 0;
        self.evaluate_statements(&program.0)
    }

    pub fn evaluate_statement(&mut self, stmt: &Statement) -> Value {
        self.nested(stmt, |_self| match stmt {
            Statement::Expression(expr) => _self.evaluate_expression(expr),
            Statement::Block(block) => _self.evaluate_block(block),
        })
    }

    pub fn evaluate_expression(&mut self, expr: &Expression) -> Value {
        self.nested(expr, |_self| match expr {
            Expression::Integer(n) => Value::Integer(*n),
            Expression::Boolean(b) => Value::from_bool(*b),
            Expression::String(s) => Value::string(s.as_str()),
            Expression::Array(elements) => Value::array(
                elements
                    .iter()
                    .map(|element| _self.evaluate_expression(element))
                    .collect(),
            ),
            Expression::Identifier(name) => identifier(name),
            Expression::Prefix(op, right) => {
                let right = _self.evaluate_expression(right);
                prefix(*op, right)
            }
            Expression::Infix(left, op, right) => {
                let left = _self.evaluate_expression(left);
                let right = _self.evaluate_expression(right);
                infix(*op, left, right)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                if _self.evaluate_expression(condition).is_truthy() {
                    _self.evaluate_block(consequence)
                } else if let Some(alternative) = alternative {
                    _self.evaluate_block(alternative)
                } else {
                    NULL
                }
            }
            Expression::Call(callee, args) => {
                let callee = _self.evaluate_expression(callee);
                let args = args
                    .iter()
                    .map(|arg| _self.evaluate_expression(arg))
                    .collect::<Vec<_>>();
                _self.call(callee, &args)
            }
        })
    }

    fn evaluate_block(&mut self, block: &Block) -> Value {
        self.evaluate_statements(&block.0)
    }

    fn evaluate_statements(&mut self, statements: &[Statement]) -> Value {
        let mut result = NULL;
        for statement in statements {
            result = self.evaluate_statement(statement);
        }
        result
    }

    fn call(&mut self, callee: Value, args: &[Value]) -> Value {
        match callee {
            Value::Builtin(builtin) => builtin.call(args, &mut *self.stdout.borrow_mut()),
            Value::Error(_) => callee,
            other => Value::error(format!("not a function: {}", other.kind())),
        }
    }

    #[cfg_attr(not(feature = "trace"), allow(unused_variables))]
    fn nested<N: Display>(&mut self, node: &N, f: impl FnOnce(&mut Self) -> Value) -> Value {
        if let Some(max_depth) = self.max_depth {
            if self.depth >= max_depth {
                return Value::error(format!(
                    "maximum evaluation depth of {} exceeded",
                    max_depth
                ));
            }
        }

        #[cfg(feature = "trace")]
        eprintln!("{:indent$}> {}", "", node, indent = self.depth * 2);

        self.depth += 1;
        let value = f(self);
        self.depth -= 1;

        #[cfg(feature = "trace")]
        eprintln!("{:indent$}< {}", "", value, indent = self.depth * 2);

        value
    }
}

/// Bindings live outside this evaluator, so the only names that resolve are
/// the builtins.
fn identifier(name: &str) -> Value {
    match builtins::lookup(name) {
        Some(builtin) => Value::Builtin(builtin),
        None => Value::error(format!("identifier not found: {}", name)),
    }
}

fn prefix(op: PrefixOperator, right: Value) -> Value {
    match op {
        PrefixOperator::Not => Value::from_bool(!right.is_truthy()),
        PrefixOperator::Negate => match right {
            Value::Integer(n) => Value::Integer(n.wrapping_neg()),
            _ => NULL,
        },
    }
}

fn infix(op: InfixOperator, left: Value, right: Value) -> Value {
    match (op, &left, &right) {
        (op, Value::Integer(a), Value::Integer(b)) => integer_infix(op, *a, *b),
        (InfixOperator::Equal, _, _) => Value::from_bool(left.is_identical(&right)),
        (InfixOperator::NotEqual, _, _) => Value::from_bool(!left.is_identical(&right)),
        _ => NULL,
    }
}

fn integer_infix(op: InfixOperator, a: i64, b: i64) -> Value {
    match op {
        InfixOperator::Plus => Value::Integer(a.wrapping_add(b)),
        InfixOperator::Minus => Value::Integer(a.wrapping_sub(b)),
        InfixOperator::Multiply => Value::Integer(a.wrapping_mul(b)),
        InfixOperator::Divide if b == 0 => {
            Value::error(format!("division by zero: {} / {}", a, b))
        }
        InfixOperator::Divide => Value::Integer(a.wrapping_div(b)),
        InfixOperator::LessThan => Value::from_bool(a < b),
        InfixOperator::GreaterThan => Value::from_bool(a > b),
        InfixOperator::Equal => Value::from_bool(a == b),
        InfixOperator::NotEqual => Value::from_bool(a != b),
    }
}
