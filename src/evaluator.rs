use crate::ast::{
    BlockStatement, Expression, Identifier, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::builtins;
use crate::environment::{EnvError, Environment};
use crate::object::{FALSE, Function, HashMembers, HashPair, NULL, Object, ObjectType, TRUE};
use crate::stack::ensure_sufficient_stack;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Nested user-function calls allowed before evaluation gives up.
pub const MAX_CALL_DEPTH: usize = 512;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: ObjectType,
        operator: InfixOperator,
        right: ObjectType,
    },
    #[error("unknown operator: {operator}{operand}")]
    UnknownPrefixOperator {
        operator: PrefixOperator,
        operand: ObjectType,
    },
    #[error("unknown operator: {left} {operator} {right}")]
    UnknownInfixOperator {
        left: ObjectType,
        operator: InfixOperator,
        right: ObjectType,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("not a function: {0}")]
    NotAFunction(ObjectType),
    #[error("wrong number of arguments. got={got}, want={want}")]
    WrongArgumentCount { got: usize, want: usize },
    #[error("unusable as hash key: {0}")]
    UnusableAsHashKey(ObjectType),
    #[error("index operator not supported: {left}[{index}]")]
    IndexNotSupported {
        left: ObjectType,
        index: ObjectType,
    },
    #[error("argument to `{builtin}` not supported, got {got}")]
    UnsupportedArgument {
        builtin: &'static str,
        got: ObjectType,
    },
    #[error("argument to `{builtin}` must be {expected}, got {got}")]
    WrongArgumentType {
        builtin: &'static str,
        expected: ObjectType,
        got: ObjectType,
    },
    #[error("first argument must be {expected}, got {got}")]
    WrongFirstArgument {
        expected: ObjectType,
        got: ObjectType,
    },
    #[error("maximum call depth exceeded")]
    CallDepthExceeded,
}

// Result type alias for convenience
pub type EvalResult<T = Object> = Result<T, EvalError>;

/// Why evaluation of a statement sequence stopped early.
#[derive(Debug)]
enum Unwind {
    Return(Object),
    Error(EvalError),
}

impl From<EvalError> for Unwind {
    fn from(err: EvalError) -> Self {
        Unwind::Error(err)
    }
}

impl From<EnvError> for Unwind {
    fn from(err: EnvError) -> Self {
        Unwind::Error(err.into())
    }
}

type Flow<T = Object> = Result<T, Unwind>;

// --- Evaluate Function ---

/// Evaluates `program` in `env` and returns the value of its last statement.
///
/// A top-level `daan` ends the program with its value. Runtime errors are
/// returned as [`Object::Error`]; bindings made before the error stay in `env`.
pub fn eval_program(program: &Program, env: &Rc<RefCell<Environment>>) -> Object {
    tracing::debug!(statements = program.statements.len(), "evaluating program");
    let mut evaluator = Evaluator::default();
    let result = match evaluator.eval_statements(&program.statements, env) {
        Ok(value) | Err(Unwind::Return(value)) => value,
        Err(Unwind::Error(err)) => Object::Error(err),
    };
    tracing::debug!(result = %result.object_type(), "program finished");
    result
}

#[derive(Default)]
struct Evaluator {
    depth: usize, // Active user-function calls
}

impl Evaluator {
    fn eval_statements(
        &mut self,
        statements: &[Statement],
        env: &Rc<RefCell<Environment>>,
    ) -> Flow {
        let mut result = NULL;
        for statement in statements {
            result = self.eval_statement(statement, env)?;
        }
        Ok(result)
    }

    fn eval_block(&mut self, block: &BlockStatement, env: &Rc<RefCell<Environment>>) -> Flow {
        self.eval_statements(&block.statements, env)
    }

    fn eval_statement(&mut self, statement: &Statement, env: &Rc<RefCell<Environment>>) -> Flow {
        match statement {
            Statement::Let { name, value } => {
                let value = self.eval_expression(value, env)?;
                env.borrow_mut().define(name.name(), value);
                Ok(NULL)
            }
            Statement::Return(Some(value)) => {
                let value = self.eval_expression(value, env)?;
                Err(Unwind::Return(value))
            }
            Statement::Return(None) => Err(Unwind::Return(NULL)),
            Statement::Expression(expression) => self.eval_expression(expression, env),
        }
    }

    fn eval_expression(
        &mut self,
        expression: &Expression,
        env: &Rc<RefCell<Environment>>,
    ) -> Flow {
        ensure_sufficient_stack(|| self.eval_expression_inner(expression, env))
    }

    fn eval_expression_inner(
        &mut self,
        expression: &Expression,
        env: &Rc<RefCell<Environment>>,
    ) -> Flow {
        match expression {
            Expression::Identifier(name) => Ok(eval_identifier(name, env)?),
            Expression::Integer(value) => Ok(Object::Integer(*value)),
            Expression::String(value) => Ok(Object::String(value.clone())),
            Expression::Boolean(value) => Ok(Object::from(*value)),
            Expression::Prefix { operator, right } => {
                let right = self.eval_expression(right, env)?;
                Ok(eval_prefix_expression(*operator, right)?)
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                let left = self.eval_expression(left, env)?;
                let right = self.eval_expression(right, env)?;
                Ok(eval_infix_expression(*operator, left, right)?)
            }
            Expression::Assign { name, value } => {
                let value = self.eval_expression(value, env)?;
                env.borrow_mut().assign(name.name(), value.clone());
                Ok(value)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expression(condition, env)?;
                if condition.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    Ok(NULL)
                }
            }
            Expression::While { condition, body } => self.eval_while(condition, body, env),
            Expression::Function { parameters, body } => {
                Ok(Object::Function(Rc::new(Function {
                    parameters: parameters.clone(),
                    body: Rc::clone(body),
                    env: Rc::clone(env),
                })))
            }
            Expression::Call {
                function,
                arguments,
            } => {
                let function = self.eval_expression(function, env)?;
                let arguments = self.eval_expressions(arguments, env)?;
                Ok(self.apply_function(function, arguments)?)
            }
            Expression::Array(elements) => {
                let elements = self.eval_expressions(elements, env)?;
                Ok(Object::array(elements))
            }
            Expression::Index { left, index } => {
                let left = self.eval_expression(left, env)?;
                let index = self.eval_expression(index, env)?;
                Ok(eval_index_expression(left, index)?)
            }
            Expression::Hash(pairs) => self.eval_hash_literal(pairs, env),
        }
    }

    // Left to right; the first error stops the rest from being evaluated.
    fn eval_expressions(
        &mut self,
        expressions: &[Expression],
        env: &Rc<RefCell<Environment>>,
    ) -> Flow<Vec<Object>> {
        expressions
            .iter()
            .map(|expression| self.eval_expression(expression, env))
            .collect()
    }

    fn eval_while(
        &mut self,
        condition: &Expression,
        body: &BlockStatement,
        env: &Rc<RefCell<Environment>>,
    ) -> Flow {
        while self.eval_expression(condition, env)?.is_truthy() {
            // Each iteration gets its own scope for `rama` bindings
            let iteration_env = Environment::new_enclosed(Rc::clone(env));
            self.eval_block(body, &iteration_env)?;
        }
        Ok(NULL)
    }

    fn eval_hash_literal(
        &mut self,
        pairs: &[(Expression, Expression)],
        env: &Rc<RefCell<Environment>>,
    ) -> Flow {
        let mut members = HashMembers::new();
        for (key_expression, value_expression) in pairs {
            let key = self.eval_expression(key_expression, env)?;
            let hash_key = key
                .hash_key()
                .ok_or(EvalError::UnusableAsHashKey(key.object_type()))?;
            let value = self.eval_expression(value_expression, env)?;
            members.insert(hash_key, HashPair { key, value });
        }
        Ok(Object::hash(members))
    }

    /// Calls a user function or builtin. A `daan` inside the callee stops at
    /// this boundary.
    #[tracing::instrument(level = "trace", skip_all, fields(depth = self.depth, callee = %function.object_type()))]
    fn apply_function(&mut self, function: Object, arguments: Vec<Object>) -> EvalResult {
        let function = match function {
            Object::Function(function) => function,
            Object::Builtin(builtin) => return (builtin.func)(arguments),
            other => return Err(EvalError::NotAFunction(other.object_type())),
        };

        if arguments.len() != function.parameters.len() {
            return Err(EvalError::WrongArgumentCount {
                got: arguments.len(),
                want: function.parameters.len(),
            });
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::CallDepthExceeded);
        }

        let call_env = Environment::new_enclosed(Rc::clone(&function.env));
        {
            let mut frame = call_env.borrow_mut();
            for (parameter, argument) in function.parameters.iter().zip(arguments) {
                frame.define(parameter.name(), argument);
            }
        }

        self.depth += 1;
        let result = self.eval_block(&function.body, &call_env);
        self.depth -= 1;

        match result {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
        }
    }
}

// Bindings shadow builtins; builtins are the last resort.
fn eval_identifier(name: &Identifier, env: &Rc<RefCell<Environment>>) -> EvalResult {
    let lookup = env.borrow().get(name.name());
    match lookup {
        Ok(value) => Ok(value),
        Err(err) => builtins::lookup(name.name())
            .map(Object::Builtin)
            .ok_or(err.into()),
    }
}

fn eval_prefix_expression(operator: PrefixOperator, right: Object) -> EvalResult {
    match (operator, right) {
        (PrefixOperator::Bang, right) => Ok(if right.is_truthy() { FALSE } else { TRUE }),
        (PrefixOperator::Minus, Object::Integer(value)) => Ok(Object::Integer(value.wrapping_neg())),
        (PrefixOperator::Minus, right) => Err(EvalError::UnknownPrefixOperator {
            operator,
            operand: right.object_type(),
        }),
    }
}

fn eval_infix_expression(operator: InfixOperator, left: Object, right: Object) -> EvalResult {
    match (&left, &right) {
        (Object::Integer(l), Object::Integer(r)) => eval_integer_infix_expression(operator, *l, *r),
        (Object::String(l), Object::String(r)) => match operator {
            InfixOperator::Plus => Ok(Object::String(format!("{}{}", l, r))),
            _ => Err(EvalError::UnknownInfixOperator {
                left: ObjectType::String,
                operator,
                right: ObjectType::String,
            }),
        },
        _ if operator == InfixOperator::Eq => Ok(Object::from(left.is_identical(&right))),
        _ if operator == InfixOperator::NotEq => Ok(Object::from(!left.is_identical(&right))),
        _ if left.object_type() != right.object_type() => Err(EvalError::TypeMismatch {
            left: left.object_type(),
            operator,
            right: right.object_type(),
        }),
        _ => Err(EvalError::UnknownInfixOperator {
            left: left.object_type(),
            operator,
            right: right.object_type(),
        }),
    }
}

fn eval_integer_infix_expression(operator: InfixOperator, left: i64, right: i64) -> EvalResult {
    let result = match operator {
        InfixOperator::Plus => Object::Integer(left.wrapping_add(right)),
        InfixOperator::Minus => Object::Integer(left.wrapping_sub(right)),
        InfixOperator::Multiply => Object::Integer(left.wrapping_mul(right)),
        InfixOperator::Divide => {
            if right == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Object::Integer(left.wrapping_div(right))
        }
        InfixOperator::Lt => Object::from(left < right),
        InfixOperator::Gt => Object::from(left > right),
        InfixOperator::LtEq => Object::from(left <= right),
        InfixOperator::GtEq => Object::from(left >= right),
        InfixOperator::Eq => Object::from(left == right),
        InfixOperator::NotEq => Object::from(left != right),
    };
    Ok(result)
}

fn eval_index_expression(left: Object, index: Object) -> EvalResult {
    match (&left, &index) {
        (Object::Array(elements), Object::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(NULL)),
        (Object::Hash(pairs), _) => {
            let key = index
                .hash_key()
                .ok_or(EvalError::UnusableAsHashKey(index.object_type()))?;
            Ok(pairs.get(&key).map_or(NULL, |pair| pair.value.clone()))
        }
        _ => Err(EvalError::IndexNotSupported {
            left: left.object_type(),
            index: index.object_type(),
        }),
    }
}
