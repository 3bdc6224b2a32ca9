use std::fmt;
use std::rc::Rc;

/// The root of every parse: top-level statements in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn token_literal(&self) -> String {
        self.statements
            .first()
            .map(Statement::token_literal)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let { name: Identifier, value: Expression },
    Return(Option<Expression>),
    Expression(Expression),
}

impl Statement {
    pub fn token_literal(&self) -> String {
        match self {
            Statement::Let { .. } => "rama".to_string(),
            Statement::Return(_) => "daan".to_string(),
            Statement::Expression(expr) => expr.token_literal(),
        }
    }
}

/// A braced statement sequence: the body of `yadi`, `anyatha`, `chakra` and `kriya`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

impl BlockStatement {
    pub fn token_literal(&self) -> String {
        "{".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Bang,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    Integer(i64),
    String(String),
    Boolean(bool),
    Prefix {
        operator: PrefixOperator,
        right: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: InfixOperator,
        right: Box<Expression>,
    },
    Assign {
        name: Identifier,
        value: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    While {
        condition: Box<Expression>,
        body: BlockStatement,
    },
    Function {
        parameters: Vec<Identifier>,
        body: Rc<BlockStatement>, // Shared with every closure created from this literal
    },
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Array(Vec<Expression>),
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
    Hash(Vec<(Expression, Expression)>),
}

impl Expression {
    pub fn token_literal(&self) -> String {
        match self {
            Expression::Identifier(ident) => ident.0.clone(),
            Expression::Integer(value) => value.to_string(),
            Expression::String(value) => value.clone(),
            Expression::Boolean(value) => if *value { "satya" } else { "asatya" }.to_string(),
            Expression::Prefix { operator, .. } => operator.to_string(),
            Expression::Infix { operator, .. } => operator.to_string(),
            Expression::Assign { .. } => "=".to_string(),
            Expression::If { .. } => "yadi".to_string(),
            Expression::While { .. } => "chakra".to_string(),
            Expression::Function { .. } => "kriya".to_string(),
            Expression::Call { .. } => "(".to_string(),
            Expression::Array(_) => "[".to_string(),
            Expression::Index { .. } => "[".to_string(),
            Expression::Hash(_) => "{".to_string(),
        }
    }
}

// --- Canonical text ---
// Every form below re-parses to the same tree.

fn write_separated<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_separated(f, &self.statements, "; ")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "rama {} = {}", name, value),
            Statement::Return(Some(value)) => write!(f, "daan {}", value),
            Statement::Return(None) => write!(f, "daan"),
            Statement::Expression(expr) => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.statements.is_empty() {
            return write!(f, "{{ }}");
        }
        write!(f, "{{ ")?;
        write_separated(f, &self.statements, "; ")?;
        write!(f, " }}")
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOperator::Bang => write!(f, "!"),
            PrefixOperator::Minus => write!(f, "-"),
        }
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InfixOperator::Plus => "+",
            InfixOperator::Minus => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
            InfixOperator::Lt => "<",
            InfixOperator::Gt => ">",
            InfixOperator::LtEq => "<=",
            InfixOperator::GtEq => ">=",
            InfixOperator::Eq => "==",
            InfixOperator::NotEq => "!=",
        };
        write!(f, "{}", text)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(ident) => write!(f, "{}", ident),
            Expression::Integer(value) => write!(f, "{}", value),
            Expression::String(value) => write!(f, "\"{}\"", value),
            Expression::Boolean(value) => write!(f, "{}", if *value { "satya" } else { "asatya" }),
            Expression::Prefix { operator, right } => write!(f, "({}{})", operator, right),
            Expression::Infix {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            Expression::Assign { name, value } => write!(f, "({} = {})", name, value),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "yadi ({}) {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " anyatha {}", alternative)?;
                }
                Ok(())
            }
            Expression::While { condition, body } => write!(f, "chakra ({}) {}", condition, body),
            Expression::Function { parameters, body } => {
                write!(f, "kriya(")?;
                write_separated(f, parameters, ", ")?;
                write!(f, ") {}", body)
            }
            Expression::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;
                write_separated(f, arguments, ", ")?;
                write!(f, ")")
            }
            Expression::Array(elements) => {
                write!(f, "[")?;
                write_separated(f, elements, ", ")?;
                write!(f, "]")
            }
            Expression::Index { left, index } => write!(f, "({}[{}])", left, index),
            Expression::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Identifier {
        Identifier(name.to_string())
    }

    fn ident_expr(name: &str) -> Expression {
        Expression::Identifier(ident(name))
    }

    #[test]
    fn test_let_statement_display() {
        let program = Program {
            statements: vec![Statement::Let {
                name: ident("krishna"),
                value: ident_expr("balaram"),
            }],
        };
        assert_eq!(program.to_string(), "rama krishna = balaram");
        assert_eq!(program.token_literal(), "rama");
    }

    #[test]
    fn test_statements_are_joined_with_terminators() {
        let program = Program {
            statements: vec![
                Statement::Let {
                    name: ident("x"),
                    value: Expression::Integer(5),
                },
                Statement::Return(Some(ident_expr("x"))),
                Statement::Return(None),
            ],
        };
        assert_eq!(program.to_string(), "rama x = 5; daan x; daan");
    }

    #[test]
    fn test_expression_display() {
        let infix = Expression::Infix {
            left: Box::new(Expression::Prefix {
                operator: PrefixOperator::Minus,
                right: Box::new(ident_expr("a")),
            }),
            operator: InfixOperator::Multiply,
            right: Box::new(ident_expr("b")),
        };
        assert_eq!(infix.to_string(), "((-a) * b)");
        assert_eq!(infix.token_literal(), "*");

        let call = Expression::Call {
            function: Box::new(ident_expr("add")),
            arguments: vec![Expression::Integer(1), Expression::String("two".into())],
        };
        assert_eq!(call.to_string(), "add(1, \"two\")");

        let index = Expression::Index {
            left: Box::new(Expression::Array(vec![
                Expression::Boolean(true),
                Expression::Boolean(false),
            ])),
            index: Box::new(Expression::Integer(0)),
        };
        assert_eq!(index.to_string(), "([satya, asatya][0])");

        let hash = Expression::Hash(vec![(Expression::String("k".into()), Expression::Integer(1))]);
        assert_eq!(hash.to_string(), "{\"k\": 1}");
        assert_eq!(Expression::Hash(vec![]).to_string(), "{}");
    }

    #[test]
    fn test_block_constructs_display() {
        let body = BlockStatement {
            statements: vec![Statement::Expression(Expression::Assign {
                name: ident("x"),
                value: Box::new(ident_expr("y")),
            })],
        };
        let function = Expression::Function {
            parameters: vec![ident("x"), ident("y")],
            body: Rc::new(body.clone()),
        };
        assert_eq!(function.to_string(), "kriya(x, y) { (x = y) }");

        let conditional = Expression::If {
            condition: Box::new(Expression::Boolean(true)),
            consequence: body.clone(),
            alternative: Some(BlockStatement::default()),
        };
        assert_eq!(
            conditional.to_string(),
            "yadi (satya) { (x = y) } anyatha { }"
        );

        let chakra = Expression::While {
            condition: Box::new(ident_expr("go")),
            body,
        };
        assert_eq!(chakra.to_string(), "chakra (go) { (x = y) }");
        assert_eq!(chakra.token_literal(), "chakra");
    }
}
