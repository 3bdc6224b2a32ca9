// Declare modules publicly so they are part of the library interface
pub mod ast;
pub mod builtins;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod pretty_print;
pub mod source;
mod stack;

pub use ast::Program;
pub use environment::{EnvError, Environment};
pub use evaluator::{EvalError, EvalResult, MAX_CALL_DEPTH, eval_program};
pub use lexer::{KEYWORDS, Lexer, Token, TokenKind, tokenize};
pub use object::{Object, ObjectType};
pub use parser::{ParseError, Parser, parse};
pub use source::Span;
