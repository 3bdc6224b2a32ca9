use crate::ast::{BlockStatement, Identifier};
use crate::environment::Environment;
use crate::evaluator::{EvalError, EvalResult};
use rustc_hash::FxHasher;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hasher;
use std::rc::Rc;

pub const TRUE: Object = Object::Boolean(true);
pub const FALSE: Object = Object::Boolean(false);
pub const NULL: Object = Object::Null;

/// Type tag of a runtime value, as shown in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Integer,
    Boolean,
    Null,
    String,
    Array,
    Hash,
    Set,
    Function,
    Builtin,
    Error,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Integer => "INTEGER",
            ObjectType::Boolean => "BOOLEAN",
            ObjectType::Null => "NULL",
            ObjectType::String => "STRING",
            ObjectType::Array => "ARRAY",
            ObjectType::Hash => "HASH",
            ObjectType::Set => "SET",
            ObjectType::Function => "FUNCTION",
            ObjectType::Builtin => "BUILTIN",
            ObjectType::Error => "ERROR",
        };
        write!(f, "{}", name)
    }
}

/// Key under which a hashable value is stored in a hash or set.
/// Ordering is by type tag, then value, which fixes the rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashKey {
    pub object_type: ObjectType,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

pub type HashMembers = BTreeMap<HashKey, HashPair>;
pub type SetMembers = BTreeMap<HashKey, Object>;

/// A user-defined function together with the scope it was created in.
pub struct Function {
    pub parameters: Vec<Identifier>,
    pub body: Rc<BlockStatement>,
    pub env: Rc<RefCell<Environment>>,
}

// The captured environment usually contains the function itself, so it is
// left out of the debug output.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

pub type BuiltinFn = fn(Vec<Object>) -> EvalResult;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

#[derive(Debug, Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Null,
    String(String),
    Array(Rc<Vec<Object>>),
    Hash(Rc<HashMembers>),
    Set(Rc<RefCell<SetMembers>>), // Shared and mutable: `add`/`remove` act in place
    Function(Rc<Function>),
    Builtin(Builtin),
    Error(EvalError),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Integer(_) => ObjectType::Integer,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::Null => ObjectType::Null,
            Object::String(_) => ObjectType::String,
            Object::Array(_) => ObjectType::Array,
            Object::Hash(_) => ObjectType::Hash,
            Object::Set(_) => ObjectType::Set,
            Object::Function(_) => ObjectType::Function,
            Object::Builtin(_) => ObjectType::Builtin,
            Object::Error(_) => ObjectType::Error,
        }
    }

    /// Only `NULL` and `FALSE` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Null | Object::Boolean(false))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }

    /// `None` for values that cannot be used as hash keys or set members.
    pub fn hash_key(&self) -> Option<HashKey> {
        let value = match self {
            Object::Integer(value) => *value as u64,
            Object::Boolean(value) => u64::from(*value),
            Object::String(value) => {
                let mut hasher = FxHasher::default();
                hasher.write(value.as_bytes());
                hasher.finish()
            }
            _ => return None,
        };
        Some(HashKey {
            object_type: self.object_type(),
            value,
        })
    }

    /// Identity comparison behind `==` and `!=` for non-integer, non-string
    /// operands. Collections and functions are identical only when they are
    /// the same allocation.
    pub fn is_identical(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Null, Object::Null) => true,
            (Object::Array(a), Object::Array(b)) => Rc::ptr_eq(a, b),
            (Object::Hash(a), Object::Hash(b)) => Rc::ptr_eq(a, b),
            (Object::Set(a), Object::Set(b)) => Rc::ptr_eq(a, b),
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => a.name == b.name,
            _ => false,
        }
    }

    /// Human-readable rendering for output. Not used for equality or hashing.
    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

// Structural equality, used by tests and hash-pair comparison. The language's
// own `==` goes through `is_identical`.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Null, Object::Null) => true,
            (Object::String(a), Object::String(b)) => a == b,
            (Object::Array(a), Object::Array(b)) => a == b,
            (Object::Hash(a), Object::Hash(b)) => a == b,
            (Object::Set(a), Object::Set(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => a.name == b.name,
            (Object::Error(a), Object::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        if value { TRUE } else { FALSE }
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<EvalError> for Object {
    fn from(err: EvalError) -> Self {
        Object::Error(err)
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Object>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(value) => write!(f, "{}", value),
            Object::Boolean(value) => write!(f, "{}", if *value { "satya" } else { "asatya" }),
            Object::Null => write!(f, "null"),
            Object::String(value) => write!(f, "{}", value),
            Object::Array(elements) => {
                write!(f, "[")?;
                write_joined(f, elements.iter())?;
                write!(f, "]")
            }
            Object::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, pair) in pairs.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                write!(f, "}}")
            }
            Object::Set(members) => {
                write!(f, "set(")?;
                write_joined(f, members.borrow().values())?;
                write!(f, ")")
            }
            Object::Function(function) => {
                write!(f, "kriya(")?;
                for (i, parameter) in function.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", parameter)?;
                }
                write!(f, ") {}", function.body)
            }
            Object::Builtin(_) => write!(f, "builtin function"),
            Object::Error(err) => write!(f, "ERROR: {}", err),
        }
    }
}

// Constructors for collection values
impl Object {
    pub fn array(elements: Vec<Object>) -> Object {
        Object::Array(Rc::new(elements))
    }

    pub fn hash(pairs: HashMembers) -> Object {
        Object::Hash(Rc::new(pairs))
    }

    pub fn set(members: SetMembers) -> Object {
        Object::Set(Rc::new(RefCell::new(members)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(value: &str) -> Object {
        Object::String(value.to_string())
    }

    #[test]
    fn test_string_hash_key() {
        let hello1 = string("Hello World");
        let hello2 = string("Hello World");
        let diff1 = string("My name is johnny");
        let diff2 = string("My name is johnny");

        assert_eq!(hello1.hash_key(), hello2.hash_key());
        assert_eq!(diff1.hash_key(), diff2.hash_key());
        assert_ne!(hello1.hash_key(), diff1.hash_key());
    }

    #[test]
    fn test_hash_key_includes_type_tag() {
        assert_ne!(Object::Integer(1).hash_key(), TRUE.hash_key());
        assert_ne!(Object::Integer(5).hash_key(), TRUE.hash_key());
        assert_eq!(Object::Integer(5).hash_key(), Object::Integer(5).hash_key());
        assert_eq!(
            FALSE.hash_key(),
            Some(HashKey {
                object_type: ObjectType::Boolean,
                value: 0
            })
        );
    }

    #[test]
    fn test_unhashable_values() {
        assert_eq!(NULL.hash_key(), None);
        assert_eq!(Object::array(vec![]).hash_key(), None);
        assert_eq!(Object::hash(HashMembers::new()).hash_key(), None);
        assert_eq!(Object::set(SetMembers::new()).hash_key(), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(!NULL.is_truthy());
        assert!(!FALSE.is_truthy());
        assert!(TRUE.is_truthy());
        assert!(Object::Integer(0).is_truthy());
        assert!(string("").is_truthy());
        assert!(Object::array(vec![]).is_truthy());
    }

    #[test]
    fn test_from_bool_returns_constants() {
        assert_eq!(Object::from(true), TRUE);
        assert_eq!(Object::from(false), FALSE);
        assert!(Object::from(true).is_identical(&TRUE));
    }

    #[test]
    fn test_identity_of_collections() {
        let array = Object::array(vec![Object::Integer(1)]);
        let same = array.clone();
        let lookalike = Object::array(vec![Object::Integer(1)]);
        assert!(array.is_identical(&same));
        assert!(!array.is_identical(&lookalike));
        assert_eq!(array, lookalike); // Structurally equal all the same
        assert!(NULL.is_identical(&NULL));
        assert!(!NULL.is_identical(&FALSE));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Object::Integer(1).object_type().to_string(), "INTEGER");
        assert_eq!(NULL.object_type().to_string(), "NULL");
        assert_eq!(Object::set(SetMembers::new()).object_type().to_string(), "SET");
        assert_eq!(
            Object::Error(EvalError::DivisionByZero).object_type().to_string(),
            "ERROR"
        );
    }

    #[test]
    fn test_inspect() {
        assert_eq!(Object::Integer(-7).inspect(), "-7");
        assert_eq!(TRUE.inspect(), "satya");
        assert_eq!(NULL.inspect(), "null");
        assert_eq!(string("hi").inspect(), "hi");
        assert_eq!(
            Object::array(vec![Object::Integer(1), string("two"), FALSE]).inspect(),
            "[1, two, asatya]"
        );

        let mut pairs = HashMembers::new();
        for (key, value) in [(Object::Integer(2), string("b")), (Object::Integer(1), string("a"))] {
            let hash_key = key.hash_key().expect("integers are hashable");
            pairs.insert(hash_key, HashPair { key, value });
        }
        assert_eq!(Object::hash(pairs).inspect(), "{1: a, 2: b}");

        let mut members = SetMembers::new();
        for member in [Object::Integer(3), TRUE, Object::Integer(1)] {
            members.insert(member.hash_key().expect("hashable"), member);
        }
        // Ordered by type tag first, integers before booleans
        assert_eq!(Object::set(members).inspect(), "set(1, 3, satya)");

        assert_eq!(
            Object::Error(EvalError::DivisionByZero).inspect(),
            "ERROR: division by zero"
        );
    }
}
