use crate::evaluator::{EvalError, EvalResult};
use crate::object::{Builtin, HashKey, NULL, Object, ObjectType, SetMembers};
use std::cell::RefCell;
use std::rc::Rc;

/// Native functions visible from every scope unless shadowed by a binding.
pub const BUILTINS: [Builtin; 9] = [
    Builtin {
        name: "dairghya",
        func: builtin_len,
    },
    Builtin {
        name: "pratham",
        func: builtin_first,
    },
    Builtin {
        name: "antha",
        func: builtin_last,
    },
    Builtin {
        name: "push",
        func: builtin_push,
    },
    Builtin {
        name: "print",
        func: builtin_print,
    },
    Builtin {
        name: "set",
        func: builtin_set,
    },
    Builtin {
        name: "has",
        func: builtin_has,
    },
    Builtin {
        name: "add",
        func: builtin_add,
    },
    Builtin {
        name: "remove",
        func: builtin_remove,
    },
];

pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name).copied()
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|builtin| builtin.name)
}

// --- Argument checks ---

fn check_arity(args: &[Object], want: usize) -> EvalResult<()> {
    if args.len() != want {
        return Err(EvalError::WrongArgumentCount {
            got: args.len(),
            want,
        });
    }
    Ok(())
}

fn expect_array<'a>(builtin: &'static str, arg: &'a Object) -> EvalResult<&'a [Object]> {
    match arg {
        Object::Array(elements) => Ok(elements.as_slice()),
        other => Err(EvalError::WrongArgumentType {
            builtin,
            expected: ObjectType::Array,
            got: other.object_type(),
        }),
    }
}

fn member_key(member: &Object) -> EvalResult<HashKey> {
    member
        .hash_key()
        .ok_or(EvalError::UnusableAsHashKey(member.object_type()))
}

// Shared by `has`, `add` and `remove`: (set, member) with the member's key.
fn set_and_member(args: Vec<Object>) -> EvalResult<(Rc<RefCell<SetMembers>>, HashKey, Object)> {
    let [set, member]: [Object; 2] = args.try_into().map_err(|args: Vec<Object>| {
        EvalError::WrongArgumentCount {
            got: args.len(),
            want: 2,
        }
    })?;
    let Object::Set(members) = set else {
        return Err(EvalError::WrongFirstArgument {
            expected: ObjectType::Set,
            got: set.object_type(),
        });
    };
    let key = member_key(&member)?;
    Ok((members, key, member))
}

// --- Builtins ---

fn builtin_len(args: Vec<Object>) -> EvalResult {
    check_arity(&args, 1)?;
    let length = match &args[0] {
        Object::String(value) => value.chars().count(),
        Object::Array(elements) => elements.len(),
        Object::Hash(pairs) => pairs.len(),
        Object::Set(members) => members.borrow().len(),
        other => {
            return Err(EvalError::UnsupportedArgument {
                builtin: "dairghya",
                got: other.object_type(),
            });
        }
    };
    Ok(Object::Integer(length as i64))
}

fn builtin_first(args: Vec<Object>) -> EvalResult {
    check_arity(&args, 1)?;
    let elements = expect_array("pratham", &args[0])?;
    Ok(elements.first().cloned().unwrap_or(NULL))
}

fn builtin_last(args: Vec<Object>) -> EvalResult {
    check_arity(&args, 1)?;
    let elements = expect_array("antha", &args[0])?;
    Ok(elements.last().cloned().unwrap_or(NULL))
}

// Arrays are immutable; the result is a new array.
fn builtin_push(args: Vec<Object>) -> EvalResult {
    check_arity(&args, 2)?;
    let mut elements = expect_array("push", &args[0])?.to_vec();
    elements.push(args[1].clone());
    Ok(Object::array(elements))
}

fn builtin_print(args: Vec<Object>) -> EvalResult {
    for arg in &args {
        println!("{}", arg.inspect());
    }
    Ok(NULL)
}

fn builtin_set(args: Vec<Object>) -> EvalResult {
    let mut members = SetMembers::new();
    for arg in args {
        members.insert(member_key(&arg)?, arg);
    }
    Ok(Object::set(members))
}

fn builtin_has(args: Vec<Object>) -> EvalResult {
    let (members, key, _) = set_and_member(args)?;
    let found = members.borrow().contains_key(&key);
    Ok(Object::from(found))
}

fn builtin_add(args: Vec<Object>) -> EvalResult {
    let (members, key, member) = set_and_member(args)?;
    members.borrow_mut().insert(key, member);
    Ok(Object::Set(members))
}

fn builtin_remove(args: Vec<Object>) -> EvalResult {
    let (members, key, _) = set_and_member(args)?;
    members.borrow_mut().remove(&key);
    Ok(Object::Set(members))
}
