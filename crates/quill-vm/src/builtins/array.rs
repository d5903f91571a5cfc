//! Collection builtins.
//!
//! Arrays are immutable: `rest` and `push` return new arrays.

use super::check_arity;
use crate::runtime::value::Value;

fn expect_array<'a>(name: &str, arg: &'a Value) -> Result<&'a [Value], String> {
    match arg {
        Value::Array(elements) => Ok(elements.as_slice()),
        other => Err(format!(
            "argument to `{}` must be ARRAY, got {}",
            name,
            other.type_name()
        )),
    }
}

/// `len(x)` - character count of a string or length of an array.
pub fn len(args: &[Value]) -> Result<Value, String> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
        Value::Array(elements) => Ok(Value::Integer(elements.len() as i64)),
        other => Err(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        )),
    }
}

/// `first(arr)` - the first element, or null when empty.
pub fn first(args: &[Value]) -> Result<Value, String> {
    check_arity(args, 1)?;
    let elements = expect_array("first", &args[0])?;
    Ok(elements.first().cloned().unwrap_or(Value::Null))
}

/// `last(arr)` - the last element, or null when empty.
pub fn last(args: &[Value]) -> Result<Value, String> {
    check_arity(args, 1)?;
    let elements = expect_array("last", &args[0])?;
    Ok(elements.last().cloned().unwrap_or(Value::Null))
}

/// `rest(arr)` - a new array without the first element, or null when empty.
pub fn rest(args: &[Value]) -> Result<Value, String> {
    check_arity(args, 1)?;
    let elements = expect_array("rest", &args[0])?;
    match elements.split_first() {
        Some((_, tail)) => Ok(Value::array(tail.to_vec())),
        None => Ok(Value::Null),
    }
}

/// `push(arr, v)` - a new array with `v` appended.
pub fn push(args: &[Value]) -> Result<Value, String> {
    check_arity(args, 2)?;
    let elements = expect_array("push", &args[0])?;
    let mut pushed = Vec::with_capacity(elements.len() + 1);
    pushed.extend_from_slice(elements);
    pushed.push(args[1].clone());
    Ok(Value::array(pushed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Value {
        Value::array(values.iter().copied().map(Value::Integer).collect())
    }

    #[test]
    fn test_len() {
        assert_eq!(len(&[Value::string("")]), Ok(Value::Integer(0)));
        assert_eq!(len(&[Value::string("four")]), Ok(Value::Integer(4)));
        assert_eq!(len(&[Value::string("héllo")]), Ok(Value::Integer(5)));
        assert_eq!(len(&[ints(&[1, 2, 3])]), Ok(Value::Integer(3)));
        assert_eq!(
            len(&[Value::Integer(1)]),
            Err("argument to `len` not supported, got INTEGER".to_string())
        );
        assert_eq!(
            len(&[Value::string("one"), Value::string("two")]),
            Err("wrong number of arguments. got=2, want=1".to_string())
        );
    }

    #[test]
    fn test_first_and_last() {
        assert_eq!(first(&[ints(&[1, 2, 3])]), Ok(Value::Integer(1)));
        assert_eq!(last(&[ints(&[1, 2, 3])]), Ok(Value::Integer(3)));
        assert_eq!(first(&[ints(&[])]), Ok(Value::Null));
        assert_eq!(last(&[ints(&[])]), Ok(Value::Null));
        assert_eq!(
            first(&[Value::Integer(1)]),
            Err("argument to `first` must be ARRAY, got INTEGER".to_string())
        );
    }

    #[test]
    fn test_rest() {
        assert_eq!(rest(&[ints(&[1, 2, 3])]), Ok(ints(&[2, 3])));
        assert_eq!(rest(&[ints(&[1])]), Ok(ints(&[])));
        assert_eq!(rest(&[ints(&[])]), Ok(Value::Null));
    }

    #[test]
    fn test_push_leaves_original_untouched() {
        let original = ints(&[1]);
        assert_eq!(push(&[original.clone(), Value::Integer(2)]), Ok(ints(&[1, 2])));
        assert_eq!(original, ints(&[1]));
        assert_eq!(
            push(&[Value::Integer(1), Value::Integer(1)]),
            Err("argument to `push` must be ARRAY, got INTEGER".to_string())
        );
    }
}
