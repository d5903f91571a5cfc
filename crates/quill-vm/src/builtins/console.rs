//! Console output builtins.

use crate::runtime::value::Value;

/// `print(args...)` - prints each argument on its own line.
pub fn print(args: &[Value]) -> Result<Value, String> {
    for arg in args {
        println!("{}", arg);
    }
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_returns_null() {
        assert_eq!(print(&[Value::Integer(1), Value::string("x")]), Ok(Value::Null));
        assert_eq!(print(&[]), Ok(Value::Null));
    }
}
