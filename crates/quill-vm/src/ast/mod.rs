//! Abstract Syntax Tree (AST) definitions for Quill.
//!
//! Every node renders back to source-like text through `Display`. The
//! compiler relies on that rendering to order hash literal pairs.

use std::fmt;

/// A complete Quill program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
}

impl Identifier {
    /// Creates an identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A Quill statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let name = value;`
    Let(LetStatement),
    /// `name = value;`
    Assign(AssignStatement),
    /// `return value;` or `return;`
    Return(Option<Expression>),
    /// An expression evaluated for its value
    Expression(Expression),
}

/// A `let` binding.
#[derive(Debug, Clone, PartialEq)]
pub struct LetStatement {
    /// The bound name
    pub name: Identifier,
    /// The initializer
    pub value: Expression,
}

/// Assignment to an existing binding.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStatement {
    /// The assigned name
    pub name: Identifier,
    /// The new value
    pub value: Expression,
}

/// A braced sequence of statements, used by `if` branches and function bodies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
}

/// A Quill expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Identifier reference
    Identifier(Identifier),
    /// Integer literal
    Integer(i64),
    /// String literal
    String(String),
    /// `true` or `false`
    Boolean(bool),
    /// Unary operation
    Unary(UnaryExpression),
    /// Binary operation
    Binary(BinaryExpression),
    /// `if (cond) { ... } else { ... }`
    If(IfExpression),
    /// `fn(params) { ... }`
    Function(FunctionLiteral),
    /// Function call
    Call(CallExpression),
    /// `[a, b, c]`
    Array(Vec<Expression>),
    /// `{key: value, ...}`
    Hash(Vec<(Expression, Expression)>),
    /// `collection[index]`
    Index(IndexExpression),
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    Not,
}

impl UnaryOperator {
    /// Returns the source text of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "!",
        }
    }
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Subtract,
    /// *
    Multiply,
    /// /
    Divide,
    /// <
    LessThan,
    /// >
    GreaterThan,
    /// ==
    Equal,
    /// !=
    NotEqual,
}

impl BinaryOperator {
    /// Returns the source text of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
        }
    }
}

/// A conditional expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression {
    /// The condition
    pub condition: Box<Expression>,
    /// Branch taken when the condition is truthy
    pub consequent: BlockStatement,
    /// Optional else branch
    pub alternate: Option<BlockStatement>,
}

/// A function literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    /// The binding name, set when the literal is the value of a `let`
    pub name: Option<String>,
    /// Parameters
    pub params: Vec<Identifier>,
    /// Function body
    pub body: BlockStatement,
}

/// A call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The callee
    pub callee: Box<Expression>,
    /// Arguments in source order
    pub arguments: Vec<Expression>,
}

/// An index expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    /// The indexed collection
    pub object: Box<Expression>,
    /// The index
    pub index: Box<Expression>,
}

// ============================================================================
// Source rendering
// ============================================================================

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.body {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let(stmt) => write!(f, "let {} = {};", stmt.name, stmt.value),
            Statement::Assign(stmt) => write!(f, "{} = {};", stmt.name, stmt.value),
            Statement::Return(Some(value)) => write!(f, "return {};", value),
            Statement::Return(None) => write!(f, "return;"),
            Statement::Expression(expr) => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for stmt in &self.body {
            write!(f, "{} ", stmt)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(id) => write!(f, "{}", id),
            Expression::Integer(n) => write!(f, "{}", n),
            Expression::String(s) => write!(f, "{:?}", s),
            Expression::Boolean(b) => write!(f, "{}", b),
            Expression::Unary(unary) => {
                write!(f, "({}{})", unary.operator.as_str(), unary.argument)
            }
            Expression::Binary(binary) => write!(
                f,
                "({} {} {})",
                binary.left,
                binary.operator.as_str(),
                binary.right
            ),
            Expression::If(if_expr) => {
                write!(f, "if {} {}", if_expr.condition, if_expr.consequent)?;
                if let Some(alternate) = &if_expr.alternate {
                    write!(f, " else {}", alternate)?;
                }
                Ok(())
            }
            Expression::Function(func) => {
                write!(f, "fn")?;
                if let Some(name) = &func.name {
                    write!(f, "<{}>", name)?;
                }
                write!(f, "(")?;
                join(f, &func.params)?;
                write!(f, ") {}", func.body)
            }
            Expression::Call(call) => {
                write!(f, "{}(", call.callee)?;
                join(f, &call.arguments)?;
                write!(f, ")")
            }
            Expression::Array(elements) => {
                write!(f, "[")?;
                join(f, elements)?;
                write!(f, "]")
            }
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
            Expression::Index(index) => write!(f, "({}[{}])", index.object, index.index),
        }
    }
}
