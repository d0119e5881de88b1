//! Abstract syntax tree for Quill scripts.
//!
//! A closed set of node kinds. Trees are immutable once built by the parser and
//! are evaluated at most once per submitted script.

use core::fmt;

/// A parsed script: the top-level statements, run strictly in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Node>,
}

/// A `{ ... }` block. Evaluates to the value of its last executed statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    pub stmts: Vec<Node>,
}

/// Reference to a scope entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub name: VarName,
}

/// What a [`Var`] names: a plain identifier or a nested access.
#[derive(Debug, Clone, PartialEq)]
pub enum VarName {
    Ident(String),
    Attr(GetAttr),
    Index(ByIndex),
}

/// Dotted attribute access `a.b.c`; the root is resolved from scope.
#[derive(Debug, Clone, PartialEq)]
pub struct GetAttr {
    pub path: Vec<String>,
}

/// Subscripted access `name[i][j]`, applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct ByIndex {
    pub name: String,
    pub indices: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Literal),
    Array(Vec<Node>),
    Var(Var),
    GetAttr(GetAttr),
    ByIndex(ByIndex),
    Assign {
        variable: Var,
        value: Box<Node>,
    },
    /// Single-level attribute mutation `parent.child = value`.
    SetAttr {
        parent: String,
        child: String,
        value: Box<Node>,
    },
    Op {
        left: Box<Node>,
        op: BinaryOp,
        right: Box<Node>,
    },
    Compound(Compound),
    Call {
        function: Box<Node>,
        args: Vec<Node>,
        /// Keyword arguments in source order.
        kwargs: Vec<(String, Node)>,
    },
    If {
        cond: Box<Node>,
        compound: Compound,
        else_: Option<Compound>,
    },
    While {
        cond: Box<Node>,
        compound: Compound,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl BinaryOp {
    /// Map an operator token to its operation.
    pub fn from_sign(sign: &str) -> Option<Self> {
        Some(match sign {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            _ => return None,
        })
    }

    pub fn sign(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
        }
    }

    pub fn is_comparison(self) -> bool {
        !matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sign())
    }
}

impl Var {
    pub fn ident(name: impl Into<String>) -> Self {
        Var {
            name: VarName::Ident(name.into()),
        }
    }
}

impl Node {
    pub fn int(value: i64) -> Self {
        Node::Literal(Literal::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Node::Literal(Literal::Float(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Node::Literal(Literal::Str(value.into()))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Node::Var(Var::ident(name))
    }

    pub fn op(left: Node, op: BinaryOp, right: Node) -> Self {
        Node::Op {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn assign(name: impl Into<String>, value: Node) -> Self {
        Node::Assign {
            variable: Var::ident(name),
            value: Box::new(value),
        }
    }
}

impl From<Vec<Node>> for Compound {
    fn from(stmts: Vec<Node>) -> Self {
        Compound { stmts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_round_trip() {
        for sign in ["+", "-", "*", "/", "==", "!=", "<=", ">=", "<", ">"] {
            let op = BinaryOp::from_sign(sign).unwrap();
            assert_eq!(op.sign(), sign);
        }
        assert_eq!(BinaryOp::from_sign("^"), None);
    }

    #[test]
    fn test_comparison_classification() {
        assert!(BinaryOp::Lt.is_comparison());
        assert!(BinaryOp::Eq.is_comparison());
        assert!(!BinaryOp::Div.is_comparison());
    }
}
