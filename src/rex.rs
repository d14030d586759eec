//! A small relational-expression model and the builder capability the rewrite
//!  engine is written against.
//!
//! The engine itself only talks to [`ExpressionBuilder`]; [`RexBuilder`] is the
//!  implementation used when this crate's own [`Expression`] tree is the host
//!  representation.

use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::grammar::{Operator, Scalar};

pub type ExprRef = Rc<RefCell<Expression>>;

pub fn expr_ref(expr: Expression) -> ExprRef {
    Rc::new(RefCell::new(expr))
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE")]
pub enum FieldType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Decimal,
    Varchar,
    #[strum(serialize = "VARBINARY")]
    Binary,
    Date,
    Timestamp,
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Integer | Self::BigInt | Self::Double | Self::Decimal
        )
    }

    /// Result type of an arithmetic operator applied to `self` and `other`.
    fn widen(self, other: FieldType) -> FieldType {
        use FieldType::*;
        match (self, other) {
            (Double, _) | (_, Double) => Double,
            (Decimal, _) | (_, Decimal) => Decimal,
            (BigInt, _) | (_, BigInt) => BigInt,
            (Integer, Integer) => Integer,
            // date arithmetic and anything else keeps the left side's type
            (l, _) => l,
        }
    }
}

/// The operator a catalog entry resolves to: the callable the host validator
///  sees, and the name a rewritten call is emitted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlOperator {
    pub name: String,
    pub return_type: FieldType,
}

impl SqlOperator {
    pub fn new(name: impl Into<String>, return_type: FieldType) -> Self {
        Self {
            name: name.into(),
            return_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Concat,
}

impl BinaryOp {
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 4,
            BinaryOp::Concat => 5,
            BinaryOp::Add | BinaryOp::Sub => 6,
            BinaryOp::Mul | BinaryOp::Div => 7,
        }
    }

    /// Comparisons do not associate: `a = b = c` is rejected by most dialects.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    fn from_operator(op: Operator) -> Option<Self> {
        Some(match op {
            Operator::Plus => BinaryOp::Add,
            Operator::Minus => BinaryOp::Sub,
            Operator::Times => BinaryOp::Mul,
            Operator::Divide => BinaryOp::Div,
            Operator::Concat => BinaryOp::Concat,
            Operator::Eq => BinaryOp::Eq,
            Operator::Ne => BinaryOp::Ne,
            Operator::Lt => BinaryOp::Lt,
            Operator::Le => BinaryOp::Le,
            Operator::Gt => BinaryOp::Gt,
            Operator::Ge => BinaryOp::Ge,
            Operator::And => BinaryOp::And,
            Operator::Or => BinaryOp::Or,
            Operator::Not | Operator::Power | Operator::Date | Operator::Timestamp => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    BoolLiteral(bool),
    NumberLiteral {
        text: String,
        field_type: FieldType,
    },
    SingleQuoteStringLiteral(String),
    /// A positional reference to a column of the enclosing projection.
    InputRef {
        index: usize,
        name: String,
        field_type: FieldType,
    },
    FunctionCall {
        name: String,
        args: Vec<ExprRef>,
        return_type: FieldType,
    },
    BinaryOperator(ExprRef, BinaryOp, ExprRef),
    UnaryOperator(UnaryOp, ExprRef),
    Cast(ExprRef, FieldType),
}

impl Expression {
    pub fn field_type(&self) -> FieldType {
        match self {
            Expression::BoolLiteral(_) => FieldType::Boolean,
            Expression::NumberLiteral { field_type, .. } => *field_type,
            Expression::SingleQuoteStringLiteral(_) => FieldType::Varchar,
            Expression::InputRef { field_type, .. } => *field_type,
            Expression::FunctionCall { return_type, .. } => *return_type,
            Expression::BinaryOperator(l, op, r) => match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                    let l = l.borrow().field_type();
                    l.widen(r.borrow().field_type())
                }
                BinaryOp::Concat => FieldType::Varchar,
                _ => FieldType::Boolean,
            },
            Expression::UnaryOperator(UnaryOp::Not, _) => FieldType::Boolean,
            Expression::UnaryOperator(UnaryOp::Neg, e) => e.borrow().field_type(),
            Expression::Cast(_, ty) => *ty,
        }
    }
}

// These From implementations keep fixtures and hand-built trees short
impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Expression::SingleQuoteStringLiteral(s.to_string())
    }
}
impl From<String> for Expression {
    fn from(s: String) -> Self {
        Expression::SingleQuoteStringLiteral(s)
    }
}
impl From<i64> for Expression {
    fn from(v: i64) -> Self {
        Expression::NumberLiteral {
            text: v.to_string(),
            field_type: FieldType::Integer,
        }
    }
}
impl From<bool> for Expression {
    fn from(v: bool) -> Self {
        Expression::BoolLiteral(v)
    }
}

/// Factory for the expressions a rewrite produces. The rewrite engine depends
///  on this capability only, never on a concrete expression type.
pub trait ExpressionBuilder {
    type Expr: Clone;

    /// If `operand` is a positional column reference, returns a freshly minted
    ///  reference to the same projected column. Returns `None` for anything
    ///  else, in which case the operand is reused as-is.
    fn make_input_ref(&self, operand: &Self::Expr) -> Option<Self::Expr>;

    fn make_literal(&self, value: &Scalar) -> Self::Expr;

    /// Applies a rule operator. `args.len()` always satisfies the operator's
    ///  arity; rules are checked before evaluation.
    fn make_operator_call(&self, op: Operator, args: Vec<Self::Expr>) -> Self::Expr;

    fn make_function_call(&self, function: &SqlOperator, args: Vec<Self::Expr>) -> Self::Expr;
}

/// Builds [`Expression`] trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct RexBuilder;

impl RexBuilder {
    pub fn input_ref(&self, index: usize, name: impl Into<String>, field_type: FieldType) -> ExprRef {
        expr_ref(Expression::InputRef {
            index,
            name: name.into(),
            field_type,
        })
    }
}

impl ExpressionBuilder for RexBuilder {
    type Expr = ExprRef;

    fn make_input_ref(&self, operand: &ExprRef) -> Option<ExprRef> {
        match &*operand.borrow() {
            Expression::InputRef {
                index,
                name,
                field_type,
            } => Some(self.input_ref(*index, name.clone(), *field_type)),
            _ => None,
        }
    }

    fn make_literal(&self, value: &Scalar) -> ExprRef {
        expr_ref(match value {
            Scalar::Str(s) => Expression::SingleQuoteStringLiteral(s.clone()),
            Scalar::Bool(b) => Expression::BoolLiteral(*b),
            Scalar::Integer(i) => Expression::from(*i),
            Scalar::Decimal(text) => Expression::NumberLiteral {
                text: text.clone(),
                field_type: FieldType::Decimal,
            },
        })
    }

    fn make_operator_call(&self, op: Operator, args: Vec<ExprRef>) -> ExprRef {
        let mut iter = args.into_iter();
        let (first, second, rest) = (iter.next(), iter.next(), iter);
        let expr = match (op, first, second) {
            (Operator::Minus, Some(operand), None) => {
                Expression::UnaryOperator(UnaryOp::Neg, operand)
            }
            (Operator::Not, Some(operand), None) => Expression::UnaryOperator(UnaryOp::Not, operand),
            (Operator::Date, Some(operand), None) => Expression::Cast(operand, FieldType::Date),
            (Operator::Timestamp, Some(operand), None) => {
                Expression::Cast(operand, FieldType::Timestamp)
            }
            (Operator::Power, Some(l), Some(r)) => Expression::FunctionCall {
                name: "POWER".into(),
                args: vec![l, r],
                return_type: FieldType::Double,
            },
            (op, Some(l), Some(r)) => match BinaryOp::from_operator(op) {
                Some(binop) => Expression::BinaryOperator(l, binop, r),
                None => fallback_call(op, vec![l, r], rest),
            },
            (op, first, second) => {
                fallback_call(op, first.into_iter().chain(second).collect(), rest)
            }
        };
        expr_ref(expr)
    }

    fn make_function_call(&self, function: &SqlOperator, args: Vec<ExprRef>) -> ExprRef {
        expr_ref(Expression::FunctionCall {
            name: function.name.clone(),
            args,
            return_type: function.return_type,
        })
    }
}

// Only reachable when a caller hands `make_operator_call` an arity the rule
//  parser would have rejected.
fn fallback_call(
    op: Operator,
    mut args: Vec<ExprRef>,
    rest: impl Iterator<Item = ExprRef>,
) -> Expression {
    args.extend(rest);
    let return_type = args
        .first()
        .map(|a| a.borrow().field_type())
        .unwrap_or(FieldType::Varchar);
    Expression::FunctionCall {
        name: op.to_string().to_uppercase(),
        args,
        return_type,
    }
}
