//! The rewrite rule language.
//!
//! Rules are JSON documents. An operand rule is an array of nodes, a result
//!  rule is a single node, and an operator rule is an array of pattern entries:
//!
//! ```text
//! operand-rule  = [ expr-node, ... ]
//! result-rule   = expr-node
//! operator-rule = [ { "pattern": text, "input": int >= 1, "name": text }, ... ]
//! expr-node     = { "input": int }
//!               | { "value": string | bool | number }
//!               | { "op": symbol, "operands": [ expr-node, ... ] }
//! ```
//!
//! Inputs are 1-indexed into the call's operands. Inside a result rule,
//!  `{"input": 0}` is the rewritten call itself.

use std::str::FromStr;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Operators a rule may apply with `{"op": ...}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Operator {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Times,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "^")]
    Power,
    #[strum(serialize = "||")]
    Concat,
    #[strum(serialize = "=")]
    Eq,
    #[strum(to_string = "<>", serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "not")]
    Not,
    /// Casts its operand to DATE.
    #[strum(serialize = "date")]
    Date,
    /// Casts its operand to TIMESTAMP.
    #[strum(serialize = "timestamp")]
    Timestamp,
}

impl Operator {
    pub fn accepts_arity(&self, n: usize) -> bool {
        match self {
            Operator::Minus => n == 1 || n == 2,
            Operator::Not | Operator::Date | Operator::Timestamp => n == 1,
            _ => n == 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Str(String),
    Bool(bool),
    Integer(i64),
    /// Kept as written so `2.50` prints as `2.50`.
    Decimal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    InputRef(usize),
    Literal(Scalar),
    Operation(Operator, Vec<ExprNode>),
}

impl ExprNode {
    /// Smallest input position this node accepts; used to reject operand rules
    ///  that reference input 0 before any call is seen.
    fn min_input(&self) -> Option<usize> {
        match self {
            ExprNode::InputRef(i) => Some(*i),
            ExprNode::Literal(_) => None,
            ExprNode::Operation(_, children) => children.iter().filter_map(|c| c.min_input()).min(),
        }
    }
}

/// Replaces a call's operand list. Absent means the operands pass through.
#[derive(Debug, Clone, PartialEq)]
pub struct OperandRule(pub Vec<ExprNode>);

/// Post-processes the rewritten call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRule(pub ExprNode);

/// Picks a different target function when the rendered SQL of one operand
///  matches `pattern`.
#[derive(Debug, Clone)]
pub struct OperatorRuleEntry {
    pub pattern: Regex,
    pub input: usize,
    pub target_name: String,
}

impl OperatorRuleEntry {
    pub fn pattern_text(&self) -> &str {
        // strip the anchoring added by `compile_pattern`
        let s = self.pattern.as_str();
        s.strip_prefix("^(?:")
            .and_then(|s| s.strip_suffix(")$"))
            .unwrap_or(s)
    }
}

impl PartialEq for OperatorRuleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str()
            && self.input == other.input
            && self.target_name == other.target_name
    }
}

const OP: &str = "op";
const OPERANDS: &str = "operands";
const INPUT: &str = "input";
const VALUE: &str = "value";
const PATTERN: &str = "pattern";
const REGEX: &str = "regex";
const NAME: &str = "name";

/// Parses rule text. Missing or blank text is `None`.
fn parse_text(text: Option<&str>) -> Result<Option<Value>> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(Some(serde_json::from_str(t)?)),
        _ => Ok(None),
    }
}

pub fn parse_operand_rule(text: Option<&str>) -> Result<Option<OperandRule>> {
    parse_text(text)?
        .map(|v| operand_rule_from_value(&v))
        .transpose()
}

pub fn parse_result_rule(text: Option<&str>) -> Result<Option<ResultRule>> {
    parse_text(text)?
        .map(|v| result_rule_from_value(&v))
        .transpose()
}

pub fn parse_operator_rules(text: Option<&str>) -> Result<Vec<OperatorRuleEntry>> {
    match parse_text(text)? {
        Some(v) => operator_rules_from_value(&v),
        None => Ok(Vec::new()),
    }
}

pub fn operand_rule_from_value(value: &Value) -> Result<OperandRule> {
    let nodes = value
        .as_array()
        .ok_or_else(|| Error::validation(format!("operand rule must be an array, got {value}")))?
        .iter()
        .map(parse_node)
        .collect::<Result<Vec<_>>>()?;

    // Input 0 only exists once the call has been built.
    if let Some(0) = nodes.iter().filter_map(|n| n.min_input()).min() {
        return Err(Error::validation(
            "operand rule inputs must be 1 or greater",
        ));
    }
    Ok(OperandRule(nodes))
}

pub fn result_rule_from_value(value: &Value) -> Result<ResultRule> {
    if !value.is_object() {
        return Err(Error::validation(format!(
            "result rule must be an object, got {value}"
        )));
    }
    parse_node(value).map(ResultRule)
}

pub fn operator_rules_from_value(value: &Value) -> Result<Vec<OperatorRuleEntry>> {
    value
        .as_array()
        .ok_or_else(|| Error::validation(format!("operator rule must be an array, got {value}")))?
        .iter()
        .map(parse_operator_entry)
        .collect()
}

fn parse_operator_entry(value: &Value) -> Result<OperatorRuleEntry> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::validation(format!("operator rule entry must be an object, got {value}")))?;

    let pattern = obj
        .get(PATTERN)
        .or_else(|| obj.get(REGEX))
        .ok_or_else(|| Error::validation(format!("operator rule entry {value} has no pattern")))?
        .as_str()
        .ok_or_else(|| Error::validation(format!("operator rule pattern must be text in {value}")))?;

    let input = match obj.get(INPUT) {
        Some(v) => parse_position(v)?,
        None => {
            return Err(Error::validation(format!(
                "operator rule entry {value} has no input"
            )));
        }
    };
    if input == 0 {
        return Err(Error::validation(format!(
            "operator rule input must be 1 or greater in {value}"
        )));
    }

    let target_name = obj
        .get(NAME)
        .ok_or_else(|| Error::validation(format!("operator rule entry {value} has no name")))?
        .as_str()
        .ok_or_else(|| Error::validation(format!("operator rule name must be text in {value}")))?;
    if target_name.is_empty() {
        return Err(Error::validation(format!(
            "operator rule name must not be empty in {value}"
        )));
    }

    Ok(OperatorRuleEntry {
        pattern: compile_pattern(pattern)?,
        input,
        target_name: target_name.to_string(),
    })
}

/// Patterns must match the whole rendered operand, not a substring of it.
///
/// The pattern is compiled on its own before anchoring, so text such as
///  `x)|(y` cannot close the anchoring group early.
fn compile_pattern(pattern: &str) -> Result<Regex> {
    let invalid = |e: regex::Error| Error::validation(format!("invalid pattern {pattern:?}: {e}"));
    Regex::new(pattern).map_err(invalid)?;
    Regex::new(&format!("^(?:{pattern})$")).map_err(invalid)
}

fn parse_node(value: &Value) -> Result<ExprNode> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::validation(format!("rule node must be an object, got {value}")))?;

    if let Some(symbol) = obj.get(OP) {
        parse_operation(symbol, obj)
    } else if let Some(position) = obj.get(INPUT) {
        parse_position(position).map(ExprNode::InputRef)
    } else if let Some(v) = obj.get(VALUE) {
        parse_scalar(v).map(ExprNode::Literal)
    } else {
        Err(Error::validation(format!("invalid rule node: {value}")))
    }
}

fn parse_operation(symbol: &Value, obj: &Map<String, Value>) -> Result<ExprNode> {
    let symbol = symbol
        .as_str()
        .ok_or_else(|| Error::validation(format!("operator symbol must be text, got {symbol}")))?;
    let op = Operator::from_str(symbol).map_err(|_| Error::unsupported(symbol))?;

    let children = obj
        .get(OPERANDS)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::validation(format!("operator {symbol} needs an operands array")))?
        .iter()
        .map(parse_node)
        .collect::<Result<Vec<_>>>()?;

    if !op.accepts_arity(children.len()) {
        return Err(Error::validation(format!(
            "operator {symbol} cannot take {} operands",
            children.len()
        )));
    }
    Ok(ExprNode::Operation(op, children))
}

fn parse_position(value: &Value) -> Result<usize> {
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| Error::validation(format!("input must be a non-negative integer, got {value}")))
}

fn parse_scalar(value: &Value) -> Result<Scalar> {
    match value {
        Value::String(s) => Ok(Scalar::Str(s.clone())),
        Value::Bool(b) => Ok(Scalar::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Scalar::Integer(i)),
            None if n.is_u64() => Err(Error::validation(format!(
                "integer literal {n} is out of range"
            ))),
            None => Ok(Scalar::Decimal(n.to_string())),
        },
        other => Err(Error::validation(format!(
            "literal value must be a string, boolean or number, got {other}"
        ))),
    }
}
