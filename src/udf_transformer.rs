use log::{debug, trace};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    evaluate::Scope,
    grammar::{self, OperandRule, OperatorRuleEntry, ResultRule},
    rex::{ExpressionBuilder, SqlOperator},
    to_sql::SqlRenderer,
};

/// Rewrites calls of one source-dialect function into the target dialect.
///
/// A transformer holds no per-call state: build it once per catalog entry and
///  share it across threads and calls.
#[derive(Debug, Clone, PartialEq)]
pub struct UdfTransformer {
    source_name: String,
    target: SqlOperator,
    operand_rule: Option<OperandRule>,
    result_rule: Option<ResultRule>,
    operator_rules: Vec<OperatorRuleEntry>,
}

impl UdfTransformer {
    /// Builds a transformer from rule text. Missing or blank text leaves that
    ///  part of the call untouched.
    ///
    /// `target` is the function a call becomes when no operator rule applies.
    ///  Its name may be empty, in which case a call that matches none of the
    ///  operator rules fails.
    pub fn new(
        source_name: impl Into<String>,
        target: SqlOperator,
        operand_rule: Option<&str>,
        result_rule: Option<&str>,
        operator_rules: Option<&str>,
    ) -> Result<Self> {
        Ok(Self::from_parts(
            source_name.into(),
            target,
            grammar::parse_operand_rule(operand_rule)?,
            grammar::parse_result_rule(result_rule)?,
            grammar::parse_operator_rules(operator_rules)?,
        ))
    }

    /// Builds a transformer from rules that were already decoded as JSON, as
    ///  they are when loaded from a UDF map file.
    pub fn from_values(
        source_name: impl Into<String>,
        target: SqlOperator,
        operand_rule: Option<&Value>,
        result_rule: Option<&Value>,
        operator_rules: Option<&Value>,
    ) -> Result<Self> {
        Ok(Self::from_parts(
            source_name.into(),
            target,
            operand_rule.map(grammar::operand_rule_from_value).transpose()?,
            result_rule.map(grammar::result_rule_from_value).transpose()?,
            operator_rules
                .map(grammar::operator_rules_from_value)
                .transpose()?
                .unwrap_or_default(),
        ))
    }

    pub fn from_parts(
        source_name: String,
        target: SqlOperator,
        operand_rule: Option<OperandRule>,
        result_rule: Option<ResultRule>,
        operator_rules: Vec<OperatorRuleEntry>,
    ) -> Self {
        debug!(
            "built transformer {source_name} -> {} (operand rule: {}, result rule: {}, {} operator rules)",
            target.name,
            operand_rule.is_some(),
            result_rule.is_some(),
            operator_rules.len()
        );
        Self {
            source_name,
            target,
            operand_rule,
            result_rule,
            operator_rules,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn target(&self) -> &SqlOperator {
        &self.target
    }

    /// True when the transformer only renames the call.
    pub fn is_identity(&self) -> bool {
        self.operand_rule.is_none() && self.result_rule.is_none() && self.operator_rules.is_empty()
    }

    /// Rewrites one call given its operands.
    ///
    /// `renderer` is only consulted when operator rules are present, to obtain
    ///  the SQL text their patterns are matched against.
    pub fn transform_call<B, R>(
        &self,
        builder: &B,
        renderer: &R,
        source_operands: &[B::Expr],
    ) -> Result<B::Expr>
    where
        B: ExpressionBuilder,
        R: SqlRenderer<B::Expr> + ?Sized,
    {
        let target = self.resolve_target(renderer, source_operands)?;

        let operands = match &self.operand_rule {
            None => source_operands.to_vec(),
            Some(OperandRule(nodes)) => {
                let scope = Scope::operands(source_operands);
                nodes
                    .iter()
                    .map(|node| node.evaluate(builder, &scope))
                    .collect::<Result<Vec<_>>>()?
            }
        };

        debug!(
            "rewriting {}({} operands) as {}({} operands)",
            self.source_name,
            source_operands.len(),
            target.name,
            operands.len()
        );
        let call = builder.make_function_call(&target, operands);

        match &self.result_rule {
            None => Ok(call),
            Some(ResultRule(node)) => {
                node.evaluate(builder, &Scope::with_call(&call, source_operands))
            }
        }
    }

    fn resolve_target<E, R>(&self, renderer: &R, operands: &[E]) -> Result<SqlOperator>
    where
        R: SqlRenderer<E> + ?Sized,
    {
        if self.operator_rules.is_empty() {
            return self.default_target();
        }

        for rule in &self.operator_rules {
            let operand = rule.input.checked_sub(1).and_then(|i| operands.get(i));
            let operand = operand.ok_or_else(|| {
                Error::validation(format!(
                    "operator rule input {} is out of range for {} with {} operands",
                    rule.input,
                    self.source_name,
                    operands.len()
                ))
            })?;
            let sql = renderer.render_sql(operand);
            let matched = rule.pattern.is_match(&sql);
            trace!(
                "operator rule {:?} on input {} ({sql}): {}",
                rule.pattern_text(),
                rule.input,
                if matched { "match" } else { "no match" }
            );
            if matched {
                return Ok(SqlOperator::new(
                    rule.target_name.clone(),
                    self.target.return_type,
                ));
            }
        }

        self.default_target().map_err(|_| {
            Error::validation(format!(
                "no operator rule matched {} and no default target is configured",
                self.source_name
            ))
        })
    }

    fn default_target(&self) -> Result<SqlOperator> {
        if self.target.name.is_empty() {
            Err(Error::validation(format!(
                "no target function is configured for {}",
                self.source_name
            )))
        } else {
            Ok(self.target.clone())
        }
    }
}
