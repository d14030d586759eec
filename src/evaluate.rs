use crate::{
    error::{Error, Result},
    grammar::ExprNode,
    rex::ExpressionBuilder,
};

/// The operands a rule node may refer to with `{"input": i}`.
///
/// Position 0 is only bound while evaluating a result rule, where it is the
///  call that was just built; positions 1..=n are the source operands.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a, E> {
    call: Option<&'a E>,
    operands: &'a [E],
}

impl<'a, E> Scope<'a, E> {
    pub fn operands(operands: &'a [E]) -> Self {
        Self {
            call: None,
            operands,
        }
    }

    pub fn with_call(call: &'a E, operands: &'a [E]) -> Self {
        Self {
            call: Some(call),
            operands,
        }
    }

    pub fn get(&self, position: usize) -> Option<&'a E> {
        match position {
            0 => self.call,
            i => self.operands.get(i - 1),
        }
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }
}

impl ExprNode {
    pub fn evaluate<B: ExpressionBuilder>(
        &self,
        builder: &B,
        scope: &Scope<'_, B::Expr>,
    ) -> Result<B::Expr> {
        match self {
            ExprNode::InputRef(position) => {
                let operand = scope.get(*position).ok_or_else(|| {
                    Error::validation(format!(
                        "input {position} is out of range for a call with {} operands",
                        scope.len()
                    ))
                })?;
                // Column references are only meaningful relative to the
                //  projection that produced them, so never hand out the
                //  caller's node.
                Ok(builder
                    .make_input_ref(operand)
                    .unwrap_or_else(|| operand.clone()))
            }

            ExprNode::Literal(value) => Ok(builder.make_literal(value)),

            ExprNode::Operation(op, children) => {
                let args = children
                    .iter()
                    .map(|child| child.evaluate(builder, scope))
                    .collect::<Result<Vec<_>>>()?;
                Ok(builder.make_operator_call(*op, args))
            }
        }
    }
}
