#![no_main]
use libfuzzer_sys::fuzz_target;

use arbitrary::Arbitrary;
use udf_rewrite::{
    FieldType, SqlOperator, UdfTransformer,
    rex::RexBuilder,
    to_sql::PrinterConfig,
};

#[derive(Debug, Arbitrary)]
pub struct RuleInput {
    pub operand_rule: Option<String>,
    pub result_rule: Option<String>,
    pub operator_rule: Option<String>,
}

fuzz_target!(|input: RuleInput| {
    // Any rule text must either build or fail with an error, never panic.
    let Ok(transformer) = UdfTransformer::new(
        "f",
        SqlOperator::new("g", FieldType::Integer),
        input.operand_rule.as_deref(),
        input.result_rule.as_deref(),
        input.operator_rule.as_deref(),
    ) else {
        return;
    };
    let rex = RexBuilder;
    let operands = vec![
        rex.input_ref(0, "a", FieldType::Integer),
        rex.input_ref(1, "b", FieldType::Varchar),
    ];
    let _ = transformer.transform_call(&rex, &PrinterConfig::default(), &operands);
});
