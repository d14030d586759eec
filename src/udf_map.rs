//! Source-dialect to target-dialect function tables.
//!
//! A [`UdfMap`] owns the rewrite rules for every function that does not carry
//!  over unchanged. Entries are keyed by lower-cased source name and operand
//!  count, so `date_add(a, b)` and a hypothetical three-argument `date_add` can
//!  map differently.
//!
//! Maps load from JSON:
//!
//! ```json
//! [
//!   {"source": "nvl", "operands": 2, "target": "coalesce", "return_type": "varchar"},
//!   {"source": "date_sub", "operands": 2, "target": "date_add", "return_type": "date",
//!    "operand_rule": [{"value": "day"},
//!                     {"op": "-", "operands": [{"input": 2}]},
//!                     {"op": "date", "operands": [{"input": 1}]}]}
//! ]
//! ```
//!
//! Rules may also be given as strings holding rule text.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{Error, Result},
    registry::CatalogFunction,
    rex::{ExpressionBuilder, FieldType, SqlOperator},
    to_sql::SqlRenderer,
    udf_transformer::UdfTransformer,
};

#[derive(Debug, Clone, Deserialize)]
pub struct UdfMapEntry {
    pub source: String,
    pub operands: usize,
    pub target: String,
    pub return_type: FieldType,
    #[serde(default)]
    pub operand_rule: Option<Value>,
    #[serde(default)]
    pub result_rule: Option<Value>,
    #[serde(default)]
    pub operator_rule: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct UdfMap {
    transformers: HashMap<(String, usize), Arc<UdfTransformer>>,
}

impl UdfMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let entries: Vec<UdfMapEntry> = serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("invalid UDF map entry: {e}")))?;
        let mut map = Self::new();
        for entry in entries {
            map.insert(entry)?;
        }
        Ok(map)
    }

    /// Hive functions whose Presto spelling or signature differs.
    pub fn hive_to_presto() -> Self {
        let mut map = Self::new();
        for (source, operands, target, return_type, operand_rule) in HIVE_TO_PRESTO {
            let transformer = UdfTransformer::new(
                *source,
                SqlOperator::new(*target, *return_type),
                *operand_rule,
                None,
                None,
            );
            match transformer {
                Ok(transformer) => {
                    map.insert_transformer(*operands, transformer);
                }
                Err(e) => warn!("skipping built-in mapping for {source}: {e}"),
            }
        }
        map
    }

    pub fn insert(&mut self, entry: UdfMapEntry) -> Result<()> {
        let operand_rule = entry.operand_rule.map(rule_value).transpose()?;
        let result_rule = entry.result_rule.map(rule_value).transpose()?;
        let operator_rule = entry.operator_rule.map(rule_value).transpose()?;
        let transformer = UdfTransformer::from_values(
            entry.source,
            SqlOperator::new(entry.target, entry.return_type),
            operand_rule.as_ref(),
            result_rule.as_ref(),
            operator_rule.as_ref(),
        )?;
        self.insert_transformer(entry.operands, transformer);
        Ok(())
    }

    /// Adds a rewrite, replacing any earlier one for the same name and operand
    ///  count. Returns the replaced rewrite.
    pub fn insert_transformer(
        &mut self,
        operands: usize,
        transformer: UdfTransformer,
    ) -> Option<Arc<UdfTransformer>> {
        let key = (transformer.source_name().to_lowercase(), operands);
        let old = self.transformers.insert(key, Arc::new(transformer));
        if let Some(old) = &old {
            warn!(
                "mapping for {}/{operands} was redefined",
                old.source_name()
            );
        }
        old
    }

    pub fn lookup(&self, name: &str, operands: usize) -> Option<&Arc<UdfTransformer>> {
        self.transformers.get(&(name.to_lowercase(), operands))
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Rewrites a call to `name` if the map has an entry for it. Returns
    ///  `Ok(None)` when the function carries over unchanged.
    pub fn transform_call<B, R>(
        &self,
        name: &str,
        builder: &B,
        renderer: &R,
        operands: &[B::Expr],
    ) -> Result<Option<B::Expr>>
    where
        B: ExpressionBuilder,
        R: SqlRenderer<B::Expr> + ?Sized,
    {
        self.lookup(name, operands.len())
            .map(|t| t.transform_call(builder, renderer, operands))
            .transpose()
    }

    /// Catalog entries for every mapped function, each carrying its rewrite.
    ///  The catalog name is the source name as written in the map.
    pub fn catalog_functions(&self) -> impl Iterator<Item = CatalogFunction> + '_ {
        self.transformers.values().map(|t| {
            CatalogFunction::new(t.source_name(), t.target().clone()).with_transformer(t.clone())
        })
    }
}

/// A rule is either inline JSON or a string of rule text.
fn rule_value(value: Value) -> Result<Value> {
    match value {
        Value::String(text) => Ok(serde_json::from_str(&text)?),
        v => Ok(v),
    }
}

type HiveToPrestoEntry = (
    &'static str,
    usize,
    &'static str,
    FieldType,
    Option<&'static str>,
);

const HIVE_TO_PRESTO: &[HiveToPrestoEntry] = &[
    ("nvl", 2, "coalesce", FieldType::Varchar, None),
    ("instr", 2, "strpos", FieldType::BigInt, None),
    ("pow", 2, "power", FieldType::Double, None),
    ("rand", 0, "random", FieldType::Double, None),
    ("substring", 2, "substr", FieldType::Varchar, None),
    ("substring", 3, "substr", FieldType::Varchar, None),
    ("to_date", 1, "date", FieldType::Date, None),
    (
        "date_add",
        2,
        "date_add",
        FieldType::Date,
        Some(r#"[{"value": "day"}, {"input": 2}, {"op": "date", "operands": [{"input": 1}]}]"#),
    ),
    (
        "date_sub",
        2,
        "date_add",
        FieldType::Date,
        Some(
            r#"[{"value": "day"}, {"op": "-", "operands": [{"input": 2}]}, {"op": "date", "operands": [{"input": 1}]}]"#,
        ),
    ),
    (
        "datediff",
        2,
        "date_diff",
        FieldType::BigInt,
        Some(
            r#"[{"value": "day"}, {"op": "date", "operands": [{"input": 2}]}, {"op": "date", "operands": [{"input": 1}]}]"#,
        ),
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rex::{ExprRef, RexBuilder},
        to_sql::PrinterConfig,
    };

    fn rewrite(map: &UdfMap, name: &str, operands: &[ExprRef]) -> Option<String> {
        let conf = PrinterConfig::default();
        map.transform_call(name, &RexBuilder, &conf, operands)
            .unwrap()
            .map(|e| conf.render_sql(&e))
    }

    #[test]
    fn hive_to_presto_entries_all_build() {
        assert_eq!(UdfMap::hive_to_presto().len(), HIVE_TO_PRESTO.len());
    }

    #[test]
    fn hive_date_functions() {
        let rex = RexBuilder;
        let map = UdfMap::hive_to_presto();
        let ops = vec![
            rex.input_ref(0, "ds", FieldType::Varchar),
            rex.input_ref(1, "n", FieldType::Integer),
        ];
        assert_eq!(
            rewrite(&map, "date_add", &ops).unwrap(),
            "date_add('day', n, CAST(ds AS DATE))"
        );
        assert_eq!(
            rewrite(&map, "DATE_SUB", &ops).unwrap(),
            "date_add('day', -n, CAST(ds AS DATE))"
        );
        assert_eq!(rewrite(&map, "nvl", &ops).unwrap(), "coalesce(ds, n)");
        // wrong operand count: carried over unchanged
        assert!(rewrite(&map, "date_add", &ops[..1]).is_none());
        assert!(rewrite(&map, "upper", &ops[..1]).is_none());
    }

    #[test]
    fn loads_inline_and_text_rules() {
        let map = UdfMap::from_json(
            r#"[
                {"source": "pmod", "operands": 2, "target": "mod", "return_type": "integer",
                 "operand_rule": [{"input": 1}, {"input": 2}],
                 "result_rule": "{\"op\": \"+\", \"operands\": [{\"input\": 0}, {\"input\": 2}]}"},
                {"source": "rand", "operands": 0, "target": "random", "return_type": "double"}
            ]"#,
        )
        .unwrap();
        assert_eq!(map.len(), 2);

        let rex = RexBuilder;
        let ops = vec![
            rex.input_ref(0, "a", FieldType::Integer),
            rex.input_ref(1, "b", FieldType::Integer),
        ];
        assert_eq!(rewrite(&map, "pmod", &ops).unwrap(), "mod(a, b) + b");
        assert_eq!(rewrite(&map, "rand", &[]).unwrap(), "random()");
    }

    #[test]
    fn load_errors_keep_their_kind() {
        assert!(matches!(UdfMap::from_json("[{"), Err(Error::Parse(_))));
        assert!(matches!(
            UdfMap::from_json(r#"[{"source": "f", "operands": 1}]"#),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            UdfMap::from_json(
                r#"[{"source": "f", "operands": 1, "target": "g", "return_type": "integer",
                     "operand_rule": "[{input}]"}]"#
            ),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            UdfMap::from_json(
                r#"[{"source": "f", "operands": 1, "target": "g", "return_type": "integer",
                     "operand_rule": {"input": 1}}]"#
            ),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            UdfMap::from_json(
                r#"[{"source": "f", "operands": 1, "target": "g", "return_type": "integer",
                     "operand_rule": [{"op": "%", "operands": [{"input": 1}, {"input": 1}]}]}]"#
            ),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn later_entries_replace_earlier_ones() {
        let map = UdfMap::from_json(
            r#"[
                {"source": "nvl", "operands": 2, "target": "coalesce", "return_type": "varchar"},
                {"source": "NVL", "operands": 2, "target": "ifnull", "return_type": "varchar"},
                {"source": "nvl", "operands": 3, "target": "coalesce", "return_type": "varchar"}
            ]"#,
        )
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.lookup("nvl", 2).unwrap().target().name, "ifnull");
        assert_eq!(map.lookup("nvl", 3).unwrap().target().name, "coalesce");

        let mut map = UdfMap::new();
        let t = |target: &str| {
            UdfTransformer::new("f", SqlOperator::new(target, FieldType::Integer), None, None, None)
                .unwrap()
        };
        assert!(map.insert_transformer(1, t("g")).is_none());
        let replaced = map.insert_transformer(1, t("h")).unwrap();
        assert_eq!(replaced.target().name, "g");
    }

    #[test]
    fn catalog_functions_carry_transformers() {
        let map = UdfMap::hive_to_presto();
        let functions: Vec<_> = map.catalog_functions().collect();
        assert_eq!(functions.len(), map.len());
        assert!(functions.iter().all(|f| f.transformer().is_some()));
        assert!(
            functions
                .iter()
                .any(|f| f.name() == "datediff" && f.operator().name == "date_diff")
        );
    }
}
