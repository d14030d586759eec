//! Function catalogs.
//!
//! [`FunctionRegistry`] is the static catalog, built once and read-only
//!  afterwards. [`DynamicRegistry`] holds per-session definitions (for example
//!  UDFs declared by a view) and may be written while other sessions resolve.
//!  All lookups are by exact, case-sensitive name.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use log::warn;

use crate::{
    rex::{FieldType, SqlOperator},
    udf_transformer::UdfTransformer,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFunction {
    name: String,
    operator: SqlOperator,
    transformer: Option<Arc<UdfTransformer>>,
}

impl CatalogFunction {
    pub fn new(name: impl Into<String>, operator: SqlOperator) -> Self {
        Self {
            name: name.into(),
            operator,
            transformer: None,
        }
    }

    /// A function whose calls are rewritten by `transformer` when translated.
    pub fn with_transformer(mut self, transformer: Arc<UdfTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operator(&self) -> &SqlOperator {
        &self.operator
    }

    pub fn transformer(&self) -> Option<&Arc<UdfTransformer>> {
        self.transformer.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Vec<CatalogFunction>>,
}

impl FunctionRegistry {
    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder::default()
    }

    /// Every overload registered under `name`, in registration order.
    pub fn lookup(&self, name: &str) -> &[CatalogFunction] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Common Hive built-ins. Functions with numeric overloads are registered
    ///  once per return type.
    pub fn hive_builtins() -> Self {
        HIVE_BUILTINS
            .iter()
            .map(|(name, ty)| CatalogFunction::new(*name, SqlOperator::new(*name, *ty)))
            .collect()
    }
}

impl FromIterator<CatalogFunction> for FunctionRegistry {
    fn from_iter<I: IntoIterator<Item = CatalogFunction>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::builder(), FunctionRegistryBuilder::register)
            .build()
    }
}

#[derive(Debug, Default)]
pub struct FunctionRegistryBuilder {
    functions: HashMap<String, Vec<CatalogFunction>>,
}

impl FunctionRegistryBuilder {
    pub fn register(mut self, function: CatalogFunction) -> Self {
        self.functions
            .entry(function.name.clone())
            .or_default()
            .push(function);
        self
    }

    pub fn build(self) -> FunctionRegistry {
        FunctionRegistry {
            functions: self.functions,
        }
    }
}

const HIVE_BUILTINS: &[(&str, FieldType)] = &[
    ("abs", FieldType::BigInt),
    ("abs", FieldType::Double),
    ("abs", FieldType::Decimal),
    ("ceil", FieldType::BigInt),
    ("concat", FieldType::Varchar),
    ("concat_ws", FieldType::Varchar),
    ("current_date", FieldType::Date),
    ("date_add", FieldType::Date),
    ("date_sub", FieldType::Date),
    ("datediff", FieldType::Integer),
    ("day", FieldType::Integer),
    ("exp", FieldType::Double),
    ("floor", FieldType::BigInt),
    ("from_unixtime", FieldType::Varchar),
    ("instr", FieldType::Integer),
    ("length", FieldType::Integer),
    ("ln", FieldType::Double),
    ("lower", FieldType::Varchar),
    ("ltrim", FieldType::Varchar),
    ("md5", FieldType::Varchar),
    ("month", FieldType::Integer),
    ("pmod", FieldType::Integer),
    ("pmod", FieldType::Double),
    ("pow", FieldType::Double),
    ("power", FieldType::Double),
    ("rand", FieldType::Double),
    ("regexp_extract", FieldType::Varchar),
    ("regexp_replace", FieldType::Varchar),
    ("round", FieldType::Double),
    ("round", FieldType::Decimal),
    ("rtrim", FieldType::Varchar),
    ("sqrt", FieldType::Double),
    ("substr", FieldType::Varchar),
    ("substring", FieldType::Varchar),
    ("to_date", FieldType::Varchar),
    ("trim", FieldType::Varchar),
    ("unix_timestamp", FieldType::BigInt),
    ("upper", FieldType::Varchar),
    ("year", FieldType::Integer),
];

/// Session-scoped function definitions. Entries here shadow the static
///  registry. The owner clears it when the session or query ends.
#[derive(Debug, Default)]
pub struct DynamicRegistry {
    functions: DashMap<String, CatalogFunction>,
}

impl DynamicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` under its name, returning the definition it
    ///  replaced, if any.
    pub fn register(&self, function: CatalogFunction) -> Option<CatalogFunction> {
        let name = function.name.clone();
        let replaced = self.functions.insert(name, function);
        if let Some(old) = &replaced {
            warn!("dynamic function {} was redefined", old.name);
        }
        replaced
    }

    pub fn unregister(&self, name: &str) -> Option<CatalogFunction> {
        self.functions.remove(name).map(|(_, f)| f)
    }

    pub fn get(&self, name: &str) -> Option<CatalogFunction> {
        self.functions.get(name).map(|f| f.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn clear(&self) {
        self.functions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, ty: FieldType) -> CatalogFunction {
        CatalogFunction::new(name, SqlOperator::new(name, ty))
    }

    #[test]
    fn overloads_keep_registration_order() {
        let registry = FunctionRegistry::builder()
            .register(function("round", FieldType::Double))
            .register(function("upper", FieldType::Varchar))
            .register(function("round", FieldType::Decimal))
            .build();
        let rounds: Vec<_> = registry
            .lookup("round")
            .iter()
            .map(|f| f.operator().return_type)
            .collect();
        assert_eq!(rounds, vec![FieldType::Double, FieldType::Decimal]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lookups_are_case_sensitive() {
        let registry: FunctionRegistry = [function("upper", FieldType::Varchar)]
            .into_iter()
            .collect();
        assert!(registry.contains("upper"));
        assert!(registry.lookup("UPPER").is_empty());
        assert!(!registry.contains("Upper"));
    }

    #[test]
    fn hive_builtins_have_overloads() {
        let registry = FunctionRegistry::hive_builtins();
        assert_eq!(registry.lookup("abs").len(), 3);
        assert_eq!(registry.lookup("datediff").len(), 1);
        assert!(registry.names().any(|n| n == "regexp_extract"));
    }

    #[test]
    fn dynamic_registry_lifecycle() {
        let dynamic = DynamicRegistry::new();
        assert!(dynamic.is_empty());
        assert!(dynamic.register(function("my_udf", FieldType::Integer)).is_none());

        let replaced = dynamic.register(function("my_udf", FieldType::Varchar));
        assert_eq!(
            replaced.map(|f| f.operator().return_type),
            Some(FieldType::Integer)
        );
        assert_eq!(
            dynamic.get("my_udf").map(|f| f.operator().return_type),
            Some(FieldType::Varchar)
        );
        assert_eq!(dynamic.len(), 1);

        assert!(dynamic.unregister("my_udf").is_some());
        assert!(!dynamic.contains("my_udf"));

        dynamic.register(function("a", FieldType::Integer));
        dynamic.register(function("b", FieldType::Integer));
        dynamic.clear();
        assert!(dynamic.is_empty());
    }
}
