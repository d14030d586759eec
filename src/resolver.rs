use std::sync::Arc;

use log::debug;

use crate::registry::{CatalogFunction, DynamicRegistry, FunctionRegistry};

/// Merges the static and session catalogs into one lookup.
#[derive(Debug, Clone)]
pub struct FunctionResolver {
    registry: Arc<FunctionRegistry>,
    dynamic: Arc<DynamicRegistry>,
}

impl FunctionResolver {
    pub fn new(registry: Arc<FunctionRegistry>, dynamic: Arc<DynamicRegistry>) -> Self {
        Self { registry, dynamic }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn dynamic(&self) -> &DynamicRegistry {
        &self.dynamic
    }

    /// All candidates for `name`: the session definition first, then the
    ///  static overloads in registration order.
    ///
    /// An unknown name yields an empty list; reporting a missing function is
    ///  the validator's job.
    pub fn resolve(&self, name: &str) -> Vec<CatalogFunction> {
        //NOTE: session entries are listed ahead of static overloads rather than
        // replacing them; the validator picks the first that fits the call.
        let candidates: Vec<_> = self
            .dynamic
            .get(name)
            .into_iter()
            .chain(self.registry.lookup(name).iter().cloned())
            .collect();
        debug!("resolved {name} to {} candidates", candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rex::{FieldType, SqlOperator};

    fn function(name: &str, ty: FieldType) -> CatalogFunction {
        CatalogFunction::new(name, SqlOperator::new(name, ty))
    }

    fn resolver() -> FunctionResolver {
        let registry = FunctionRegistry::builder()
            .register(function("f", FieldType::Integer))
            .register(function("f", FieldType::Double))
            .register(function("g", FieldType::Varchar))
            .build();
        FunctionResolver::new(Arc::new(registry), Arc::new(DynamicRegistry::new()))
    }

    fn return_types(functions: &[CatalogFunction]) -> Vec<FieldType> {
        functions.iter().map(|f| f.operator().return_type).collect()
    }

    #[test]
    fn static_overloads_in_order() {
        let r = resolver();
        assert_eq!(
            return_types(&r.resolve("f")),
            vec![FieldType::Integer, FieldType::Double]
        );
    }

    #[test]
    fn unknown_names_resolve_to_nothing() {
        let r = resolver();
        assert!(r.resolve("nope").is_empty());
        assert!(r.resolve("F").is_empty());
    }

    #[test]
    fn dynamic_entries_come_first() {
        let r = resolver();
        r.dynamic().register(function("f", FieldType::Boolean));
        r.dynamic().register(function("session_only", FieldType::Date));
        assert_eq!(
            return_types(&r.resolve("f")),
            vec![FieldType::Boolean, FieldType::Integer, FieldType::Double]
        );
        assert_eq!(
            return_types(&r.resolve("session_only")),
            vec![FieldType::Date]
        );

        r.dynamic().clear();
        assert_eq!(r.resolve("f").len(), 2);
        assert!(r.resolve("session_only").is_empty());
    }
}
