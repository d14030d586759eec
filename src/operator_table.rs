use crate::{resolver::FunctionResolver, rex::SqlOperator};

/// The overload-lookup protocol a SQL validator uses to turn a function name
///  into candidate operators.
pub trait OperatorTable {
    /// Candidate operators for a possibly qualified function name
    ///  (`["db", "fn"]`). Narrowing by argument count and type is left to the
    ///  caller.
    fn lookup_operator_overloads(&self, identifier: &[&str]) -> Vec<SqlOperator>;

    /// Every operator the table knows about.
    fn operator_list(&self) -> Vec<SqlOperator>;
}

/// Exposes a [`FunctionResolver`] to the validator. Lookups are case-sensitive.
#[derive(Debug, Clone)]
pub struct CatalogOperatorTable {
    resolver: FunctionResolver,
}

impl CatalogOperatorTable {
    pub fn new(resolver: FunctionResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &FunctionResolver {
        &self.resolver
    }
}

impl OperatorTable for CatalogOperatorTable {
    fn lookup_operator_overloads(&self, identifier: &[&str]) -> Vec<SqlOperator> {
        let Some(name) = identifier.last() else {
            return Vec::new();
        };
        self.resolver
            .resolve(name)
            .into_iter()
            .map(|f| f.operator().clone())
            .collect()
    }

    // TODO: enumerate the registries once a consumer needs the full operator list
    fn operator_list(&self) -> Vec<SqlOperator> {
        Vec::new()
    }
}
