//! Cross-dialect rewriting of SQL function calls.
//!
//! A [`UdfTransformer`] rewrites one call according to a small JSON rule
//!  language (see [`grammar`]); the [`FunctionResolver`] and
//!  [`CatalogOperatorTable`] decide which catalog entry, and therefore which
//!  rewrite, a function name refers to.

pub mod error;
pub mod evaluate;
pub mod grammar;
pub mod operator_table;
pub mod registry;
pub mod resolver;
pub mod rex;
pub mod to_sql;
pub mod udf_map;
pub mod udf_transformer;


pub use error::{Error, Result};
pub use operator_table::{CatalogOperatorTable, OperatorTable};
pub use registry::{CatalogFunction, DynamicRegistry, FunctionRegistry};
pub use resolver::FunctionResolver;
pub use rex::{ExpressionBuilder, FieldType, SqlOperator};
pub use to_sql::SqlRenderer;
pub use udf_map::UdfMap;
pub use udf_transformer::UdfTransformer;
