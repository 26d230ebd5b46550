//! Type-checked programmatic query construction.
//!
//! Queries are built as explicit trees: a [`QueryContext`] owns the source
//! and parameter arenas, a [`QueryStructure`] holds one query level's
//! roots, selection, restriction, grouping and ordering, and a
//! [`Renderer`] compiles the whole thing to portable query text plus
//! parameter metadata.
//!
//! ```
//! use criteria::{
//!     JoinKind, QueryContext, QueryStructure, Renderer, ResultShape, ScalarType,
//!     expr::gt,
//!     metadata::{EntityType, SchemaMetamodel},
//! };
//!
//! # fn main() -> criteria::Result<()> {
//! let model = SchemaMetamodel::new()
//!     .with_entity(
//!         EntityType::new("Customer")
//!             .basic("name", ScalarType::Text)
//!             .set("orders", criteria::TypeRef::Entity("Order".into())),
//!     )
//!     .with_entity(EntityType::new("Order").basic("amount", ScalarType::Decimal));
//!
//! let mut ctx = QueryContext::new(&model);
//! let mut query = QueryStructure::new(ResultShape::Untyped);
//! let customer = query.from(&mut ctx, "Customer")?;
//! let orders = ctx.join(customer, "orders", JoinKind::Inner)?;
//! let amount = ctx.path(orders).navigate(&ctx, "amount")?;
//! query.select_expr(ctx.path(customer).navigate(&ctx, "name")?);
//! query.restrict(gt(amount, ctx.parameter(ScalarType::Decimal)));
//!
//! let compiled = Renderer::new().compile(&ctx, &query)?;
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT \"t0\".\"name\" FROM Customer AS \"t0\" \
//!      INNER JOIN \"t0\".\"orders\" AS \"t1\" WHERE \"t1\".\"amount\" > ?"
//! );
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
pub mod expr;
pub mod metadata;
mod path;
mod query;
mod render;
mod sql;
mod types;

pub use context::{
    JoinKind, ParamId, ParamInfo, Plurality, QueryContext, SourceId, SourceKind, SourceNode,
};
pub use error::{QueryError, Result};
pub use path::Path;
pub use query::{
    CompoundKind, Order, QueryStructure, ResultShape, Selection, asc, desc,
};
pub use render::{Compiled, Renderer};
pub use sql::{Chunk, Sql, Token};
pub use types::{ScalarType, TypeRef};
