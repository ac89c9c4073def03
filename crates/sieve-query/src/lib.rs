//! Lucene-style filter compiler for SQL and PartiQL backends
//!
//! This crate turns user-supplied filter text such as
//! `name:john* AND age:[25 TO *]` into a parameterized boolean fragment for
//! PostgreSQL, MySQL, SQLite or DynamoDB PartiQL.
//!
//! ## Pipeline
//!
//! 1. **Safety validation**: length, nesting depth and term count limits
//! 2. **Implicit-term expansion**: `john` becomes `(name:*john* OR email:*john*)`
//! 3. **Field validation**: every `field:` reference must exist in the schema
//! 4. **Parsing**: chumsky grammar producing a closed [`Expr`] tree
//! 5. **Rendering**: dialect-specific fragment plus bound values
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sieve_query::{FieldDescriptor, FieldSchema, QueryParser, SqlProvider};
//!
//! let schema = FieldSchema::new(vec![
//!     FieldDescriptor::text("name"),
//!     FieldDescriptor::text("email"),
//! ])?;
//! let parser = QueryParser::with_schema(schema)?;
//!
//! let fragment = parser.to_sql("name:john", SqlProvider::Postgresql)?;
//! // Some(SqlFragment { sql: "\"name\" = $1", params: ["john"] })
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod expand;
pub mod fields;
pub mod limits;
pub mod parser;
pub mod render;
pub mod schema;
pub mod syntax;

mod pattern;
mod scan;

// Re-exports
pub use ast::{Column, Expr, Value};
pub use config::ParserConfiguration;
pub use error::{
    ConfigurationError, InvalidFieldError, InvalidFieldReason, LimitExceededError,
    LimitViolation, QueryError, QueryResult,
};
pub use expand::ImplicitExpander;
pub use fields::FieldValidator;
pub use limits::{QueryStats, SafetyValidator};
pub use parser::{Provider, QueryParser};
pub use render::{
    AttributeValue, PartiqlFragment, PartiqlRenderer, QueryRenderer, RenderedQuery, SqlFragment,
    SqlProvider, SqlRenderer,
};
pub use schema::{FieldDescriptor, FieldKind, FieldSchema, FieldSchemaBuilder};
pub use syntax::LuceneSyntax;
