//! Query syntax parsing.
//!
//! `common` holds the chumsky primitives shared by the grammar; `lucene`
//! builds the full filter grammar and lowers it into [`Expr`](crate::ast::Expr).

mod common;
mod lucene;

pub use lucene::LuceneSyntax;
