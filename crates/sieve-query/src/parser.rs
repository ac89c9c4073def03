//! Query parser facade.
//!
//! Runs the fixed pipeline: safety validation, implicit-term expansion,
//! field reference validation, grammar, then rendering for the requested
//! provider. A parser is immutable after construction and can be shared
//! across threads.

use crate::ast::Expr;
use crate::config::ParserConfiguration;
use crate::error::{ConfigurationError, InvalidFieldError, LimitExceededError, QueryResult};
use crate::expand::ImplicitExpander;
use crate::fields::FieldValidator;
use crate::limits::SafetyValidator;
use crate::render::{
    PartiqlFragment, PartiqlRenderer, QueryRenderer, RenderedQuery, SqlFragment, SqlProvider,
    SqlRenderer,
};
use crate::schema::FieldSchema;
use crate::syntax::LuceneSyntax;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// Target backend for a compiled filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(alias = "postgres")]
    Postgresql,
    Mysql,
    Sqlite,
    Dynamodb,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Postgresql,
        Provider::Mysql,
        Provider::Sqlite,
        Provider::Dynamodb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Dynamodb => "dynamodb",
        }
    }

    /// The SQL dialect, or `None` for PartiQL
    pub fn sql(self) -> Option<SqlProvider> {
        match self {
            Self::Postgresql => Some(SqlProvider::Postgresql),
            Self::Mysql => Some(SqlProvider::Mysql),
            Self::Sqlite => Some(SqlProvider::Sqlite),
            Self::Dynamodb => None,
        }
    }
}

impl From<SqlProvider> for Provider {
    fn from(provider: SqlProvider) -> Self {
        match provider {
            SqlProvider::Postgresql => Self::Postgresql,
            SqlProvider::Mysql => Self::Mysql,
            SqlProvider::Sqlite => Self::Sqlite,
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(Self::Postgresql),
            "mysql" => Ok(Self::Mysql),
            "sqlite" => Ok(Self::Sqlite),
            "dynamodb" => Ok(Self::Dynamodb),
            _ => Err(ConfigurationError::UnknownProvider(s.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compiles filter queries against one schema.
#[derive(Debug, Clone)]
pub struct QueryParser {
    schema: FieldSchema,
    config: ParserConfiguration,
    safety: SafetyValidator,
    expander: ImplicitExpander,
    fields: FieldValidator,
    syntax: LuceneSyntax,
    postgresql: SqlRenderer,
    mysql: SqlRenderer,
    sqlite: SqlRenderer,
    partiql: PartiqlRenderer,
}

impl QueryParser {
    pub fn new(schema: FieldSchema, config: ParserConfiguration) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let expander = ImplicitExpander::new(&schema);
        let syntax = LuceneSyntax::new(schema.default_field().map(str::to_string));
        debug!(
            fields = schema.len(),
            implicit = ?expander.fields(),
            default_field = ?syntax.default_field(),
            "query parser ready"
        );

        Ok(Self {
            fields: FieldValidator::new(schema.clone()),
            schema,
            config,
            safety: SafetyValidator::new(config),
            expander,
            syntax,
            postgresql: SqlRenderer::new(SqlProvider::Postgresql),
            mysql: SqlRenderer::new(SqlProvider::Mysql),
            sqlite: SqlRenderer::new(SqlProvider::Sqlite),
            partiql: PartiqlRenderer::new(),
        })
    }

    /// Parser with default limits
    pub fn with_schema(schema: FieldSchema) -> Result<Self, ConfigurationError> {
        Self::new(schema, ParserConfiguration::default())
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn config(&self) -> &ParserConfiguration {
        &self.config
    }

    /// Check length, depth and term limits on the raw query
    pub fn validate(&self, raw: &str) -> Result<(), LimitExceededError> {
        match self.safety.validate(raw) {
            Ok(stats) => {
                debug!(
                    length = stats.length,
                    depth = stats.depth,
                    terms = stats.terms,
                    "query within limits"
                );
                Ok(())
            }
            Err(err) => {
                warn!(violations = err.violations.len(), error = %err, "query rejected by limits");
                Err(err)
            }
        }
    }

    /// Rewrite bare terms into field-qualified alternatives
    pub fn expand(&self, raw: &str) -> String {
        self.expander.expand(raw)
    }

    pub fn validate_fields(&self, query: &str) -> Result<(), InvalidFieldError> {
        self.fields.validate(query)
    }

    /// Run every stage up to the expression tree. `None` means no filter.
    pub fn parse(&self, raw: &str) -> QueryResult<Option<Expr>> {
        trace!(query = raw, "compiling query");
        self.validate(raw)?;

        let expanded = self.expand(raw);
        trace!(expanded = %expanded, "expanded implicit terms");

        self.validate_fields(&expanded)?;

        let expr = self.syntax.parse(&expanded)?;
        if let Some(expr) = &expr {
            self.fields.validate_expr(expr)?;
        }
        debug!(
            root = expr.as_ref().map(Expr::operator),
            nodes = expr.as_ref().map_or(0, Expr::node_count),
            "parsed query"
        );
        Ok(expr)
    }

    pub fn to_sql(&self, raw: &str, provider: SqlProvider) -> QueryResult<Option<SqlFragment>> {
        let Some(expr) = self.parse(raw)? else {
            return Ok(None);
        };
        let fragment = self.sql_renderer(provider).render(&expr)?;
        debug!(%provider, params = fragment.params.len(), "rendered sql filter");
        Ok(Some(fragment))
    }

    pub fn to_partiql(&self, raw: &str) -> QueryResult<Option<PartiqlFragment>> {
        let Some(expr) = self.parse(raw)? else {
            return Ok(None);
        };
        let fragment = self.partiql.render(&expr)?;
        debug!(
            provider = self.partiql.name(),
            values = fragment.attribute_values.len(),
            "rendered partiql filter"
        );
        Ok(Some(fragment))
    }

    /// Compile for any provider
    pub fn compile(&self, raw: &str, provider: Provider) -> QueryResult<Option<RenderedQuery>> {
        match provider.sql() {
            Some(sql) => Ok(self.to_sql(raw, sql)?.map(RenderedQuery::Sql)),
            None => Ok(self.to_partiql(raw)?.map(RenderedQuery::Partiql)),
        }
    }

    fn sql_renderer(&self, provider: SqlProvider) -> &SqlRenderer {
        match provider {
            SqlProvider::Postgresql => &self.postgresql,
            SqlProvider::Mysql => &self.mysql,
            SqlProvider::Sqlite => &self.sqlite,
        }
    }
}
