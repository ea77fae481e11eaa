//! Bound parameters and parameter-carrying SQL fragments.
//!
//! Decomposition splits one statement into several sub-statements, so each
//! fragment remembers which caller parameters it references and binds them
//! late.

use serde::{Deserialize, Serialize};

use crate::errors::TemporalError;

use super::SqlValue;

/// Parameters supplied with a statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Params {
    #[default]
    None,
    /// Values for `?` / `?NNN` placeholders, first value is index 0.
    Positional(Vec<SqlValue>),
    /// Values for `:name`, `@name`, `$name` placeholders.
    Named(Vec<(String, SqlValue)>),
}

impl Params {
    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(v) => v.is_empty(),
            Params::Named(v) => v.is_empty(),
        }
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    fn named_value(&self, name: &str) -> Option<&SqlValue> {
        let Params::Named(values) = self else {
            return None;
        };
        let bare = name.trim_start_matches(&[':', '@', '$'][..]);
        values
            .iter()
            .find(|(n, _)| n == name || n.trim_start_matches(&[':', '@', '$'][..]) == bare)
            .map(|(_, v)| v)
    }
}

/// A placeholder occurrence inside a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamRef {
    /// Zero-based index into the caller's positional values.
    Positional(usize),
    /// Placeholder name including its prefix character.
    Named(String),
}

/// SQL text with its placeholder references in textual order.
///
/// Positional placeholders are normalized to anonymous `?` so fragments can
/// be concatenated in any order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlFragment {
    pub text: String,
    pub params: Vec<ParamRef>,
}

impl SqlFragment {
    pub fn new(text: impl Into<String>, params: Vec<ParamRef>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }

    /// A fragment without placeholders.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Bind this fragment on its own.
    pub fn bind(&self, params: &Params) -> Result<BoundSql, TemporalError> {
        let mut builder = SqlBuilder::new();
        builder.push_fragment(self, params)?;
        Ok(builder.finish())
    }
}

/// A ready-to-execute statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSql {
    pub sql: String,
    pub params: Params,
}

/// Accumulates SQL text and the parameter values referenced by embedded fragments.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    sql: String,
    positional: Vec<SqlValue>,
    named: Vec<(String, SqlValue)>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    /// Append an engine-side positional placeholder bound to `value`.
    pub fn push_value(&mut self, value: SqlValue) -> Result<&mut Self, TemporalError> {
        if !self.named.is_empty() {
            return Err(TemporalError::ParameterMismatch(
                "cannot mix positional and named parameters".to_string(),
            ));
        }
        self.sql.push('?');
        self.positional.push(value);
        Ok(self)
    }

    pub fn push_fragment(
        &mut self,
        fragment: &SqlFragment,
        params: &Params,
    ) -> Result<&mut Self, TemporalError> {
        for param in &fragment.params {
            match (param, params) {
                (ParamRef::Positional(index), Params::Positional(values)) => {
                    let value = values.get(*index).ok_or_else(|| {
                        TemporalError::ParameterMismatch(format!(
                            "statement references parameter {} but {} supplied",
                            index + 1,
                            values.len()
                        ))
                    })?;
                    if !self.named.is_empty() {
                        return Err(TemporalError::ParameterMismatch(
                            "cannot mix positional and named parameters".to_string(),
                        ));
                    }
                    self.positional.push(value.clone());
                }
                (ParamRef::Named(name), Params::Named(_)) => {
                    let value = params.named_value(name).ok_or_else(|| {
                        TemporalError::ParameterMismatch(format!("no value for {name}"))
                    })?;
                    if !self.positional.is_empty() {
                        return Err(TemporalError::ParameterMismatch(
                            "cannot mix positional and named parameters".to_string(),
                        ));
                    }
                    if !self.named.iter().any(|(n, _)| n == name) {
                        self.named.push((name.clone(), value.clone()));
                    }
                }
                (ParamRef::Positional(index), _) => {
                    return Err(TemporalError::ParameterMismatch(format!(
                        "positional parameter {} has no positional value",
                        index + 1
                    )))
                }
                (ParamRef::Named(name), _) => {
                    return Err(TemporalError::ParameterMismatch(format!(
                        "named parameter {name} has no named value"
                    )))
                }
            }
        }
        self.sql.push_str(&fragment.text);
        Ok(self)
    }

    pub fn finish(self) -> BoundSql {
        let params = if !self.positional.is_empty() {
            Params::Positional(self.positional)
        } else if !self.named.is_empty() {
            Params::Named(self.named)
        } else {
            Params::None
        };
        BoundSql {
            sql: self.sql,
            params,
        }
    }
}
