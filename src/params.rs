//! Typed path parameters.
//!
//! A pattern segment `:id{int}` declares a parameter named `id` of type `int`.
//! Declarations are owned by the route that registered them and travel with
//! the request context; there is no process-wide lookup table.
//!
//! Coercion comes in two flavors. [`try_coerce`] surfaces failures as a typed
//! [`CoerceError`]. [`coerce`] is the legacy contract: a raw value that cannot
//! be converted silently degrades to the declared type's zero value (`0`,
//! `0.0`, `false`). Callers that care about the difference between "client
//! sent 0" and "client sent garbage" should use [`Ctx::try_param`].
//!
//! [`Ctx::try_param`]: crate::context::Ctx::try_param

use serde::Serialize;
use thiserror::Error;

/// Declared type of a path parameter. Defaults to `String` when the pattern
/// omits the `{type}` suffix or names an unknown type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Int,
    Int64,
    Float64,
    Bool,
}

impl ParamType {
    /// Parse a `{type}` suffix. Unknown names degrade to `String`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "int" => ParamType::Int,
            "int64" => ParamType::Int64,
            "float64" => ParamType::Float64,
            "bool" => ParamType::Bool,
            _ => ParamType::String,
        }
    }

    fn zero_value(self) -> ParamValue {
        match self {
            ParamType::String => ParamValue::Str(String::new()),
            ParamType::Int => ParamValue::Int(0),
            ParamType::Int64 => ParamValue::Int64(0),
            ParamType::Float64 => ParamValue::Float(0.0),
            ParamType::Bool => ParamValue::Bool(false),
        }
    }
}

/// One declared path parameter of a route: name plus declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
}

/// A coerced path parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Int64(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) | ParamValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// A raw path segment could not be converted to its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce {raw:?} to {ty:?} for path parameter {name:?}")]
pub struct CoerceError {
    pub name: String,
    pub raw: String,
    pub ty: ParamType,
}

/// Convert a raw path segment to the declared type, reporting failures.
pub fn try_coerce(spec: &ParamSpec, raw: &str) -> Result<ParamValue, CoerceError> {
    let err = || CoerceError {
        name: spec.name.clone(),
        raw: raw.to_string(),
        ty: spec.ty,
    };
    match spec.ty {
        ParamType::String => Ok(ParamValue::Str(raw.to_string())),
        ParamType::Int => raw.parse().map(ParamValue::Int).map_err(|_| err()),
        ParamType::Int64 => raw.parse().map(ParamValue::Int64).map_err(|_| err()),
        ParamType::Float64 => raw.parse().map(ParamValue::Float).map_err(|_| err()),
        ParamType::Bool => raw.parse().map(ParamValue::Bool).map_err(|_| err()),
    }
}

/// Convert a raw path segment, degrading silently to the zero value on
/// failure. This mirrors the historical contract; see the module docs.
#[must_use]
pub fn coerce(spec: &ParamSpec, raw: &str) -> ParamValue {
    try_coerce(spec, raw).unwrap_or_else(|_| spec.ty.zero_value())
}
