//! Parameter schemas: untrusted input in, normalized value or field errors out.

use std::fmt::{self, Display, Formatter};
use std::marker::PhantomData;

use jsonschema::{Draft, JSONSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const ROOT_PATH: &str = "/";

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    path: String,
    message: String,
}

impl FieldError {
    /// Creates an error for the field at `path` (a JSON pointer).
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            path: if path.is_empty() {
                ROOT_PATH.to_owned()
            } else {
                path
            },
            message: message.into(),
        }
    }

    /// Creates an error concerning the input as a whole.
    #[must_use]
    pub fn root(message: impl Into<String>) -> Self {
        Self::new(ROOT_PATH, message)
    }

    /// Returns the JSON pointer of the rejected field.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the validation message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Field errors produced by a rejected input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaErrors(Vec<FieldError>);

impl SchemaErrors {
    /// Wraps a single error.
    #[must_use]
    pub fn single(error: FieldError) -> Self {
        Self(vec![error])
    }

    /// Returns the individual errors.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Returns each error rendered as `path: message`.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<FieldError>> for SchemaErrors {
    fn from(value: Vec<FieldError>) -> Self {
        Self(value)
    }
}

impl FromIterator<FieldError> for SchemaErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for SchemaErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            Display::fmt(error, f)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

/// Attempt-parses an untrusted value into a normalized value.
pub trait ParameterSchema: Send + Sync {
    /// Accepts and normalizes `input`, or rejects it with field errors.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaErrors`] describing every rejected field.
    fn parse(&self, input: &Value) -> Result<Value, SchemaErrors>;

    /// JSON Schema advertised to callers, when one exists.
    fn json_schema(&self) -> Option<Value> {
        None
    }
}

impl<F> ParameterSchema for F
where
    F: Send + Sync + Fn(&Value) -> Result<Value, SchemaErrors>,
{
    fn parse(&self, input: &Value) -> Result<Value, SchemaErrors> {
        (self)(input)
    }
}

/// Schema accepting any input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyParameters;

impl ParameterSchema for AnyParameters {
    fn parse(&self, input: &Value) -> Result<Value, SchemaErrors> {
        Ok(input.clone())
    }
}

/// A JSON Schema document failed to compile.
#[derive(Debug, Error)]
#[error("invalid JSON schema: {reason}")]
pub struct InvalidSchema {
    reason: String,
}

/// Validates input against a JSON Schema (draft 7) document.
pub struct JsonSchemaParameters {
    raw: Value,
    compiled: JSONSchema,
}

impl fmt::Debug for JsonSchemaParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaParameters")
            .field("schema", &self.raw)
            .finish_non_exhaustive()
    }
}

impl JsonSchemaParameters {
    /// Compiles the supplied schema document.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSchema`] when the document is not a valid schema.
    pub fn new(schema: Value) -> Result<Self, InvalidSchema> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|err| InvalidSchema {
                reason: err.to_string(),
            })?;
        Ok(Self {
            raw: schema,
            compiled,
        })
    }
}

impl ParameterSchema for JsonSchemaParameters {
    fn parse(&self, input: &Value) -> Result<Value, SchemaErrors> {
        match self.compiled.validate(input) {
            Ok(()) => Ok(input.clone()),
            Err(errors) => Err(errors
                .map(|err| FieldError::new(err.instance_path.to_string(), err.to_string()))
                .collect()),
        }
    }

    fn json_schema(&self) -> Option<Value> {
        Some(self.raw.clone())
    }
}

/// Deserializes input into `T` and re-serializes it, applying serde defaults
/// and dropping unknown fields unless `T` denies them.
pub struct TypedParameters<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedParameters<T> {
    /// Creates the schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedParameters<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedParameters<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedParameters")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> ParameterSchema for TypedParameters<T>
where
    T: DeserializeOwned + Serialize,
{
    fn parse(&self, input: &Value) -> Result<Value, SchemaErrors> {
        let typed = T::deserialize(input)
            .map_err(|err| SchemaErrors::single(FieldError::root(err.to_string())))?;
        serde_json::to_value(typed)
            .map_err(|err| SchemaErrors::single(FieldError::root(err.to_string())))
    }
}
