use super::error::{ConfigError, ErrorDescription, ValidationError};
use super::form::media_type;
use super::reference::{dereference, ReferenceError, MAX_REF_DEPTH};
use super::request::{validate_request, RequestSource, ValidatedRequest};
use super::schema::{build_schema, compile_schema, group_parameters};
use super::defaults::inject_defaults;
use crate::spec::{ApiDocument, Parameter, ParameterLocation};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, warn};

/// Validator for the data found at one request location.
pub struct LocationValidator {
    location: ParameterLocation,
    schema: Value,
    declared: Vec<String>,
    validator: jsonschema::Validator,
}

impl LocationValidator {
    /// # Errors
    ///
    /// Fails when `schema` does not compile as a Draft-4 schema.
    pub fn new(location: ParameterLocation, schema: Value, declared: Vec<String>) -> Result<Self, ConfigError> {
        let validator = compile_schema(location, &schema)?;
        Ok(Self {
            location,
            schema,
            declared,
            validator,
        })
    }

    #[must_use]
    pub fn location(&self) -> ParameterLocation {
        self.location
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Names of the parameters declared for this location.
    #[must_use]
    pub fn declared_names(&self) -> &[String] {
        &self.declared
    }

    /// Fill in defaults, then check `instance` against the location schema.
    ///
    /// # Errors
    ///
    /// Returns the first schema violation.
    pub fn validate(&self, instance: &mut Value) -> Result<(), ValidationError> {
        inject_defaults(&self.schema, instance);
        let first = self.validator.iter_errors(instance).next();
        match first {
            None => Ok(()),
            Some(err) => Err(self.describe(&err)),
        }
    }

    fn describe(&self, err: &jsonschema::ValidationError<'_>) -> ValidationError {
        let schema_path = err.schema_path.to_string();
        let (parent, keyword) = schema_path.rsplit_once('/').unwrap_or(("", schema_path.as_str()));
        let schema = self
            .schema
            .pointer(parent)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let mut field = self.location.result_key().to_string();
        for segment in err.instance_path.to_string().split('/').filter(|s| !s.is_empty()) {
            field.push('.');
            field.push_str(&unescape_pointer(segment));
        }

        ValidationError::new(
            err.to_string(),
            ErrorDescription {
                validator: unescape_pointer(keyword),
                schema,
                field,
                value: err.instance.clone().into_owned(),
            },
        )
        .with_schema_path(format!("{}{}", self.location.result_key(), schema_path))
    }
}

impl fmt::Debug for LocationValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationValidator")
            .field("location", &self.location)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Reusable validator for one Swagger operation.
///
/// Immutable once built and shared between request coroutines behind an `Arc`.
#[derive(Debug)]
pub struct CompiledValidator {
    operation: Value,
    consumes: Vec<String>,
    groups: Vec<LocationValidator>,
    rejection: Option<ValidationError>,
}

impl CompiledValidator {
    /// Validator that rejects every request with the same error.
    ///
    /// Used for operations whose references cycle.
    #[must_use]
    pub fn rejecting(operation: Value, error: ValidationError) -> Self {
        Self {
            operation,
            consumes: Vec::new(),
            groups: Vec::new(),
            rejection: Some(error),
        }
    }

    /// The dereferenced operation (or the raw one, for rejecting validators).
    #[must_use]
    pub fn operation(&self) -> &Value {
        &self.operation
    }

    /// Accepted media types, normalized.
    #[must_use]
    pub fn consumes(&self) -> &[String] {
        &self.consumes
    }

    #[must_use]
    pub fn groups(&self) -> &[LocationValidator] {
        &self.groups
    }

    #[must_use]
    pub fn rejection(&self) -> Option<&ValidationError> {
        self.rejection.as_ref()
    }

    /// Schema generated for a location, if the operation declares any
    /// parameter there.
    #[must_use]
    pub fn schema_for(&self, location: ParameterLocation) -> Option<&Value> {
        self.groups
            .iter()
            .find(|g| g.location == location)
            .map(LocationValidator::schema)
    }

    /// Validate a request against this operation.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate<R: RequestSource + ?Sized>(&self, request: &mut R) -> Result<ValidatedRequest, ValidationError> {
        validate_request(request, self)
    }
}

/// Compile the validator for one operation of `document`.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the operation cannot be turned into
/// schemas. Reference cycles do not fail compilation; they yield a validator
/// that rejects every request with the cycle error.
pub fn compile(document: &ApiDocument, operation: &Value) -> Result<CompiledValidator, ConfigError> {
    let resolved = match dereference(document.as_value(), operation) {
        Ok(resolved) => resolved,
        Err(ReferenceError::Cycle(reference)) => {
            warn!(reference = %reference, "Swagger reference cycle; requests to this operation will be rejected");
            return Ok(CompiledValidator::rejecting(
                operation.clone(),
                ValidationError::reference_cycle(&reference),
            ));
        }
        Err(ReferenceError::TooDeep(reference)) => {
            warn!(reference = %reference, max_depth = MAX_REF_DEPTH, "Swagger reference nesting too deep");
            return Ok(CompiledValidator::rejecting(
                operation.clone(),
                ValidationError::reference_depth(&reference, MAX_REF_DEPTH),
            ));
        }
        Err(ReferenceError::Unresolved(reference)) => {
            return Err(ConfigError::UnresolvedReference(reference));
        }
    };

    let op = resolved
        .as_object()
        .ok_or_else(|| ConfigError::Document("operation must be a mapping".to_string()))?;

    let parameters = match op.get("parameters") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| Parameter::from_value(index, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ConfigError::Document("`parameters` must be a list".to_string())),
    };

    let consumes = match op.get("consumes") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|c| media_type(Some(c)))
            .collect(),
        Some(_) => return Err(ConfigError::Document("`consumes` must be a list".to_string())),
    };

    let mut groups = Vec::new();
    for group in group_parameters(parameters)? {
        let schema = build_schema(&group)?;
        let declared = group.parameters.iter().map(|p| p.name.clone()).collect();
        groups.push(LocationValidator::new(group.location, schema, declared)?);
    }

    debug!(
        groups = ?groups.iter().map(|g| g.location.as_str()).collect::<Vec<_>>(),
        consumes = ?consumes,
        "Compiled operation validator"
    );

    Ok(CompiledValidator {
        operation: resolved,
        consumes,
        groups,
        rejection: None,
    })
}
