//! Translation of Swagger parameter lists into per-location JSON schemas.

use super::error::ConfigError;
use crate::spec::{Parameter, ParameterLocation};
use serde_json::{json, Map, Value};

/// All parameters sharing one `in` location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGroup {
    pub location: ParameterLocation,
    pub parameters: Vec<Parameter>,
}

/// Group parameters by location, keeping the order in which each location
/// first appears.
///
/// # Errors
///
/// Returns [`ConfigError::DuplicateBody`] for a second `in: body` parameter.
pub fn group_parameters(parameters: Vec<Parameter>) -> Result<Vec<ParameterGroup>, ConfigError> {
    let mut groups: Vec<ParameterGroup> = Vec::new();
    for parameter in parameters {
        match groups.iter_mut().find(|g| g.location == parameter.location) {
            Some(group) => {
                if group.location == ParameterLocation::Body {
                    return Err(ConfigError::DuplicateBody);
                }
                group.parameters.push(parameter);
            }
            None => groups.push(ParameterGroup {
                location: parameter.location,
                parameters: vec![parameter],
            }),
        }
    }
    Ok(groups)
}

/// Object schema for a `path`, `query`, `header` or `formData` group.
///
/// # Errors
///
/// Fails when the generated schema is not a valid Draft-4 schema.
pub fn build_group_schema(location: ParameterLocation, parameters: &[Parameter]) -> Result<Value, ConfigError> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for parameter in parameters {
        properties.insert(parameter.name.clone(), parameter.constraint_schema());
        if parameter.required {
            required.push(Value::String(parameter.name.clone()));
        }
    }
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    let schema = Value::Object(schema);
    check_schema(location, &schema)?;
    Ok(schema)
}

/// Schema for the single body parameter.
///
/// An optional body also accepts `null`, which is what an absent or
/// unparseable body turns into.
///
/// # Errors
///
/// Fails when the parameter has no `schema` or the result is not a valid
/// Draft-4 schema.
pub fn build_body_schema(parameter: &Parameter) -> Result<Value, ConfigError> {
    let inner = parameter.schema.clone().ok_or_else(|| ConfigError::InvalidSchema {
        location: ParameterLocation::Body.to_string(),
        message: format!("body parameter `{}` has no schema", parameter.name),
    })?;
    let schema = if parameter.required {
        inner
    } else {
        json!({ "anyOf": [{"type": "null"}, inner] })
    };
    check_schema(ParameterLocation::Body, &schema)?;
    Ok(schema)
}

/// Build the schema matching a group's location.
///
/// # Errors
///
/// See [`build_group_schema`] and [`build_body_schema`].
pub fn build_schema(group: &ParameterGroup) -> Result<Value, ConfigError> {
    match group.location {
        ParameterLocation::Body => match group.parameters.as_slice() {
            [parameter] => build_body_schema(parameter),
            _ => Err(ConfigError::DuplicateBody),
        },
        location => build_group_schema(location, &group.parameters),
    }
}

/// Compile a Draft-4 validator, which also checks the schema against the
/// Draft-4 meta-schema.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSchema`] when the schema does not compile.
pub fn compile_schema(location: ParameterLocation, schema: &Value) -> Result<jsonschema::Validator, ConfigError> {
    jsonschema::options()
        .with_draft(jsonschema::Draft::Draft4)
        .build(schema)
        .map_err(|err| ConfigError::InvalidSchema {
            location: location.to_string(),
            message: err.to_string(),
        })
}

fn check_schema(location: ParameterLocation, schema: &Value) -> Result<(), ConfigError> {
    compile_schema(location, schema).map(|_| ())
}
