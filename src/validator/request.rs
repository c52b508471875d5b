use super::compile::{CompiledValidator, LocationValidator};
use super::error::ValidationError;
use super::form::{media_type, parse_form, FormBody};
use crate::spec::ParameterLocation;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read access to the parts of a live request that validation looks at.
pub trait RequestSource {
    /// Raw `Content-Type` header value, parameters included.
    fn content_type(&self) -> Option<&str>;

    /// Parameters captured by the matched route pattern.
    fn path_params(&self) -> &[(Arc<str>, String)];

    /// Decoded query string pairs, duplicates preserved.
    fn query_params(&self) -> &[(Arc<str>, String)];

    /// Header pairs, duplicates preserved.
    fn headers(&self) -> &[(Arc<str>, String)];

    /// Request body.
    ///
    /// Implementations backed by a stream read it on the first call and hand
    /// out the buffered bytes afterwards.
    fn body(&mut self) -> io::Result<&[u8]>;
}

/// Validated data, keyed by location.
///
/// A location is `None` when the operation declares no parameter there;
/// `Some(Value::Null)` is a legitimate value for an absent optional body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidatedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(rename = "formData", skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Value>,
}

impl ValidatedRequest {
    #[must_use]
    pub fn get(&self, location: ParameterLocation) -> Option<&Value> {
        match location {
            ParameterLocation::Header => self.headers.as_ref(),
            ParameterLocation::Query => self.query.as_ref(),
            ParameterLocation::FormData => self.form_data.as_ref(),
            ParameterLocation::Body => self.body.as_ref(),
            ParameterLocation::Path => self.path.as_ref(),
        }
    }

    fn set(&mut self, location: ParameterLocation, value: Value) {
        let slot = match location {
            ParameterLocation::Header => &mut self.headers,
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::FormData => &mut self.form_data,
            ParameterLocation::Body => &mut self.body,
            ParameterLocation::Path => &mut self.path,
        };
        *slot = Some(value);
    }

    /// The result as a JSON object with one key per validated location.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Collapse a multi-map into an object: a key seen once maps to its string,
/// a key seen several times maps to the array of its values in order.
pub fn collapse_pairs<'a, I>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value.to_string());
        match out.get_mut(key) {
            None => {
                out.insert(key.to_string(), value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    out
}

/// Headers keyed by the declared parameter name when one matches ignoring
/// ASCII case, by their lower-cased name otherwise.
fn collapse_headers(headers: &[(Arc<str>, String)], declared: &[String]) -> Map<String, Value> {
    let keyed: Vec<(String, &str)> = headers
        .iter()
        .map(|(name, value)| {
            let key = declared
                .iter()
                .find(|d| d.eq_ignore_ascii_case(name))
                .cloned()
                .unwrap_or_else(|| name.to_ascii_lowercase());
            (key, value.as_str())
        })
        .collect();
    collapse_pairs(keyed.iter().map(|(k, v)| (k.as_str(), *v)))
}

fn read_body<R: RequestSource + ?Sized>(request: &mut R) -> &[u8] {
    match request.body() {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "Request body could not be read; treating it as empty");
            &[]
        }
    }
}

/// Decode a body according to its media type.
///
/// JSON that fails to parse and empty bodies become `null`; text media types
/// become a string; anything else is passed on as (lossy) text.
#[must_use]
pub fn decode_body(media: &str, body: &[u8]) -> Value {
    if media == "application/json" {
        if body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(body).unwrap_or_else(|err| {
            debug!(error = %err, "JSON body did not parse; validating it as null");
            Value::Null
        })
    } else if media.starts_with("text") {
        Value::String(String::from_utf8_lossy(body).into_owned())
    } else if body.is_empty() {
        Value::Null
    } else {
        Value::String(String::from_utf8_lossy(body).into_owned())
    }
}

fn extract<R: RequestSource + ?Sized>(
    request: &mut R,
    group: &LocationValidator,
    raw_content_type: Option<&str>,
    media: &str,
) -> Value {
    match group.location() {
        ParameterLocation::Header => Value::Object(collapse_headers(request.headers(), group.declared_names())),
        ParameterLocation::Query => Value::Object(collapse_pairs(
            request.query_params().iter().map(|(k, v)| (k.as_ref(), v.as_str())),
        )),
        ParameterLocation::FormData => match parse_form(raw_content_type, read_body(request)) {
            FormBody::Pairs(pairs) => Value::Object(collapse_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))),
            FormBody::NotForm | FormBody::Malformed => Value::Object(Map::new()),
        },
        ParameterLocation::Body => decode_body(media, read_body(request)),
        ParameterLocation::Path => Value::Object(
            request
                .path_params()
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
                .collect(),
        ),
    }
}

/// Run a compiled validator against a request.
///
/// The content type is checked first, before the body is touched. Each
/// location is then extracted, defaulted and validated in declaration order;
/// the first failure aborts.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate_request<R: RequestSource + ?Sized>(
    request: &mut R,
    compiled: &CompiledValidator,
) -> Result<ValidatedRequest, ValidationError> {
    if let Some(rejection) = compiled.rejection() {
        return Err(rejection.clone());
    }

    let raw_content_type = request.content_type().map(str::to_string);
    let media = media_type(raw_content_type.as_deref());
    if !compiled.consumes().is_empty() && !compiled.consumes().iter().any(|c| *c == media) {
        return Err(ValidationError::unsupported_content_type(&media, compiled.consumes()));
    }

    let mut result = ValidatedRequest::default();
    for group in compiled.groups() {
        let mut instance = extract(request, group, raw_content_type.as_deref(), &media);
        group.validate(&mut instance)?;
        result.set(group.location(), instance);
    }
    Ok(result)
}
