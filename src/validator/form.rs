//! Content-type handling and form body parsing.

/// Media type assumed when a request carries no `Content-Type`.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Lower-cased media type without parameters (`text/plain; charset=utf-8` → `text/plain`).
#[must_use]
pub fn media_type(raw: Option<&str>) -> String {
    match raw.map(|r| r.split(';').next().unwrap_or("").trim()) {
        Some(mt) if !mt.is_empty() => mt.to_ascii_lowercase(),
        _ => DEFAULT_MEDIA_TYPE.to_string(),
    }
}

/// Value of a `Content-Type` parameter such as `boundary`, unquoted.
#[must_use]
pub fn content_type_param(raw: &str, name: &str) -> Option<String> {
    raw.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// Outcome of reading a request body as form data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormBody {
    /// Decoded `(name, value)` pairs in body order.
    Pairs(Vec<(String, String)>),
    /// The body is not a form; it contributes no fields.
    NotForm,
    /// Declared multipart but unreadable.
    Malformed,
}

/// Parse an urlencoded or multipart body.
#[must_use]
pub fn parse_form(raw_content_type: Option<&str>, body: &[u8]) -> FormBody {
    match media_type(raw_content_type).as_str() {
        "application/x-www-form-urlencoded" => FormBody::Pairs(
            url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        ),
        "multipart/form-data" => raw_content_type
            .and_then(|raw| content_type_param(raw, "boundary"))
            .and_then(|boundary| parse_multipart(body, &boundary))
            .map_or(FormBody::Malformed, FormBody::Pairs),
        _ => FormBody::NotForm,
    }
}

fn parse_multipart(body: &[u8], boundary: &str) -> Option<Vec<(String, String)>> {
    if boundary.is_empty() {
        return None;
    }
    let dash_boundary = format!("--{boundary}").into_bytes();
    let delimiter = [b"\r\n".as_slice(), dash_boundary.as_slice()].concat();

    // The first boundary may open the body or follow a preamble line.
    let mut rest = if body.starts_with(&dash_boundary) {
        &body[dash_boundary.len()..]
    } else {
        let at = find(body, &delimiter)?;
        &body[at + delimiter.len()..]
    };

    let mut pairs = Vec::new();
    loop {
        if rest.starts_with(b"--") {
            return Some(pairs);
        }
        let line_end = find(rest, b"\r\n")?;
        // Only transport padding may follow a boundary on its line.
        if !rest[..line_end].iter().all(|b| *b == b' ' || *b == b'\t') {
            return None;
        }
        rest = &rest[line_end + 2..];
        // No closing delimiter means the body is truncated.
        let end = find(rest, &delimiter)?;
        let (name, value) = parse_part(&rest[..end])?;
        pairs.push((name, value));
        rest = &rest[end + delimiter.len()..];
    }
}

fn parse_part(part: &[u8]) -> Option<(String, String)> {
    let split = find(part, b"\r\n\r\n")?;
    let head = String::from_utf8_lossy(&part[..split]);
    let content = &part[split + 4..];
    let mut name = None;
    let mut charset = None;
    for line in head.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            name = disposition_name(value);
        } else if key.eq_ignore_ascii_case("content-type") {
            charset = content_type_param(value, "charset");
        }
    }
    Some((name?, decode_field(content, charset.as_deref())))
}

/// Field bytes as text: UTF-8 unless the part names another charset, with
/// ISO-8859-1 as the fallback for bytes that are not valid UTF-8.
fn decode_field(content: &[u8], charset: Option<&str>) -> String {
    let latin1 = charset.is_some_and(|c| {
        c.eq_ignore_ascii_case("iso-8859-1") || c.eq_ignore_ascii_case("latin1")
    });
    match std::str::from_utf8(content) {
        Ok(text) if !latin1 => text.to_string(),
        _ => content.iter().map(|b| char::from(*b)).collect(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn disposition_name(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("name="))
        .map(|name| name.trim_matches('"').to_string())
}
