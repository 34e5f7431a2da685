//! A small JSONPath dialect for assertions.
//!
//! Supported syntax: `$` root, `.name` and `['name']` child access, `[n]`
//! and `[-n]` array indices, `[*]` and `.*` wildcards, and `..name`
//! recursive descent. A leading `$` is optional.

use serde_json::Value;

/// One compiled path step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Child(String),
    Index(i64),
    Wildcard,
    Descendant(Box<Segment>),
}

/// Errors raised for malformed path expressions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid JSON path '{path}': {reason}")]
pub struct JsonPathError {
    path: String,
    reason: String,
}

impl JsonPathError {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Returns every value matched by `path`, in document order.
///
/// # Errors
///
/// Returns [`JsonPathError`] when the expression cannot be parsed.
pub fn select<'a>(root: &'a Value, path: &str) -> Result<Vec<&'a Value>, JsonPathError> {
    let segments = parse(path)?;
    let mut current = vec![root];
    for segment in &segments {
        let mut next = Vec::new();
        for value in current {
            apply(segment, value, &mut next);
        }
        if next.is_empty() {
            return Ok(next);
        }
        current = next;
    }
    Ok(current)
}

/// Returns the first value matched by `path`.
///
/// # Errors
///
/// Returns [`JsonPathError`] when the expression cannot be parsed.
pub fn select_first<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>, JsonPathError> {
    Ok(select(root, path)?.into_iter().next())
}

fn apply<'a>(segment: &Segment, value: &'a Value, out: &mut Vec<&'a Value>) {
    match segment {
        Segment::Child(name) => {
            if let Some(child) = value.as_object().and_then(|map| map.get(name)) {
                out.push(child);
            }
        }
        Segment::Index(index) => {
            if let Some(items) = value.as_array() {
                let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                let resolved = if *index < 0 { len + index } else { *index };
                if let Some(item) = usize::try_from(resolved).ok().and_then(|i| items.get(i)) {
                    out.push(item);
                }
            }
        }
        Segment::Wildcard => match value {
            Value::Object(map) => out.extend(map.values()),
            Value::Array(items) => out.extend(items.iter()),
            _ => {}
        },
        Segment::Descendant(inner) => {
            let mut stack = vec![value];
            // pre-order walk so matches come out in document order
            while let Some(node) = stack.pop() {
                apply(inner, node, out);
                match node {
                    Value::Object(map) => stack.extend(map.values().rev()),
                    Value::Array(items) => stack.extend(items.iter().rev()),
                    _ => {}
                }
            }
        }
    }
}

fn parse(path: &str) -> Result<Vec<Segment>, JsonPathError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(JsonPathError::new(path, "empty expression"));
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let mut pos = 0;
    let mut segments = Vec::new();

    if chars[0] == '$' {
        pos = 1;
    } else if chars[0] != '.' && chars[0] != '[' {
        // bare `data.items` is read as `$.data.items`
        let (name, next) = read_name(&chars, 0);
        segments.push(Segment::Child(name));
        pos = next;
    }

    while pos < chars.len() {
        match chars[pos] {
            '.' if chars.get(pos + 1) == Some(&'.') => {
                pos += 2;
                let (inner, next) = match chars.get(pos) {
                    Some('[') => parse_bracket(path, &chars, pos)?,
                    Some('*') => (Segment::Wildcard, pos + 1),
                    Some(_) => {
                        let (name, next) = read_name(&chars, pos);
                        if name.is_empty() {
                            return Err(JsonPathError::new(
                                path,
                                format!("expected a name at {pos}"),
                            ));
                        }
                        (Segment::Child(name), next)
                    }
                    None => return Err(JsonPathError::new(path, "dangling '..'")),
                };
                segments.push(Segment::Descendant(Box::new(inner)));
                pos = next;
            }
            '.' => {
                pos += 1;
                if chars.get(pos) == Some(&'*') {
                    segments.push(Segment::Wildcard);
                    pos += 1;
                } else {
                    let (name, next) = read_name(&chars, pos);
                    if name.is_empty() {
                        return Err(JsonPathError::new(path, format!("expected a name at {pos}")));
                    }
                    segments.push(Segment::Child(name));
                    pos = next;
                }
            }
            '[' => {
                let (segment, next) = parse_bracket(path, &chars, pos)?;
                segments.push(segment);
                pos = next;
            }
            other => {
                return Err(JsonPathError::new(
                    path,
                    format!("unexpected '{other}' at {pos}"),
                ));
            }
        }
    }
    Ok(segments)
}

fn read_name(chars: &[char], start: usize) -> (String, usize) {
    let end = chars[start..]
        .iter()
        .position(|c| *c == '.' || *c == '[')
        .map_or(chars.len(), |offset| start + offset);
    (chars[start..end].iter().collect(), end)
}

/// Parses `[...]` starting at the opening bracket.
fn parse_bracket(
    path: &str,
    chars: &[char],
    start: usize,
) -> Result<(Segment, usize), JsonPathError> {
    let close = chars[start..]
        .iter()
        .position(|c| *c == ']')
        .map(|offset| start + offset)
        .ok_or_else(|| JsonPathError::new(path, format!("unclosed '[' at {start}")))?;
    let inner: String = chars[start + 1..close].iter().collect();
    let inner = inner.trim();

    let segment = if inner == "*" {
        Segment::Wildcard
    } else if let Some(name) = quoted(inner) {
        Segment::Child(name.to_string())
    } else {
        let index = inner
            .parse::<i64>()
            .map_err(|_| JsonPathError::new(path, format!("invalid index '{inner}'")))?;
        Segment::Index(index)
    };
    Ok((segment, close + 1))
}

fn quoted(text: &str) -> Option<&str> {
    ['\'', '"'].iter().find_map(|q| {
        text.strip_prefix(*q)
            .and_then(|rest| rest.strip_suffix(*q))
    })
}
