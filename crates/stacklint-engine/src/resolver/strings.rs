//! String and list functions: `Fn::Join`, `Fn::Split`, `Fn::Sub`,
//! `Fn::Select`, `Fn::Base64`, `Fn::Length`, `Fn::ToJsonString`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map, Value};

use super::pseudo::is_pseudo;
use stacklint_core::PathSegment;

use super::{all_present, invalid, scalar_text, when, Candidate, Resolver};
use crate::context::Context;
use crate::error::ResolveError;
use crate::functions::Function;

type Resolved = Result<Vec<Candidate>, ResolveError>;

/// A piece of an `Fn::Sub` template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubPart {
    /// Text copied verbatim.
    Literal(String),
    /// A `${Name}` reference.
    Variable(String),
}

/// Split an `Fn::Sub` string into literal text and variable references.
/// `${!Name}` is the literal `${Name}`; an unterminated `${` is literal.
pub fn sub_parts(text: &str) -> Vec<SubPart> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        literal.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        if let Some(escaped) = after.strip_prefix('!') {
            literal.push_str("${");
            rest = escaped;
            continue;
        }
        match after.find('}') {
            Some(end) => {
                if !literal.is_empty() {
                    parts.push(SubPart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(SubPart::Variable(after[..end].to_string()));
                rest = &after[end + 1..];
            }
            None => {
                literal.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(SubPart::Literal(literal));
    }
    parts
}

/// Distinct variable names referenced by an `Fn::Sub` string, in order of
/// first use.
pub fn sub_variables(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for part in sub_parts(text) {
        if let SubPart::Variable(name) = part {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

fn pair<'v>(function: Function, args: &'v Value, shape: &str) -> Result<(&'v Value, &'v Value), ResolveError> {
    match args {
        Value::Array(items) if items.len() == 2 => Ok((&items[0], &items[1])),
        _ => Err(invalid(function, format!("{} expects {shape}", function.name()), vec![])),
    }
}

pub(super) fn resolve_join(resolver: &Resolver, ctx: &Context, args: &Value) -> Resolved {
    let (delimiter, list) = pair(Function::Join, args, "[delimiter, [values]]")?;
    let Value::String(delimiter) = delimiter else {
        return Err(invalid(Function::Join, "the delimiter must be a string", vec![0usize.into()]));
    };
    let mut out = Vec::new();
    for candidate in resolver.resolve_argument(ctx, list, &[1usize.into()])? {
        let Value::Array(items) = &candidate.value else {
            return Err(invalid(Function::Join, "Fn::Join expects a list of values", vec![1usize.into()]));
        };
        let mut pieces = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match scalar_text(item) {
                Some(text) => pieces.push(text),
                None => {
                    return Err(invalid(
                        Function::Join,
                        format!("{item} is not a string"),
                        vec![1usize.into(), index.into()],
                    ))
                }
            }
        }
        out.push(Candidate {
            value: Value::String(pieces.join(delimiter)),
            assumptions: candidate.assumptions,
        });
    }
    Ok(out)
}

pub(super) fn resolve_split(resolver: &Resolver, ctx: &Context, args: &Value) -> Resolved {
    let (delimiter, source) = pair(Function::Split, args, "[delimiter, string]")?;
    let Value::String(delimiter) = delimiter else {
        return Err(invalid(Function::Split, "the delimiter must be a string", vec![0usize.into()]));
    };
    if delimiter.is_empty() {
        return Err(invalid(Function::Split, "the delimiter must not be empty", vec![0usize.into()]));
    }
    let mut out = Vec::new();
    for candidate in resolver.resolve_argument(ctx, source, &[1usize.into()])? {
        let Value::String(text) = &candidate.value else {
            return Err(invalid(Function::Split, "Fn::Split expects a string to split", vec![1usize.into()]));
        };
        out.push(Candidate {
            value: Value::Array(
                text.split(delimiter.as_str())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
            assumptions: candidate.assumptions,
        });
    }
    Ok(out)
}

pub(super) fn resolve_sub(resolver: &Resolver, ctx: &Context, args: &Value) -> Resolved {
    let (text, variables): (&str, Option<&Map<String, Value>>) = match args {
        Value::String(s) => (s, None),
        Value::Array(items) if items.len() == 2 => match (&items[0], &items[1]) {
            (Value::String(s), Value::Object(m)) => (s, Some(m)),
            _ => {
                return Err(invalid(
                    Function::Sub,
                    "Fn::Sub expects a string or [string, {variables}]",
                    vec![],
                ))
            }
        },
        _ => {
            return Err(invalid(
                Function::Sub,
                "Fn::Sub expects a string or [string, {variables}]",
                vec![],
            ))
        }
    };

    let parts = sub_parts(text);
    let names = sub_variables(text);
    let mut expressions: Vec<(Vec<PathSegment>, Value)> = Vec::with_capacity(names.len());
    for name in &names {
        match variables.and_then(|m| m.get(name)) {
            Some(value) => expressions.push((vec![1usize.into(), name.as_str().into()], value.clone())),
            None if name.contains('.') => {
                return Err(ResolveError::unpredictable(
                    Function::Sub.name(),
                    format!("'{name}' is a resource attribute"),
                ))
            }
            None if is_declared(ctx, name) => expressions.push((Vec::new(), json!({ "Ref": name }))),
            None => {
                return Err(invalid(
                    Function::Sub,
                    format!("variable '{name}' is not a declared parameter, resource or pseudo-parameter"),
                    vec![],
                ))
            }
        }
    }

    let positioned: Vec<(Vec<PathSegment>, &Value)> =
        expressions.iter().map(|(position, value)| (position.clone(), value)).collect();
    let mut out = Vec::new();
    for (resolved, assumptions) in resolver.product_at(ctx, &positioned)? {
        if !all_present(&resolved) {
            continue;
        }
        let mut rendered = String::new();
        for part in &parts {
            match part {
                SubPart::Literal(text) => rendered.push_str(text),
                SubPart::Variable(name) => {
                    let index = names.iter().position(|n| n == name).unwrap_or_default();
                    match resolved.get(index).and_then(scalar_text) {
                        Some(text) => rendered.push_str(&text),
                        None => {
                            return Err(invalid(
                                Function::Sub,
                                format!("variable '{name}' does not resolve to a string"),
                                vec![],
                            ))
                        }
                    }
                }
            }
        }
        out.push(Candidate {
            value: Value::String(rendered),
            assumptions,
        });
    }
    Ok(out)
}

fn is_declared(ctx: &Context, name: &str) -> bool {
    is_pseudo(name) || ctx.template().parameter(name).is_some() || ctx.template().resource(name).is_some()
}

pub(super) fn resolve_select(resolver: &Resolver, ctx: &Context, args: &Value) -> Resolved {
    let Value::Array(items) = args else {
        return Err(invalid(Function::Select, "Fn::Select expects [index, [values]]", vec![]));
    };
    if items.len() != 2 {
        return Err(invalid(Function::Select, "Fn::Select expects [index, [values]]", vec![]));
    }
    let mut out = Vec::new();
    for (resolved, assumptions) in resolver.product(ctx, items)? {
        if !all_present(&resolved) {
            continue;
        }
        let index = match &resolved[0] {
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(s) => s.parse::<usize>().ok(),
            _ => None,
        };
        let Some(index) = index else {
            return Err(invalid(
                Function::Select,
                format!("{} is not a valid index", resolved[0]),
                vec![0usize.into()],
            ));
        };
        let Value::Array(list) = &resolved[1] else {
            return Err(invalid(Function::Select, "Fn::Select expects a list", vec![1usize.into()]));
        };
        match list.get(index) {
            Some(value) => out.push(Candidate {
                value: value.clone(),
                assumptions,
            }),
            None => {
                return Err(invalid(
                    Function::Select,
                    format!(
                        "index {index} is out of range for a list of length {}{}",
                        list.len(),
                        when(&assumptions)
                    ),
                    vec![0usize.into()],
                ))
            }
        }
    }
    Ok(out)
}

pub(super) fn resolve_base64(resolver: &Resolver, ctx: &Context, args: &Value) -> Resolved {
    resolver
        .resolve_argument(ctx, args, &[])?
        .into_iter()
        .map(|candidate| match &candidate.value {
            Value::String(text) => Ok(Candidate {
                value: Value::String(STANDARD.encode(text.as_bytes())),
                assumptions: candidate.assumptions,
            }),
            _ => Err(invalid(Function::Base64, "Fn::Base64 expects a string", vec![])),
        })
        .collect()
}

pub(super) fn resolve_length(resolver: &Resolver, ctx: &Context, args: &Value) -> Resolved {
    resolver
        .resolve_argument(ctx, args, &[])?
        .into_iter()
        .map(|candidate| match &candidate.value {
            Value::Array(items) => Ok(Candidate {
                value: json!(items.len()),
                assumptions: candidate.assumptions,
            }),
            _ => Err(invalid(Function::Length, "Fn::Length expects a list", vec![])),
        })
        .collect()
}

pub(super) fn resolve_to_json_string(resolver: &Resolver, ctx: &Context, args: &Value) -> Resolved {
    resolver
        .resolve_argument(ctx, args, &[])?
        .into_iter()
        .map(|candidate| match &candidate.value {
            Value::Array(_) | Value::Object(_) => serde_json::to_string(&candidate.value)
                .map(|text| Candidate {
                    value: Value::String(text),
                    assumptions: candidate.assumptions.clone(),
                })
                .map_err(|e| invalid(Function::ToJsonString, e.to_string(), vec![])),
            _ => Err(invalid(
                Function::ToJsonString,
                "Fn::ToJsonString expects an object or a list",
                vec![],
            )),
        })
        .collect()
}
