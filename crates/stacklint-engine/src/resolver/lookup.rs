//! Declaration lookups: `Ref`, `Fn::GetAtt`, `Fn::FindInMap`, `Fn::GetAZs`.

use serde_json::{json, Value};

use stacklint_core::{Parameter, Region};

use super::pseudo::{is_pseudo, pseudo_value};
use super::{all_present, invalid, scalar_text, Candidate, Resolver};
use crate::context::{Changes, Context};
use crate::error::ResolveError;
use crate::functions::Function;

pub(super) fn resolve_ref(ctx: &Context, args: &Value) -> Result<Vec<Candidate>, ResolveError> {
    let Value::String(name) = args else {
        return Err(invalid(Function::Ref, "Ref target must be a string", vec![]));
    };

    if is_pseudo(name) {
        if name == "AWS::NoValue" {
            return Ok(vec![Candidate::plain(json!({ "Ref": name }))]);
        }
        if !ctx.resolve_pseudo_parameters() {
            return Err(ResolveError::unpredictable("Ref", format!("{name} is not resolved here")));
        }
        let mut out: Vec<Candidate> = Vec::new();
        for region in ctx.regions() {
            if let Some(value) = pseudo_value(name, region) {
                let candidate = Candidate::plain(value);
                if !out.contains(&candidate) {
                    out.push(candidate);
                }
            }
        }
        return Ok(out);
    }

    let template = ctx.template();
    if let Some(parameter) = template.parameter(name) {
        return parameter_values(ctx, parameter);
    }
    if template.resource(name).is_some() {
        return Err(ResolveError::unpredictable(
            "Ref",
            format!("resource '{name}' is identified at deploy time"),
        ));
    }
    Err(invalid(
        Function::Ref,
        format!("'{name}' is not a declared parameter or resource"),
        vec![],
    ))
}

/// The values a parameter can take, less those the context's condition
/// assumptions rule out.
fn parameter_values(ctx: &Context, parameter: &Parameter) -> Result<Vec<Candidate>, ResolveError> {
    if parameter.is_ssm() {
        return Err(ResolveError::unpredictable(
            "Ref",
            format!("parameter '{}' is read from the parameter store", parameter.name),
        ));
    }
    let raw: Vec<&Value> = if !parameter.allowed_values.is_empty() {
        parameter.allowed_values.iter().collect()
    } else if let Some(default) = &parameter.default {
        vec![default]
    } else {
        return Err(ResolveError::unpredictable(
            "Ref",
            format!("parameter '{}' has no default or allowed values", parameter.name),
        ));
    };

    let mut out = Vec::with_capacity(raw.len());
    for value in raw {
        let value = if parameter.is_list() {
            match value {
                Value::Array(items) => Value::Array(items.clone()),
                other => match scalar_text(other) {
                    Some(text) => Value::Array(
                        text.split(',')
                            .map(|s| Value::String(s.trim().to_string()))
                            .collect(),
                    ),
                    None => continue,
                },
            }
        } else {
            match scalar_text(value) {
                Some(text) if admits(ctx, &parameter.name, &text) => Value::String(text),
                _ => continue,
            }
        };
        out.push(Candidate::plain(value));
    }
    Ok(out)
}

fn admits(ctx: &Context, parameter: &str, value: &str) -> bool {
    let state = ctx.conditions();
    state
        .set()
        .admits_parameter_value(parameter, value, state.assignments(), state.regions())
        .unwrap_or(true)
}

pub(super) fn resolve_get_att(args: &Value) -> Result<Vec<Candidate>, ResolveError> {
    let well_formed = match args {
        Value::String(s) => s.split_once('.').is_some_and(|(r, a)| !r.is_empty() && !a.is_empty()),
        Value::Array(items) => items.len() == 2 && items[0].is_string(),
        _ => false,
    };
    if !well_formed {
        return Err(invalid(
            Function::GetAtt,
            "Fn::GetAtt expects [resource, attribute] or 'resource.attribute'",
            vec![],
        ));
    }
    Err(ResolveError::unpredictable(
        Function::GetAtt.name(),
        "resource attributes are only known at deploy time",
    ))
}

pub(super) fn resolve_get_azs(
    resolver: &Resolver,
    ctx: &Context,
    args: &Value,
) -> Result<Vec<Candidate>, ResolveError> {
    let mut out = Vec::new();
    for candidate in resolver.resolve_argument(ctx, args, &[])? {
        let Value::String(region) = &candidate.value else {
            return Err(invalid(Function::GetAZs, "Fn::GetAZs expects a region string", vec![]));
        };
        let regions: Vec<Region> = if region.is_empty() {
            ctx.regions().to_vec()
        } else {
            match Region::new(region.as_str()) {
                Ok(r) => vec![r],
                Err(_) => {
                    return Err(invalid(
                        Function::GetAZs,
                        format!("'{region}' is not a region"),
                        vec![],
                    ))
                }
            }
        };
        for region in regions {
            let zones = region.availability_zones().ok_or_else(|| {
                ResolveError::unpredictable(
                    Function::GetAZs.name(),
                    format!("availability zones of {region} are not known"),
                )
            })?;
            out.push(Candidate {
                value: Value::Array(zones.into_iter().map(Value::String).collect()),
                assumptions: candidate.assumptions.clone(),
            });
        }
    }
    Ok(out)
}

pub(super) fn resolve_find_in_map(
    resolver: &Resolver,
    ctx: &Context,
    args: &Value,
) -> Result<Vec<Candidate>, ResolveError> {
    let items = match args {
        Value::Array(items) if items.len() == 3 || items.len() == 4 => items,
        _ => {
            return Err(invalid(
                Function::FindInMap,
                "Fn::FindInMap expects [map, top-level key, second-level key]",
                vec![],
            ))
        }
    };
    let default = match items.get(3) {
        None => None,
        Some(Value::Object(options)) if options.len() == 1 && options.contains_key("DefaultValue") => {
            options.get("DefaultValue")
        }
        Some(_) => {
            return Err(invalid(
                Function::FindInMap,
                "the fourth argument must be {\"DefaultValue\": ...}",
                vec![3usize.into()],
            ))
        }
    };

    let mut out = Vec::new();
    for (keys, assumptions) in resolver.product(ctx, &items[..3])? {
        if !all_present(&keys) {
            continue;
        }
        let mut names = Vec::with_capacity(3);
        for (index, key) in keys.iter().enumerate() {
            match scalar_text(key) {
                Some(text) => names.push(text),
                None => {
                    return Err(invalid(
                        Function::FindInMap,
                        "mapping keys must be strings",
                        vec![index.into()],
                    ))
                }
            }
        }
        let found = ctx
            .template()
            .mappings()
            .get(&names[0])
            .and_then(|m| m.get(&names[1]))
            .and_then(|m| m.get(&names[2]));
        match (found, default) {
            (Some(value), _) => out.push(Candidate {
                value: value.clone(),
                assumptions,
            }),
            (None, Some(default)) => {
                let scoped = if assumptions.is_empty() {
                    ctx.clone()
                } else {
                    match ctx.evolve(Changes::new().conditions(&assumptions)) {
                        Ok(c) => c,
                        Err(_) => continue,
                    }
                };
                let position = [3usize.into(), "DefaultValue".into()];
                for mut candidate in resolver.resolve_argument(&scoped, default, &position)? {
                    candidate.assumptions.extend(assumptions.clone());
                    out.push(candidate);
                }
            }
            (None, None) => {
                let (message, index) = missing_key_message(ctx, &names);
                return Err(invalid(Function::FindInMap, message, vec![index.into()]));
            }
        }
    }
    Ok(out)
}

fn missing_key_message(ctx: &Context, names: &[String]) -> (String, usize) {
    let mappings = ctx.template().mappings();
    match mappings.get(&names[0]) {
        None => (format!("'{}' is not one of the declared mappings", names[0]), 0),
        Some(map) if map.get(&names[1]).is_none() => (
            format!("'{}' is not a top-level key of mapping '{}'", names[1], names[0]),
            1,
        ),
        Some(_) => (
            format!(
                "'{}' is not a second-level key of '{}' in mapping '{}'",
                names[2], names[1], names[0]
            ),
            2,
        ),
    }
}
