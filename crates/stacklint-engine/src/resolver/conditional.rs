//! `Fn::If`: one candidate set per reachable branch. A reachable
//! `AWS::NoValue` branch yields the marker itself so an enclosing list or
//! object can drop the element under that branch's assumption.

use serde_json::Value;

use stacklint_conditions::ConditionError;

use super::{invalid, Candidate, Resolver};
use crate::context::{Changes, Context};
use crate::error::ResolveError;
use crate::functions::Function;

pub(super) fn resolve_if(
    resolver: &Resolver,
    ctx: &Context,
    args: &Value,
) -> Result<Vec<Candidate>, ResolveError> {
    let (name, branches) = match args {
        Value::Array(items) if items.len() == 3 => match &items[0] {
            Value::String(name) => (name, [(1usize, true, &items[1]), (2, false, &items[2])]),
            _ => {
                return Err(invalid(
                    Function::If,
                    "the condition name must be a string",
                    vec![0usize.into()],
                ))
            }
        },
        _ => {
            return Err(invalid(
                Function::If,
                "Fn::If expects [condition, value if true, value if false]",
                vec![],
            ))
        }
    };

    let mut out = Vec::new();
    let mut skipped = None;
    for (index, value, branch) in branches {
        let scoped = match ctx.evolve(Changes::new().condition(name.as_str(), value)) {
            Ok(scoped) => scoped,
            Err(ConditionError::Unsatisfiable { .. }) => continue,
            Err(e) => return Err(ResolveError::unpredictable(Function::If.name(), e.to_string())),
        };
        match resolver.resolve_at(&scoped, branch, &[index.into()]) {
            Ok(candidates) => out.extend(candidates.into_iter().map(|mut c| {
                c.assumptions.insert(name.clone(), value);
                c
            })),
            Err(e @ ResolveError::Unpredictable { .. }) => skipped = Some(e),
            Err(e) => return Err(e),
        }
    }
    match (out.is_empty(), skipped) {
        (true, Some(e)) => Err(e),
        _ => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{ctx_for, values};
    use super::*;
    use serde_json::json;

    fn template() -> Value {
        json!({
            "Parameters": {"Env": {"Type": "String", "AllowedValues": ["dev", "prod"]}},
            "Conditions": {
                "IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
                "IsEast": {"Fn::Equals": [{"Ref": "AWS::Region"}, "us-east-1"]}
            }
        })
    }

    #[test]
    fn test_both_branches_when_unknown() {
        let r = Resolver::new(25);
        let ctx = ctx_for(template(), "us-east-1");
        let got = r.resolve(&ctx, &json!({"Fn::If": ["IsProd", "big", "small"]})).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].assumptions.get("IsProd"), Some(&true));
        assert_eq!(got[1].assumptions.get("IsProd"), Some(&false));
    }

    #[test]
    fn test_region_fixes_branch() {
        let r = Resolver::new(25);
        let ctx = ctx_for(template(), "eu-west-1");
        assert_eq!(
            values(r.resolve(&ctx, &json!({"Fn::If": ["IsEast", "east", "elsewhere"]}))),
            vec![json!("elsewhere")]
        );
    }

    #[test]
    fn test_assumed_condition_prunes_branch() {
        let r = Resolver::new(25);
        let ctx = ctx_for(template(), "us-east-1")
            .evolve(Changes::new().condition("IsProd", true))
            .unwrap();
        assert_eq!(
            values(r.resolve(&ctx, &json!({"Fn::If": ["IsProd", "big", "small"]}))),
            vec![json!("big")]
        );
    }

    #[test]
    fn test_no_value_branch_is_dropped() {
        let r = Resolver::new(25);
        let ctx = ctx_for(template(), "us-east-1");
        assert_eq!(
            values(r.resolve(&ctx, &json!({"Fn::If": ["IsProd", "big", {"Ref": "AWS::NoValue"}]}))),
            vec![json!("big")]
        );
        assert!(matches!(
            r.resolve(
                &ctx,
                &json!({"Fn::If": ["IsProd", {"Ref": "AWS::NoValue"}, {"Ref": "AWS::NoValue"}]})
            ),
            Err(ResolveError::Unpredictable { .. })
        ));
    }

    #[test]
    fn test_no_value_list_element_keeps_other_scenario() {
        let r = Resolver::new(25);
        let ctx = ctx_for(template(), "us-east-1");
        let got = r
            .resolve(
                &ctx,
                &json!({"Fn::Join": ["-", ["a", {"Fn::If": ["IsProd", "b", {"Ref": "AWS::NoValue"}]}]]}),
            )
            .unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].value, json!("a-b"));
        assert_eq!(got[0].assumptions.get("IsProd"), Some(&true));
        assert_eq!(got[1].value, json!("a"));
        assert_eq!(got[1].assumptions.get("IsProd"), Some(&false));

        let object = values(r.resolve(
            &ctx,
            &json!({"Name": "n", "Extra": {"Fn::If": ["IsProd", "x", {"Ref": "AWS::NoValue"}]}}),
        ));
        assert_eq!(object, vec![json!({"Name": "n", "Extra": "x"}), json!({"Name": "n"})]);
    }

    #[test]
    fn test_select_out_of_range_once_element_is_removed() {
        let r = Resolver::new(25);
        let ctx = ctx_for(template(), "us-east-1");
        let expr = json!({"Fn::Select": [1, ["a", {"Fn::If": ["IsProd", "b", {"Ref": "AWS::NoValue"}]}]]});
        match r.resolve(&ctx, &expr).unwrap_err() {
            ResolveError::Invalid { message, path, .. } => {
                assert!(message.contains("'IsProd' is false"), "{message}");
                assert_eq!(path, vec!["Fn::Select".into(), 0usize.into()]);
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        let prod = ctx.evolve(Changes::new().condition("IsProd", true)).unwrap();
        assert_eq!(values(r.resolve(&prod, &expr)), vec![json!("b")]);
    }

    #[test]
    fn test_undefined_condition_is_unpredictable() {
        let r = Resolver::new(25);
        let ctx = ctx_for(template(), "us-east-1");
        assert!(matches!(
            r.resolve(&ctx, &json!({"Fn::If": ["Nope", "a", "b"]})),
            Err(ResolveError::Unpredictable { .. })
        ));
    }
}
