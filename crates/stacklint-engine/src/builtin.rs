//! Rules owned by the engine itself rather than by a keyword check:
//! function legality and resolution failures, template structure, unknown
//! resource types and broken conditions.

use std::sync::OnceLock;

use crate::diagnostic::RuleMeta;
use crate::functions::Function;

/// Engine-owned rule metadata.
#[derive(Debug)]
pub struct BuiltinRules {
    /// Template structure problems.
    pub template: RuleMeta,
    /// Resource properties failing a schema with no more specific rule.
    pub properties: RuleMeta,
    /// Resource type with no schema in a region.
    pub unknown_type: RuleMeta,
    /// Reference to an undefined condition.
    pub undefined_condition: RuleMeta,
    /// Malformed or cyclic condition definition.
    pub invalid_condition: RuleMeta,
    /// Resource whose condition can never hold.
    pub unreachable_condition: RuleMeta,
    functions: Vec<(Function, RuleMeta)>,
}

fn meta(id: &str, description: &str) -> RuleMeta {
    RuleMeta::new(id, description).expect("BUG: hardcoded builtin rule id rejected")
}

/// The engine-owned rules.
pub fn builtin() -> &'static BuiltinRules {
    static RULES: OnceLock<BuiltinRules> = OnceLock::new();
    RULES.get_or_init(|| BuiltinRules {
        template: meta("E1001", "Basic template structure"),
        properties: meta("E3000", "Resource properties are invalid"),
        unknown_type: meta("E3006", "Resource type is not available in the region"),
        undefined_condition: meta("E8002", "Referenced condition is not defined"),
        invalid_condition: meta("E8003", "Condition definition is invalid"),
        unreachable_condition: meta("W8001", "Resource condition is never true"),
        functions: vec![
            (Function::Ref, meta("E1020", "Ref validation of value")),
            (Function::GetAtt, meta("E1010", "GetAtt validation of parameters")),
            (Function::FindInMap, meta("E1011", "FindInMap validation of configuration")),
            (Function::GetAZs, meta("E1015", "GetAZs validation of parameters")),
            (Function::ImportValue, meta("E1016", "ImportValue validation of parameters")),
            (Function::Select, meta("E1017", "Select validation of parameters")),
            (Function::Split, meta("E1018", "Split validation of parameters")),
            (Function::Sub, meta("E1019", "Sub validation of parameters")),
            (Function::Base64, meta("E1021", "Base64 validation of parameters")),
            (Function::Join, meta("E1022", "Join validation of parameters")),
            (Function::Cidr, meta("E1024", "Cidr validation of parameters")),
            (Function::If, meta("E1028", "Fn::If structure and condition")),
            (Function::Length, meta("E1030", "Length validation of parameters")),
            (Function::ToJsonString, meta("E1031", "ToJsonString validation of parameters")),
        ],
    })
}

impl BuiltinRules {
    /// The rule for problems with `function`.
    pub fn function(&self, function: Function) -> &RuleMeta {
        self.functions
            .iter()
            .find(|(f, _)| *f == function)
            .map(|(_, m)| m)
            .unwrap_or(&self.template)
    }

    /// The function whose rule has `id`, if any. A check registered under
    /// that function's keyword may share the id.
    pub fn function_of(&self, id: &str) -> Option<Function> {
        self.functions
            .iter()
            .find(|(_, m)| m.id() == id)
            .map(|(f, _)| *f)
    }

    /// Every engine-owned rule.
    pub fn all(&self) -> impl Iterator<Item = &RuleMeta> {
        [
            &self.template,
            &self.properties,
            &self.unknown_type,
            &self.undefined_condition,
            &self.invalid_condition,
            &self.unreachable_condition,
        ]
        .into_iter()
        .chain(self.functions.iter().map(|(_, m)| m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_function_has_its_own_rule() {
        let rules = builtin();
        let mut ids: Vec<&str> = Function::ALL.iter().map(|f| rules.function(*f).id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), Function::ALL.len());
        assert!(!ids.contains(&"E1001"));
        assert_eq!(rules.function_of("E1010"), Some(Function::GetAtt));
        assert_eq!(rules.function_of("E3000"), None);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<&str> = builtin().all().map(RuleMeta::id).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
