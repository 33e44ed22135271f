//! # stacklint-rules — Standard Rule Collection
//!
//! The checks a default lint run uses, registered against the engine's
//! [`RegistryBuilder`].
//!
//! ## Layout
//!
//! - [`types`]: `type` with template-style scalar coercion.
//! - [`values`]: scalar constraints (`enum`, `const`, `pattern`, length and
//!   range bounds, item counts, uniqueness).
//! - [`objects`]: structural keywords (`properties`, `required`, `items`, ...).
//! - [`combinators`]: `allOf`, `anyOf`, `oneOf`, `not`.
//! - [`resources`]: provider-schema markers (`readOnlyProperties`) and the
//!   `cfnLint` extension keyword with its child checks.
//! - [`functions`]: checks registered under function keywords (`ref`,
//!   `fn_getatt`, `fn_sub`).
//!
//! ## Crate Policy
//!
//! - Every check is stateless apart from memoized regex compilation.
//! - Rule ids never collide with engine-owned rules, except where a check
//!   extends a function's own rule (`E1010` under `fn_getatt`).

use std::sync::Arc;

use stacklint_engine::{ConfigurationError, Registry, RegistryBuilder, RuleMeta};

pub mod combinators;
pub mod functions;
pub mod objects;
pub mod resources;
pub mod types;
pub mod values;

/// Schema keywords the standard collection must cover.
pub const STANDARD_KEYWORDS: &[&str] = &[
    "type",
    "enum",
    "const",
    "pattern",
    "minLength",
    "maxLength",
    "minimum",
    "maximum",
    "minItems",
    "maxItems",
    "uniqueItems",
    "properties",
    "additionalProperties",
    "patternProperties",
    "required",
    "dependentRequired",
    "items",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "readOnlyProperties",
    "cfnLint",
];

pub(crate) fn rule(id: &str, description: &str) -> RuleMeta {
    RuleMeta::new(id, description).expect("BUG: hardcoded rule id rejected")
}

/// The standard checks, not yet built. Callers may register more before
/// calling [`RegistryBuilder::build`].
pub fn standard_rules() -> RegistryBuilder {
    RegistryBuilder::new()
        // ── Structure ────────────────────────────────────────────────
        .register("properties", rule("E3001", "Properties are validated against their schemas"), Arc::new(objects::Properties))
        .register(
            "additionalProperties",
            rule("E3002", "Resource properties are known to the resource type"),
            Arc::new(objects::AdditionalProperties::default()),
        )
        .register("required", rule("E3003", "Required resource properties are present"), Arc::new(objects::Required))
        .register("items", rule("E3008", "List items are validated against their schema"), Arc::new(objects::Items))
        .register(
            "patternProperties",
            rule("E3010", "Properties matching a name pattern are validated"),
            Arc::new(objects::PatternProperties::default()),
        )
        .register(
            "dependentRequired",
            rule("E3021", "Properties required together with another property"),
            Arc::new(objects::DependentRequired),
        )
        // ── Types and values ─────────────────────────────────────────
        .register("type", rule("E3012", "Property values have the expected type"), Arc::new(types::Type))
        .register("enum", rule("E3030", "Property value is one of the allowed values"), Arc::new(values::Enum))
        .register("pattern", rule("E3031", "Property value matches the required pattern"), Arc::new(values::Pattern::default()))
        .register("minItems", rule("E3032", "List has at least the minimum number of items"), Arc::new(values::MinItems))
        .register("minLength", rule("E3033", "String is at least the minimum length"), Arc::new(values::MinLength))
        .register("minimum", rule("E3034", "Number is at least the minimum"), Arc::new(values::Minimum))
        .register("maxItems", rule("E3035", "List has at most the maximum number of items"), Arc::new(values::MaxItems))
        .register("maxLength", rule("E3036", "String is at most the maximum length"), Arc::new(values::MaxLength))
        .register("uniqueItems", rule("E3037", "List items are unique"), Arc::new(values::UniqueItems))
        .register("maximum", rule("E3038", "Number is at most the maximum"), Arc::new(values::Maximum))
        .register("const", rule("E3039", "Property value equals the required constant"), Arc::new(values::Const))
        // ── Combinators ──────────────────────────────────────────────
        .register("oneOf", rule("E3014", "Exactly one alternative applies"), Arc::new(combinators::OneOf))
        .register("anyOf", rule("E3015", "At least one alternative applies"), Arc::new(combinators::AnyOf))
        .register("allOf", rule("E3016", "Every sub-schema applies"), Arc::new(combinators::AllOf))
        .register("not", rule("E3017", "A forbidden shape is not used"), Arc::new(combinators::Not))
        // ── Resource markers ─────────────────────────────────────────
        .register(
            "readOnlyProperties",
            rule("E3009", "Read-only properties are not set"),
            Arc::new(resources::ReadOnlyProperties),
        )
        .register("cfnLint", rule("E3050", "Template-specific property checks"), Arc::new(resources::CfnLint))
        .register_child(
            "E3050",
            "AvailabilityZone",
            rule("W3010", "Availability zones are not hardcoded"),
            Arc::new(resources::HardcodedAvailabilityZone),
        )
        // ── Function-aware ───────────────────────────────────────────
        .register("fn_getatt", rule("E1010", "GetAtt validation of parameters"), Arc::new(functions::GetAttTarget))
        .register("ref", rule("W1001", "Ref to a conditional resource"), Arc::new(functions::ConditionalRef))
        .register("fn_sub", rule("W1020", "Sub is not needed without variables"), Arc::new(functions::SubWithoutVariables))
        .declare_keywords(STANDARD_KEYWORDS.iter().copied())
}

/// Build the standard registry.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] only if the collection itself is
/// inconsistent.
pub fn standard_registry() -> Result<Registry, ConfigurationError> {
    standard_rules().build()
}
