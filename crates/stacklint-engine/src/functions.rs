//! # Intrinsic Functions
//!
//! The closed set of intrinsic functions that may appear in property values,
//! and [`FunctionSet`], the compact set of functions legal at a position.
//!
//! A value is a function invocation when it is an object with exactly one
//! key and that key names a known function. Anything else, including
//! objects with a single unknown `Fn::` key, is an ordinary value.

use std::fmt;

use serde_json::Value;

/// An intrinsic function usable in property values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Function {
    Ref,
    GetAtt,
    Base64,
    Cidr,
    FindInMap,
    GetAZs,
    If,
    ImportValue,
    Join,
    Length,
    Select,
    Split,
    Sub,
    ToJsonString,
}

impl Function {
    /// Every function, in declaration order.
    pub const ALL: [Function; 14] = [
        Function::Ref,
        Function::GetAtt,
        Function::Base64,
        Function::Cidr,
        Function::FindInMap,
        Function::GetAZs,
        Function::If,
        Function::ImportValue,
        Function::Join,
        Function::Length,
        Function::Select,
        Function::Split,
        Function::Sub,
        Function::ToJsonString,
    ];

    /// The key used in documents, e.g. `Fn::Join`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ref => "Ref",
            Self::GetAtt => "Fn::GetAtt",
            Self::Base64 => "Fn::Base64",
            Self::Cidr => "Fn::Cidr",
            Self::FindInMap => "Fn::FindInMap",
            Self::GetAZs => "Fn::GetAZs",
            Self::If => "Fn::If",
            Self::ImportValue => "Fn::ImportValue",
            Self::Join => "Fn::Join",
            Self::Length => "Fn::Length",
            Self::Select => "Fn::Select",
            Self::Split => "Fn::Split",
            Self::Sub => "Fn::Sub",
            Self::ToJsonString => "Fn::ToJsonString",
        }
    }

    /// The registry keyword under which function-aware checks register,
    /// e.g. `fn_join`, `ref`.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Ref => "ref",
            Self::GetAtt => "fn_getatt",
            Self::Base64 => "fn_base64",
            Self::Cidr => "fn_cidr",
            Self::FindInMap => "fn_findinmap",
            Self::GetAZs => "fn_getazs",
            Self::If => "fn_if",
            Self::ImportValue => "fn_importvalue",
            Self::Join => "fn_join",
            Self::Length => "fn_length",
            Self::Select => "fn_select",
            Self::Split => "fn_split",
            Self::Sub => "fn_sub",
            Self::ToJsonString => "fn_tojsonstring",
        }
    }

    /// Look a function up by its document key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// If `value` is a function invocation, the function and its arguments.
pub fn as_function(value: &Value) -> Option<(Function, &Value)> {
    let Value::Object(map) = value else {
        return None;
    };
    if map.len() != 1 {
        return None;
    }
    let (key, args) = map.iter().next()?;
    Function::from_name(key).map(|f| (f, args))
}

/// Whether `value` is `{"Ref": "AWS::NoValue"}`.
pub fn is_no_value(value: &Value) -> bool {
    matches!(as_function(value), Some((Function::Ref, Value::String(s))) if s == "AWS::NoValue")
}

/// Whether any function invocation occurs anywhere inside `value`.
pub fn contains_function(value: &Value) -> bool {
    if as_function(value).is_some() {
        return true;
    }
    match value {
        Value::Array(items) => items.iter().any(contains_function),
        Value::Object(map) => map.values().any(contains_function),
        _ => false,
    }
}

/// A set of functions, stored as a bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FunctionSet(u16);

impl FunctionSet {
    /// No function allowed.
    pub const fn none() -> Self {
        Self(0)
    }

    /// Every function allowed.
    pub fn all() -> Self {
        Function::ALL.into_iter().collect()
    }

    /// Whether `function` is in the set.
    pub fn contains(self, function: Function) -> bool {
        self.0 & function.bit() != 0
    }

    /// The set plus `function`.
    pub fn with(self, function: Function) -> Self {
        Self(self.0 | function.bit())
    }

    /// The set minus `function`.
    pub fn without(self, function: Function) -> Self {
        Self(self.0 & !function.bit())
    }

    /// Members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Function> {
        Function::ALL.into_iter().filter(move |f| self.contains(*f))
    }

    /// True if no function is allowed.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Function> for FunctionSet {
    fn from_iter<T: IntoIterator<Item = Function>>(iter: T) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

impl fmt::Debug for FunctionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Function::name)).finish()
    }
}
