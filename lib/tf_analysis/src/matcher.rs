//! Method patterns.
//!
//! A pattern reads `<declaring type> <method name>(<argument types>)`, for
//! example `java.lang.String toUpperCase()` or `java.io.File <constructor>(..)`.
//! In type and method names, `*` matches any part of a single dotted
//! segment. In the argument list, `..` matches any number of arguments.

use crate::errors::MatcherError;
use regex::Regex;
use std::fmt;
use tf_tree::{MethodInvocation, MethodType, NewClass};

/// Method name of constructors in patterns.
pub const CONSTRUCTOR: &str = "<constructor>";

#[derive(Debug, Clone)]
pub struct MethodMatcher {
    pattern: String,
    declaring_type: Regex,
    name: Regex,
    arguments: Regex,
}

// `*` stays within a segment of a dotted name
fn segment_regex(glob: &str) -> String {
    glob.split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^.,]*")
}

// arguments are matched against the parameter types, each followed by ','
fn arguments_regex(glob: &str) -> String {
    let mut re = String::from("^");
    for arg in glob.split(',').map(str::trim).filter(|arg| !arg.is_empty()) {
        if arg == ".." {
            re.push_str("(?:[^,]*,)*");
        } else {
            re.push_str(&segment_regex(arg));
            re.push(',');
        }
    }
    re.push('$');
    re
}

impl MethodMatcher {
    /// # Errors
    ///
    /// Fails on patterns not shaped as `type name(args)`.
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        let malformed = || MatcherError::Malformed(pattern.to_string());
        let (declaring_type, signature) = pattern.trim().split_once(' ').ok_or_else(malformed)?;
        let (name, arguments) = signature.trim().split_once('(').ok_or_else(malformed)?;
        let arguments = arguments.strip_suffix(')').ok_or_else(malformed)?;
        if declaring_type.is_empty() || name.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            pattern: pattern.to_string(),
            declaring_type: Regex::new(&format!("^{}$", segment_regex(declaring_type)))?,
            name: Regex::new(&format!("^{}$", segment_regex(name)))?,
            arguments: Regex::new(&arguments_regex(arguments))?,
        })
    }

    #[must_use]
    pub fn matches(&self, name: &str, method_type: &MethodType) -> bool {
        let arguments: String = method_type
            .parameter_types
            .iter()
            .map(|param| format!("{param},"))
            .collect();
        self.declaring_type.is_match(&method_type.declaring_type)
            && self.name.is_match(name)
            && self.arguments.is_match(&arguments)
    }

    /// Invocations without type attribution never match.
    #[must_use]
    pub fn matches_invocation(&self, node: &MethodInvocation) -> bool {
        node.method_type
            .as_ref()
            .map_or(false, |method_type| self.matches(&node.name, method_type))
    }

    #[must_use]
    pub fn matches_constructor(&self, node: &NewClass) -> bool {
        node.constructor_type
            .as_ref()
            .map_or(false, |method_type| self.matches(CONSTRUCTOR, method_type))
    }
}

impl fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_method(params: &[&str]) -> MethodType {
        MethodType::new("java.lang.String", params)
    }

    #[test]
    fn exact_signature() {
        let matcher = MethodMatcher::new("java.lang.String toUpperCase()").unwrap();
        assert!(matcher.matches("toUpperCase", &string_method(&[])));
        assert!(!matcher.matches("toUpperCase", &string_method(&["java.util.Locale"])));
        assert!(!matcher.matches("toLowerCase", &string_method(&[])));
        assert!(!matcher.matches("toUpperCase", &MethodType::new("java.lang.Object", &[])));
        assert_eq!(matcher.to_string(), "java.lang.String toUpperCase()");
    }

    #[test]
    fn any_arguments() {
        let matcher = MethodMatcher::new("java.lang.String replace(..)").unwrap();
        assert!(matcher.matches("replace", &string_method(&[])));
        assert!(matcher.matches("replace", &string_method(&["char", "char"])));

        let matcher = MethodMatcher::new("java.lang.String substring(int, ..)").unwrap();
        assert!(matcher.matches("substring", &string_method(&["int"])));
        assert!(matcher.matches("substring", &string_method(&["int", "int"])));
        assert!(!matcher.matches("substring", &string_method(&[])));
        assert!(!matcher.matches("substring", &string_method(&["long"])));
    }

    #[test]
    fn wildcards_stay_in_segment() {
        let matcher = MethodMatcher::new("java.lang.* to*()").unwrap();
        assert!(matcher.matches("toString", &MethodType::new("java.lang.Integer", &[])));
        assert!(!matcher.matches("toString", &MethodType::new("java.lang.ref.Reference", &[])));
        assert!(!matcher.matches("valueOf", &MethodType::new("java.lang.Integer", &[])));
    }

    #[test]
    fn invocations_and_constructors() {
        let mut b = tf_tree::TreeBuilder::new();
        let dir = b.ident("dir");
        let name = b.ident("name");
        let file = b.typed_new_class(
            "File",
            vec![dir, name],
            MethodType::new("java.io.File", &["java.io.File", "java.lang.String"]),
        );
        let untyped = b.invoke(None, "toPath", vec![]);
        let block = b.block(vec![file, untyped]);
        let tree = b.finish(block).unwrap();

        let matcher = MethodMatcher::new("java.io.File <constructor>(..)").unwrap();
        let tf_tree::NodeKind::NewClass(new) = tree.kind(file).unwrap() else {
            panic!("not a constructor call");
        };
        assert!(matcher.matches_constructor(new));

        let matcher = MethodMatcher::new("java.io.File toPath()").unwrap();
        let tf_tree::NodeKind::MethodInvocation(call) = tree.kind(untyped).unwrap() else {
            panic!("not an invocation");
        };
        assert!(!matcher.matches_invocation(call));
    }

    #[test]
    fn malformed_patterns() {
        for pattern in ["toUpperCase()", "java.lang.String toUpperCase", "java.lang.String f(", " ()"] {
            assert!(
                matches!(MethodMatcher::new(pattern), Err(MatcherError::Malformed(_))),
                "{pattern}"
            );
        }
    }
}
