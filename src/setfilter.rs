//! Additive/subtractive set-filter expression parser.
//!
//! Used both by the task-input surface (namespace/component/pod-name
//! filters) and by [`crate::query`] generators that turn a parsed filter
//! into a backend query fragment.

use std::collections::HashMap;

/// Which sentinel expansions a caller accepts from a set-filter string.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowFlags {
    pub allow_add_all: bool,
    pub allow_remove_all: bool,
    pub allow_custom_value: bool,
}

/// The parsed result of a set-filter string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSetFilter {
    pub additives: Vec<String>,
    pub subtractives: Vec<String>,
    pub subtract_mode: bool,
    pub validation_error: Option<String>,
}

/// Parses a space-separated set-filter string: each token is `[+|-|@]name`.
/// `+name`/bare `name` adds, `-name` subtracts, `@alias` expands through
/// `aliases` into a list of additives (possibly sentinels starting with
/// `#`). `subtract_mode` is true iff the expression is subtract-only (at
/// least one subtractive token and no additive ones); a mix of additives
/// and subtractives is not subtract mode. An empty additive side outside
/// subtract mode is a validation error unless `allow.allow_remove_all`
/// permits a subtract-only expression.
pub fn parse(input: &str, aliases: &HashMap<String, Vec<String>>, allow: AllowFlags) -> ParsedSetFilter {
    let mut additives = Vec::new();
    let mut subtractives = Vec::new();
    let mut validation_error = None;

    for token in input.split_whitespace() {
        if let Some(name) = token.strip_prefix('-') {
            subtractives.push(name.to_string());
        } else if let Some(alias) = token.strip_prefix('@') {
            match aliases.get(alias) {
                Some(expansion) => {
                    for item in expansion {
                        if item.starts_with('#') && !sentinel_allowed(item, allow) {
                            validation_error = Some(format!("sentinel '{item}' is not allowed here"));
                            continue;
                        }
                        additives.push(item.clone());
                    }
                }
                None => {
                    validation_error = Some(format!("unknown alias '@{alias}'"));
                }
            }
        } else {
            let name = token.strip_prefix('+').unwrap_or(token);
            additives.push(name.to_string());
        }
    }

    let subtract_mode = !subtractives.is_empty() && additives.is_empty();

    if validation_error.is_none() && additives.is_empty() && !(subtract_mode && allow.allow_remove_all) {
        validation_error = Some("set-filter has no additive terms".to_string());
    }

    ParsedSetFilter { additives, subtractives, subtract_mode, validation_error }
}

fn sentinel_allowed(sentinel: &str, allow: AllowFlags) -> bool {
    match sentinel {
        "#cluster-scoped" | "#namespaced" | "#all" => allow.allow_add_all,
        "#none" => allow.allow_remove_all,
        _ => allow.allow_custom_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> HashMap<String, Vec<String>> {
        let mut map = HashMap::new();
        map.insert("all_cluster_scoped".to_string(), vec!["#cluster-scoped".to_string()]);
        map.insert("all_namespaced".to_string(), vec!["#namespaced".to_string()]);
        map
    }

    #[test]
    fn s5_alias_and_mixed_additive_subtractive() {
        let allow = AllowFlags { allow_add_all: true, ..Default::default() };
        let parsed = parse("@all_cluster_scoped kube-system -istio-system", &aliases(), allow);
        assert_eq!(parsed.additives, vec!["#cluster-scoped", "kube-system"]);
        assert_eq!(parsed.subtractives, vec!["istio-system"]);
        assert!(!parsed.subtract_mode);
        assert_eq!(parsed.validation_error, None);
    }

    #[test]
    fn empty_additive_without_allow_remove_all_is_error() {
        let parsed = parse("-only-subtract", &HashMap::new(), AllowFlags::default());
        assert!(parsed.validation_error.is_some());
    }

    #[test]
    fn empty_additive_with_allow_remove_all_is_ok() {
        let allow = AllowFlags { allow_remove_all: true, ..Default::default() };
        let parsed = parse("-only-subtract", &HashMap::new(), allow);
        assert_eq!(parsed.validation_error, None);
    }

    #[test]
    fn subtract_only_expression_is_subtract_mode() {
        let allow = AllowFlags { allow_remove_all: true, ..Default::default() };
        let parsed = parse("-only-subtract", &HashMap::new(), allow);
        assert!(parsed.subtract_mode);
    }

    #[test]
    fn unknown_alias_is_validation_error() {
        let parsed = parse("@nope", &HashMap::new(), AllowFlags::default());
        assert!(parsed.validation_error.unwrap().contains("unknown alias"));
    }
}
