//! Merging options trees
//!
//! [`merge_options`] composes a base tree with an overriding tree into a new
//! tree. Every key is first classified into a [`Rule`], and the rule alone
//! decides what lands in the result:
//!
//! - absent or `Unset` overrides keep the base value,
//! - two mappings are merged recursively,
//! - two hook lists are concatenated, base first,
//! - a URL `base_url` resolves a URL or string override against itself,
//! - anything else is replaced by the override.
//!
//! The result is unlocked and owns all of its mappings and lists. Only
//! hooks and [`Opaque`](crate::Opaque) handles are shared with the inputs.

use std::collections::BTreeSet;

use log::{debug, trace};
use url::Url;

use crate::hooks::Hook;
use crate::into_url::resolve_base;
use crate::options::keys;
use crate::{Options, Value};

/// How a single key is merged.
#[derive(Debug)]
pub(crate) enum Rule<'a> {
    Keep(Option<&'a Value>),
    Recurse(&'a Options, &'a Options),
    Concat(&'a [Hook], &'a [Hook]),
    Resolve(&'a Url, &'a Value),
    Replace(&'a Value),
}

impl<'a> Rule<'a> {
    pub(crate) fn classify(
        key: &str,
        base: Option<&'a Value>,
        over: Option<&'a Value>,
    ) -> Rule<'a> {
        match (base, over) {
            (base, None) | (base, Some(Value::Unset)) => Rule::Keep(base),
            (Some(Value::Map(b)), Some(Value::Map(o))) => Rule::Recurse(b, o),
            (Some(Value::Hooks(b)), Some(Value::Hooks(o))) => Rule::Concat(b, o),
            (Some(Value::Url(b)), Some(o))
                if key == keys::BASE_URL && matches!(o, Value::Url(_) | Value::String(_)) =>
            {
                Rule::Resolve(b, o)
            }
            (_, Some(o)) => Rule::Replace(o),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Rule::Keep(_) => "keep",
            Rule::Recurse(..) => "recurse",
            Rule::Concat(..) => "concat",
            Rule::Resolve(..) => "resolve",
            Rule::Replace(_) => "replace",
        }
    }

    fn apply(self) -> Option<Value> {
        match self {
            Rule::Keep(base) => base.and_then(Value::fresh),
            Rule::Recurse(base, over) => Some(Value::Map(merge_options(base, over))),
            Rule::Concat(base, over) => Some(Value::Hooks(
                base.iter().chain(over.iter()).cloned().collect(),
            )),
            Rule::Resolve(base, over) => {
                let reference = match over {
                    Value::Url(u) => u.as_str(),
                    Value::String(s) => s.as_str(),
                    _ => return over.fresh(),
                };
                match resolve_base(base, reference) {
                    Some(url) => Some(Value::Url(url)),
                    None => {
                        debug!("could not resolve {reference:?} against {base}, replacing");
                        over.fresh()
                    }
                }
            }
            Rule::Replace(over) => over.fresh(),
        }
    }
}

/// Merge `over` into `base`, returning a new tree.
///
/// Neither input is modified, and the result shares no mapping or list with
/// either of them. See the [module documentation](self) for the rules.
pub fn merge_options(base: &Options, over: &Options) -> Options {
    let keys: BTreeSet<&str> = base.keys().chain(over.keys()).collect();

    keys.into_iter()
        .filter_map(|key| {
            let rule = Rule::classify(key, base.get(key), over.get(key));
            trace!("merge {key:?}: {}", rule.name());
            rule.apply().map(|value| (key, value))
        })
        .collect()
}

/// Merge any number of trees, left to right.
///
/// An empty slice yields an empty tree.
pub fn merge_all(trees: &[&Options]) -> Options {
    trees
        .iter()
        .fold(Options::new(), |acc, tree| merge_options(&acc, tree))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts<const N: usize>(entries: [(&str, Value); N]) -> Options {
        entries.into_iter().collect()
    }

    #[test]
    fn classify_picks_one_rule_per_shape() {
        let map = Value::Map(Options::new());
        let hooks = Value::Hooks(Vec::new());
        let url = Value::Url(Url::parse("https://example.com").unwrap());
        let s = Value::from("/foo");
        let n = Value::from(1);
        let rule = |base, over| Rule::classify("k", Some(base), over).name();

        assert_eq!(rule(&n, None), "keep");
        assert_eq!(rule(&n, Some(&Value::Unset)), "keep");
        assert_eq!(rule(&map, Some(&map)), "recurse");
        assert_eq!(rule(&hooks, Some(&hooks)), "concat");
        assert_eq!(rule(&url, Some(&s)), "replace");
        assert_eq!(rule(&s, Some(&url)), "replace");
        assert_eq!(rule(&map, Some(&n)), "replace");
        assert_eq!(rule(&hooks, Some(&map)), "replace");
        assert_eq!(Rule::classify("k", None, Some(&n)).name(), "replace");

        let base_url = |over| Rule::classify(keys::BASE_URL, Some(&url), Some(over)).name();
        assert_eq!(base_url(&s), "resolve");
        assert_eq!(base_url(&url), "resolve");
        assert_eq!(base_url(&n), "replace");
    }

    #[test]
    fn unset_keeps_and_null_clears() {
        let base = opts([("a", Value::from(1)), ("b", Value::from(2))]);
        let over = opts([("a", Value::Unset), ("b", Value::Null)]);

        let merged = merge_options(&base, &over);
        assert_eq!(merged.get("a"), Some(&Value::from(1)));
        assert_eq!(merged.get("b"), Some(&Value::Null));
    }

    #[test]
    fn unset_never_lands_in_result() {
        let base = opts([("a", Value::Unset)]);
        let over = opts([("b", Value::Unset), ("c", Value::Map(opts([("d", Value::Unset)])))]);

        let merged = merge_options(&base, &over);
        assert!(!merged.contains_key("a"));
        assert!(!merged.contains_key("b"));
        assert!(merged.get_map("c").unwrap().is_empty());
    }

    #[test]
    fn map_replaced_by_scalar() {
        let base = opts([("retry", Value::Map(opts([("limit", Value::from(2))])))]);
        let over = opts([("retry", Value::from(0))]);
        assert_eq!(merge_options(&base, &over).get("retry"), Some(&Value::from(0)));
    }

    #[test]
    fn arrays_are_replaced() {
        let base = opts([("methods", Value::from(vec![Value::from("GET")]))]);
        let over = opts([("methods", Value::from(vec![Value::from("PUT")]))]);
        assert_eq!(
            merge_options(&base, &over).get("methods"),
            Some(&Value::from(vec![Value::from("PUT")]))
        );
    }

    #[test]
    fn unresolvable_url_is_replaced() {
        let base = opts([("base_url", Value::Url(Url::parse("mailto:a@b.c").unwrap()))]);
        let over = opts([("base_url", Value::from("x"))]);
        assert_eq!(
            merge_options(&base, &over).get("base_url"),
            Some(&Value::from("x"))
        );
    }

    #[test]
    fn result_is_unlocked() {
        let base = opts([("headers", Value::Map(opts([("a", Value::from("1"))])))]).lock();
        let mut merged = merge_options(&base, &Options::new());
        assert!(!merged.is_locked());
        merged.map_mut("headers").unwrap().insert("b", "2").unwrap();
        assert_eq!(base.header("b"), None);
    }

    #[test]
    fn merge_all_folds_left_to_right() {
        let a = opts([("x", Value::from(1)), ("y", Value::from(1))]);
        let b = opts([("x", Value::from(2))]);
        let c = opts([("x", Value::from(3)), ("z", Value::from(3))]);

        let merged = merge_all(&[&a, &b, &c]);
        assert_eq!(merged.get("x"), Some(&Value::from(3)));
        assert_eq!(merged.get("y"), Some(&Value::from(1)));
        assert_eq!(merged.get("z"), Some(&Value::from(3)));
        assert!(merge_all(&[]).is_empty());
    }
}
