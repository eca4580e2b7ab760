//! Resource overrides: structural patches applied to a template tree
//!
//! An override patch mirrors the shape of the tree it patches. Keys may carry
//! a two-character sentinel that says what to do at that point:
//!
//! - `>>Key` inserts or replaces `Key` with the patch value, no recursion
//! - `<<Key` deletes `Key`, which must exist (the patch value is ignored)
//! - `^^Key` merges the patch value into the existing value at `Key`:
//!   mappings are shallow-unioned with the patch winning, lists are appended
//! - `Key` without a sentinel descends into the existing `Key` and applies
//!   the nested patch there, or does nothing when `Key` is absent
//!
//! A list patch applies each element in turn against the same target.
//!
//! # Example
//!
//! Overrides:
//! ```json
//! {
//!   "LoaderFunction": {
//!     "Properties": {
//!       "Environment": {
//!         "Variables": {
//!           ">>NEW_SALT_SECRET_NAME": { "Ref": "NewPiiSalt" },
//!           "DATABASE_HOST": { "^^Fn::GetAtt": ["something_new"] }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! add `NEW_SALT_SECRET_NAME` next to the existing variables and append
//! `"something_new"` to the `Fn::GetAtt` list of `DATABASE_HOST`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::error::OverrideError;

pub const INSERT_SENTINEL: &str = ">>";
pub const DELETE_SENTINEL: &str = "<<";
pub const MERGE_SENTINEL: &str = "^^";

/// What a patch key asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOp {
    Insert,
    Delete,
    Merge,
    Descend,
}

/// A patch key split into its operation and the real key it targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideKey<'a> {
    pub op: OverrideOp,
    pub target: &'a str,
}

impl<'a> OverrideKey<'a> {
    /// Strip a leading sentinel, if any
    pub fn parse(raw: &'a str) -> Self {
        let sentinels = [
            (INSERT_SENTINEL, OverrideOp::Insert),
            (DELETE_SENTINEL, OverrideOp::Delete),
            (MERGE_SENTINEL, OverrideOp::Merge),
        ];

        for (sentinel, op) in sentinels {
            if let Some(target) = raw.strip_prefix(sentinel) {
                return Self { op, target };
            }
        }

        Self {
            op: OverrideOp::Descend,
            target: raw,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.op != OverrideOp::Descend
    }
}

/// Resource overrides from a stack config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceOverrides(pub JsonValue);

impl ResourceOverrides {
    /// No overrides
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// True for null, an empty mapping or an empty list
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Array(items) => items.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }

    /// Patch `target` in place
    pub fn apply(&self, target: &mut JsonValue) -> Result<(), OverrideError> {
        apply_overrides(target, &self.0)
    }

    /// Patch an owned tree and hand it back
    pub fn applied_to(&self, target: JsonValue) -> Result<JsonValue, OverrideError> {
        overridden(target, &self.0)
    }

    /// Number of sentinel keys anywhere in the patch
    pub fn count(&self) -> usize {
        count_overrides(&self.0)
    }

    pub fn inner(&self) -> &JsonValue {
        &self.0
    }
}

/// Apply `patch` to `target` in place
///
/// Sibling keys target distinct entries and may be visited in any order. On
/// error, `target` may already hold the effects of earlier keys; use
/// [`overridden`] on a copy when that matters.
pub fn apply_overrides(target: &mut JsonValue, patch: &JsonValue) -> Result<(), OverrideError> {
    match patch {
        JsonValue::Object(entries) => {
            for (raw_key, value) in entries {
                apply_entry(target, OverrideKey::parse(raw_key), value)?;
            }
            Ok(())
        }
        JsonValue::Array(batch) => {
            for item in batch {
                apply_overrides(target, item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Owned variant of [`apply_overrides`]
pub fn overridden(mut target: JsonValue, patch: &JsonValue) -> Result<JsonValue, OverrideError> {
    apply_overrides(&mut target, patch)?;
    Ok(target)
}

fn apply_entry(
    target: &mut JsonValue,
    key: OverrideKey<'_>,
    value: &JsonValue,
) -> Result<(), OverrideError> {
    let found = kind_of(target);
    let JsonValue::Object(map) = target else {
        if key.op == OverrideOp::Descend {
            trace!(key = key.target, found, "cannot descend into non-mapping, skipping");
            return Ok(());
        }
        return Err(OverrideError::NotAMapping {
            key: key.target.to_string(),
            found,
        });
    };

    match key.op {
        OverrideOp::Insert => {
            debug!(key = key.target, "inserting override");
            map.insert(key.target.to_string(), value.clone());
        }
        OverrideOp::Delete => {
            debug!(key = key.target, "deleting override");
            map.remove(key.target)
                .ok_or_else(|| OverrideError::MissingDeleteTarget {
                    key: key.target.to_string(),
                })?;
        }
        OverrideOp::Merge => {
            debug!(key = key.target, "merging override");
            let existing =
                map.get_mut(key.target)
                    .ok_or_else(|| OverrideError::MissingMergeTarget {
                        key: key.target.to_string(),
                    })?;
            merge_into(existing, value, key.target)?;
        }
        OverrideOp::Descend => match map.get_mut(key.target) {
            Some(child) => apply_overrides(child, value)?,
            None => trace!(key = key.target, "override path not present in target, skipping"),
        },
    }

    Ok(())
}

fn merge_into(existing: &mut JsonValue, patch: &JsonValue, key: &str) -> Result<(), OverrideError> {
    match (existing, patch) {
        (JsonValue::Object(base), JsonValue::Object(overlay)) => {
            for (k, v) in overlay {
                base.insert(k.clone(), v.clone());
            }
            Ok(())
        }
        (JsonValue::Array(base), JsonValue::Array(extra)) => {
            base.extend(extra.iter().cloned());
            Ok(())
        }
        (existing, patch) => Err(OverrideError::Unmergeable {
            key: key.to_string(),
            existing: kind_of(existing),
            patch: kind_of(patch),
        }),
    }
}

/// Count sentinel keys anywhere in a patch
pub fn count_overrides(patch: &JsonValue) -> usize {
    match patch {
        JsonValue::Object(entries) => entries
            .iter()
            .map(|(raw_key, value)| {
                usize::from(OverrideKey::parse(raw_key).is_sentinel()) + count_overrides(value)
            })
            .sum(),
        JsonValue::Array(batch) => batch.iter().map(count_overrides).sum(),
        _ => 0,
    }
}

/// Human name for the kind of a JSON value
pub fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Object(_) => "mapping",
        JsonValue::Array(_) => "list",
        JsonValue::String(_) => "string",
        JsonValue::Number(_) => "number",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested_resource() -> JsonValue {
        json!({
            "ParentKey": {
                "OldKey": {
                    "OldNestedKey": "OldNestedValue"
                }
            }
        })
    }

    fn four_keys() -> JsonValue {
        json!({
            "ParentKey": {
                "OldKey1": { "OldNestedKey": "OldNestedValue" },
                "OldKey2": { "OldNestedKey": "OldNestedValue" },
                "OldKey3": { "OldNestedKey": "OldNestedValue" },
                "OldKey4": { "OldNestedKey": "OldNestedValue" }
            }
        })
    }

    fn four_elements() -> JsonValue {
        json!({
            "ParentKey": [
                { "OldKey1": { "OldNestedKey": "OldNestedValue" } },
                { "OldKey2": { "OldNestedKey": "OldNestedValue" } },
                { "OldKey3": { "OldNestedKey": "OldNestedValue" } },
                { "OldKey4": { "OldNestedKey": "OldNestedValue" } }
            ]
        })
    }

    fn scalars() -> JsonValue {
        json!({
            "String": "old string",
            "Int": 123,
            "None": null,
            "Bool": true
        })
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(
            OverrideKey::parse(">>NewKey"),
            OverrideKey { op: OverrideOp::Insert, target: "NewKey" }
        );
        assert_eq!(
            OverrideKey::parse("<<OldKey"),
            OverrideKey { op: OverrideOp::Delete, target: "OldKey" }
        );
        assert_eq!(
            OverrideKey::parse("^^Fn::GetAtt"),
            OverrideKey { op: OverrideOp::Merge, target: "Fn::GetAtt" }
        );
        assert_eq!(
            OverrideKey::parse("Properties"),
            OverrideKey { op: OverrideOp::Descend, target: "Properties" }
        );
    }

    #[test]
    fn test_parse_key_strips_only_leading_sentinel() {
        let key = OverrideKey::parse(">>a>>b");
        assert_eq!(key.op, OverrideOp::Insert);
        assert_eq!(key.target, "a>>b");

        let key = OverrideKey::parse("a<<b");
        assert_eq!(key.op, OverrideOp::Descend);
        assert_eq!(key.target, "a<<b");

        // A single character is not a sentinel
        assert_eq!(OverrideKey::parse(">Key").op, OverrideOp::Descend);
    }

    #[test]
    fn test_insert_new_key() {
        let mut resources = nested_resource();
        let patch = json!({
            "ParentKey": {
                ">>NewKey": { "NewNestedKey": "NewNestedValue" }
            }
        });

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(
            resources,
            json!({
                "ParentKey": {
                    "OldKey": { "OldNestedKey": "OldNestedValue" },
                    "NewKey": { "NewNestedKey": "NewNestedValue" }
                }
            })
        );
    }

    #[test]
    fn test_insert_replaces_without_merging() {
        let mut resources = four_elements();
        let patch = json!({
            ">>ParentKey": [
                { "NewKey": { "NewNestedKey": "NewNestedValue" } }
            ]
        });

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(
            resources,
            json!({
                "ParentKey": [
                    { "NewKey": { "NewNestedKey": "NewNestedValue" } }
                ]
            })
        );
    }

    #[test]
    fn test_insert_value_is_not_interpreted() {
        let mut resources = json!({});
        let patch = json!({ ">>Outer": { "<<NotAnOp": 1 } });

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(resources, json!({ "Outer": { "<<NotAnOp": 1 } }));
    }

    #[test]
    fn test_merge_mappings() {
        let mut resources = nested_resource();
        let patch = json!({
            "^^ParentKey": {
                "NewKey": { "NewNestedKey": "NewNestedValue" }
            }
        });

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(
            resources,
            json!({
                "ParentKey": {
                    "OldKey": { "OldNestedKey": "OldNestedValue" },
                    "NewKey": { "NewNestedKey": "NewNestedValue" }
                }
            })
        );
    }

    #[test]
    fn test_merge_mappings_is_shallow_and_patch_wins() {
        let mut resources = json!({
            "Tags": { "Owner": "a", "Nested": { "Keep": 1 } }
        });
        let patch = json!({
            "^^Tags": { "Owner": "b", "Nested": { "New": 2 } }
        });

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(
            resources,
            json!({ "Tags": { "Owner": "b", "Nested": { "New": 2 } } })
        );
    }

    #[test]
    fn test_merge_lists_appends_in_order() {
        let mut resources = four_elements();
        let patch = json!({
            "^^ParentKey": [
                { "OldKey5": { "OldNestedKey": "OldNestedValue" } }
            ]
        });

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(
            resources,
            json!({
                "ParentKey": [
                    { "OldKey1": { "OldNestedKey": "OldNestedValue" } },
                    { "OldKey2": { "OldNestedKey": "OldNestedValue" } },
                    { "OldKey3": { "OldNestedKey": "OldNestedValue" } },
                    { "OldKey4": { "OldNestedKey": "OldNestedValue" } },
                    { "OldKey5": { "OldNestedKey": "OldNestedValue" } }
                ]
            })
        );
    }

    #[test]
    fn test_merge_into_scalars_fails() {
        let patches = [
            json!({ "^^String": "new string" }),
            json!({ "^^Int": 456 }),
            json!({ "^^None": null }),
            json!({ "^^Bool": false }),
            json!({ "^^String": { "a": 1 } }),
            json!({ "^^Int": [1] }),
            json!({ "^^None": {} }),
        ];

        for patch in patches {
            let mut resources = scalars();
            let result = apply_overrides(&mut resources, &patch);
            assert!(
                matches!(result, Err(OverrideError::Unmergeable { .. })),
                "expected {} to be unmergeable",
                patch
            );
        }
    }

    #[test]
    fn test_merge_kind_mismatch_fails() {
        let mut resources = four_elements();
        let err = apply_overrides(&mut resources, &json!({ "^^ParentKey": { "a": 1 } }))
            .unwrap_err();

        assert_eq!(
            err,
            OverrideError::Unmergeable {
                key: "ParentKey".to_string(),
                existing: "list",
                patch: "mapping",
            }
        );
    }

    #[test]
    fn test_merge_missing_key_fails() {
        let mut resources = nested_resource();
        let err = apply_overrides(&mut resources, &json!({ "^^Absent": [] })).unwrap_err();
        assert!(matches!(err, OverrideError::MissingMergeTarget { key } if key == "Absent"));
    }

    #[test]
    fn test_delete_keys_ignores_patch_values() {
        let mut resources = four_keys();
        let patch = json!({
            "ParentKey": {
                "<<OldKey1": {},
                "<<OldKey2": [],
                "<<OldKey3": "this shouldnt matter",
                "<<OldKey4": null
            }
        });

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(resources, json!({ "ParentKey": {} }));
    }

    #[test]
    fn test_delete_missing_key_fails() {
        let mut resources = nested_resource();
        let patch = json!({ "ParentKey": { "<<Nope": null } });

        let err = apply_overrides(&mut resources, &patch).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"trying to delete key 'Nope' but it is not found in resources");
    }

    #[test]
    fn test_descend_into_missing_key_is_noop() {
        let mut resources = nested_resource();
        let before = resources.clone();
        let patch = json!({
            "SomeOtherResource": { "Properties": { ">>X": 1, "<<Y": null } }
        });

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(resources, before);
    }

    #[test]
    fn test_descend_into_scalar_is_noop() {
        let mut resources = json!({ "Name": "value" });
        let patch = json!({ "Name": { "Inner": { ">>X": 1 } } });

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(resources, json!({ "Name": "value" }));
    }

    #[test]
    fn test_sentinel_against_non_mapping_fails() {
        let mut resources = json!({ "List": [1, 2] });
        let err = apply_overrides(&mut resources, &json!({ "List": { ">>X": 1 } })).unwrap_err();

        assert_eq!(
            err,
            OverrideError::NotAMapping {
                key: "X".to_string(),
                found: "list",
            }
        );
    }

    #[test]
    fn test_deeply_nested_merge() {
        let mut template = json!({
            "LoaderFunction": {
                "Properties": {
                    "Environment": {
                        "Variables": {
                            "DATABASE_HOST": {
                                "Fn::GetAtt": ["RdsDbInstance", "Endpoint.Address"]
                            }
                        }
                    }
                }
            }
        });
        let patch = json!({
            "LoaderFunction": {
                "Properties": {
                    "Environment": {
                        "Variables": {
                            ">>NEW_SALT_SECRET_NAME": { "Ref": "NewPiiSalt" },
                            "DATABASE_HOST": { "^^Fn::GetAtt": ["something_new"] }
                        }
                    }
                }
            }
        });

        apply_overrides(&mut template, &patch).unwrap();

        let variables = &template["LoaderFunction"]["Properties"]["Environment"]["Variables"];
        assert_eq!(variables["NEW_SALT_SECRET_NAME"], json!({ "Ref": "NewPiiSalt" }));
        assert_eq!(
            variables["DATABASE_HOST"]["Fn::GetAtt"],
            json!(["RdsDbInstance", "Endpoint.Address", "something_new"])
        );
    }

    #[test]
    fn test_list_patch_applies_each_in_turn() {
        let mut resources = json!({ "A": { "x": 1 } });
        let patch = json!([
            { "A": { ">>y": 2 } },
            { "A": { "<<x": null } },
            { ">>B": true }
        ]);

        apply_overrides(&mut resources, &patch).unwrap();

        assert_eq!(resources, json!({ "A": { "y": 2 }, "B": true }));
    }

    #[test]
    fn test_scalar_patch_is_noop() {
        for patch in [json!(null), json!("x"), json!(1), json!(false)] {
            let mut resources = nested_resource();
            apply_overrides(&mut resources, &patch).unwrap();
            assert_eq!(resources, nested_resource());
        }
    }

    #[test]
    fn test_overridden_returns_patched_tree() {
        let patched = overridden(nested_resource(), &json!({ ">>Top": 1 })).unwrap();
        assert_eq!(patched["Top"], json!(1));
        assert!(patched.get("ParentKey").is_some());
    }

    #[test]
    fn test_resource_overrides_wrapper() {
        let overrides: ResourceOverrides =
            serde_json::from_value(json!({ "ParentKey": { "^^OldKey": { "Extra": 1 } } })).unwrap();
        assert!(!overrides.is_empty());
        assert_eq!(overrides.count(), 1);

        let patched = overrides.applied_to(nested_resource()).unwrap();
        assert_eq!(patched["ParentKey"]["OldKey"]["Extra"], json!(1));

        assert!(ResourceOverrides::new().is_empty());
        assert!(ResourceOverrides(JsonValue::Null).is_empty());
    }

    #[test]
    fn test_count_overrides() {
        let patch = json!({
            "A": {
                ">>B": { "<<InsideInsert": 1 },
                "C": [ { "^^D": [] }, { "E": 1 } ]
            },
            "<<F": null
        });
        // >>B, <<InsideInsert, ^^D and <<F
        assert_eq!(count_overrides(&patch), 4);
        assert_eq!(count_overrides(&json!({})), 0);
        assert_eq!(count_overrides(&json!("<<x")), 0);
    }
}
