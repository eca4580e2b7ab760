//! Stack config documents
//!
//! A stack config is a JSON document with exactly these top-level keys:
//!
//! ```json
//! {
//!   "Version": "1.0",
//!   "Template": { "Name": "network", "Version": "0.3" },
//!   "EnvType": "prod",
//!   "Region": "eu-west-2",
//!   "Identifier": "core",
//!   "RoleArn": null,
//!   "TemplateParameters": { "VpcCidr": "10.0.0.0/16" },
//!   "ResourceOverrides": null
//! }
//! ```
//!
//! The artifact block may also be spelled `System`. Validation is strict and
//! happens before anything touches the network.

use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::overrides::{ResourceOverrides, kind_of};
use crate::region::Region;
use crate::stack::{StackSpec, TemplateRef};
use crate::version::Version;

/// Artifact block key
pub const TEMPLATE_KEY: &str = "Template";

/// Legacy spelling of the artifact block key
pub const SYSTEM_KEY: &str = "System";

/// Keys every stack config must have, besides the artifact block
const REQUIRED_KEYS: &[&str] = &[
    "Version",
    "EnvType",
    "Region",
    "Identifier",
    "RoleArn",
    "TemplateParameters",
    "ResourceOverrides",
];

const STRING_KEYS: &[&str] = &["Version", "EnvType", "Region", "Identifier"];

const ARTIFACT_KEYS: &[&str] = &["Name", "Version"];

/// Maximum edit distance for "did you mean" hints
const MAX_SUGGESTION_DISTANCE: usize = 3;

impl StackSpec {
    /// Load and validate a stack config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse and validate a stack config document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: JsonValue = serde_json::from_str(json)?;
        parse_stack_config(&document)
    }
}

/// Validate a parsed stack config document and build a [`StackSpec`]
pub fn parse_stack_config(document: &JsonValue) -> Result<StackSpec> {
    let JsonValue::Object(config) = document else {
        return Err(CoreError::config(format!(
            "stack config must be a mapping, found a {}",
            kind_of(document)
        )));
    };

    let artifact_key = check_keys(config)?;

    for key in STRING_KEYS {
        non_empty_string(config, key, "Stack config")?;
    }

    let artifact = match &config[artifact_key] {
        JsonValue::Object(block) => block,
        other => {
            return Err(CoreError::config(format!(
                "stack config {artifact_key} value must be a mapping, found a {}",
                kind_of(other)
            )));
        }
    };
    let artifact_context = format!("Stack config's {artifact_key}");
    for key in ARTIFACT_KEYS {
        if !artifact.contains_key(*key) {
            return Err(CoreError::config(format!(
                "stack config file's {artifact_key} is missing required {key} key"
            )));
        }
        non_empty_string(artifact, key, &artifact_context)?;
    }

    let role_arn = match &config["RoleArn"] {
        JsonValue::Null => None,
        JsonValue::String(arn) if !arn.is_empty() => Some(arn.clone()),
        other => {
            return Err(CoreError::config(format!(
                "stack config RoleArn value {other} must be a non-empty string or null"
            )));
        }
    };

    let template_parameters = parse_parameters(&config["TemplateParameters"])?;

    let resource_overrides = match &config["ResourceOverrides"] {
        JsonValue::Null => ResourceOverrides::new(),
        value @ JsonValue::Object(_) => ResourceOverrides(value.clone()),
        other => return Err(not_a_mapping("ResourceOverrides", other)),
    };

    let region_name = string_at(config, "Region");
    let region = Region::from_name(region_name).map_err(|_| unknown_region(region_name))?;

    Ok(StackSpec {
        version: Version::parse(string_at(config, "Version"))?,
        template: TemplateRef::new(
            string_at(artifact, "Name"),
            Version::parse(string_at(artifact, "Version"))?,
        ),
        env_type: string_at(config, "EnvType").to_string(),
        region,
        identifier: string_at(config, "Identifier").to_string(),
        role_arn,
        template_parameters,
        resource_overrides,
    })
}

/// Reject unknown and missing keys, returning the artifact block key in use
fn check_keys(config: &Map<String, JsonValue>) -> Result<&'static str> {
    let known: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .chain([TEMPLATE_KEY, SYSTEM_KEY])
        .collect();

    for key in config.keys() {
        if !known.contains(&key.as_str()) {
            let message = format!("unexpected key '{key}' detected in stack config file");
            return Err(match closest(key, &known) {
                Some(suggestion) => {
                    CoreError::config_with_help(message, format!("did you mean '{suggestion}'?"))
                }
                None => CoreError::config(message),
            });
        }
    }

    for key in REQUIRED_KEYS {
        if !config.contains_key(*key) {
            return Err(CoreError::config(format!(
                "stack config file is missing required {key} key"
            )));
        }
    }

    match (config.contains_key(TEMPLATE_KEY), config.contains_key(SYSTEM_KEY)) {
        (true, false) => Ok(TEMPLATE_KEY),
        (false, true) => Ok(SYSTEM_KEY),
        (false, false) => Err(CoreError::config(format!(
            "stack config file is missing required {TEMPLATE_KEY} key"
        ))),
        (true, true) => Err(CoreError::config_with_help(
            format!("stack config file has both {TEMPLATE_KEY} and {SYSTEM_KEY} keys"),
            format!("{SYSTEM_KEY} is the legacy spelling of {TEMPLATE_KEY}; keep only one"),
        )),
    }
}

fn non_empty_string(block: &Map<String, JsonValue>, key: &str, context: &str) -> Result<()> {
    match &block[key] {
        JsonValue::String(s) if !s.is_empty() => Ok(()),
        other => Err(CoreError::config(format!(
            "{context} {key} value: {other} must be a non-empty string"
        ))),
    }
}

/// Fetch a string that [`non_empty_string`] has already checked
fn string_at<'a>(block: &'a Map<String, JsonValue>, key: &str) -> &'a str {
    block.get(key).and_then(JsonValue::as_str).unwrap_or_default()
}

fn parse_parameters(value: &JsonValue) -> Result<BTreeMap<String, String>> {
    let entries = match value {
        JsonValue::Null => return Ok(BTreeMap::new()),
        JsonValue::Object(entries) => entries,
        other => return Err(not_a_mapping("TemplateParameters", other)),
    };

    entries
        .iter()
        .map(|(name, value)| match value {
            JsonValue::String(s) => Ok((name.clone(), s.clone())),
            other => Err(CoreError::config(format!(
                "template parameter {name} value {other} must be a string"
            ))),
        })
        .collect()
}

fn not_a_mapping(key: &str, value: &JsonValue) -> CoreError {
    CoreError::config(format!(
        "stack config {key} value {value} must be a dictionary or null"
    ))
}

fn unknown_region(name: &str) -> CoreError {
    let names: Vec<&str> = Region::all().map(|r| r.name()).collect();
    let message = format!("region {name} not recognized");
    match closest(name, &names) {
        Some(suggestion) => {
            CoreError::config_with_help(message, format!("did you mean '{suggestion}'?"))
        }
        None => CoreError::config(message),
    }
}

/// Closest candidate within [`MAX_SUGGESTION_DISTANCE`] edits
fn closest<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, strsim::levenshtein(input, candidate)))
        .filter(|(_, distance)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}
