//! AWS region names and their short codes
//!
//! Stack names embed the short code (`euw2`) rather than the region name
//! (`eu-west-2`) to keep them compact.

use phf::phf_ordered_map;
use serde::Serialize;
use std::fmt;

use crate::error::{CoreError, Result};

/// Region name -> (short code, display name)
static REGIONS: phf::OrderedMap<&'static str, (&'static str, &'static str)> = phf_ordered_map! {
    "us-east-2" => ("use2", "US East (Ohio)"),
    "us-east-1" => ("use1", "US East (N. Virginia)"),
    "us-west-1" => ("usw1", "US West (N. California)"),
    "us-west-2" => ("usw2", "US West (Oregon)"),
    "af-south-1" => ("afs1", "Africa (Cape Town)"),
    "ap-east-1" => ("ape1", "Asia Pacific (Hong Kong)"),
    "ap-south-2" => ("aps2", "Asia Pacific (Hyderabad)"),
    "ap-southeast-3" => ("apse3", "Asia Pacific (Jakarta)"),
    "ap-south-1" => ("aps1", "Asia Pacific (Mumbai)"),
    "ap-northeast-3" => ("apne3", "Asia Pacific (Osaka)"),
    "ap-northeast-2" => ("apne2", "Asia Pacific (Seoul)"),
    "ap-southeast-1" => ("apse1", "Asia Pacific (Singapore)"),
    "ap-southeast-2" => ("apse2", "Asia Pacific (Sydney)"),
    "ap-northeast-1" => ("apne1", "Asia Pacific (Tokyo)"),
    "ca-central-1" => ("cac1", "Canada (Central)"),
    "eu-central-1" => ("euc1", "Europe (Frankfurt)"),
    "eu-west-1" => ("euw1", "Europe (Ireland)"),
    "eu-west-2" => ("euw2", "Europe (London)"),
    "eu-south-1" => ("eus1", "Europe (Milan)"),
    "eu-west-3" => ("euw3", "Europe (Paris)"),
    "eu-south-2" => ("eus2", "Europe (Spain)"),
    "eu-north-1" => ("eun1", "Europe (Stockholm)"),
    "eu-central-2" => ("euc2", "Europe (Zurich)"),
    "me-south-1" => ("mes1", "Middle East (Bahrain)"),
    "me-central-1" => ("mec1", "Middle East (UAE)"),
    "sa-east-1" => ("sae1", "South America (São Paulo)"),
    "us-gov-east-1" => ("usge1", "AWS GovCloud (US-East)"),
    "us-gov-west-1" => ("usgw1", "AWS GovCloud (US-West)"),
};

/// A known AWS region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Region {
    name: &'static str,
    code: &'static str,
    full_name: &'static str,
}

impl Region {
    /// Look up by region name, e.g. `eu-west-2`
    pub fn from_name(name: &str) -> Result<Self> {
        REGIONS
            .get_entry(name)
            .map(|(name, entry)| Self::from_entry(name, entry))
            .ok_or_else(|| CoreError::UnknownRegion {
                input: name.to_string(),
            })
    }

    /// Look up by short code, e.g. `euw2`
    pub fn from_code(code: &str) -> Result<Self> {
        REGIONS
            .entries()
            .find(|(_, (c, _))| *c == code)
            .map(|(name, entry)| Self::from_entry(name, entry))
            .ok_or_else(|| CoreError::UnknownRegion {
                input: code.to_string(),
            })
    }

    /// Region name, e.g. `eu-west-2`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Short code, e.g. `euw2`
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Display name, e.g. `Europe (London)`
    pub fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// All known regions in table order
    pub fn all() -> impl Iterator<Item = Region> {
        REGIONS
            .entries()
            .map(|(name, entry)| Self::from_entry(name, entry))
    }

    fn from_entry(name: &&'static str, entry: &(&'static str, &'static str)) -> Self {
        let (code, full_name) = *entry;
        Self {
            name: *name,
            code,
            full_name,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
