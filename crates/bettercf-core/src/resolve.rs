//! Latest-version resolution over a set of stored version strings

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::version::{Version, VersionFormat};

/// Return the latest of `versions`, as it was written
///
/// Every string must parse under the same grammar: first all are tried as
/// `X.Y.Z`, then all as `X.Y`. A set that mixes the two, or contains anything
/// else, is rejected rather than compared on a shared prefix.
///
/// Callers are expected to have dropped empty placeholder entries already.
pub fn resolve_latest<S: AsRef<str>>(versions: &[S]) -> Result<String> {
    if versions.is_empty() {
        return Err(CoreError::NoVersions);
    }

    for format in [VersionFormat::MajorMinorMicro, VersionFormat::MajorMinor] {
        if let Some(latest) = latest_in_format(versions, format) {
            debug!(%format, latest, candidates = versions.len(), "resolved latest version");
            return Ok(latest.to_string());
        }
    }

    let example = versions
        .iter()
        .map(AsRef::as_ref)
        .find(|v| Version::parse(v).is_err())
        .unwrap_or_else(|| versions[0].as_ref());

    Err(CoreError::MixedVersionFormats {
        example: example.to_string(),
    })
}

/// Latest entry if *all* entries parse as `format`
fn latest_in_format<S: AsRef<str>>(versions: &[S], format: VersionFormat) -> Option<&str> {
    let mut latest: Option<(&str, Version)> = None;

    for raw in versions.iter().map(AsRef::as_ref) {
        let version = Version::parse_as(raw, format).ok()?;
        match &latest {
            Some((_, current)) if version.key() <= current.key() => {}
            _ => latest = Some((raw, version)),
        }
    }

    latest.map(|(raw, _)| raw)
}

/// Resolve and parse in one step
pub fn resolve_latest_version<S: AsRef<str>>(versions: &[S]) -> Result<Version> {
    Version::parse(&resolve_latest(versions)?)
}
