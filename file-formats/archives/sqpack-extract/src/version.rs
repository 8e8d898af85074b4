//! Game versions and patch file names
//!
//! A version is written as five dot-separated, zero-padded numbers:
//! `YYYY.MM.DD.PPPP.RRRR`. The first three components are the calendar day the
//! build was cut; the last two are the part and revision counters of that day.
//!
//! Ordering compares the revision *before* the part counter, matching the
//! order patch servers list builds in.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Widths of the five components in the canonical text form
const COMPONENT_WIDTHS: [usize; 5] = [4, 2, 2, 4, 4];

/// A five-part game version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VersionId {
    /// Year of the build
    pub epoch: u32,
    /// Month of the build
    pub major: u32,
    /// Day of the build
    pub minor: u32,
    /// Part counter within the day
    pub patch: u32,
    /// Revision counter within the day
    pub revision: u32,
}

impl VersionId {
    /// Create a version from its components
    pub const fn new(epoch: u32, major: u32, minor: u32, patch: u32, revision: u32) -> Self {
        Self {
            epoch,
            major,
            minor,
            patch,
            revision,
        }
    }

    /// Parse the canonical `YYYY.MM.DD.PPPP.RRRR` form
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != COMPONENT_WIDTHS.len() {
            return Err(Error::MalformedVersion(text.to_string()));
        }

        let mut values = [0u32; 5];
        for ((value, part), width) in values.iter_mut().zip(&parts).zip(COMPONENT_WIDTHS) {
            if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::MalformedVersion(text.to_string()));
            }
            *value = part
                .parse()
                .map_err(|_| Error::MalformedVersion(text.to_string()))?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3], values[4]))
    }

    /// Calendar day key used to group patches into batches
    pub fn day(&self) -> (u32, u32, u32) {
        (self.epoch, self.major, self.minor)
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.epoch, self.major, self.minor, self.revision, self.patch).cmp(&(
            other.epoch,
            other.major,
            other.minor,
            other.revision,
            other.patch,
        ))
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}.{:02}.{:02}.{:04}.{:04}",
            self.epoch, self.major, self.minor, self.patch, self.revision
        )
    }
}

impl FromStr for VersionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Class of a patch file, taken from the first letter of its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
    /// Incremental game data patch (`D...`)
    Delta,
    /// History patch (`H...`), a different patch class the pipeline skips
    History,
}

/// A parsed patch file name such as `D2023.03.28.0000.0001.patch`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatchName {
    /// Patch class
    pub kind: PatchKind,
    /// Version the patch produces
    pub version: VersionId,
}

impl PatchName {
    /// Parse a patch file name, with or without directory and `.patch` extension
    pub fn parse(file_name: &str) -> Result<Self> {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name);
        let stem = base.strip_suffix(".patch").unwrap_or(base);

        let mut chars = stem.chars();
        let kind = match chars.next() {
            Some('D') => PatchKind::Delta,
            Some('H') => PatchKind::History,
            _ => return Err(Error::MalformedVersion(file_name.to_string())),
        };

        let rest = chars.as_str();
        // History names carry a trailing letter after the revision
        let rest = match kind {
            PatchKind::History => rest.trim_end_matches(|c: char| c.is_ascii_alphabetic()),
            PatchKind::Delta => rest,
        };

        let version =
            VersionId::parse(rest).map_err(|_| Error::MalformedVersion(file_name.to_string()))?;
        Ok(Self { kind, version })
    }

    /// Whether this is a history patch
    pub fn is_history(&self) -> bool {
        self.kind == PatchKind::History
    }
}

impl fmt::Display for PatchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            PatchKind::Delta => 'D',
            PatchKind::History => 'H',
        };
        write!(f, "{prefix}{}", self.version)
    }
}

/// Partition items into same-day batches, ordered by day
///
/// Items keep their relative order inside a batch.
pub fn group_by_day<T, F>(items: Vec<T>, version_of: F) -> Vec<Vec<T>>
where
    F: Fn(&T) -> VersionId,
{
    let mut days: BTreeMap<(u32, u32, u32), Vec<T>> = BTreeMap::new();
    for item in items {
        days.entry(version_of(&item).day()).or_default().push(item);
    }
    days.into_values().collect()
}
