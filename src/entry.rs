//! Entry identifiers: `<prefix>-<number>` strings such as `emd-1832` or
//! `empiar-10070`, and the source databases their prefixes map to.

use std::fmt;
use std::str::FromStr;

use crate::error::VolsegError;

/// Source database an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Electron Microscopy Data Bank (`emd-` prefix).
    Emdb,
    /// Electron Microscopy Public Image Archive (`empiar-` prefix).
    Empiar,
}

impl Source {
    /// Canonical source name used by the volume server API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emdb => "emdb",
            Self::Empiar => "empiar",
        }
    }

    /// Entry id prefix for this source.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Emdb => "emd",
            Self::Empiar => "empiar",
        }
    }

    /// Look up the source for an entry id prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "emd" => Some(Self::Emdb),
            "empiar" => Some(Self::Empiar),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = VolsegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "emdb" => Ok(Self::Emdb),
            "empiar" => Ok(Self::Empiar),
            other => Err(VolsegError::UnknownSourcePrefix(other.to_owned())),
        }
    }
}

/// A parsed entry id: source plus accession number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId {
    /// Source database.
    pub source: Source,
    /// Accession number, kept verbatim (leading zeros are significant).
    pub number: String,
}

impl EntryId {
    /// Create an entry id from its parts.
    #[must_use]
    pub fn new(source: Source, number: impl Into<String>) -> Self {
        Self {
            source,
            number: number.into(),
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source.prefix(), self.number)
    }
}

impl FromStr for EntryId {
    type Err = VolsegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve_source(s)
    }
}

/// Split an entry id (e.g. `emd-1832`) into source (`emdb`) and number
/// (`1832`).
pub fn resolve_source(entry_id: &str) -> Result<EntryId, VolsegError> {
    let (prefix, number) = entry_id
        .split_once('-')
        .ok_or_else(|| VolsegError::MalformedEntryId(entry_id.to_owned()))?;
    let source = Source::from_prefix(prefix)
        .ok_or_else(|| VolsegError::UnknownSourcePrefix(prefix.to_owned()))?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VolsegError::MalformedEntryId(entry_id.to_owned()));
    }
    Ok(EntryId::new(source, number))
}

/// Create an entry id string (e.g. `emd-1832`) for a source and number.
#[must_use]
pub fn build_entry_id(source: Source, number: &str) -> String {
    EntryId::new(source, number).to_string()
}
