use std::{fmt, str::FromStr};

use crate::{error::Error, filter::FilteredEntry};

/// Column the resource table is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Order by API group.
    #[default]
    Unset,
    Name,
    Kind,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(SortKey::Unset),
            "name" => Ok(SortKey::Name),
            "kind" => Ok(SortKey::Kind),
            other => Err(Error::InvalidSortKey(other.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Unset => "",
            SortKey::Name => "name",
            SortKey::Kind => "kind",
        })
    }
}

impl SortKey {
    fn primary<'a>(&self, entry: &'a FilteredEntry) -> &'a str {
        match self {
            SortKey::Unset => &entry.group,
            SortKey::Name => &entry.resource.name,
            SortKey::Kind => &entry.resource.kind,
        }
    }
}

/// Sorts entries by `key`, breaking ties by resource name.
///
/// Entries equal on both keep their input order.
pub fn sort_entries(entries: &mut [FilteredEntry], key: SortKey) {
    entries.sort_by(|a, b| {
        key.primary(a)
            .cmp(key.primary(b))
            .then_with(|| a.resource.name.cmp(&b.resource.name))
    });
}
