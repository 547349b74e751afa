//! Header normalization: raw workbook column headers to canonical fields.
//!
//! Matching runs over an ordered alias table. The first canonical field with
//! any pattern matching the normalized header wins; headers nothing matches
//! are dropped. When several columns land on the same single-valued field,
//! [`resolve_columns`] keeps exactly one of them:
//!
//! 1. a header equal to a preferred alias (e.g. `ID.1`) beats one that is not;
//! 2. otherwise the strictly longer raw header wins;
//! 3. ties keep the earlier column.
//!
//! `division` is multi-valued and keeps every matching column in file order.

use std::collections::{BTreeMap, HashMap};

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Reference,
    CategoryName,
    ProductName,
    Size,
    Picture,
    Ce,
    CeMdr,
    Fda,
    Iso,
    PcsInner,
    PcsOuter,
    #[serde(rename = "loading_20gp")]
    Loading20gp,
    #[serde(rename = "loading_40hc")]
    Loading40hc,
    CartonSize,
    Division,
}

impl CanonicalField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Reference => "reference",
            CanonicalField::CategoryName => "category_name",
            CanonicalField::ProductName => "product_name",
            CanonicalField::Size => "size",
            CanonicalField::Picture => "picture",
            CanonicalField::Ce => "ce",
            CanonicalField::CeMdr => "ce_mdr",
            CanonicalField::Fda => "fda",
            CanonicalField::Iso => "iso",
            CanonicalField::PcsInner => "pcs_inner",
            CanonicalField::PcsOuter => "pcs_outer",
            CanonicalField::Loading20gp => "loading_20gp",
            CanonicalField::Loading40hc => "loading_40hc",
            CanonicalField::CartonSize => "carton_size",
            CanonicalField::Division => "division",
        }
    }

    /// Fields that may legitimately span several columns.
    #[must_use]
    pub fn is_multi_column(self) -> bool {
        matches!(self, CanonicalField::Division)
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in alias table, in match-priority order.
const DEFAULT_ALIASES: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Reference,
        &[
            r"^id\.1$",
            r"^id$",
            r"^ref(erence)?(\s*string)?$",
            r"^product\s*id$",
        ],
    ),
    (
        CanonicalField::CategoryName,
        &[r"^products?'?\s*category$", r"^category(\s*name)?$"],
    ),
    (
        CanonicalField::ProductName,
        &[r"^products?$", r"^product\s*name$", r"^item$"],
    ),
    (CanonicalField::Size, &[r"^sizes?$", r"^variant$", r"^model$"]),
    (CanonicalField::Picture, &[r"^picture$", r"^image$", r"^photo$"]),
    (CanonicalField::Ce, &[r"^ce$"]),
    (CanonicalField::CeMdr, &[r"^ce[_\s-]*mdr$"]),
    (CanonicalField::Fda, &[r"^fda$"]),
    (
        CanonicalField::Iso,
        &[r"^iso\s*st\s*/\s*ard$", r"^iso", r"^standard(s)?$"],
    ),
    (
        CanonicalField::PcsInner,
        &[r"^pcs/?\s*inner\s*pack(aging)?$", r"^inner\s*(pcs|qty)$"],
    ),
    (
        CanonicalField::PcsOuter,
        &[
            r"^pcs/?\s*outer\s*pack(aging)?$",
            r"^outer\s*(pcs|qty)$",
            r"^carton\s*qty$",
        ],
    ),
    (
        CanonicalField::Loading20gp,
        &[r"^loading\s*capacity$", r"20\s*gp", r"^20gp$"],
    ),
    (
        CanonicalField::Loading40hc,
        &[r"^unnamed:\s*16$", r"40\s*hc", r"^40hc$"],
    ),
    (
        CanonicalField::CartonSize,
        &[r"^carton\s*size$", r"^ctn\s*size$", r"^box\s*size$"],
    ),
    (CanonicalField::Division, &[r"^divisions?(\.\d+)?$"]),
];

/// Raw header forms that win a duplicate-column contest outright.
pub const DEFAULT_PREFERRED: &[&str] = &["ID.1"];

/// Collapse internal whitespace, trim, and lowercase a raw header.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Give every column a distinct, non-empty name.
///
/// Blank headers become `Unnamed: <index>`; a repeated header gets `.1`,
/// `.2`, … suffixes in file order, so a logical column entered twice reads
/// as `X` and `X.1`.
#[must_use]
pub fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::with_capacity(raw.len());

    for (idx, header) in raw.iter().enumerate() {
        let base = header.trim();
        let base = if base.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            base.to_string()
        };

        let mut name = base.clone();
        while out.contains(&name) {
            let n = counts.entry(base.clone()).or_insert(0);
            *n += 1;
            name = format!("{base}.{n}");
        }
        out.push(name);
    }

    out
}

/// Ordered table of canonical field → case-insensitive header patterns.
#[derive(Debug, Clone)]
pub struct HeaderAliases {
    entries: Vec<(CanonicalField, Vec<Regex>)>,
}

impl HeaderAliases {
    /// Compile an alias table. Entry order is match priority.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidAliasPattern`] if any pattern fails to
    /// compile.
    pub fn new<I, P>(table: I) -> Result<Self, IngestError>
    where
        I: IntoIterator<Item = (CanonicalField, Vec<P>)>,
        P: AsRef<str>,
    {
        let mut entries = Vec::new();
        for (canonical, patterns) in table {
            let compiled = patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p.as_ref())
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| IngestError::InvalidAliasPattern {
                            canonical: canonical.to_string(),
                            pattern: p.as_ref().to_string(),
                            source: e,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            entries.push((canonical, compiled));
        }
        Ok(Self { entries })
    }

    /// The checked-in alias table covering the known workbook layouts.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidAliasPattern`] if a built-in pattern
    /// fails to compile.
    pub fn builtin() -> Result<Self, IngestError> {
        Self::new(
            DEFAULT_ALIASES
                .iter()
                .map(|(canonical, patterns)| (*canonical, patterns.to_vec())),
        )
    }

    /// Canonical field for a raw header, or `None` when nothing matches.
    #[must_use]
    pub fn match_header(&self, raw: &str) -> Option<CanonicalField> {
        let normalized = normalize_header(raw);
        self.entries
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(&normalized)))
            .map(|(canonical, _)| *canonical)
    }
}

/// One row of the header diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderMatch {
    pub column: usize,
    pub header: String,
    pub canonical: Option<CanonicalField>,
    /// `false` when the header matched but lost a duplicate contest.
    pub selected: bool,
}

/// Column positions for each canonical field of a sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    single: BTreeMap<CanonicalField, usize>,
    divisions: Vec<usize>,
    matches: Vec<HeaderMatch>,
}

impl ColumnMap {
    #[must_use]
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        self.single.get(&field).copied()
    }

    #[must_use]
    pub fn division_columns(&self) -> &[usize] {
        &self.divisions
    }

    /// Every header with the field it mapped to, in column order.
    #[must_use]
    pub fn diagnostics(&self) -> &[HeaderMatch] {
        &self.matches
    }
}

/// Map deduplicated headers to canonical columns and log the mapping.
#[must_use]
pub fn resolve_columns(headers: &[String], aliases: &HeaderAliases, preferred: &[&str]) -> ColumnMap {
    let mut map = ColumnMap::default();

    for (column, header) in headers.iter().enumerate() {
        let canonical = aliases.match_header(header);
        map.matches.push(HeaderMatch {
            column,
            header: header.clone(),
            canonical,
            selected: false,
        });

        let Some(field) = canonical else { continue };

        if field.is_multi_column() {
            map.divisions.push(column);
            continue;
        }

        match map.single.get(&field) {
            None => {
                map.single.insert(field, column);
            }
            Some(&holder) => {
                if challenger_wins(header, &headers[holder], preferred) {
                    map.single.insert(field, column);
                }
            }
        }
    }

    let selected: Vec<usize> = map
        .single
        .values()
        .copied()
        .chain(map.divisions.iter().copied())
        .collect();
    for m in &mut map.matches {
        m.selected = selected.contains(&m.column);
        match m.canonical {
            Some(field) => tracing::info!(
                column = m.column,
                header = %m.header,
                canonical = %field,
                selected = m.selected,
                "header mapped"
            ),
            None => tracing::debug!(column = m.column, header = %m.header, "header ignored"),
        }
    }

    map
}

fn challenger_wins(challenger: &str, holder: &str, preferred: &[&str]) -> bool {
    let is_preferred = |h: &str| preferred.iter().any(|p| p.trim().eq_ignore_ascii_case(h.trim()));
    match (is_preferred(challenger), is_preferred(holder)) {
        (true, false) => true,
        (false, true) => false,
        _ => challenger.trim().chars().count() > holder.trim().chars().count(),
    }
}

#[cfg(test)]
#[path = "headers_test.rs"]
mod tests;
