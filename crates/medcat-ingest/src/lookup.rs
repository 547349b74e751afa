//! Category and division id resolution.
//!
//! Resolution order for upload data:
//!
//! 1. exact (case-insensitive) name, or exact id, in the live CMS table;
//! 2. exact name in the fallback defaults;
//! 3. otherwise [`Resolution::Unresolved`].
//!
//! Fuzzy matching ([`LookupResolver::suggest_category`]) is kept separate and
//! only feeds the category-sync report. What happens to an unresolved lookup
//! is decided by an [`UnresolvedPolicy`] supplied by the caller.

use std::collections::HashSet;

use medcat_core::{LookupDefaults, MappingTable, Product};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedId {
    pub id: i64,
    pub name: String,
    pub source: LookupSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedId),
    Unresolved,
}

impl Resolution {
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Resolution::Resolved(r) => Some(r.id),
            Resolution::Unresolved => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DivisionResolution {
    pub resolved: Vec<ResolvedId>,
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    Exact,
    Substring,
    SharedKeyword,
    ManualAlias,
}

impl MatchReason {
    /// Curated matches (exact name or a configured alias) as opposed to
    /// heuristics that can produce a plausible but wrong category.
    #[must_use]
    pub fn is_curated(self) -> bool {
        matches!(self, MatchReason::Exact | MatchReason::ManualAlias)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub id: i64,
    pub name: String,
    pub reason: MatchReason,
}

pub struct LookupResolver {
    categories: MappingTable,
    divisions: MappingTable,
    defaults: LookupDefaults,
}

impl LookupResolver {
    #[must_use]
    pub fn new(categories: MappingTable, divisions: MappingTable, defaults: LookupDefaults) -> Self {
        Self {
            categories,
            divisions,
            defaults,
        }
    }

    #[must_use]
    pub fn resolve_category(&self, label: &str) -> Resolution {
        if let Some((id, name)) = self.categories.find(label) {
            return Resolution::Resolved(ResolvedId {
                id,
                name: name.to_string(),
                source: LookupSource::Live,
            });
        }
        match self.defaults.find_category(label) {
            Some(entry) => Resolution::Resolved(ResolvedId {
                id: entry.id,
                name: entry.name.clone(),
                source: LookupSource::Fallback,
            }),
            None => Resolution::Unresolved,
        }
    }

    #[must_use]
    pub fn resolve_division(&self, label: &str) -> Resolution {
        if let Some((id, name)) = self.divisions.find(label) {
            return Resolution::Resolved(ResolvedId {
                id,
                name: name.to_string(),
                source: LookupSource::Live,
            });
        }
        match self.defaults.find_division(label) {
            Some(entry) => Resolution::Resolved(ResolvedId {
                id: entry.id,
                name: entry.name.clone(),
                source: LookupSource::Fallback,
            }),
            None => Resolution::Unresolved,
        }
    }

    /// Resolve every label, keeping input order and dropping repeated ids.
    #[must_use]
    pub fn resolve_divisions(&self, labels: &[String]) -> DivisionResolution {
        let mut out = DivisionResolution::default();
        let mut seen = HashSet::new();
        for label in labels {
            match self.resolve_division(label) {
                Resolution::Resolved(r) => {
                    if seen.insert(r.id) {
                        out.resolved.push(r);
                    }
                }
                Resolution::Unresolved => out.unresolved.push(label.clone()),
            }
        }
        out
    }

    /// Closest live category for a workbook label, for operator review.
    ///
    /// Tries an exact name, then substring containment either way, then a
    /// shared word of three or more letters, then the manual alias table.
    #[must_use]
    pub fn suggest_category(&self, label: &str) -> Option<Suggestion> {
        let wanted = label.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let suggestion = |id: i64, name: &str, reason| Suggestion {
            id,
            name: name.to_string(),
            reason,
        };

        if let Some((id, name)) = self.categories.find(label) {
            return Some(suggestion(id, name, MatchReason::Exact));
        }

        let live = self.categories.entries();
        if let Some((id, name)) = live.iter().find(|(_, name)| {
            let candidate = name.trim().to_lowercase();
            !candidate.is_empty() && (candidate.contains(&wanted) || wanted.contains(&candidate))
        }) {
            return Some(suggestion(*id, *name, MatchReason::Substring));
        }

        let words = keywords(&wanted);
        if let Some((id, name)) = live
            .iter()
            .find(|(_, name)| !keywords(&name.to_lowercase()).is_disjoint(&words))
        {
            return Some(suggestion(*id, *name, MatchReason::SharedKeyword));
        }

        let target = self.defaults.category_alias(label)?;
        self.categories
            .find(target)
            .map(|(id, name)| suggestion(id, name, MatchReason::ManualAlias))
    }
}

fn keywords(text: &str) -> HashSet<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .collect()
}

// ---------------------------------------------------------------------------
// Unresolved-lookup policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    Category,
    Division,
}

#[derive(Debug, Clone, Copy)]
pub struct UnresolvedLookup<'a> {
    pub reference: &'a str,
    pub kind: LookupKind,
    pub label: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Leave the product out of the output.
    Skip,
    /// Keep the product. An unresolved category keeps whatever id it already
    /// had (none for a fresh import). Unresolved divisions are dropped from
    /// the new list; when no division resolves the existing ids stay.
    KeepNull,
    /// Keep the product with the given id.
    UseDefault(i64),
}

/// Caller-chosen handling of lookups that resolve to nothing.
pub trait UnresolvedPolicy {
    fn decide(&self, lookup: &UnresolvedLookup<'_>) -> PolicyDecision;
}

impl<F> UnresolvedPolicy for F
where
    F: Fn(&UnresolvedLookup<'_>) -> PolicyDecision,
{
    fn decide(&self, lookup: &UnresolvedLookup<'_>) -> PolicyDecision {
        self(lookup)
    }
}

#[must_use]
pub fn skip_unresolved(_: &UnresolvedLookup<'_>) -> PolicyDecision {
    PolicyDecision::Skip
}

#[must_use]
pub fn keep_unresolved_as_null(_: &UnresolvedLookup<'_>) -> PolicyDecision {
    PolicyDecision::KeepNull
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingLookup {
    pub reference: String,
    pub kind: LookupKind,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LookupReport {
    pub resolved_categories: usize,
    pub resolved_divisions: usize,
    pub fallback_hits: usize,
    pub defaulted: usize,
    pub skipped_references: Vec<String>,
    pub missing: Vec<MissingLookup>,
}

/// Fill `category`/`divisions` ids on every product.
///
/// Live matches also normalize the stored label to the CMS display name.
/// Products the policy skips are removed from the returned list.
pub fn apply_lookups(
    products: Vec<Product>,
    resolver: &LookupResolver,
    policy: &dyn UnresolvedPolicy,
) -> (Vec<Product>, LookupReport) {
    let mut report = LookupReport::default();
    let mut kept = Vec::with_capacity(products.len());

    for mut product in products {
        let mut skip = false;
        let reference = product.reference_string.clone();
        let decide = |kind, label: &str, report: &mut LookupReport| {
            report.missing.push(MissingLookup {
                reference: reference.clone(),
                kind,
                label: label.to_string(),
            });
            policy.decide(&UnresolvedLookup {
                reference: &reference,
                kind,
                label,
            })
        };

        let label = product.category_name.clone().unwrap_or_default();
        match resolver.resolve_category(&label) {
            Resolution::Resolved(r) => {
                report.resolved_categories += 1;
                if r.source == LookupSource::Fallback {
                    report.fallback_hits += 1;
                } else {
                    product.category_name = Some(r.name.clone());
                }
                product.category = Some(r.id);
            }
            Resolution::Unresolved => match decide(LookupKind::Category, &label, &mut report) {
                PolicyDecision::Skip => skip = true,
                PolicyDecision::KeepNull => {}
                PolicyDecision::UseDefault(id) => {
                    report.defaulted += 1;
                    product.category = Some(id);
                }
            },
        }

        let divisions = resolver.resolve_divisions(&product.division_names);
        let mut ids: Vec<i64> = Vec::new();
        for r in &divisions.resolved {
            report.resolved_divisions += 1;
            if r.source == LookupSource::Fallback {
                report.fallback_hits += 1;
            }
            ids.push(r.id);
        }
        for label in &divisions.unresolved {
            match decide(LookupKind::Division, label, &mut report) {
                PolicyDecision::Skip => skip = true,
                PolicyDecision::KeepNull => {}
                PolicyDecision::UseDefault(id) => {
                    report.defaulted += 1;
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        if !ids.is_empty() {
            product.divisions = ids;
        }

        if skip {
            tracing::warn!(reference = %reference, "skipping product with unresolved lookup");
            report.skipped_references.push(reference);
        } else {
            kept.push(product);
        }
    }

    (kept, report)
}

#[cfg(test)]
#[path = "lookup_test.rs"]
mod tests;
