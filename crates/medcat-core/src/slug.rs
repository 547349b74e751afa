use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

use crate::product::CatalogEntry;

const EMPTY_SLUG: &str = "product";

/// Generate a URL-safe slug from a product name.
///
/// Accents are decomposed and dropped, punctuation other than `-` and `_` is
/// removed, and runs of whitespace or dashes collapse into a single `-`.
/// Names with nothing sluggable left become `"product"`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let kept: String = name
        .nfd()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .flat_map(char::to_lowercase)
        .collect();

    let slug = kept
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Hands out catalog-unique slugs, suffixing `-1`, `-2`, … on collision.
#[derive(Debug, Default)]
pub struct SlugAllocator {
    used: HashSet<String>,
}

impl SlugAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `slug` as taken without allocating it.
    pub fn reserve(&mut self, slug: &str) {
        self.used.insert(slug.to_string());
    }

    pub fn allocate(&mut self, name: &str) -> String {
        let base = slugify(name);
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut counter = 1u32;
        loop {
            let candidate = format!("{base}-{counter}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Assigns fresh slugs to the first `limit` entries (all entries when `None`).
///
/// Slugs already held by entries outside the processed range are reserved so
/// the catalog stays collision-free. Returns the number of entries updated.
pub fn assign_slugs(entries: &mut [CatalogEntry], limit: Option<usize>) -> usize {
    let count = limit.map_or(entries.len(), |l| l.min(entries.len()));
    let mut allocator = SlugAllocator::new();

    for entry in &entries[count..] {
        if let Some(slug) = entry.data.slug.as_deref() {
            allocator.reserve(slug);
        }
    }

    for entry in &mut entries[..count] {
        let slug = allocator.allocate(&entry.data.name);
        entry.data.slug = Some(slug);
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Product;

    #[test]
    fn slug_simple_name() {
        assert_eq!(slugify("Disposable Syringe"), "disposable-syringe");
    }

    #[test]
    fn slug_strips_punctuation_and_collapses_separators() {
        assert_eq!(slugify("Suction Tube + Jankauer Handle"), "suction-tube-jankauer-handle");
        assert_eq!(slugify("  IV -- Cannula (G18) "), "iv-cannula-g18");
    }

    #[test]
    fn slug_drops_accents() {
        assert_eq!(slugify("Cathéter Urinaire"), "catheter-urinaire");
    }

    #[test]
    fn slug_of_punctuation_only_falls_back() {
        assert_eq!(slugify("???"), "product");
        assert_eq!(slugify(""), "product");
    }

    #[test]
    fn duplicate_names_get_counter_suffix() {
        let mut allocator = SlugAllocator::new();
        assert_eq!(allocator.allocate("Syringe"), "syringe");
        assert_eq!(allocator.allocate("Syringe"), "syringe-1");
        assert_eq!(allocator.allocate("syringe"), "syringe-2");
    }

    #[test]
    fn assign_slugs_respects_limit_and_reserves_the_rest() {
        let mut entries: Vec<CatalogEntry> = ["Syringe", "Syringe", "Gauze"]
            .iter()
            .map(|n| CatalogEntry::from(Product::parent(n, "1")))
            .collect();
        entries[2].data.slug = Some("syringe".to_string());

        let updated = assign_slugs(&mut entries, Some(2));

        assert_eq!(updated, 2);
        assert_eq!(entries[0].data.slug.as_deref(), Some("syringe-1"));
        assert_eq!(entries[1].data.slug.as_deref(), Some("syringe-2"));
        assert_eq!(entries[2].data.slug.as_deref(), Some("syringe"));
    }

    #[test]
    fn assign_slugs_without_limit_covers_everything() {
        let mut entries: Vec<CatalogEntry> = ["Syringe", "Syringe"]
            .iter()
            .map(|n| CatalogEntry::from(Product::parent(n, "1")))
            .collect();
        assert_eq!(assign_slugs(&mut entries, None), 2);
        assert_eq!(entries[0].data.slug.as_deref(), Some("syringe"));
        assert_eq!(entries[1].data.slug.as_deref(), Some("syringe-1"));
    }
}
