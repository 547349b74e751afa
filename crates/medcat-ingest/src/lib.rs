pub mod error;
pub mod group;
pub mod headers;
pub mod lookup;
pub mod merge;
pub mod parse;
pub mod slides;
pub mod workbook;

pub use error::IngestError;
pub use group::{group_rows, parent_groups, GroupOutcome, ProductGroup, SheetRow};
pub use headers::{
    resolve_columns, CanonicalField, ColumnMap, HeaderAliases, HeaderMatch, DEFAULT_PREFERRED,
};
pub use lookup::{
    apply_lookups, keep_unresolved_as_null, skip_unresolved, LookupKind, LookupReport,
    LookupResolver, MatchReason, PolicyDecision, Resolution, Suggestion, UnresolvedLookup,
    UnresolvedPolicy,
};
pub use merge::{merge_catalog, merge_slide, MergeField, MergeReport, SlideRange};
pub use slides::{load_slide_content, load_slide_records, SlideContent, SlidePayload, SlideRecord};
pub use workbook::{load_rows, read_sheet, SheetTable};
