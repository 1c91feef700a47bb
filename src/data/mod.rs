/// Data layer: core types, loading, filtering, aggregation and alerts.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file, drop rows without city/date → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Reading> ordered by timestamp, city index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  Selection (cities, dates) → FilteredView
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌───────────┐  ┌─────────┐
///   │ aggregate  │  │  alert   │  KPIs, chart tables / latest-reading bands
///   └───────────┘  └─────────┘
///        │              │
///        └──────┬───────┘
///               ▼
///         summary::summarize → DashboardSummary
/// ```

pub mod aggregate;
pub mod alert;
pub mod filter;
pub mod loader;
pub mod model;
pub mod summary;
