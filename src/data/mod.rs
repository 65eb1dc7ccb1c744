/// Data layer: town table, segmentation schema, loading, reshaping,
/// filtering and summary statistics.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → TownTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  schema   │  (dimension, value) → column, validated → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐     ┌──────────┐
///   │  filter   │ ──▶ │ reshape   │  wide rows → long (town, segment) rows
///   └──────────┘     └──────────┘
///        │                │
///        ▼                ▼
///   ┌──────────────────────────┐
///   │  stats                    │  quartiles, fences, box, density
///   └──────────────────────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod reshape;
pub mod schema;
pub mod stats;
