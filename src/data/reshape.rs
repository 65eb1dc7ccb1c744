use super::model::TownTable;
use super::schema::{Dimension, ResolvedDimension, SegmentKey};

// ---------------------------------------------------------------------------
// Long (tidy) tables
// ---------------------------------------------------------------------------

/// One (town, segment) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    /// Index of the source row in the town table.
    pub town_index: usize,
    pub region: String,
    pub department: String,
    pub segment: SegmentKey,
    /// `None` when the source cell was empty or not a number.
    pub salary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LongTable {
    pub dimension: Dimension,
    pub rows: Vec<LongRecord>,
}

impl LongTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Unpivot every town of `table` along `dimension`.
///
/// Produces one row per town and segment, grouped per town in table order,
/// segments in dimension order.
#[cfg(test)]
pub fn reshape(table: &TownTable, dimension: &ResolvedDimension) -> LongTable {
    reshape_rows(table, 0..table.len(), dimension)
}

/// Unpivot only the towns at `rows` (e.g. the output of
/// [`filter_towns`](super::filter::filter_towns)).
pub fn reshape_rows(
    table: &TownTable,
    rows: impl IntoIterator<Item = usize>,
    dimension: &ResolvedDimension,
) -> LongTable {
    let mut out = Vec::new();
    for idx in rows {
        let Some(town) = table.towns.get(idx) else {
            continue;
        };
        for &(segment, column) in &dimension.columns {
            out.push(LongRecord {
                town_index: idx,
                region: town.region.clone(),
                department: town.department.clone(),
                segment,
                salary: town.measure(column),
            });
        }
    }
    LongTable {
        dimension: dimension.dimension,
        rows: out,
    }
}
