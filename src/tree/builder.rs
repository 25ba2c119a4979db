//! Row tree construction.
//!
//! Flat rows + grouping model → tree. With no grouping the tree is root → N
//! leaves; otherwise rows are bucketed by successive grouping fields, with
//! group nodes created in first-seen order. Rows whose grouping value is
//! null/missing (or NaN) land in a sentinel "no value" bucket — never
//! dropped. Malformed row ids are fatal before any later stage runs.

use crate::column::ColumnSet;
use crate::diag::WarnOnce;
use crate::error::{GridError, Result};
use crate::model::GroupingModel;
use crate::tree::node::{RowNodeKind, RowTree};
use crate::types::{CellValue, RowIdSource, RowKey, RowRecord};
use std::collections::HashSet;

/// Everything the builder needs from the pipeline context.
pub struct TreeBuildInput<'a> {
    pub rows: &'a [RowRecord],
    pub columns: &'a ColumnSet,
    pub grouping: &'a GroupingModel,
    pub id_source: &'a RowIdSource,
    /// Append a synthetic footer child to every group (aggregation footers).
    pub with_footers: bool,
}

/// Build the row tree. Fails on duplicate or missing row ids and on a
/// malformed grouping model; otherwise total (every input row becomes a leaf).
pub fn build_row_tree(input: &TreeBuildInput<'_>, warn: &mut WarnOnce) -> Result<RowTree> {
    input.grouping.validate()?;

    let keys = resolve_row_keys(input.rows, input.id_source)?;

    let mut tree = RowTree::new();
    let root = tree.root();

    if input.grouping.is_empty() {
        for (row_index, key) in keys.into_iter().enumerate() {
            tree.add_node(root, key, RowNodeKind::Leaf { row_index });
        }
        return Ok(tree);
    }

    for (row_index, (row, key)) in input.rows.iter().zip(keys).enumerate() {
        let mut parent = root;
        for field in &input.grouping.fields {
            let value = grouping_value(row, field, input.columns, warn);
            let group_key = group_node_key(&tree.node(parent).key, field, &value);
            parent = match tree.find_by_key(&group_key) {
                Some(id) => id,
                None => tree.add_node(
                    parent,
                    group_key,
                    RowNodeKind::Group {
                        field: field.clone(),
                        key: value,
                    },
                ),
            };
        }
        tree.add_node(parent, key, RowNodeKind::Leaf { row_index });
    }

    if input.with_footers {
        // Separate pass so every footer lands after its siblings.
        let group_ids: Vec<_> = tree
            .iter()
            .filter(|n| n.is_group() && n.id != root)
            .map(|n| n.id)
            .collect();
        for group in group_ids {
            let footer_key = RowKey::Str(format!("auto-generated-footer-{}", tree.node(group).key));
            tree.add_node(group, footer_key, RowNodeKind::Footer);
        }
    }

    Ok(tree)
}

/// Resolve every row's key up front so id errors surface before the tree is
/// built at all.
fn resolve_row_keys(rows: &[RowRecord], id_source: &RowIdSource) -> Result<Vec<RowKey>> {
    let mut keys = Vec::with_capacity(rows.len());
    let mut seen = HashSet::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let key = id_source
            .key_for(row)
            .ok_or(GridError::MissingRowId(index))?;
        if !seen.insert(key.clone()) {
            return Err(GridError::DuplicateRowId(key));
        }
        keys.push(key);
    }
    Ok(keys)
}

/// Grouping cell for a row. A field with no column definition reads the raw
/// record directly; a missing value is identical to an explicit null.
fn grouping_value(
    row: &RowRecord,
    field: &str,
    columns: &ColumnSet,
    warn: &mut WarnOnce,
) -> CellValue {
    let value = match columns.get(field) {
        Some(col) => col.cell_value(row, warn),
        None => row.get(field).clone(),
    };
    // NaN would defeat strict-equality bucketing; fold it into "no value".
    match value {
        CellValue::Number(n) if n.is_nan() => CellValue::Null,
        other => other,
    }
}

/// Auto-generated key for a group bucket, namespaced by the parent's key so
/// nested buckets with equal values stay distinct.
fn group_node_key(parent_key: &RowKey, field: &str, value: &CellValue) -> RowKey {
    RowKey::Str(format!(
        "auto-generated-group-{}/{}/{}",
        parent_key,
        field,
        value.bucket_key()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDefinition, ColumnType};

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDefinition::new("id", ColumnType::Number),
            ColumnDefinition::new("g", ColumnType::String),
            ColumnDefinition::new("v", ColumnType::Number),
        ])
        .unwrap()
    }

    fn rows(specs: &[(i64, &str, f64)]) -> Vec<RowRecord> {
        specs
            .iter()
            .map(|(id, g, v)| RowRecord::new().with("id", *id).with("g", *g).with("v", *v))
            .collect()
    }

    fn build(
        rows: &[RowRecord],
        grouping: &[&str],
        with_footers: bool,
    ) -> Result<RowTree> {
        let columns = columns();
        let grouping = GroupingModel {
            fields: grouping.iter().map(|s| s.to_string()).collect(),
        };
        let id_source = RowIdSource::default();
        let mut warn = WarnOnce::new();
        build_row_tree(
            &TreeBuildInput {
                rows,
                columns: &columns,
                grouping: &grouping,
                id_source: &id_source,
                with_footers,
            },
            &mut warn,
        )
    }

    #[test]
    fn test_flat_tree() {
        let rows = rows(&[(1, "x", 1.0), (2, "y", 2.0), (3, "x", 3.0)]);
        let tree = build(&rows, &[], false).unwrap();

        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.children(tree.root()).len(), 3);
        for &child in tree.children(tree.root()) {
            assert_eq!(tree.node(child).depth, 1);
            assert!(tree.node(child).is_leaf());
        }
    }

    #[test]
    fn test_grouped_tree_first_seen_order() {
        let rows = rows(&[(1, "x", 1.0), (2, "y", 2.0), (3, "x", 3.0)]);
        let tree = build(&rows, &["g"], false).unwrap();

        let top = tree.children(tree.root());
        assert_eq!(top.len(), 2);
        // First-seen order: x before y
        assert_eq!(
            tree.node(top[0]).grouping_key(),
            Some(&CellValue::Text("x".into()))
        );
        assert_eq!(
            tree.node(top[1]).grouping_key(),
            Some(&CellValue::Text("y".into()))
        );
        assert_eq!(tree.children(top[0]).len(), 2);
        assert_eq!(tree.children(top[1]).len(), 1);
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn test_missing_group_value_gets_sentinel_bucket() {
        let mut all = rows(&[(1, "x", 1.0)]);
        // Row without the grouping field at all
        all.push(RowRecord::new().with("id", 2i64).with("v", 5.0));
        // Row with an explicit null
        all.push(
            RowRecord::new()
                .with("id", 3i64)
                .with("g", CellValue::Null)
                .with("v", 6.0),
        );

        let tree = build(&all, &["g"], false).unwrap();
        let top = tree.children(tree.root());
        assert_eq!(top.len(), 2);
        // Missing and explicit-null rows share the sentinel bucket
        let sentinel = top
            .iter()
            .find(|&&id| tree.node(id).grouping_key() == Some(&CellValue::Null))
            .copied()
            .unwrap();
        assert_eq!(tree.children(sentinel).len(), 2);
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn test_duplicate_row_id_fatal() {
        let rows = rows(&[(1, "x", 1.0), (1, "y", 2.0)]);
        let err = build(&rows, &["g"], false).unwrap_err();
        assert!(matches!(err, GridError::DuplicateRowId(RowKey::Int(1))));
    }

    #[test]
    fn test_missing_row_id_fatal() {
        let rows = vec![RowRecord::new().with("v", 1.0)];
        let err = build(&rows, &[], false).unwrap_err();
        assert!(matches!(err, GridError::MissingRowId(0)));
    }

    #[test]
    fn test_footers_appended_last() {
        let rows = rows(&[(1, "x", 1.0), (2, "x", 2.0), (3, "y", 3.0)]);
        let tree = build(&rows, &["g"], true).unwrap();

        for &group in tree.children(tree.root()) {
            let children = tree.children(group);
            let footer = *children.last().unwrap();
            assert!(tree.node(footer).is_footer());
            // Exactly one footer per group
            assert_eq!(
                children
                    .iter()
                    .filter(|&&c| tree.node(c).is_footer())
                    .count(),
                1
            );
        }
    }

    #[test]
    fn test_two_level_grouping_depths() {
        let all = vec![
            RowRecord::new().with("id", 1i64).with("g", "x").with("h", "p"),
            RowRecord::new().with("id", 2i64).with("g", "x").with("h", "q"),
        ];
        let tree = build(&all, &["g", "h"], false).unwrap();

        let top = tree.children(tree.root());
        assert_eq!(top.len(), 1);
        let second = tree.children(top[0]);
        assert_eq!(second.len(), 2);
        assert_eq!(tree.node(second[0]).depth, 2);
        let leaves = tree.children(second[0]);
        assert_eq!(tree.node(leaves[0]).depth, 3);
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_leaf_count_equals_row_count(
            groups in prop::collection::vec(0u8..4, 0..60),
            nested in prop::collection::vec(0u8..3, 0..60),
        ) {
            let n = groups.len().min(nested.len());
            let rows: Vec<RowRecord> = (0..n)
                .map(|i| {
                    RowRecord::new()
                        .with("id", i as i64)
                        .with("g", format!("g{}", groups[i]))
                        .with("h", format!("h{}", nested[i]))
                })
                .collect();

            for fields in [&[][..], &["g"][..], &["g", "h"][..]] {
                let tree = build(&rows, fields, false).unwrap();
                prop_assert_eq!(tree.leaf_count(), rows.len());
                // Every non-root node's parent links back to it
                for node in tree.iter() {
                    for &child in &node.children {
                        prop_assert_eq!(tree.node(child).parent, node.id);
                    }
                }
            }
        }
    }
}
