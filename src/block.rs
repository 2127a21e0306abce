//! Data blocks: the unit of columnar exchange with the server.

use crate::column::Column;
use crate::{Error, Result};

/// Block header fields carried alongside the columns.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInfo {
    /// Overflow marker set by the server for partial aggregation results.
    pub is_overflows: u8,
    /// Bucket number for two-level aggregation, -1 when unused.
    pub bucket_num: i32,
}

impl Default for BlockInfo {
    fn default() -> Self {
        BlockInfo {
            is_overflows: 0,
            bucket_num: -1,
        }
    }
}

/// A set of equally sized named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    info: BlockInfo,
    columns: Vec<Column>,
}

impl Block {
    /// Create a new empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a block from prepared columns, validating names and lengths.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut block = Block::new();
        for column in columns {
            block.append_column(column)?;
        }
        Ok(block)
    }

    /// Append a column; its row count must match the block's.
    pub fn append_column(&mut self, column: Column) -> Result<()> {
        if column.name().is_empty() {
            return Err(Error::Validation(
                "Column name must not be empty".to_string(),
            ));
        }
        if let Some(first) = self.columns.first() {
            if column.len() != first.len() {
                return Err(Error::Validation(format!(
                    "All columns in a block must have the same row count. \
                     Column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    first.len()
                )));
            }
        }
        self.columns.push(column);
        Ok(())
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (zero for a block without columns).
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Column by index.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Column by name.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Consume the block, returning the columns.
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Block header.
    pub fn info(&self) -> &BlockInfo {
        &self.info
    }

    /// Replace the block header.
    pub fn set_info(&mut self, info: BlockInfo) {
        self.info = info;
    }

    /// True when the block carries no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.row_count() == 0
    }
}

/// Synthesize a query result from the accumulated data blocks.
///
/// The server sends the schema first as a zero-row block, then the row
/// blocks. A single block is returned as-is; a schema-only block followed
/// by exactly one row block yields that row block; anything else is
/// concatenated column-wise. Mixing descriptors across blocks at the same
/// column position is a type error.
pub fn merge_result_blocks(mut blocks: Vec<Block>) -> Result<Block> {
    match blocks.len() {
        0 => Ok(Block::new()),
        1 => Ok(blocks.swap_remove(0)),
        2 if blocks[0].row_count() == 0 => Ok(blocks.swap_remove(1)),
        _ => {
            let mut blocks = blocks.into_iter();
            let mut merged = match blocks.next() {
                Some(block) => block,
                None => return Ok(Block::new()),
            };
            for block in blocks {
                if block.column_count() != merged.column_count() {
                    return Err(Error::Validation(format!(
                        "Result blocks disagree on column count: {} vs {}",
                        merged.column_count(),
                        block.column_count()
                    )));
                }
                let mut columns = merged.into_columns();
                for (target, source) in columns.iter_mut().zip(block.into_columns()) {
                    target.merge(source)?;
                }
                merged = Block::from_columns(columns)?;
            }
            Ok(merged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnData;
    use crate::types::Type;

    fn uint64_column(name: &str, values: Vec<u64>) -> Column {
        Column::new(name, values)
    }

    #[test]
    fn test_block_append_and_counts() {
        let mut block = Block::new();
        block
            .append_column(uint64_column("id", vec![1, 2, 3]))
            .unwrap();
        block
            .append_column(uint64_column("value", vec![10, 20, 30]))
            .unwrap();

        assert_eq!(block.column_count(), 2);
        assert_eq!(block.row_count(), 3);
        assert!(!block.is_empty());
    }

    #[test]
    fn test_block_rejects_row_count_mismatch() {
        let mut block = Block::new();
        block.append_column(uint64_column("id", vec![1, 2])).unwrap();
        let err = block
            .append_column(uint64_column("value", vec![1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_block_rejects_empty_name() {
        let mut block = Block::new();
        assert!(block.append_column(uint64_column("", vec![1])).is_err());
    }

    #[test]
    fn test_block_lookup() {
        let mut block = Block::new();
        block.append_column(uint64_column("id", vec![42])).unwrap();

        assert_eq!(block.column(0).unwrap().name(), "id");
        assert!(block.column(1).is_none());
        assert!(block.column_by_name("id").is_some());
        assert!(block.column_by_name("missing").is_none());
    }

    fn schema_block() -> Block {
        Block::from_columns(vec![Column::with_type(
            "id",
            Type::UInt64,
            ColumnData::UInt64(vec![]),
        )
        .unwrap()])
        .unwrap()
    }

    fn data_block(values: Vec<u64>) -> Block {
        Block::from_columns(vec![
            Column::with_type("id", Type::UInt64, ColumnData::UInt64(values)).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_merge_no_blocks() {
        assert_eq!(merge_result_blocks(vec![]).unwrap().row_count(), 0);
    }

    #[test]
    fn test_merge_single_block() {
        let merged = merge_result_blocks(vec![data_block(vec![1, 2])]).unwrap();
        assert_eq!(merged.row_count(), 2);
    }

    #[test]
    fn test_merge_schema_plus_one() {
        let merged =
            merge_result_blocks(vec![schema_block(), data_block(vec![7, 8, 9])]).unwrap();
        assert_eq!(merged.row_count(), 3);
        assert_eq!(
            merged.column(0).unwrap().data().as_u64s(),
            Some(&[7u64, 8, 9][..])
        );
    }

    #[test]
    fn test_merge_concatenates_many() {
        let merged = merge_result_blocks(vec![
            schema_block(),
            data_block(vec![1, 2]),
            data_block(vec![3]),
            data_block(vec![4, 5]),
        ])
        .unwrap();
        assert_eq!(merged.row_count(), 5);
        assert_eq!(
            merged.column(0).unwrap().data().as_u64s(),
            Some(&[1u64, 2, 3, 4, 5][..])
        );
    }

    #[test]
    fn test_merge_row_count_is_sum() {
        let blocks = vec![schema_block(), data_block(vec![1]), data_block(vec![2, 3])];
        let expected: usize = blocks.iter().map(Block::row_count).sum();
        let merged = merge_result_blocks(blocks).unwrap();
        assert_eq!(merged.row_count(), expected);
    }

    #[test]
    fn test_merge_heterogeneous_types_fails() {
        let other = Block::from_columns(vec![Column::with_type(
            "id",
            Type::UInt32,
            ColumnData::UInt32(vec![1]),
        )
        .unwrap()])
        .unwrap();

        let err = merge_result_blocks(vec![
            schema_block(),
            data_block(vec![1]),
            other,
        ])
        .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
