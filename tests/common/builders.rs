//! Test data builders for creating test objects

use gridcore_rs::{CellValue, RowRecord};

/// Builder for creating test rows
pub struct RowBuilder {
    record: RowRecord,
}

impl RowBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            record: RowRecord::new().with("id", id),
        }
    }

    pub fn field(mut self, name: &str, value: impl Into<CellValue>) -> Self {
        self.record.insert(name, value);
        self
    }

    pub fn build(self) -> RowRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_builder() {
        let row = RowBuilder::new(7).field("name", "test").field("v", 1.5).build();
        assert_eq!(row.get("id"), &CellValue::Number(7.0));
        assert_eq!(row.get("name"), &CellValue::Text("test".into()));
        assert_eq!(row.get("v"), &CellValue::Number(1.5));
    }
}
