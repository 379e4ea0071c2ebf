use barflow_parser::schema::{BAR_NAME, DRINK_NAME, GLASS_NAME, STOCK, TRANS_TIME, VALUE};

use super::{
    CellValue, ColumnKind, ColumnSpec, Dataset, ForeignKey, PersistError, TableRecord, TableSpec,
};
use crate::types::{CanonicalDatasets, Drink, GlassType, Location, Transaction};

pub const BAR_STOCK: &str = "BAR_STOCK";
pub const TRANS_ID: &str = "TRANS_ID";

pub static BARS: TableSpec = TableSpec {
    name: "bars",
    key_columns: &[BAR_NAME],
    columns: &[
        ColumnSpec::new(BAR_NAME, ColumnKind::Text),
        ColumnSpec::new(BAR_STOCK, ColumnKind::Json),
    ],
    foreign_keys: &[],
};

pub static GLASSES: TableSpec = TableSpec {
    name: "glasses",
    key_columns: &[GLASS_NAME],
    columns: &[
        ColumnSpec::new(GLASS_NAME, ColumnKind::Text),
        ColumnSpec::new(STOCK, ColumnKind::Integer),
    ],
    foreign_keys: &[],
};

pub static DRINKS: TableSpec = TableSpec {
    name: "drinks",
    key_columns: &[DRINK_NAME],
    columns: &[
        ColumnSpec::new(DRINK_NAME, ColumnKind::Text),
        ColumnSpec::new(GLASS_NAME, ColumnKind::Text),
    ],
    foreign_keys: &[ForeignKey::new(GLASS_NAME, "glasses", GLASS_NAME)],
};

pub static TRANSACTIONS: TableSpec = TableSpec {
    name: "transactions",
    key_columns: &[TRANS_ID],
    columns: &[
        ColumnSpec::new(TRANS_ID, ColumnKind::Integer),
        ColumnSpec::new(BAR_NAME, ColumnKind::Text),
        ColumnSpec::new(DRINK_NAME, ColumnKind::Text),
        ColumnSpec::new(VALUE, ColumnKind::Float),
        ColumnSpec::new(TRANS_TIME, ColumnKind::TimestampTz),
    ],
    foreign_keys: &[
        ForeignKey::new(BAR_NAME, "bars", BAR_NAME),
        ForeignKey::new(DRINK_NAME, "drinks", DRINK_NAME),
    ],
};

impl TableRecord for Location {
    fn table() -> &'static TableSpec {
        &BARS
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.name.clone()),
            CellValue::Json(self.stock.to_json()),
        ]
    }
}

impl TableRecord for GlassType {
    fn table() -> &'static TableSpec {
        &GLASSES
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.name.clone()),
            CellValue::Integer(self.stock),
        ]
    }
}

impl TableRecord for Drink {
    fn table() -> &'static TableSpec {
        &DRINKS
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.name.clone()),
            CellValue::Text(self.glass.clone()),
        ]
    }
}

impl TableRecord for Transaction {
    fn table() -> &'static TableSpec {
        &TRANSACTIONS
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Integer(self.id),
            CellValue::Text(self.location.clone()),
            CellValue::Text(self.drink.clone()),
            CellValue::Float(self.value),
            CellValue::Text(self.timestamp.clone()),
        ]
    }
}

impl CanonicalDatasets {
    /// The four datasets in write order: bars, glasses, drinks, transactions.
    /// Every table is written after the tables it references.
    pub fn to_datasets(&self) -> Result<Vec<Dataset>, PersistError> {
        Ok(vec![
            Dataset::from_records(&self.locations)?,
            Dataset::from_records(&self.glass_types)?,
            Dataset::from_records(&self.drinks)?,
            Dataset::from_records(&self.transactions)?,
        ])
    }
}
