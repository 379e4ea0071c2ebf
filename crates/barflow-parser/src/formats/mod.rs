mod common;
pub mod schema;

use once_cell::sync::Lazy;
use regex::Regex;

pub use common::{
    clean_glass_name, clean_name, clean_stock, clean_timestamp, clean_value, GLASS_NAME_CORRECTIONS,
};

use schema::{BAR_NAME, DRINK_NAME, GLASS_NAME, STOCK, TRANS_TIME, VALUE};

/// Literal source-column → canonical-column table for one raw layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap(&'static [(&'static str, &'static str)]);

impl FieldMap {
    pub const fn new(pairs: &'static [(&'static str, &'static str)]) -> Self {
        Self(pairs)
    }

    /// Looks up an already uppercased header label.
    pub fn canonical(&self, label: &str) -> Option<&'static str> {
        self.0
            .iter()
            .find(|(source, _)| *source == label)
            .map(|(_, canonical)| *canonical)
    }
}

pub const BAR_INVENTORY_FIELDS: FieldMap = FieldMap::new(&[
    ("GLASS_TYPE", GLASS_NAME),
    ("STOCK", STOCK),
    ("BAR", BAR_NAME),
]);

pub const BAR_TRANSACTION_FIELDS: FieldMap = FieldMap::new(&[
    ("TS", TRANS_TIME),
    ("TIME", TRANS_TIME),
    ("ITAL", DRINK_NAME),
    ("DRINK", DRINK_NAME),
    ("KÖLTSÉG", VALUE),
    ("AMOUNT", VALUE),
]);

const LONDON_TRANSACTION_COLUMNS: [&str; 3] = [TRANS_TIME, DRINK_NAME, VALUE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCategory {
    Inventory,
    Transaction,
}

/// How the raw bytes of a format are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// First row carries source labels that are remapped onto canonical names.
    Headed { delimiter: u8, fields: FieldMap },
    /// No header row; columns are positional and already canonical.
    Fixed {
        delimiter: u8,
        columns: &'static [&'static str],
    },
}

impl Layout {
    pub fn delimiter(&self) -> u8 {
        match self {
            Layout::Headed { delimiter, .. } | Layout::Fixed { delimiter, .. } => *delimiter,
        }
    }

    pub fn field_map(&self) -> Option<&FieldMap> {
        match self {
            Layout::Headed { fields, .. } => Some(fields),
            Layout::Fixed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    BarInventory,
    BarTransactions,
    LondonTransactions,
}

impl SourceFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::BarInventory => "BAR_INVENTORY",
            SourceFormat::BarTransactions => "BAR_TRANSACTIONS",
            SourceFormat::LondonTransactions => "LONDON_TRANSACTIONS",
        }
    }

    pub fn category(&self) -> RecordCategory {
        match self {
            SourceFormat::BarInventory => RecordCategory::Inventory,
            SourceFormat::BarTransactions | SourceFormat::LondonTransactions => {
                RecordCategory::Transaction
            }
        }
    }

    pub fn layout(&self) -> Layout {
        match self {
            SourceFormat::BarInventory => Layout::Headed {
                delimiter: b',',
                fields: BAR_INVENTORY_FIELDS,
            },
            SourceFormat::BarTransactions => Layout::Headed {
                delimiter: b',',
                fields: BAR_TRANSACTION_FIELDS,
            },
            SourceFormat::LondonTransactions => Layout::Fixed {
                delimiter: b'\t',
                columns: &LONDON_TRANSACTION_COLUMNS,
            },
        }
    }
}

/// What a queued file turned out to be, judged from its name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFile {
    Inventory,
    Transactions {
        /// Uppercased city key used to look up the bar name and UTC offset.
        city: String,
        format: SourceFormat,
    },
}

impl SourceFile {
    pub fn format(&self) -> SourceFormat {
        match self {
            SourceFile::Inventory => SourceFormat::BarInventory,
            SourceFile::Transactions { format, .. } => *format,
        }
    }
}

static INVENTORY_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^.+\.csv$").expect("valid inventory file regex"));
static TRANSACTION_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\w+)\.csv\.gz$").expect("valid transaction file regex"));

const LONDON_FILE_KEY: &str = "LONDON_TRANSACTIONS";
const LONDON_CITY: &str = "LONDON";

/// Classifies a queue entry by file name. Returns `None` for files the
/// pipeline does not consume.
pub fn classify_file_name(file_name: &str) -> Option<SourceFile> {
    if let Some(captures) = TRANSACTION_FILE.captures(file_name) {
        let stem = captures.get(1)?.as_str().to_uppercase();
        if stem == LONDON_FILE_KEY {
            return Some(SourceFile::Transactions {
                city: LONDON_CITY.to_string(),
                format: SourceFormat::LondonTransactions,
            });
        }
        return Some(SourceFile::Transactions {
            city: stem,
            format: SourceFormat::BarTransactions,
        });
    }

    if INVENTORY_FILE.is_match(file_name) {
        return Some(SourceFile::Inventory);
    }

    None
}
