pub mod errors;
pub mod formats;
pub mod model;
mod normalize;
mod registry;

pub use errors::{CleanError, ParserError};
pub use formats::schema;
pub use formats::{
    classify_file_name, FieldMap, Layout, RecordCategory, SourceFile, SourceFormat,
    BAR_INVENTORY_FIELDS, BAR_TRANSACTION_FIELDS,
};
pub use formats::{
    clean_glass_name, clean_name, clean_stock, clean_timestamp, clean_value,
    GLASS_NAME_CORRECTIONS,
};
pub use model::{NormalizedTable, RawTable};
pub use normalize::{normalize, read_raw_table};
pub use registry::{inventory_frame, parse_source_file, transaction_frame};
