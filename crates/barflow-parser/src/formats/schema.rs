pub const BAR_NAME: &str = "BAR_NAME";
pub const GLASS_NAME: &str = "GLASS_NAME";
pub const STOCK: &str = "STOCK";

pub const TRANS_TIME: &str = "TRANS_TIME";
pub const DRINK_NAME: &str = "DRINK_NAME";
pub const VALUE: &str = "VALUE";

pub const INVENTORY_COLUMNS: [&str; 3] = [BAR_NAME, GLASS_NAME, STOCK];

pub const TRANSACTION_COLUMNS: [&str; 3] = [TRANS_TIME, DRINK_NAME, VALUE];
