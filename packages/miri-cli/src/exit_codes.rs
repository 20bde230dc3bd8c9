pub const SUCCESS: i32 = 0;
pub const USAGE_ERROR: i32 = 1;
pub const EXECUTION_ERROR: i32 = 2;
