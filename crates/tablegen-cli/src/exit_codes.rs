//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

#![allow(dead_code)]

/// Success - every template rendered
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Load error - the data document is missing or malformed
pub const LOAD_ERROR: i32 = 2;

/// Template error - at least one template failed to render or write
pub const TEMPLATE_ERROR: i32 = 3;

/// Discovery error - the template root cannot be scanned
pub const DISCOVERY_ERROR: i32 = 4;

/// Config error - invalid tablegen.yaml (following sysexits.h EX_CONFIG)
pub const CONFIG_ERROR: i32 = 78;
