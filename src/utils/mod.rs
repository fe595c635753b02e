//! # Utility Modules
//!
//! - **Logging**: tracing-subscriber setup from configuration
//! - **Timeout**: async timeout wrapper and defaults

pub mod logging;
pub mod timeout;
