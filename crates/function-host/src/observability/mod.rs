//! Observability for the function host.
//!
//! Provides metrics definitions, the Prometheus recorder setup and the
//! default log filter.

pub mod logging;
pub mod metrics;
