//! Testing utilities and mock implementations.
//!
//! Mock versions of the external surfaces (the browser page and the
//! download directory) so the navigation, query and batch logic can be
//! exercised without a running browser.
//!
//! # Example
//!
//! ```rust,ignore
//! use harvester_core::testing::{MockPageDriver, MockStorageProbe};
//!
//! let driver = MockPageDriver::new();
//! driver.set_url("https://portal.example/consulta.xhtml#obligaciones");
//! driver.push_download("reporte.xls");
//!
//! let probe = MockStorageProbe::new();
//! probe.set_exists("/downloads/reporte.xls");
//! ```

mod mock_driver;
mod mock_probe;

pub use mock_driver::MockPageDriver;
pub use mock_probe::MockStorageProbe;
