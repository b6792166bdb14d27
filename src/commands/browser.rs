//! System browser integration.

use tracing::{error, info};
use crate::error::RelayError;

/// Open a URL in the system's default browser
pub fn open_browser(url: &str) -> Result<(), RelayError> {
    info!("Opening browser for Google consent");
    match open::that(url) {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(error = %e, "Failed to open browser");
            Err(RelayError::Io(e))
        }
    }
}
