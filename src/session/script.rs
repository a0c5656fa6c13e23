//! Vendor script passthrough.

use super::Session;
use crate::driver::{encode_wide, Driver};
use crate::Error;

impl<D: Driver> Session<D> {
    /// Forwards `script` verbatim to the vendor runtime.
    ///
    /// The text is opaque here: it is neither parsed, escaped nor
    /// validated. The runtime's status is returned unchanged, so `Ok`
    /// only means the script was delivered.
    pub fn execute_script(&self, script: &str) -> Result<i32, Error> {
        let mut link = self.ready_link_mut()?;
        let wide = encode_wide(script);
        let status = link.driver.execute_script(&wide)?;
        tracing::debug!(status, chars = wide.len() - 1, "executed vendor script");
        Ok(status)
    }
}
