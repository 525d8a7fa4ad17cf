//! Validate command handler.

use color_eyre::{eyre::eyre, Result};

use super::App;
use crate::error::DiError;

impl App {
    /// Build every lazy service and report the failures.
    pub fn run_validate(&self, broken: bool) -> Result<()> {
        let (_, container) = self.build_container(broken)?;

        match container.validate_all() {
            Ok(()) => {
                println!("All {} service(s) built successfully", container.len());
                Ok(())
            }
            Err(DiError::Validation { failures }) => {
                for failure in &failures {
                    tracing::error!(error = %failure, "Service failed validation");
                    eprintln!("  {failure}");
                }
                Err(eyre!("{} service(s) failed validation", failures.len()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
