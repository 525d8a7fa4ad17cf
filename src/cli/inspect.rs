//! Inspect command handler.

use color_eyre::Result;

use super::wiring::RequestHandler;
use super::App;

impl App {
    /// Wire the services, inject a request handler and print the registry.
    pub fn run_inspect(&self, json: bool) -> Result<()> {
        let (config, container) = self.build_container(false)?;
        if config.container.validate_on_start {
            container.validate_all()?;
        }

        let mut handler = RequestHandler::default();
        container.inject_struct(&mut handler)?;
        tracing::info!(
            environment = handler.settings.as_ref().map(|s| s.environment.as_str()),
            repository = handler.repository.is_some(),
            "Injected request handler"
        );

        let services = container.list_services();
        if json {
            println!("{}", serde_json::to_string_pretty(&services)?);
            return Ok(());
        }

        println!(
            "{:<48} {:<7} {:<8} {:<12}",
            "SERVICE", "KIND", "INVOKED", "MATERIALIZED"
        );
        for info in &services {
            println!(
                "{:<48} {:<7} {:<8} {:<12}",
                info.service, info.kind, info.invoked, info.materialized
            );
        }

        Ok(())
    }
}
