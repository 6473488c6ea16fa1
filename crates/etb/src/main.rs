use std::sync::Arc;

use etb_core::{
    config::Config,
    gateway::SpreadsheetGateway,
    registry::{JsonFileRegistry, UserRegistry},
};
use etb_sheets::GoogleSheetsGateway;

#[tokio::main]
async fn main() -> Result<(), etb_core::Error> {
    etb_core::logging::init("etb")?;

    let cfg = Arc::new(Config::load()?);

    // Corrupt registry or bad credentials stop us before serving.
    let registry: Arc<dyn UserRegistry> = Arc::new(JsonFileRegistry::load(&cfg.registry_path)?);
    let sheets = GoogleSheetsGateway::new(&cfg.service_account)?;
    tracing::info!(
        service_account = sheets.service_account_email(),
        project_id = %cfg.service_account.project_id,
        "spreadsheet credentials loaded"
    );
    let gateway: Arc<dyn SpreadsheetGateway> = Arc::new(sheets);

    etb_telegram::router::run_polling(cfg, registry, gateway)
        .await
        .map_err(|e| etb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
