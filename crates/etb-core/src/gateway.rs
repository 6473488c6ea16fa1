use async_trait::async_trait;

use crate::{
    domain::{ExpenseRow, SheetId, UserId},
    errors::GatewayResult,
};

/// Hexagonal port for the remote spreadsheet service.
///
/// Every call is a network round trip; nothing is cached, so each summary is
/// recomputed from the remote rows.
#[async_trait]
pub trait SpreadsheetGateway: Send + Sync {
    /// Create a sheet for `owner`, share it with `email`, return its id.
    async fn provision(&self, owner: &UserId, email: &str) -> GatewayResult<SheetId>;

    /// Append one row stamped with the current time.
    async fn append(&self, sheet: &SheetId, category: &str, amount: f64) -> GatewayResult<()>;

    /// All expense rows in sheet order (header excluded).
    async fn read_all(&self, sheet: &SheetId) -> GatewayResult<Vec<ExpenseRow>>;

    /// Browser link for a sheet.
    fn sheet_url(&self, sheet: &SheetId) -> String;
}
