//! Google Sheets adapter.
//!
//! Implements the `etb-core` SpreadsheetGateway over Sheets v4 + Drive v3,
//! authenticated as a service account.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub mod auth;

use etb_core::{
    config::ServiceAccount,
    domain::{ExpenseRow, SheetId, UserId},
    errors::{Error, GatewayError, GatewayResult},
    gateway::SpreadsheetGateway,
    Result,
};

use crate::auth::ServiceAccountAuth;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";
/// First sheet, columns Date | Category | Amount.
const DATA_RANGE: &str = "A:C";
pub const HEADER: [&str; 3] = ["Date", "Category", "Amount"];
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct GoogleSheetsGateway {
    http: reqwest::Client,
    auth: ServiceAccountAuth,
}

impl GoogleSheetsGateway {
    pub fn new(account: &ServiceAccount) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::External(format!("http client build error: {e}")))?;
        let auth = ServiceAccountAuth::new(account, http.clone())?;
        Ok(Self { http, auth })
    }

    pub fn service_account_email(&self) -> &str {
        self.auth.client_email()
    }

    /// Send an authorized request and return the JSON body (or `Null` for empty bodies).
    async fn send(&self, req: reqwest::RequestBuilder) -> std::result::Result<Value, String> {
        let token = self.auth.access_token().await?;
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| format!("request error: {e}"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| format!("response read error: {e}"))?;
        if !status.is_success() {
            return Err(format!(
                "{status} {}",
                body.chars().take(200).collect::<String>()
            ));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| format!("json error: {e}"))
    }

    async fn append_values(
        &self,
        sheet: &SheetId,
        values: Vec<Value>,
    ) -> std::result::Result<(), String> {
        let url = format!("{SHEETS_API}/{sheet}/values/{DATA_RANGE}:append");
        // RAW keeps category text from being evaluated as a formula.
        self.send(
            self.http
                .post(url)
                .query(&[
                    ("valueInputOption", "RAW"),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&json!({ "values": [values] })),
        )
        .await?;
        Ok(())
    }

    async fn share(
        &self,
        sheet: &SheetId,
        permission: Value,
        notify: bool,
    ) -> std::result::Result<(), String> {
        let url = format!("{DRIVE_API}/{sheet}/permissions");
        self.send(
            self.http
                .post(url)
                .query(&[("sendNotificationEmail", notify.to_string())])
                .json(&permission),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SpreadsheetGateway for GoogleSheetsGateway {
    async fn provision(&self, owner: &UserId, email: &str) -> GatewayResult<SheetId> {
        let title = sheet_title(owner, chrono::Utc::now().timestamp());
        debug!(user_id = %owner, title = %title, "creating spreadsheet");

        let created = self
            .send(
                self.http
                    .post(SHEETS_API)
                    .json(&json!({ "properties": { "title": title } })),
            )
            .await
            .map_err(GatewayError::Provision)?;
        let sheet = created
            .get("spreadsheetId")
            .and_then(Value::as_str)
            .map(SheetId::from)
            .ok_or_else(|| GatewayError::Provision("response missing spreadsheetId".to_string()))?;

        self.append_values(&sheet, HEADER.iter().map(|h| json!(h)).collect())
            .await
            .map_err(GatewayError::Provision)?;

        self.share(
            &sheet,
            json!({ "type": "user", "role": "writer", "emailAddress": email }),
            true,
        )
        .await
        .map_err(|e| GatewayError::Provision(format!("sharing with {email}: {e}")))?;

        if let Err(e) = self
            .share(&sheet, json!({ "type": "anyone", "role": "reader" }), false)
            .await
        {
            warn!(sheet_id = %sheet, error = %e, "could not enable link sharing");
        }

        Ok(sheet)
    }

    async fn append(&self, sheet: &SheetId, category: &str, amount: f64) -> GatewayResult<()> {
        let recorded_at = chrono::Local::now().format(DATE_FORMAT).to_string();
        self.append_values(sheet, vec![json!(recorded_at), json!(category), json!(amount)])
            .await
            .map_err(GatewayError::Append)
    }

    async fn read_all(&self, sheet: &SheetId) -> GatewayResult<Vec<ExpenseRow>> {
        let url = format!("{SHEETS_API}/{sheet}/values/{DATA_RANGE}");
        let body = self
            .send(
                self.http
                    .get(url)
                    .query(&[("valueRenderOption", "UNFORMATTED_VALUE")]),
            )
            .await
            .map_err(GatewayError::Read)?;
        Ok(parse_rows(&body))
    }

    fn sheet_url(&self, sheet: &SheetId) -> String {
        sheet_url(sheet)
    }
}

pub fn sheet_url(sheet: &SheetId) -> String {
    format!("https://docs.google.com/spreadsheets/d/{sheet}/edit")
}

pub fn sheet_title(owner: &UserId, unix_ts: i64) -> String {
    format!("ExpenseTracker_{owner}_{unix_ts}")
}

/// Convert a `values.get` response into rows, skipping the header row.
///
/// Rows without a numeric amount are skipped.
pub fn parse_rows(body: &Value) -> Vec<ExpenseRow> {
    let Some(rows) = body.get("values").and_then(Value::as_array) else {
        return Vec::new();
    };

    rows.iter()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, row)| {
            let cells = row.as_array()?;
            let parsed = parse_row(cells);
            if parsed.is_none() {
                warn!(row = idx + 1, "skipping malformed expense row");
            }
            parsed
        })
        .collect()
}

fn parse_row(cells: &[Value]) -> Option<ExpenseRow> {
    let recorded_at = cells.first().map(cell_text).unwrap_or_default();
    let category = cells.get(1).map(cell_text).unwrap_or_default();
    let amount = match cells.get(2)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !amount.is_finite() {
        return None;
    }
    Some(ExpenseRow {
        recorded_at,
        category,
        amount,
    })
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account() -> ServiceAccount {
        ServiceAccount {
            project_id: "proj".to_string(),
            private_key_id: "kid-123".to_string(),
            private_key: include_str!("../testdata/service_account_key.pem").to_string(),
            client_email: "bot@proj.iam.gserviceaccount.com".to_string(),
        }
    }

    #[test]
    fn parses_rows_and_skips_header() {
        let body = json!({
            "range": "Sheet1!A1:C3",
            "values": [
                ["Date", "Category", "Amount"],
                ["2026-10-18 09:00:00", "Food", 250],
                ["2026-10-18 10:00:00", "Gas", 45.5]
            ]
        });
        let rows = parse_rows(&body);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, "Food");
        assert_eq!(rows[0].amount, 250.0);
        assert_eq!(rows[1].recorded_at, "2026-10-18 10:00:00");
        assert_eq!(rows[1].amount, 45.5);
    }

    #[test]
    fn empty_sheet_has_no_rows() {
        assert!(parse_rows(&json!({ "range": "Sheet1!A1:C1" })).is_empty());
        assert!(parse_rows(&json!({ "values": [["Date", "Category", "Amount"]] })).is_empty());
        assert!(parse_rows(&Value::Null).is_empty());
    }

    #[test]
    fn amount_may_be_text() {
        let body = json!({ "values": [HEADER, ["d", "Food", " 12.5 "]] });
        assert_eq!(parse_rows(&body)[0].amount, 12.5);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let body = json!({
            "values": [
                HEADER,
                ["d", "Food"],
                ["d", "Food", "lots"],
                ["d", "Food", true],
                "not a row",
                ["d", "Rent", 1000]
            ]
        });
        let rows = parse_rows(&body);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Rent");
    }

    #[test]
    fn category_is_read_verbatim() {
        let body = json!({ "values": [HEADER, ["d", " food ", 1]] });
        assert_eq!(parse_rows(&body)[0].category, " food ");
    }

    #[test]
    fn builds_links_and_titles() {
        assert_eq!(
            sheet_url(&SheetId::from("abc123")),
            "https://docs.google.com/spreadsheets/d/abc123/edit"
        );
        assert_eq!(
            sheet_title(&UserId::from(42_i64), 1_700_000_000),
            "ExpenseTracker_42_1700000000"
        );
    }

    #[test]
    fn gateway_builds_from_valid_credentials() {
        let gw = GoogleSheetsGateway::new(&test_account()).unwrap();
        assert_eq!(
            gw.service_account_email(),
            "bot@proj.iam.gserviceaccount.com"
        );
        assert_eq!(
            SpreadsheetGateway::sheet_url(&gw, &SheetId::from("x")),
            "https://docs.google.com/spreadsheets/d/x/edit"
        );
    }
}
