//! Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet.
//!
//! Value reads and range writes go through the `sheets` crate. Appending rows and structural
//! changes (deleting rows, adding a sheet) are sent to the REST API directly with `reqwest`.

use crate::api::{A1Range, Sheet, SheetRange, TokenProvider};
use crate::Result;
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use serde_json::json;
use sheets::types::{
    BatchUpdateValuesRequest, DateTimeRenderOption, Dimension, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use tracing::trace;
use url::Url;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Implements the `Sheet` trait against one spreadsheet. It takes a `TokenProvider`, which it asks
/// for a current access token before every call.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetSheets {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl GoogleSheet {
    pub(super) fn new(spreadsheet_id: impl Into<String>, token_provider: TokenProvider) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            token_provider,
            http: reqwest::Client::new(),
        }
    }

    /// Creates a sheets client carrying a current access token.
    async fn client(&mut self) -> Result<sheets::Client> {
        let access_token = self.token_provider.token().await?;
        // The sheets crate asks for OAuth app details that are only needed for its own refresh
        // flow, which is not used here.
        Ok(sheets::Client::new(
            String::new(),
            String::new(),
            String::new(),
            access_token,
            String::new(),
        ))
    }

    /// `https://sheets.googleapis.com/v4/spreadsheets/{id}/{segments...}`
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API).context("Bad Sheets API base URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("The Sheets API URL cannot take path segments"))?
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    /// Sends `request` with a bearer token and fails on any non-success status.
    async fn send(
        &mut self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response> {
        let token = self.token_provider.token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to send the {what} request to Google Sheets"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("Google Sheets {what} failed with status {status}: {body}");
        }
        Ok(response)
    }

    /// Sends a `spreadsheets.batchUpdate` holding the given requests.
    async fn batch_update(&mut self, requests: serde_json::Value, what: &str) -> Result<()> {
        let url = self.url(&[])?;
        let url = Url::parse(&format!("{url}:batchUpdate"))
            .context("Bad Sheets API batchUpdate URL")?;
        let request = self
            .http
            .post(url)
            .json(&json!({ "requests": requests }));
        self.send(request, what).await?;
        Ok(())
    }

    /// Finds the numeric id of the sheet called `sheet_name`.
    async fn sheet_id(&mut self, sheet_name: &str) -> Result<i64> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let request = self.http.get(url);
        let body: SpreadsheetSheets = self
            .send(request, "sheet lookup")
            .await?
            .json()
            .await
            .context("Failed to parse the spreadsheet properties")?;
        body.sheets
            .into_iter()
            .find(|s| s.properties.title == sheet_name)
            .map(|s| s.properties.sheet_id)
            .with_context(|| format!("The spreadsheet has no sheet named '{sheet_name}'"))
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn get(&mut self, range: &A1Range) -> Result<Vec<Vec<String>>> {
        trace!("get {range}");
        let client = self.client().await?;
        let response = client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range.to_string(),
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {range}"))?;
        Ok(response.body.values)
    }

    async fn append(&mut self, range: &A1Range, rows: &[Vec<String>]) -> Result<()> {
        trace!("append {} rows to {range}", rows.len());
        let mut url = self.url(&["values", &format!("{range}:append")])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let request = self.http.post(url).json(&json!({
            "range": range.to_string(),
            "majorDimension": "ROWS",
            "values": rows,
        }));
        self.send(request, "append").await?;
        Ok(())
    }

    async fn write_ranges(&mut self, data: &[SheetRange]) -> Result<()> {
        trace!("write {} ranges", data.len());
        let client = self.client().await?;
        let value_ranges: Vec<ValueRange> = data
            .iter()
            .map(|sr| ValueRange {
                major_dimension: Some(Dimension::Rows),
                range: sr.range.to_string(),
                values: sr.values.clone(),
            })
            .collect();

        let request = BatchUpdateValuesRequest {
            data: value_ranges,
            include_values_in_response: Some(false),
            response_date_time_render_option: None,
            response_value_render_option: None,
            value_input_option: Some(ValueInputOption::UserEntered),
        };

        client
            .spreadsheets()
            .values_batch_update(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .context("Failed to write ranges")?;
        Ok(())
    }

    async fn delete_rows(&mut self, sheet_name: &str, start: usize, end: usize) -> Result<()> {
        trace!("delete rows {start}..{end} from {sheet_name}");
        let sheet_id = self.sheet_id(sheet_name).await?;
        let requests = json!([{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": start,
                    "endIndex": end,
                }
            }
        }]);
        self.batch_update(requests, "row delete").await
    }

    async fn add_sheet(&mut self, sheet_name: &str, hidden: bool) -> Result<()> {
        trace!("add sheet {sheet_name}");
        let requests = json!([{
            "addSheet": {
                "properties": {
                    "title": sheet_name,
                    "hidden": hidden,
                    "gridProperties": { "rowCount": 1, "columnCount": 1 },
                }
            }
        }]);
        self.batch_update(requests, "add sheet").await
    }
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}
