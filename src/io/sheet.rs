use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{RegistryError, Result};

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
const SPREADSHEET_URL: &str = "https://docs.google.com/spreadsheets/d/";

/// Worksheet listing of a spreadsheet, as returned by the Sheets API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpreadsheetMetadata {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

impl SpreadsheetMetadata {
    /// Looks up the grid identifier of the worksheet with the given title.
    pub fn sheet_id(&self, title: &str) -> Option<i64> {
        self.sheets
            .iter()
            .find(|sheet| sheet.properties.title == title)
            .map(|sheet| sheet.properties.sheet_id)
    }
}

/// Access to a remote spreadsheet. Implementations own authentication and
/// transport.
pub trait SheetClient {
    /// Fetches the worksheet listing of the spreadsheet.
    fn fetch_metadata(&self, spreadsheet_id: &str) -> Result<SpreadsheetMetadata>;

    /// Exports one worksheet as CSV bytes.
    fn export_csv(&self, spreadsheet_id: &str, sheet_id: i64) -> Result<Vec<u8>>;
}

/// Bearer token decoded from the base64 credential handed to the CLI.
#[derive(Clone)]
pub struct SheetCredential {
    token: String,
}

#[derive(Deserialize)]
struct TokenDocument {
    access_token: String,
}

impl SheetCredential {
    /// Decodes a base64 credential. The payload is either a JSON document
    /// carrying an `access_token` or the token itself.
    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = STANDARD.decode(encoded.trim())?;
        let token = match serde_json::from_slice::<TokenDocument>(&bytes) {
            Ok(document) => document.access_token,
            Err(_) => String::from_utf8_lossy(&bytes).trim().to_string(),
        };
        if token.is_empty() {
            return Err(RegistryError::Config(
                "spreadsheet credential carries no token".into(),
            ));
        }
        Ok(Self { token })
    }
}

impl std::fmt::Debug for SheetCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SheetCredential(..)")
    }
}

/// [`SheetClient`] backed by the Google Sheets HTTP endpoints.
#[derive(Debug)]
pub struct HttpSheetClient {
    client: Client,
    credential: SheetCredential,
}

impl HttpSheetClient {
    pub fn new(credential: SheetCredential) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, credential })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.credential.token))
            .send()?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "spreadsheet request completed");
        if !status.is_success() {
            return Err(RegistryError::SheetStatus {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl SheetClient for HttpSheetClient {
    #[instrument(level = "debug", skip(self))]
    fn fetch_metadata(&self, spreadsheet_id: &str) -> Result<SpreadsheetMetadata> {
        let url = format!("{SHEETS_API_URL}{spreadsheet_id}?fields=sheets.properties");
        let body = self.get(&url)?.bytes()?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[instrument(level = "debug", skip(self))]
    fn export_csv(&self, spreadsheet_id: &str, sheet_id: i64) -> Result<Vec<u8>> {
        let url = format!("{SPREADSHEET_URL}{spreadsheet_id}/export?format=csv&gid={sheet_id}");
        Ok(self.get(&url)?.bytes()?.to_vec())
    }
}
