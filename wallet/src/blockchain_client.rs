/// Ledger gateway client for the Horizon REST API
///
/// Loads account records and submits signed envelopes. The same client runs
/// natively (tokio) and in the browser (fetch), so the gateway trait is not
/// `Send`.
use crate::blockchain::{AccountRecord, Address, Amount, BalanceLine};
use crate::errors::{WalletError, WalletResult};
use crate::transaction::SignedEnvelope;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<u32>,
}

/// Read and write access to the ledger
#[async_trait(?Send)]
pub trait LedgerGateway {
    /// `Ok(None)` when the account does not exist yet.
    async fn load_account(&self, address: &Address) -> WalletResult<Option<AccountRecord>>;

    async fn submit(&self, envelope: &SignedEnvelope) -> WalletResult<SubmitResponse>;
}

/// Native balance of an account, zero when the account does not exist.
pub async fn fetch_balance<G: LedgerGateway + ?Sized>(
    gateway: &G,
    address: &Address,
) -> WalletResult<Amount> {
    Ok(gateway
        .load_account(address)
        .await?
        .map(|record| record.native_balance())
        .unwrap_or(Amount::ZERO))
}

/// HTTP client for a Horizon server
#[derive(Debug, Clone)]
pub struct HorizonClient {
    client: Client,
    base_url: String,
}

/// Account resource as served by Horizon
#[derive(Debug, Deserialize)]
struct HorizonAccount {
    account_id: String,
    sequence: String,
    #[serde(default)]
    balances: Vec<HorizonBalance>,
}

#[derive(Debug, Deserialize)]
struct HorizonBalance {
    asset_type: String,
    #[serde(default)]
    asset_code: Option<String>,
    balance: String,
}

/// Problem document returned on failures
#[derive(Debug, Default, Deserialize)]
struct HorizonProblem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    extras: Option<ProblemExtras>,
}

#[derive(Debug, Default, Deserialize)]
struct ProblemExtras {
    #[serde(default)]
    result_codes: Option<ResultCodes>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultCodes {
    #[serde(default)]
    transaction: Option<String>,
    #[serde(default)]
    operations: Vec<String>,
}

impl HorizonClient {
    /// Create a new Horizon client
    pub fn new(base_url: impl Into<String>) -> WalletResult<Self> {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(std::time::Duration::from_secs(30));

        let client = builder.build()?;

        Ok(HorizonClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait(?Send)]
impl LedgerGateway for HorizonClient {
    async fn load_account(&self, address: &Address) -> WalletResult<Option<AccountRecord>> {
        let url = format!("{}/accounts/{}", self.base_url, address);
        log::debug!("Loading account {}", address);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await?;

        if !status.is_success() {
            return Err(query_error(status.as_u16(), &body));
        }

        parse_account(&body).map(Some)
    }

    async fn submit(&self, envelope: &SignedEnvelope) -> WalletResult<SubmitResponse> {
        let url = format!("{}/transactions", self.base_url);
        log::info!("Submitting transaction {}", envelope.hash_hex());

        let response = self
            .client
            .post(&url)
            .form(&[("tx", envelope.xdr_base64())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = submit_error(status.as_u16(), &body);
            log::warn!("Submission rejected: {}", error);
            return Err(error);
        }

        serde_json::from_str(&body).map_err(|e| {
            WalletError::InvalidResponse(format!("Failed to parse submit response: {}", e))
        })
    }
}

fn parse_account(body: &str) -> WalletResult<AccountRecord> {
    let raw: HorizonAccount = serde_json::from_str(body)
        .map_err(|e| WalletError::InvalidResponse(format!("Failed to parse account: {}", e)))?;

    let account_id = Address::from_string(&raw.account_id)
        .map_err(|e| WalletError::InvalidResponse(format!("Account id: {}", e)))?;
    let sequence = raw
        .sequence
        .parse::<i64>()
        .map_err(|_| WalletError::InvalidResponse("Invalid sequence number".to_string()))?;

    let balances = raw
        .balances
        .into_iter()
        .map(|line| {
            let balance = Amount::from_string(&line.balance).map_err(|e| {
                WalletError::InvalidResponse(format!("Invalid balance {:?}: {}", line.balance, e))
            })?;
            Ok(BalanceLine {
                asset_type: line.asset_type,
                asset_code: line.asset_code,
                balance,
            })
        })
        .collect::<WalletResult<Vec<_>>>()?;

    Ok(AccountRecord {
        account_id,
        sequence,
        balances,
    })
}

fn parse_problem(body: &str) -> HorizonProblem {
    serde_json::from_str(body).unwrap_or_default()
}

fn query_error(status: u16, body: &str) -> WalletError {
    if status == 429 {
        return WalletError::NetworkError("Rate limited by Horizon, try again shortly".to_string());
    }
    let problem = parse_problem(body);
    let title = problem.title.unwrap_or_else(|| "Request failed".to_string());
    WalletError::NetworkError(format!("HTTP {}: {}", status, title))
}

fn submit_error(status: u16, body: &str) -> WalletError {
    if status == 429 {
        return WalletError::NetworkSubmitFailed(
            "Rate limited by Horizon, try again shortly".to_string(),
        );
    }

    let problem = parse_problem(body);
    let codes = problem
        .extras
        .and_then(|extras| extras.result_codes)
        .unwrap_or_default();

    let mut message = match codes.transaction.as_deref() {
        Some(code) => describe_result_code(code).to_string(),
        None => problem
            .title
            .or(problem.detail)
            .unwrap_or_else(|| format!("HTTP {}", status)),
    };

    let failed_ops: Vec<&str> = codes
        .operations
        .iter()
        .map(String::as_str)
        .filter(|code| *code != "op_success")
        .collect();
    if !failed_ops.is_empty() {
        let described: Vec<&str> = failed_ops.iter().map(|c| describe_result_code(c)).collect();
        message = format!("{} ({})", message, described.join(", "));
    }

    WalletError::NetworkSubmitFailed(message)
}

/// Human text for the result codes a payment can hit.
fn describe_result_code(code: &str) -> &str {
    match code {
        "tx_failed" => "Transaction failed",
        "tx_bad_seq" => "Sequence number is out of date",
        "tx_bad_auth" => "Missing or invalid signature",
        "tx_insufficient_balance" => "Balance too low to cover the fee",
        "tx_insufficient_fee" => "Fee too low",
        "tx_too_late" => "Transaction expired before it was submitted",
        "tx_too_early" => "Transaction is not valid yet",
        "tx_no_source_account" => "Source account does not exist",
        "op_underfunded" => "insufficient funds",
        "op_low_reserve" => "amount below the minimum account reserve",
        "op_no_destination" => "destination account does not exist",
        "op_already_exists" => "destination account already exists",
        "op_malformed" => "malformed operation",
        "op_line_full" => "destination cannot hold more",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(seed: u8) -> String {
        Address::from_public_key([seed; 32]).to_string()
    }

    #[test]
    fn parses_account_resource() {
        let body = serde_json::json!({
            "id": address(1),
            "account_id": address(1),
            "sequence": "4294967296",
            "subentry_count": 0,
            "balances": [
                { "balance": "12.5000000", "asset_type": "credit_alphanum4",
                  "asset_code": "USD", "asset_issuer": address(2) },
                { "balance": "100.0000000", "asset_type": "native" }
            ]
        })
        .to_string();

        let record = parse_account(&body).unwrap();
        assert_eq!(record.account_id.as_str(), address(1));
        assert_eq!(record.sequence, 4_294_967_296);
        assert_eq!(record.balances.len(), 2);
        assert_eq!(record.native_balance().stroops(), 1_000_000_000);
        assert_eq!(record.balances[0].asset_code.as_deref(), Some("USD"));
    }

    #[test]
    fn rejects_malformed_account() {
        let body = serde_json::json!({
            "account_id": address(1),
            "sequence": "not-a-number",
            "balances": []
        })
        .to_string();
        assert!(matches!(
            parse_account(&body),
            Err(WalletError::InvalidResponse(_))
        ));
        assert!(parse_account("<html>").is_err());
    }

    #[test]
    fn submit_problem_folds_result_codes() {
        let body = serde_json::json!({
            "type": "https://stellar.org/horizon-errors/transaction_failed",
            "title": "Transaction Failed",
            "status": 400,
            "extras": {
                "envelope_xdr": "AAAA",
                "result_codes": {
                    "transaction": "tx_failed",
                    "operations": ["op_underfunded"]
                }
            }
        })
        .to_string();

        match submit_error(400, &body) {
            WalletError::NetworkSubmitFailed(message) => {
                assert_eq!(message, "Transaction failed (insufficient funds)");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn submit_problem_without_codes_uses_title() {
        let body = r#"{"title":"Timeout","status":504}"#;
        assert_eq!(
            submit_error(504, body),
            WalletError::NetworkSubmitFailed("Timeout".to_string())
        );
        assert_eq!(
            submit_error(500, "not json"),
            WalletError::NetworkSubmitFailed("HTTP 500".to_string())
        );
    }

    #[test]
    fn rate_limiting_is_reported() {
        assert!(matches!(submit_error(429, ""), WalletError::NetworkSubmitFailed(m) if m.contains("Rate limited")));
        assert!(matches!(query_error(429, ""), WalletError::NetworkError(m) if m.contains("Rate limited")));
    }

    #[test]
    fn client_trims_base_url() {
        let client = HorizonClient::new("https://horizon-testnet.stellar.org/").unwrap();
        assert_eq!(client.base_url(), "https://horizon-testnet.stellar.org");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let client = HorizonClient::new("http://127.0.0.1:1").unwrap();
        let result = client
            .load_account(&Address::from_public_key([1; 32]))
            .await;
        assert!(
            matches!(&result, Err(WalletError::NetworkError(m)) if m.starts_with("HTTP request failed")),
            "got {:?}",
            result
        );
    }
}
