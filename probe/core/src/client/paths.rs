pub const TRANSACTION_ANNOUNCE: &str = "/transaction";
pub const CHAIN_HEIGHT: &str = "/chain/height";

#[must_use]
pub fn account_transactions(public_key: &str) -> String {
    format!("/account/{public_key}/transactions")
}

#[must_use]
pub fn account_status_errors(address: &str) -> String {
    format!("/account/{address}/status-errors")
}
