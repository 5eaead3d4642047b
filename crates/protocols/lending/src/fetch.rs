//! Lending State Fetching from Node
//!
//! Reads the contract's resources through a `ResourceReader` and normalizes
//! them into typed records.

use std::collections::BTreeMap;

use aptlend_core::{addresses_match, ContractConfig, ContractError, Error};
use aptos_node_client::ResourceReader;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::constants::resources;
use crate::state::{LoanOffer, LoanRequest, LoanStatus, PlatformConfig, RawLoanOffer, RawLoanRequest};

/// Parallel table lookups when enumerating loan requests
const TABLE_FETCH_CONCURRENCY: usize = 8;

/// Both maps as read in one fetch cycle
#[derive(Debug, Clone, Default)]
pub struct ContractSnapshot {
    pub offers: BTreeMap<String, LoanOffer>,
    pub loans: BTreeMap<String, LoanRequest>,
    pub fetched_at: DateTime<Utc>,
}

/// Read the `Offers` and `Loans` resources.
///
/// A resource that is not published yet reads as an empty map.
pub async fn fetch_snapshot(
    reader: &dyn ResourceReader,
    contract: &ContractConfig,
) -> Result<ContractSnapshot, Error> {
    let offers_type = contract.qualified(resources::OFFERS);
    let loans_type = contract.qualified(resources::LOANS);

    let (offers_data, loans_data) = futures::future::try_join(
        reader.read_resource(&contract.address, &offers_type),
        reader.read_resource(&contract.address, &loans_type),
    )
    .await?;

    let fetched_at = Utc::now();
    let stamp = fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut offers = BTreeMap::new();
    if let Some(data) = offers_data {
        for (key, value) in collection_entries(&data, "offers", resources::OFFERS)? {
            let raw = RawLoanOffer::from_value(&value);
            let Some(id) = key.or_else(|| raw.embedded_id()) else {
                tracing::debug!("Skipping offer without id");
                continue;
            };
            offers.insert(id.clone(), raw.normalize(&id, &stamp));
        }
    }

    let mut loans = BTreeMap::new();
    if let Some(data) = loans_data {
        for (key, value) in collection_entries(&data, "loans", resources::LOANS)? {
            let raw = RawLoanRequest::from_value(&value);
            let Some(id) = key.or_else(|| raw.embedded_id()) else {
                tracing::debug!("Skipping loan request without id");
                continue;
            };
            loans.insert(id.clone(), raw.normalize(&id, &stamp));
        }
    }

    Ok(ContractSnapshot {
        offers,
        loans,
        fetched_at,
    })
}

/// Key/value pairs of the collection field of a resource.
///
/// Accepts a JSON object keyed by id, a Move `SimpleMap`
/// (`{"data": [{"key", "value"}]}`) or a plain array of records. A `Table`
/// handle cannot be enumerated and yields nothing.
fn collection_entries(
    data: &Value,
    field: &str,
    resource: &str,
) -> Result<Vec<(Option<String>, Value)>, ContractError> {
    if !data.is_object() {
        return Err(ContractError::Decode {
            resource: resource.to_string(),
            message: "resource data is not an object".to_string(),
        });
    }

    let entries = match data.get(field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(|v| (None, v.clone())).collect(),
        Some(Value::Object(map)) => match map.get("data") {
            Some(Value::Array(pairs)) => pairs
                .iter()
                .map(|pair| {
                    let key = pair
                        .get("key")
                        .and_then(crate::state::json_string);
                    let value = pair.get("value").cloned().unwrap_or(Value::Null);
                    (key, value)
                })
                .collect(),
            _ if map.contains_key("handle") && map.len() == 1 => {
                tracing::debug!(resource = %resource, "Collection is a table handle, not enumerable");
                Vec::new()
            }
            _ => map
                .iter()
                .map(|(k, v)| (Some(k.clone()), v.clone()))
                .collect(),
        },
        Some(_) => {
            return Err(ContractError::Decode {
                resource: resource.to_string(),
                message: format!("'{}' is neither a map nor a list", field),
            })
        }
    };

    Ok(entries)
}

/// Read the `PlatformConfig` resource; `None` if the module is not initialized
pub async fn fetch_platform_config(
    reader: &dyn ResourceReader,
    contract: &ContractConfig,
) -> Result<Option<PlatformConfig>, Error> {
    let data = reader
        .read_resource(&contract.address, &contract.qualified(resources::PLATFORM_CONFIG))
        .await?;
    match data {
        Some(data) => Ok(Some(PlatformConfig::from_resource(&data)?)),
        None => Ok(None),
    }
}

/// Enumerate the `loan_requests` table by its sequential `u64` keys.
///
/// Keys that are missing from the table are skipped.
pub async fn fetch_requests_from_table(
    reader: &dyn ResourceReader,
    contract: &ContractConfig,
    config: &PlatformConfig,
) -> Result<Vec<LoanRequest>, Error> {
    let value_type = contract.qualified(resources::LOAN_REQUEST);
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let items: Vec<(u64, Option<Value>)> = stream::iter(0..config.total_requests)
        .map(|i| {
            let value_type = &value_type;
            async move {
                let item = reader
                    .read_table_item(
                        &config.loan_requests_handle,
                        resources::LOAN_REQUEST_KEY_TYPE,
                        value_type,
                        Value::String(i.to_string()),
                    )
                    .await?;
                Ok::<_, Error>((i, item))
            }
        })
        .buffered(TABLE_FETCH_CONCURRENCY)
        .try_collect()
        .await?;

    Ok(items
        .into_iter()
        .filter_map(|(i, item)| {
            let raw = RawLoanRequest::from_value(&item?);
            let id = raw.embedded_id().unwrap_or_else(|| i.to_string());
            Some(raw.normalize(&id, &stamp))
        })
        .collect())
}

/// Approved loans taken by `borrower`, read straight from the request table
pub async fn fetch_active_loans(
    reader: &dyn ResourceReader,
    contract: &ContractConfig,
    borrower: &str,
) -> Result<Vec<LoanRequest>, Error> {
    let Some(config) = fetch_platform_config(reader, contract).await? else {
        return Ok(Vec::new());
    };
    let requests = fetch_requests_from_table(reader, contract, &config).await?;
    Ok(requests
        .into_iter()
        .filter(|r| r.status == LoanStatus::Approved && addresses_match(&r.borrower, borrower))
        .collect())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use aptlend_core::NodeError;
    use async_trait::async_trait;
    use serde_json::Value;

    use aptos_node_client::ResourceReader;

    /// In-memory ledger keyed by resource type / table key
    #[derive(Default)]
    pub struct FakeLedger {
        pub resources: Mutex<HashMap<String, Value>>,
        pub table: Mutex<HashMap<String, Value>>,
        pub fail: Mutex<Option<String>>,
        pub reads: AtomicUsize,
    }

    impl FakeLedger {
        pub fn set_resource(&self, resource_type: &str, data: Value) {
            self.resources
                .lock()
                .unwrap()
                .insert(resource_type.to_string(), data);
        }

        pub fn set_failure(&self, message: Option<&str>) {
            *self.fail.lock().unwrap() = message.map(str::to_string);
        }

        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResourceReader for FakeLedger {
        async fn read_resource(
            &self,
            _address: &str,
            resource_type: &str,
        ) -> Result<Option<Value>, NodeError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = self.fail.lock().unwrap().clone() {
                return Err(NodeError::ApiError { message });
            }
            Ok(self.resources.lock().unwrap().get(resource_type).cloned())
        }

        async fn read_table_item(
            &self,
            _handle: &str,
            _key_type: &str,
            _value_type: &str,
            key: Value,
        ) -> Result<Option<Value>, NodeError> {
            let key = key.as_str().unwrap_or_default().to_string();
            Ok(self.table.lock().unwrap().get(&key).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeLedger;
    use super::*;
    use serde_json::json;

    fn contract() -> ContractConfig {
        ContractConfig {
            address: "0xc0ffee".to_string(),
            module_name: "lending".to_string(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_from_object_maps() {
        let ledger = FakeLedger::default();
        ledger.set_resource(
            "0xc0ffee::lending::Offers",
            json!({"offers": {"1": {"lender": "0x123", "amount": "5000000", "status": "open"}}}),
        );
        ledger.set_resource(
            "0xc0ffee::lending::Loans",
            json!({"loans": {"5": {"offer_id": "1", "borrower": "0x456", "status": 0}}}),
        );

        let snapshot = fetch_snapshot(&ledger, &contract()).await.unwrap();
        assert_eq!(snapshot.offers.len(), 1);
        assert_eq!(snapshot.offers["1"].amount, 5_000_000);
        assert_eq!(snapshot.loans["5"].borrower, "0x456");
        assert_eq!(snapshot.loans["5"].status, LoanStatus::Pending);
    }

    #[tokio::test]
    async fn test_snapshot_from_simple_map() {
        let ledger = FakeLedger::default();
        ledger.set_resource(
            "0xc0ffee::lending::Offers",
            json!({"offers": {"data": [
                {"key": "3", "value": {"lender": "0x1", "amount": 10}},
                {"key": 4, "value": {"lender": "0x2", "amount": 20}}
            ]}}),
        );

        let snapshot = fetch_snapshot(&ledger, &contract()).await.unwrap();
        assert_eq!(snapshot.offers.len(), 2);
        assert_eq!(snapshot.offers["4"].lender, "0x2");
        assert!(snapshot.loans.is_empty());
    }

    #[tokio::test]
    async fn test_missing_resources_are_empty() {
        let ledger = FakeLedger::default();
        let snapshot = fetch_snapshot(&ledger, &contract()).await.unwrap();
        assert!(snapshot.offers.is_empty());
        assert!(snapshot.loans.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_resource_is_an_error() {
        let ledger = FakeLedger::default();
        ledger.set_resource("0xc0ffee::lending::Offers", json!({"offers": 42}));
        let err = fetch_snapshot(&ledger, &contract()).await.unwrap_err();
        assert!(matches!(err, Error::Contract(ContractError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_active_loans_from_table() {
        let ledger = FakeLedger::default();
        ledger.set_resource(
            "0xc0ffee::lending::PlatformConfig",
            json!({"total_requests": "4", "loan_requests": {"handle": "0xfeed"}}),
        );
        {
            let mut table = ledger.table.lock().unwrap();
            table.insert("0".into(), json!({"borrower": "0x456", "status": 1, "loan_amount": "100"}));
            table.insert("1".into(), json!({"borrower": "0x456", "status": 0}));
            table.insert("2".into(), json!({"borrower": "0x789", "status": 1}));
            // key 3 missing
        }

        let loans = fetch_active_loans(&ledger, &contract(), "0x0456").await.unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].request_id, "0");
        assert_eq!(loans[0].loan_amount, 100);
    }

    #[tokio::test]
    async fn test_active_loans_without_platform_config() {
        let ledger = FakeLedger::default();
        let loans = fetch_active_loans(&ledger, &contract(), "0x1").await.unwrap();
        assert!(loans.is_empty());
    }
}
