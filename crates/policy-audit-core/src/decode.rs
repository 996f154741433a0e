//! Per-record decoding of raw result sets.
//!
//! A record that fails to decode is reported and skipped; its siblings still
//! decode. Nothing past this module touches untyped JSON.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{
    ImplementationRecord, ImplementationWire, ListingRecord, MappingRecord, PolicyRecord,
    ResultSet,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record {index}: {message}")]
pub struct DecodeError {
    pub index: usize,
    pub message: String,
}

/// Decoded records plus the records that could not be decoded.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub errors: Vec<DecodeError>,
}

impl<T> Decoded<T> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn decode_each<W, T>(raw: &ResultSet<Value>, convert: impl Fn(W) -> T) -> Decoded<T>
where
    W: DeserializeOwned,
{
    let mut records = Vec::with_capacity(raw.records.len());
    let mut errors = Vec::new();

    for (index, value) in raw.records.iter().enumerate() {
        match W::deserialize(value) {
            Ok(wire) => records.push(convert(wire)),
            Err(e) => {
                tracing::debug!(index, error = %e, "skipping malformed record");
                errors.push(DecodeError {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    Decoded { records, errors }
}

/// Decode the policy listing row by row, one row per implementation.
pub fn decode_listing(raw: &ResultSet<Value>) -> Decoded<ListingRecord> {
    decode_each::<ListingRecord, ListingRecord>(raw, |row| row)
}

/// Distinct (policy, partner) pairs of the listing rows, in first-seen order.
///
/// The listing has one row per implementation, so the same policy shows up
/// once per launch year.
pub fn distinct_policies(rows: impl IntoIterator<Item = ListingRecord>) -> Vec<PolicyRecord> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .map(PolicyRecord::from)
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

pub fn decode_implementations(raw: &ResultSet<Value>) -> Decoded<ImplementationRecord> {
    decode_each::<ImplementationWire, ImplementationRecord>(raw, ImplementationRecord::from)
}

pub fn decode_mappings(raw: &ResultSet<Value>) -> Decoded<MappingRecord> {
    decode_each::<MappingRecord, MappingRecord>(raw, |m| m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AffiliationRecord, LaunchYear};
    use serde_json::json;

    fn raw(records: Vec<Value>) -> ResultSet<Value> {
        ResultSet::from_records(records)
    }

    #[test]
    fn test_distinct_policies_dedupes_and_cleans() {
        let listing = raw(vec![
            json!({"Id": "1", "Rally_Launch_Year__c": "2020", "Primary_Policy_Number__c": "P1\u{00a0}", "Partner_Name__c": "Acme"}),
            json!({"Id": "2", "Rally_Launch_Year__c": "2019", "Primary_Policy_Number__c": "P1", "Partner_Name__c": "Acme"}),
            json!({"Id": "3", "Rally_Launch_Year__c": "2019", "Primary_Policy_Number__c": "P2", "Partner_Name__c": "Acme"}),
        ]);

        let decoded = decode_listing(&listing);
        assert!(decoded.is_clean());
        assert_eq!(
            distinct_policies(decoded.records),
            vec![PolicyRecord::new("P1", "Acme"), PolicyRecord::new("P2", "Acme")]
        );
    }

    #[test]
    fn test_decode_listing_keeps_row_context() {
        let listing = raw(vec![
            json!({"Id": "I1", "Rally_Launch_Year__c": 2020, "Primary_Policy_Number__c": "P1", "Partner_Name__c": "Acme"}),
            json!({"Primary_Policy_Number__c": "P1", "Partner_Name__c": "Acme"}),
        ]);

        let decoded = decode_listing(&listing);
        assert!(decoded.is_clean());
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].id.as_deref(), Some("I1"));
        assert_eq!(decoded.records[0].launch_year, LaunchYear::from(2020));
        assert_eq!(decoded.records[1].id, None);
        assert_eq!(decoded.records[1].launch_year, LaunchYear::unset());

        assert_eq!(
            distinct_policies(decoded.records),
            vec![PolicyRecord::new("P1", "Acme")]
        );
    }

    #[test]
    fn test_decode_keeps_siblings_of_malformed_record() {
        let implementations = raw(vec![
            json!({"Rally_Launch_Year__c": "2020"}),
            json!({"Id": "I2", "Rally_Launch_Year__c": "2019", "Client_Affiliations__r": null}),
        ]);

        let decoded = decode_implementations(&implementations);
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].id, "I2");
        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.errors[0].index, 0);
        assert!(decoded.errors[0].message.contains("Id"));
    }

    #[test]
    fn test_decode_keeps_first_page_of_partial_affiliations() {
        let implementations = raw(vec![json!({
            "Id": "I1",
            "Rally_Launch_Year__c": "2021",
            "Client_Affiliations__r": {
                "totalSize": 3,
                "done": false,
                "nextRecordsUrl": "/services/data/v52.0/query/01g-2000",
                "records": [{"Id": "A1", "Segmentation_IDs__c": "S1"}]
            }
        })]);

        let decoded = decode_implementations(&implementations);
        assert!(decoded.is_clean());
        assert_eq!(
            decoded.records[0].affiliations,
            vec![AffiliationRecord::new(Some("A1"), Some("S1"))]
        );
    }

    #[test]
    fn test_decode_mapping_requires_identifier_values() {
        let mappings = raw(vec![json!({"Identifier_Values__c": null})]);
        let decoded = decode_mappings(&mappings);
        assert!(decoded.records.is_empty());
        assert_eq!(decoded.errors.len(), 1);
    }
}
