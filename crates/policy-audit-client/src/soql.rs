//! Query text for the three record lookups the audit needs.

use policy_audit_core::PolicyRecord;

use crate::client::helpers::escape_literal;

/// Implementations carrying a policy number and partner, newest first.
pub fn policy_listing(limit: Option<u32>, offset: Option<u32>) -> String {
    let mut query = String::from(
        "SELECT Id, Rally_Launch_Year__c, Primary_Policy_Number__c, Partner_Name__c \
         FROM Milestone1_Project__c \
         WHERE Primary_Policy_Number__c <> '' AND Partner_Name__c <> '' \
         ORDER BY CreatedDate DESC",
    );
    if let Some(limit) = limit {
        query.push_str(&format!(" LIMIT {}", limit.max(1)));
    }
    if let Some(offset) = offset {
        query.push_str(&format!(" OFFSET {}", offset));
    }
    query
}

/// Implementations of one policy with their client affiliations.
pub fn implementations_for(policy: &PolicyRecord) -> String {
    format!(
        "SELECT Id, Rally_Launch_Year__c, \
         (SELECT Id, Segmentation_IDs__c FROM Client_Affiliations__r) \
         FROM Milestone1_Project__c \
         WHERE Primary_Policy_Number__c = '{}' AND Partner_Name__c = '{}' \
         ORDER BY Rally_Launch_Year__c DESC, CreatedDate DESC",
        escape_literal(&policy.policy_number),
        escape_literal(&policy.partner_name)
    )
}

/// Mapping records of one affiliation.
pub fn mappings_for(affiliation_id: &str) -> String {
    format!(
        "SELECT Identifier_Values__c FROM Affiliation_Mapping__c \
         WHERE Affiliation_Logic_Source__c = 'PVRC' AND Client_Affiliation__c = '{}'",
        escape_literal(affiliation_id)
    )
}
