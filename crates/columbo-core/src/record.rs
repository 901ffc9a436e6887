//! The verification record: one per attributed connection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::Verdict;

/// Column names, in display/CSV order.
pub const FIELD_NAMES: [&str; 8] = [
    "name",
    "claimedIP",
    "actualIP",
    "ipMismatch",
    "claimedFQDN",
    "actualFQDN",
    "fqdnMismatch",
    "url",
];

/// What we saw when a resource was fetched: claimed vs actual endpoint identity.
///
/// Fields are private so a record cannot be edited after it is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    name: String,
    #[serde(rename = "claimedIP")]
    claimed_ip: String,
    #[serde(rename = "actualIP")]
    actual_ip: String,
    #[serde(rename = "ipMismatch")]
    ip_mismatch: bool,
    #[serde(rename = "claimedFQDN")]
    claimed_fqdn: String,
    #[serde(rename = "actualFQDN")]
    actual_fqdn: String,
    #[serde(rename = "fqdnMismatch")]
    fqdn_mismatch: bool,
    url: String,
}

impl VerificationRecord {
    /// Build a record; the mismatch flags come from `verdict`, which the caller computed
    /// from the same four identity strings.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        claimed_ip: impl Into<String>,
        actual_ip: impl Into<String>,
        claimed_fqdn: impl Into<String>,
        actual_fqdn: impl Into<String>,
        verdict: Verdict,
    ) -> Self {
        Self {
            name: name.into(),
            claimed_ip: claimed_ip.into(),
            actual_ip: actual_ip.into(),
            ip_mismatch: verdict.ip_mismatch,
            claimed_fqdn: claimed_fqdn.into(),
            actual_fqdn: actual_fqdn.into(),
            fqdn_mismatch: verdict.fqdn_mismatch,
            url: url.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn claimed_ip(&self) -> &str {
        &self.claimed_ip
    }

    pub fn actual_ip(&self) -> &str {
        &self.actual_ip
    }

    pub fn ip_mismatch(&self) -> bool {
        self.ip_mismatch
    }

    pub fn claimed_fqdn(&self) -> &str {
        &self.claimed_fqdn
    }

    pub fn actual_fqdn(&self) -> &str {
        &self.actual_fqdn
    }

    pub fn fqdn_mismatch(&self) -> bool {
        self.fqdn_mismatch
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Field values as text, aligned with [`FIELD_NAMES`].
    pub fn values(&self) -> [String; 8] {
        [
            self.name.clone(),
            self.claimed_ip.clone(),
            self.actual_ip.clone(),
            self.ip_mismatch.to_string(),
            self.claimed_fqdn.clone(),
            self.actual_fqdn.clone(),
            self.fqdn_mismatch.to_string(),
            self.url.clone(),
        ]
    }
}

impl fmt::Display for VerificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource(")?;
        for (i, (field, value)) in FIELD_NAMES.iter().zip(self.values()).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", field, value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn cdn_record() -> VerificationRecord {
        let verdict = classify("1.2.3.4", "5.6.7.8", "cdn.example.net", "edge01.cdnprovider.net");
        VerificationRecord::new(
            "app.js",
            "https://cdn.example.net/app.js",
            "1.2.3.4",
            "5.6.7.8",
            "cdn.example.net",
            "edge01.cdnprovider.net",
            verdict,
        )
    }

    #[test]
    fn display_follows_field_order() {
        assert_eq!(
            cdn_record().to_string(),
            "Resource(name=app.js, claimedIP=1.2.3.4, actualIP=5.6.7.8, ipMismatch=true, \
             claimedFQDN=cdn.example.net, actualFQDN=edge01.cdnprovider.net, \
             fqdnMismatch=true, url=https://cdn.example.net/app.js)"
        );
    }

    #[test]
    fn json_uses_field_names() {
        let value = serde_json::to_value(cdn_record()).unwrap();
        let obj = value.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        for name in FIELD_NAMES {
            assert!(keys.contains(&name), "missing {}", name);
        }
        assert_eq!(obj["actualIP"], "5.6.7.8");
        assert_eq!(obj["ipMismatch"], true);
    }
}
