//! Experiment ids: creation time plus a content hash of the protocol.

use chrono::{DateTime, Local, Utc};
use rf_protocol::Protocol;
use sha2::{Digest, Sha256};

use crate::ResultsResult;
use crate::types::ExperimentId;

/// First 32 bits of the SHA-256 of `canonical`, as 8 hex digits.
pub fn protocol_hash(canonical: &str) -> String {
    let digest = Sha256::digest(canonical.as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

/// `YYYY_MM_DD_HH_MM_SS_<hash>`, with the time in the local zone.
pub fn compute_experiment_id(canonical: &str, created: DateTime<Utc>) -> ExperimentId {
    let stamp = created.with_timezone(&Local).format("%Y_%m_%d_%H_%M_%S");
    format!("{stamp}_{}", protocol_hash(canonical))
}

pub fn experiment_id(protocol: &Protocol<'_>, created: DateTime<Utc>) -> ResultsResult<ExperimentId> {
    Ok(compute_experiment_id(&protocol.canonical_json()?, created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hash_stability() {
        let text = r#"[{"component":"P1","params":{"rate":"10 mL/min"},"start":null,"stop":300.0}]"#;
        assert_eq!(protocol_hash(text), protocol_hash(text));
        assert_eq!(protocol_hash(text).len(), 8);
        assert!(protocol_hash(text).chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        assert_ne!(protocol_hash("[]"), protocol_hash("[{}]"));
    }

    #[test]
    fn same_second_same_id() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();
        let a = compute_experiment_id("[]", created);
        let b = compute_experiment_id("[]", created);
        assert_eq!(a, b);

        let (stamp, hash) = a.rsplit_once('_').unwrap();
        assert_eq!(hash, protocol_hash("[]"));
        assert_eq!(stamp.split('_').count(), 6);
        assert!(stamp.starts_with("2026_03_0"));
    }
}
