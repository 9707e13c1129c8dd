//! Remote presence value decoding.

use serde::Deserialize;
use serde_json::{Number, Value};

use pulse_core::types::{PresenceRecord, UserId};

/// Wire shape stored at `status/{user_id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemotePresence {
    is_online: bool,
    last_seen: Number,
}

/// Decode a remote value into a snapshot.
///
/// An absent value, a partial value, or a value of the wrong shape all
/// decode to the offline reset state.
pub fn decode_record(user_id: &UserId, value: Option<&Value>) -> PresenceRecord {
    let Some(value) = value else {
        return PresenceRecord::offline(user_id.clone());
    };

    let remote = match RemotePresence::deserialize(value) {
        Ok(remote) => remote,
        Err(e) => {
            tracing::debug!("Malformed presence value for '{}': {}", user_id, e);
            return PresenceRecord::offline(user_id.clone());
        }
    };

    let Some(last_seen) = as_timestamp(&remote.last_seen) else {
        tracing::debug!("Unusable lastSeen for '{}': {}", user_id, remote.last_seen);
        return PresenceRecord::offline(user_id.clone());
    };

    PresenceRecord {
        user_id: user_id.clone(),
        online: remote.is_online,
        last_seen: Some(last_seen),
    }
}

fn as_timestamp(n: &Number) -> Option<i64> {
    n.as_i64()
        .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> UserId {
        UserId::parse("u1").unwrap()
    }

    #[test]
    fn test_online_value() {
        let record = decode_record(&user(), Some(&json!({"isOnline": true, "lastSeen": 1700000000})));
        assert!(record.online);
        assert_eq!(record.last_seen, Some(1700000000));
    }

    #[test]
    fn test_float_timestamp_truncates() {
        let record = decode_record(&user(), Some(&json!({"isOnline": false, "lastSeen": 1700000000123.0})));
        assert!(!record.online);
        assert_eq!(record.last_seen, Some(1700000000123));
    }

    #[test]
    fn test_absent_resets() {
        assert!(decode_record(&user(), None).is_reset());
    }

    #[test]
    fn test_partial_and_malformed_reset() {
        for value in [
            json!({"isOnline": true}),
            json!({"lastSeen": 5}),
            json!({"isOnline": "yes", "lastSeen": 5}),
            json!({"isOnline": true, "lastSeen": null}),
            json!("online"),
            json!(null),
        ] {
            assert!(decode_record(&user(), Some(&value)).is_reset(), "{value}");
        }
    }
}
