use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::LicenseError;

/// Fixed first segment of every key
pub const KEY_PREFIX: &str = "NOTHING";
/// Characters used in generated key groups; no 0/O or 1/I
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GROUPS: usize = 3;
const GROUP_LEN: usize = 4;

/// A license as stored by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    /// `NOTHING-XXXX-XXXX-XXXX`
    pub key: String,
    /// Devices activated so far
    #[serde(default)]
    pub usages: u32,
    /// Device limit
    pub max_usages: u32,
    /// Issue time
    pub created_at: DateTime<Utc>,
    /// Expiry, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Cleared by revocation
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Device ids holding an activation
    #[serde(default)]
    pub used_by: Vec<String>,
}

const fn default_active() -> bool {
    true
}

impl LicenseRecord {
    /// Fresh record with a random key
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Validation`] when the expiry falls outside the
    /// representable date range.
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        max_usages: u32,
        expires_in_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Self, LicenseError> {
        let expires_at = expires_in_days
            .map(|days| {
                Duration::try_days(i64::from(days))
                    .and_then(|delta| now.checked_add_signed(delta))
                    .ok_or_else(|| {
                        LicenseError::Validation(format!("expiry of {days} days is out of range"))
                    })
            })
            .transpose()?;
        Ok(Self {
            key: generate_key(rng),
            usages: 0,
            max_usages: max_usages.max(1),
            created_at: now,
            expires_at,
            is_active: true,
            used_by: Vec::new(),
        })
    }

    /// Past its expiry at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// `device` already holds an activation
    #[must_use]
    pub fn is_used_by(&self, device: &str) -> bool {
        self.used_by.iter().any(|d| d == device)
    }

    /// Every device slot is taken
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.usages >= self.max_usages
    }
}

/// Random key in the canonical format
pub fn generate_key<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut key = String::from(KEY_PREFIX);
    for _ in 0..GROUPS {
        key.push('-');
        for _ in 0..GROUP_LEN {
            let idx = rng.gen_range(0..KEY_ALPHABET.len());
            key.push(char::from(KEY_ALPHABET[idx]));
        }
    }
    key
}

/// Trim and uppercase user input
#[must_use]
pub fn normalize_key(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

/// `NOTHING-` followed by three groups of four uppercase letters or digits
#[must_use]
pub fn is_well_formed(key: &str) -> bool {
    let mut parts = key.split('-');
    if parts.next() != Some(KEY_PREFIX) {
        return false;
    }
    let groups: Vec<&str> = parts.collect();
    groups.len() == GROUPS
        && groups.iter().all(|g| {
            g.len() == GROUP_LEN
                && g.bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generated_keys_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let key = generate_key(&mut rng);
            assert!(is_well_formed(&key), "{key}");
        }
    }

    #[test]
    fn format_check() {
        assert!(is_well_formed("NOTHING-AB12-CD34-EF56"));
        assert!(!is_well_formed("NOTHING-AB12-CD34"));
        assert!(!is_well_formed("NOTHING-ab12-CD34-EF56"));
        assert!(!is_well_formed("SOMETHING-AB12-CD34-EF56"));
        assert!(!is_well_formed("NOTHING-AB12-CD34-EF56-GH78"));
        assert!(is_well_formed(&normalize_key("  nothing-ab12-cd34-ef56\n")));
    }

    #[test]
    fn expiry_and_limits() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut record = LicenseRecord::generate(&mut rng, 0, Some(30), now).unwrap();
        assert_eq!(record.max_usages, 1);
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::days(31)));
        assert!(!record.is_exhausted());
        record.usages = 1;
        assert!(record.is_exhausted());
    }

    #[test]
    fn far_future_expiry_is_rejected() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(2);
        let err = LicenseRecord::generate(&mut rng, 1, Some(u32::MAX), now).unwrap_err();
        assert!(matches!(err, LicenseError::Validation(_)), "{err}");

        let record = LicenseRecord::generate(&mut rng, 1, None, now).unwrap();
        assert!(record.expires_at.is_none());
    }

    #[test]
    fn record_json_shape() {
        let json = serde_json::json!({
            "key": "NOTHING-AB12-CD34-EF56",
            "maxUsages": 3,
            "createdAt": "2026-01-01T00:00:00Z"
        });
        let record: LicenseRecord = serde_json::from_value(json).unwrap();
        assert!(record.is_active);
        assert_eq!(record.usages, 0);
        assert!(record.used_by.is_empty());
    }
}
