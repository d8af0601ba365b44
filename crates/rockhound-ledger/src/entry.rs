//! Validated construction of score ledger rows.

use chrono::Utc;
use rockhound_types::{ScoreEntry, ScoreEntryId, ScoreEntryKind};
use uuid::Uuid;

use crate::LedgerError;

/// Builder for [`ScoreEntry`] values.
///
/// Enforces a non-zero delta with the right sign for its kind, and a
/// resulting balance that stays non-negative.
///
/// # Examples
///
/// ```
/// use rockhound_ledger::ScoreEntryBuilder;
/// use rockhound_types::ScoreEntryKind;
///
/// let entry = ScoreEntryBuilder::new(ScoreEntryKind::Purchase, 1200)
///     .delta(-750)
///     .reason("Precision Loupe".to_owned())
///     .build();
///
/// assert_eq!(entry.map(|e| e.balance_after).ok(), Some(450));
/// ```
#[derive(Debug)]
pub struct ScoreEntryBuilder {
    kind: ScoreEntryKind,
    balance_before: u64,
    delta: Option<i64>,
    reason: Option<String>,
    reference_id: Option<Uuid>,
}

impl ScoreEntryBuilder {
    /// Start a row of `kind` against the current balance.
    pub const fn new(kind: ScoreEntryKind, balance_before: u64) -> Self {
        Self {
            kind,
            balance_before,
            delta: None,
            reason: None,
            reference_id: None,
        }
    }

    /// Set the signed change.
    #[must_use]
    pub const fn delta(mut self, delta: i64) -> Self {
        self.delta = Some(delta);
        self
    }

    /// Set the human-readable reason.
    #[must_use]
    pub fn reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Link the row to a related record.
    #[must_use]
    pub const fn reference_id(mut self, id: Uuid) -> Self {
        self.reference_id = Some(id);
        self
    }

    /// Validate inputs and produce a [`ScoreEntry`].
    pub fn build(self) -> Result<ScoreEntry, LedgerError> {
        let delta = self.delta.ok_or(LedgerError::MissingField("delta"))?;
        let reason = self.reason.ok_or(LedgerError::MissingField("reason"))?;

        if delta == 0 {
            return Err(LedgerError::ZeroDelta);
        }
        validate_sign(self.kind, delta)?;

        let balance_after = self
            .balance_before
            .checked_add_signed(delta)
            .ok_or(LedgerError::Overdraft {
                balance: self.balance_before,
                delta,
            })?;

        Ok(ScoreEntry {
            id: ScoreEntryId::new(),
            kind: self.kind,
            delta,
            balance_after,
            reason,
            reference_id: self.reference_id,
            created_at: Utc::now(),
        })
    }
}

const fn validate_sign(kind: ScoreEntryKind, delta: i64) -> Result<(), LedgerError> {
    let ok = match kind {
        ScoreEntryKind::AchievementBonus => delta > 0,
        ScoreEntryKind::Purchase => delta < 0,
        ScoreEntryKind::Opening
        | ScoreEntryKind::Identification
        | ScoreEntryKind::TradeSettlement => true,
    };
    if ok {
        Ok(())
    } else {
        Err(LedgerError::InvalidSign { kind, delta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_valid_bonus() {
        let entry = ScoreEntryBuilder::new(ScoreEntryKind::AchievementBonus, 50)
            .delta(50)
            .reason("first-find".to_owned())
            .build();
        assert_eq!(entry.map(|e| e.balance_after).ok(), Some(100));
    }

    #[test]
    fn zero_delta_rejected() {
        let result = ScoreEntryBuilder::new(ScoreEntryKind::Identification, 10)
            .delta(0)
            .reason("noop".to_owned())
            .build();
        assert_eq!(result.err(), Some(LedgerError::ZeroDelta));
    }

    #[test]
    fn overdraft_rejected() {
        let result = ScoreEntryBuilder::new(ScoreEntryKind::TradeSettlement, 10)
            .delta(-45)
            .reason("trade".to_owned())
            .build();
        assert_eq!(
            result.err(),
            Some(LedgerError::Overdraft {
                balance: 10,
                delta: -45
            })
        );
    }

    #[test]
    fn purchase_must_be_negative() {
        let result = ScoreEntryBuilder::new(ScoreEntryKind::Purchase, 1000)
            .delta(750)
            .reason("refund?".to_owned())
            .build();
        assert!(matches!(result, Err(LedgerError::InvalidSign { .. })));
    }

    #[test]
    fn missing_reason_rejected() {
        let result = ScoreEntryBuilder::new(ScoreEntryKind::Identification, 0)
            .delta(5)
            .build();
        assert_eq!(result.err(), Some(LedgerError::MissingField("reason")));
    }
}
