//! Validator reward policies.
//!
//! A policy decides how the validator pool is divided among the approvers
//! that carried the quorum. Whatever a policy leaves unpaid is burned, so a
//! policy can never create or lose value, only move it to the burn sink.
//!
//! Both built-in policies pay only the first `quorum_threshold` approvers
//! by vote order; later approvals arrive after settlement and are rejected.

use quorum_escrow_types::{AccountId, RewardPolicyKind};

/// Inputs a policy may use.
#[derive(Debug, Clone, Copy)]
pub struct RewardContext<'a> {
    /// The validator pool to divide.
    pub pool: u128,
    pub quorum_threshold: usize,
    /// Approving validators in vote order.
    pub approvers: &'a [AccountId],
    /// Every committee member with its ledger balance before payout,
    /// in registration order.
    pub stakes: &'a [(AccountId, u128)],
}

impl RewardContext<'_> {
    /// The approvers eligible for a reward.
    #[must_use]
    pub fn payees(&self) -> &[AccountId] {
        let n = self.approvers.len().min(self.quorum_threshold);
        &self.approvers[..n]
    }

    fn stake_of(&self, account: &AccountId) -> u128 {
        self.stakes
            .iter()
            .find(|(a, _)| a == account)
            .map_or(0, |(_, s)| *s)
    }
}

/// Divides the validator pool. Must pay only approvers and never more than
/// `pool` in total; the engine rejects a settlement that does.
pub trait RewardPolicy: Send + Sync {
    /// Stable name recorded on each settlement.
    fn name(&self) -> &'static str;

    /// Payouts in vote order. Zero entries may be omitted.
    fn distribute(&self, ctx: &RewardContext<'_>) -> Vec<(AccountId, u128)>;
}

/// `pool / n` to each of the first `n = quorum_threshold` approvers.
/// The integer remainder is burned.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualSplit;

impl RewardPolicy for EqualSplit {
    fn name(&self) -> &'static str {
        "equal-split"
    }

    fn distribute(&self, ctx: &RewardContext<'_>) -> Vec<(AccountId, u128)> {
        let payees = ctx.payees();
        if payees.is_empty() {
            return Vec::new();
        }
        let share = ctx.pool / payees.len() as u128;
        payees.iter().map(|v| (*v, share)).collect()
    }
}

/// `pool * stake / Σ committee stake` to each of the first
/// `quorum_threshold` approvers.
///
/// Stake is the validator's ledger balance at settlement. The share of
/// committee members that did not carry the quorum is burned. With zero
/// total stake this falls back to [`EqualSplit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StakeWeighted;

impl RewardPolicy for StakeWeighted {
    fn name(&self) -> &'static str {
        "stake-weighted"
    }

    fn distribute(&self, ctx: &RewardContext<'_>) -> Vec<(AccountId, u128)> {
        let total = ctx
            .stakes
            .iter()
            .try_fold(0u128, |acc, (_, s)| acc.checked_add(*s))
            .unwrap_or(u128::MAX);
        if total == 0 {
            return EqualSplit.distribute(ctx);
        }
        ctx.payees()
            .iter()
            .map(|v| (*v, mul_div_floor(ctx.pool, ctx.stake_of(v).min(total), total)))
            .collect()
    }
}

/// Build the policy named in configuration.
#[must_use]
pub fn policy_for(kind: RewardPolicyKind) -> Box<dyn RewardPolicy> {
    match kind {
        RewardPolicyKind::EqualSplit => Box::new(EqualSplit),
        RewardPolicyKind::StakeWeighted => Box::new(StakeWeighted),
    }
}

/// `floor(a * b / c)` without intermediate overflow.
///
/// Requires `b <= c` and `c > 0`, so the result is at most `a`.
fn mul_div_floor(a: u128, b: u128, c: u128) -> u128 {
    const MASK: u128 = u64::MAX as u128;

    if let Some(product) = a.checked_mul(b) {
        return product / c;
    }

    // 256-bit product as (hi, lo).
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);
    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;
    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);

    // Restoring long division, one bit at a time.
    let mut rem: u128 = 0;
    let mut quotient: u128 = 0;
    for i in (0..256u32).rev() {
        let bit = if i >= 128 { (hi >> (i - 128)) & 1 } else { (lo >> i) & 1 };
        let carry = rem >> 127;
        rem = (rem << 1) | bit;
        quotient <<= 1;
        if carry == 1 || rem >= c {
            rem = rem.wrapping_sub(c);
            quotient |= 1;
        }
    }
    quotient
}

#[cfg(test)]
mod tests {
    use quorum_escrow_types::constants::ONE_TOKEN;

    use super::*;

    fn accounts(n: usize) -> Vec<AccountId> {
        (0..n)
            .map(|i| AccountId::from_label(&format!("validator-{i}")))
            .collect()
    }

    #[test]
    fn equal_split_pays_first_threshold_approvers() {
        let v = accounts(3);
        let stakes: Vec<_> = v.iter().map(|a| (*a, 0)).collect();
        let ctx = RewardContext {
            pool: 330,
            quorum_threshold: 2,
            approvers: &v,
            stakes: &stakes,
        };
        let payouts = EqualSplit.distribute(&ctx);
        assert_eq!(payouts, vec![(v[0], 165), (v[1], 165)]);
    }

    #[test]
    fn equal_split_remainder_is_left_unpaid() {
        let v = accounts(3);
        let ctx = RewardContext {
            pool: 100,
            quorum_threshold: 3,
            approvers: &v,
            stakes: &[],
        };
        let paid: u128 = EqualSplit.distribute(&ctx).iter().map(|(_, a)| a).sum();
        assert_eq!(paid, 99);
    }

    #[test]
    fn stake_weighted_matches_reference_interaction() {
        // Committee balances 1, 2, 3 tokens; validators #1 and #3 carry the quorum.
        let v = accounts(3);
        let stakes = vec![(v[0], ONE_TOKEN), (v[1], 2 * ONE_TOKEN), (v[2], 3 * ONE_TOKEN)];
        let approvers = vec![v[0], v[2]];
        let ctx = RewardContext {
            pool: 330_000_000_000_000_000,
            quorum_threshold: 2,
            approvers: &approvers,
            stakes: &stakes,
        };
        let payouts = StakeWeighted.distribute(&ctx);
        assert_eq!(
            payouts,
            vec![(v[0], 55_000_000_000_000_000), (v[2], 165_000_000_000_000_000)]
        );
    }

    #[test]
    fn stake_weighted_zero_stake_falls_back() {
        let v = accounts(2);
        let stakes: Vec<_> = v.iter().map(|a| (*a, 0)).collect();
        let ctx = RewardContext {
            pool: 10,
            quorum_threshold: 2,
            approvers: &v,
            stakes: &stakes,
        };
        assert_eq!(StakeWeighted.distribute(&ctx), vec![(v[0], 5), (v[1], 5)]);
    }

    #[test]
    fn no_approvers_no_payouts() {
        let ctx = RewardContext {
            pool: 10,
            quorum_threshold: 1,
            approvers: &[],
            stakes: &[],
        };
        assert!(EqualSplit.distribute(&ctx).is_empty());
    }

    #[test]
    fn policy_for_kind() {
        assert_eq!(policy_for(RewardPolicyKind::EqualSplit).name(), "equal-split");
        assert_eq!(policy_for(RewardPolicyKind::StakeWeighted).name(), "stake-weighted");
    }

    #[test]
    fn mul_div_without_overflow() {
        assert_eq!(mul_div_floor(10, 1, 3), 3);
        assert_eq!(mul_div_floor(u128::MAX, 3, 6), u128::MAX / 2);
        assert_eq!(mul_div_floor(u128::MAX, u128::MAX, u128::MAX), u128::MAX);
        assert_eq!(mul_div_floor(u128::MAX / 7, u128::MAX - 1, u128::MAX), u128::MAX / 7 - 1);
    }
}
