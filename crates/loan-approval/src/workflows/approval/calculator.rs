use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::domain::{ApprovalDecision, Money};

/// Requests above this amount have it deducted from the approved value.
pub const APPROVAL_DEDUCTION: Money = dec!(100);

/// Approved amount for a request: anything above 100 loses a flat 100, smaller requests
/// are approved in full.
///
/// Callers guarantee `requested_amount >= 0`.
pub fn approve(requested_amount: Money) -> Money {
    if requested_amount > APPROVAL_DEDUCTION {
        requested_amount - APPROVAL_DEDUCTION
    } else {
        requested_amount
    }
}

pub(crate) fn decide(requested_amount: Money) -> Option<ApprovalDecision> {
    if requested_amount < Decimal::ZERO {
        return None;
    }
    Some(ApprovalDecision::new(approve(requested_amount)))
}
