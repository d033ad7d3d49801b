//! Combination policy.

use arbiter_core::{GrantState, GrantVerdict};

/// Reduce verdicts to one decision: prohibit overrides grant, grant
/// overrides silence.
///
/// Total and independent of verdict order. An empty slice, or one holding
/// only `Undefined` verdicts, yields `Undefined`, which callers treat as not
/// granted. Failed providers reach this function as `Undefined` verdicts and
/// so never tip a decision either way.
#[must_use]
pub fn combine(verdicts: &[GrantVerdict]) -> GrantState {
    let mut decision = GrantState::Undefined;
    for verdict in verdicts {
        match verdict.state {
            GrantState::Prohibited => return GrantState::Prohibited,
            GrantState::Granted => decision = GrantState::Granted,
            GrantState::Undefined => {},
        }
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdicts(states: &[GrantState]) -> Vec<GrantVerdict> {
        states
            .iter()
            .enumerate()
            .map(|(i, s)| GrantVerdict::new(format!("P{i}"), *s))
            .collect()
    }

    #[test]
    fn test_default_deny() {
        assert_eq!(combine(&[]), GrantState::Undefined);
        assert_eq!(
            combine(&verdicts(&[GrantState::Undefined, GrantState::Undefined])),
            GrantState::Undefined
        );
    }

    #[test]
    fn test_grant_over_silence() {
        assert_eq!(
            combine(&verdicts(&[GrantState::Undefined, GrantState::Granted])),
            GrantState::Granted
        );
    }

    #[test]
    fn test_prohibit_overrides_grant() {
        assert_eq!(
            combine(&verdicts(&[GrantState::Granted, GrantState::Prohibited])),
            GrantState::Prohibited
        );
    }

    #[test]
    fn test_order_independent() {
        let states = [
            GrantState::Granted,
            GrantState::Undefined,
            GrantState::Prohibited,
        ];
        let expected = combine(&verdicts(&states));
        // Every rotation of the input gives the same decision.
        for shift in 0..states.len() {
            let mut rotated = states;
            rotated.rotate_left(shift);
            assert_eq!(combine(&verdicts(&rotated)), expected);
        }
    }
}
