//! Threshold linking constraints.
//!
//! Ties a boolean indicator `p` to an integer-valued linear count `c` with
//! known bounds `lower <= c <= upper` and a threshold `k`:
//!
//! - `p = 1  =>  c >= k + 1`, written `c >= lower + (k + 1 - lower) * p`
//! - `p = 0  =>  c <= k`,     written `c <= k + (upper - k) * p`
//!
//! Both implications are the linear ("big-M") form of an only-enforce-if
//! pair, valid because the bounds make the relaxed side vacuous. Together
//! they make `p` exactly the truth value of `c > k`. The second one alone
//! only forces `p` up, which is enough when `p` is penalised in a
//! minimisation and lets several counts share one indicator.

use good_lp::constraint::{geq, leq};
use good_lp::{Constraint, Expression, Variable};

#[derive(Debug, Clone)]
pub struct ThresholdLink {
    count: Expression,
    lower: f64,
    upper: f64,
    threshold: f64,
    indicator: Variable,
}

impl ThresholdLink {
    /// Links `indicator` to `count > threshold` for a count within `[lower, upper]`.
    pub fn new(
        count: impl Into<Expression>,
        lower: f64,
        upper: f64,
        threshold: f64,
        indicator: Variable,
    ) -> Self {
        Self {
            count: count.into(),
            lower,
            upper,
            threshold,
            indicator,
        }
    }

    /// Indicator equals `count > threshold`.
    pub fn exact(self) -> [Constraint; 2] {
        let at_least = geq(
            self.count.clone(),
            (self.threshold + 1.0 - self.lower) * self.indicator + self.lower,
        );
        [at_least, self.forcing_constraint()]
    }

    /// Indicator is at least `count > threshold`.
    pub fn forcing(self) -> Constraint {
        self.forcing_constraint()
    }

    fn forcing_constraint(&self) -> Constraint {
        leq(
            self.count.clone(),
            (self.upper - self.threshold) * self.indicator + self.threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineSettings, EngineStatus, HighsEngine, LinearModel, SolvingEngine};
    use good_lp::{ProblemVariables, constraint, variable};

    /// Fixes `count` to `value`, links it with threshold 1 and reads back the indicator.
    fn indicator_for(value: f64, exact: bool, penalise: bool) -> f64 {
        let mut vars = ProblemVariables::new();
        let count = vars.add(variable().integer().min(0).max(3));
        let indicator = vars.add(variable().binary());

        let mut constraints = vec![constraint!(count == value)];
        let link = ThresholdLink::new(count, 0.0, 3.0, 1.0, indicator);
        if exact {
            constraints.extend(link.exact());
        } else {
            constraints.push(link.forcing());
        }
        // penalise (or reward) the indicator so the solver pushes against the link
        let weight = if penalise { 1.0 } else { -1.0 };

        let model = LinearModel::new(vars, constraints, vec![(indicator, weight)], vec![indicator]);
        let outcome = HighsEngine.solve(model, &EngineSettings::for_tests());
        assert_eq!(outcome.status, EngineStatus::Optimal);
        outcome.valuation.unwrap().values[0]
    }

    #[test]
    fn test_exact_link_tracks_threshold() {
        for (value, expected) in [(0.0, 0.0), (1.0, 0.0), (2.0, 1.0), (3.0, 1.0)] {
            assert_eq!(indicator_for(value, true, true).round(), expected, "penalised, count {value}");
            assert_eq!(indicator_for(value, true, false).round(), expected, "rewarded, count {value}");
        }
    }

    #[test]
    fn test_forcing_link_only_forces_up() {
        assert_eq!(indicator_for(2.0, false, true).round(), 1.0);
        assert_eq!(indicator_for(1.0, false, true).round(), 0.0);
        // nothing stops a rewarded indicator below the threshold
        assert_eq!(indicator_for(1.0, false, false).round(), 1.0);
    }
}
