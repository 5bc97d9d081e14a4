//! Translates the candidate space into a weighted MILP.
//!
//! One binary decision per candidate. Hard rules:
//! - every session takes exactly one candidate
//! - a teacher, a room and a group each hold at most one session per slot
//!
//! Soft rules, each a weighted term of the minimised objective and skipped
//! when its weight is not positive or it has nothing to act on:
//! - teacher taught outside their preferred periods
//! - a group having the same course twice or more on one day
//! - the busiest teacher's load
//! - idle periods inside a group's day
//! - a group changing rooms between adjacent periods

use crate::config::Weights;
use crate::data::{Dataset, Session, SessionIdx};
use crate::engine::{LinearModel, Valuation};
use crate::feasibility::CandidateSpace;
use crate::linking::ThresholdLink;
use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable};
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    TeacherPreference,
    SameDayRepetition,
    LoadBalance,
    GroupGap,
    RoomChange,
}

/// One weighted term of the objective, aligned with the model's objective list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenaltyTerm {
    pub kind: PenaltyKind,
    pub label: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub decision_vars: usize,
    pub auxiliary_vars: usize,
    pub hard_constraints: usize,
    pub soft_constraints: usize,
}

/// Maps solver values back to sessions and candidates.
#[derive(Debug, Clone)]
pub struct AssignmentIndex {
    pub sessions: Vec<Session>,
    pub space: CandidateSpace,
}

impl AssignmentIndex {
    /// Values of the decision variables, one per candidate. `None` when the
    /// valuation holds fewer values than there are candidates.
    pub fn decision_values<'v>(&self, valuation: &'v Valuation) -> Option<&'v [f64]> {
        valuation.values.get(..self.space.len())
    }

    /// Values of the objective term variables, aligned with the penalty list.
    pub fn penalty_values<'v>(&self, valuation: &'v Valuation) -> Option<&'v [f64]> {
        valuation.values.get(self.space.len()..)
    }
}

pub struct EncodedModel {
    pub model: LinearModel,
    pub index: AssignmentIndex,
    pub penalties: Vec<PenaltyTerm>,
    pub stats: ModelStats,
}

/// Builds the model for `sessions` over `space`.
pub fn encode(
    dataset: &Dataset,
    sessions: Vec<Session>,
    space: CandidateSpace,
    weights: &Weights,
) -> EncodedModel {
    let mut encoder = Encoder::new(dataset, &sessions, &space);
    encoder.add_hard_constraints();

    if weights.teacher_preference > 0.0 {
        encoder.add_teacher_preference(weights.teacher_preference);
    }
    if weights.same_day_repetition > 0.0 {
        encoder.add_same_day_repetition(weights.same_day_repetition);
    }
    if weights.load_balance > 0.0 {
        encoder.add_load_balance(weights.load_balance);
    }
    if weights.group_gap > 0.0 {
        encoder.add_group_gaps(weights.group_gap);
    }
    if weights.room_change > 0.0 {
        encoder.add_room_changes(weights.room_change);
    }

    let Encoder {
        vars,
        constraints,
        decisions,
        objective,
        penalties,
        stats,
        ..
    } = encoder;
    info!(
        "Model has {} decision and {} auxiliary variables, {} hard and {} soft constraints, {} objective terms",
        stats.decision_vars,
        stats.auxiliary_vars,
        stats.hard_constraints,
        stats.soft_constraints,
        objective.len()
    );

    let readout = decisions
        .iter()
        .copied()
        .chain(objective.iter().map(|(var, _)| *var))
        .collect();
    EncodedModel {
        model: LinearModel::new(vars, constraints, objective, readout),
        index: AssignmentIndex { sessions, space },
        penalties,
        stats,
    }
}

struct Encoder<'a> {
    dataset: &'a Dataset,
    sessions: &'a [Session],
    space: &'a CandidateSpace,
    vars: ProblemVariables,
    constraints: Vec<Constraint>,
    decisions: Vec<Variable>,
    objective: Vec<(Variable, f64)>,
    penalties: Vec<PenaltyTerm>,
    stats: ModelStats,
    /// slot indices per day in first-appearance order, each sorted by period
    days: Vec<(&'a str, Vec<usize>)>,
}

impl<'a> Encoder<'a> {
    fn new(dataset: &'a Dataset, sessions: &'a [Session], space: &'a CandidateSpace) -> Self {
        let mut vars = ProblemVariables::new();
        // x_c = 1 if candidate c (session, teacher, room, slot) is chosen
        let decisions = vars.add_vector(variable().binary(), space.len());
        let stats = ModelStats {
            decision_vars: decisions.len(),
            ..ModelStats::default()
        };
        Self {
            dataset,
            sessions,
            space,
            vars,
            constraints: Vec::new(),
            decisions,
            objective: Vec::new(),
            penalties: Vec::new(),
            stats,
            days: slots_by_day(dataset),
        }
    }

    fn group_of(&self, session: SessionIdx) -> &'a str {
        let sessions: &'a [Session] = self.sessions;
        sessions[session].group.as_str()
    }

    /// The candidate space, borrowed for `'a` rather than for `self`.
    fn space_ref(&self) -> &'a CandidateSpace {
        self.space
    }

    fn aux_binary(&mut self) -> Variable {
        self.stats.auxiliary_vars += 1;
        self.vars.add(variable().binary())
    }

    fn aux_integer(&mut self, upper: usize) -> Variable {
        self.stats.auxiliary_vars += 1;
        self.vars.add(variable().integer().min(0).max(upper as f64))
    }

    fn hard(&mut self, c: Constraint) {
        self.stats.hard_constraints += 1;
        self.constraints.push(c);
    }

    fn soft(&mut self, c: Constraint) {
        self.stats.soft_constraints += 1;
        self.constraints.push(c);
    }

    fn penalise(&mut self, var: Variable, weight: f64, kind: PenaltyKind, label: String) {
        self.objective.push((var, weight));
        self.penalties.push(PenaltyTerm {
            kind,
            label,
            weight,
        });
    }

    /// Decision variables bucketed by `key`, in key order.
    fn bucket<K: Ord>(&self, key: impl Fn(usize) -> K) -> BTreeMap<K, Vec<Variable>> {
        let mut buckets: BTreeMap<K, Vec<Variable>> = BTreeMap::new();
        for (i, var) in self.decisions.iter().enumerate() {
            buckets.entry(key(i)).or_default().push(*var);
        }
        buckets
    }

    fn add_hard_constraints(&mut self) {
        debug!("Adding 'session scheduled once' constraints...");
        for session in 0..self.sessions.len() {
            let chosen: Expression = self.space.by_session[session]
                .iter()
                .map(|&i| self.decisions[i])
                .sum();
            self.hard(constraint!(chosen == 1));
        }

        let candidates = &self.space_ref().candidates;
        debug!("Adding 'no teacher overlap' constraints...");
        let teacher_slot = self.bucket(|i| (candidates[i].teacher, candidates[i].slot));
        self.add_at_most_one(teacher_slot.into_values());

        debug!("Adding 'no room overlap' constraints...");
        let room_slot = self.bucket(|i| (candidates[i].room, candidates[i].slot));
        self.add_at_most_one(room_slot.into_values());

        debug!("Adding 'no group overlap' constraints...");
        let group_slot = self.bucket(|i| (self.group_of(candidates[i].session), candidates[i].slot));
        self.add_at_most_one(group_slot.into_values());
    }

    fn add_at_most_one(&mut self, buckets: impl Iterator<Item = Vec<Variable>>) {
        // a single binary is at most one on its own
        for vars in buckets.filter(|v| v.len() > 1) {
            let busy = sum(&vars);
            self.hard(constraint!(busy <= 1));
        }
    }

    fn add_teacher_preference(&mut self, weight: f64) {
        let dataset = self.dataset;
        for (i, c) in self.space_ref().candidates.iter().enumerate() {
            let teacher = &dataset.teachers[c.teacher];
            let slot = &dataset.slots[c.slot];
            if teacher.dislikes_period(slot.period) {
                let label = format!(
                    "teacher {} teaches session {} at slot {} (period {})",
                    teacher.id, c.session, slot.id, slot.period
                );
                self.penalise(self.decisions[i], weight, PenaltyKind::TeacherPreference, label);
            }
        }
    }

    fn add_same_day_repetition(&mut self, weight: f64) {
        struct DayCount {
            vars: Vec<Variable>,
            sessions: BTreeSet<SessionIdx>,
            slots: BTreeSet<usize>,
        }

        let (dataset, sessions) = (self.dataset, self.sessions);
        let mut counts: BTreeMap<(&str, &str, &str), DayCount> = BTreeMap::new();
        for (i, c) in self.space_ref().candidates.iter().enumerate() {
            let session = &sessions[c.session];
            let day = dataset.slots[c.slot].day.as_str();
            let entry = counts
                .entry((session.group.as_str(), session.course_name.as_str(), day))
                .or_insert_with(|| DayCount {
                    vars: Vec::new(),
                    sessions: BTreeSet::new(),
                    slots: BTreeSet::new(),
                });
            entry.vars.push(self.decisions[i]);
            entry.sessions.insert(c.session);
            entry.slots.insert(c.slot);
        }

        for ((group, course, day), day_count) in counts {
            // H1 caps the count by the sessions, H4 by the slots of that day
            let upper = day_count.sessions.len().min(day_count.slots.len());
            if upper < 2 {
                continue;
            }
            let count = self.aux_integer(upper);
            let on_day = sum(&day_count.vars);
            self.soft(constraint!(count == on_day));

            let repeated = self.aux_binary();
            for c in ThresholdLink::new(count, 0.0, upper as f64, 1.0, repeated).exact() {
                self.soft(c);
            }
            let label = format!("group {} has {} more than once on {}", group, course, day);
            self.penalise(repeated, weight, PenaltyKind::SameDayRepetition, label);
        }
    }

    fn add_load_balance(&mut self, weight: f64) {
        let candidates = &self.space_ref().candidates;
        let per_teacher = self.bucket(|i| candidates[i].teacher);
        if per_teacher.is_empty() {
            return;
        }
        let max_load = self.aux_integer(self.sessions.len());
        for vars in per_teacher.into_values() {
            let load = sum(&vars);
            self.soft(constraint!(load <= max_load));
        }
        self.penalise(
            max_load,
            weight,
            PenaltyKind::LoadBalance,
            "maximum teacher load".to_string(),
        );
    }

    /// Occupancy of each group per slot: the sum of its decisions there,
    /// which H4 keeps at most one.
    fn group_occupancy(&self) -> BTreeMap<(&'a str, usize), Vec<Variable>> {
        let candidates = &self.space_ref().candidates;
        self.bucket(|i| (self.group_of(candidates[i].session), candidates[i].slot))
    }

    fn groups(&self) -> BTreeSet<&'a str> {
        let sessions: &'a [Session] = self.sessions;
        sessions.iter().map(|s| s.group.as_str()).collect()
    }

    fn add_group_gaps(&mut self, weight: f64) {
        let occupancy = self.group_occupancy();
        let days = self.days.clone();

        for group in self.groups() {
            for (day, slots) in &days {
                let occ: Vec<Option<&Vec<Variable>>> =
                    slots.iter().map(|&s| occupancy.get(&(group, s))).collect();

                for mid in 1..slots.len().saturating_sub(1) {
                    let before: Vec<&Vec<Variable>> = occ[..mid].iter().flatten().copied().collect();
                    let after: Vec<&Vec<Variable>> = occ[mid + 1..].iter().flatten().copied().collect();
                    if before.is_empty() || after.is_empty() {
                        continue;
                    }

                    let busy_before = self.aux_binary();
                    for vars in &before {
                        let link = ThresholdLink::new(sum(vars), 0.0, 1.0, 0.0, busy_before);
                        self.soft(link.forcing());
                    }
                    let busy_after = self.aux_binary();
                    for vars in &after {
                        let link = ThresholdLink::new(sum(vars), 0.0, 1.0, 0.0, busy_after);
                        self.soft(link.forcing());
                    }

                    // idle when busy before and after but free at `mid`
                    let at_mid = sum(occ[mid].map(Vec::as_slice).unwrap_or(&[]));
                    let idle = self.aux_binary();
                    let count = Expression::from(busy_before) + busy_after - at_mid;
                    self.soft(ThresholdLink::new(count, -1.0, 2.0, 1.0, idle).forcing());

                    let slot = &self.dataset.slots[slots[mid]];
                    let label = format!(
                        "group {} is idle on {} period {} between sessions",
                        group, day, slot.period
                    );
                    self.penalise(idle, weight, PenaltyKind::GroupGap, label);
                }
            }
        }
    }

    fn add_room_changes(&mut self, weight: f64) {
        let occupancy = self.group_occupancy();
        let candidates = &self.space_ref().candidates;
        let in_room = self.bucket(|i| {
            (
                self.group_of(candidates[i].session),
                candidates[i].slot,
                candidates[i].room,
            )
        });
        let days = self.days.clone();
        let room_count = self.dataset.rooms.len();

        for group in self.groups() {
            for (day, slots) in &days {
                for pair in slots.windows(2) {
                    let (first, second) = (pair[0], pair[1]);
                    let Some(present_second) = occupancy.get(&(group, second)) else {
                        continue;
                    };
                    let rooms_first: Vec<(usize, &Vec<Variable>)> = (0..room_count)
                        .filter_map(|r| in_room.get(&(group, first, r)).map(|v| (r, v)))
                        .collect();
                    if rooms_first.is_empty() {
                        continue;
                    }

                    // changed when in room r at `first` and present elsewhere at `second`
                    let changed = self.aux_binary();
                    for (room, vars_first) in rooms_first {
                        let stay = sum(in_room
                            .get(&(group, second, room))
                            .map(Vec::as_slice)
                            .unwrap_or(&[]));
                        let count = sum(vars_first) + sum(present_second) - stay;
                        self.soft(ThresholdLink::new(count, -1.0, 2.0, 1.0, changed).forcing());
                    }

                    let label = format!(
                        "group {} changes room on {} between slots {} and {}",
                        group, day, self.dataset.slots[first].id, self.dataset.slots[second].id
                    );
                    self.penalise(changed, weight, PenaltyKind::RoomChange, label);
                }
            }
        }
    }
}

fn sum(vars: &[Variable]) -> Expression {
    vars.iter().copied().sum()
}

/// Slot indices grouped by day, days in first-appearance order, slots by period.
pub fn slots_by_day(dataset: &Dataset) -> Vec<(&str, Vec<usize>)> {
    let mut days: Vec<(&str, Vec<usize>)> = Vec::new();
    for (idx, slot) in dataset.slots.iter().enumerate() {
        match days.iter_mut().find(|(day, _)| *day == slot.day) {
            Some((_, slots)) => slots.push(idx),
            None => days.push((slot.day.as_str(), vec![idx])),
        }
    }
    for (_, slots) in &mut days {
        slots.sort_by_key(|&s| dataset.slots[s].period);
    }
    days
}
