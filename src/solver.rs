use good_lp::{
    Expression, ResolutionError, Solution, SolverModel, Variable, constraint, default_solver,
    variable, variables,
};

use crate::patterns::enumerate_patterns;
use crate::types::{
    CutPlan, CutRequest, EPS, InputError, LargePieceGroup, LargePieceRequest, Pattern, PlanStatus,
    RollContents, RollPlan, merge_requests,
};

/// Plans how to cut stock rolls of one fixed length into the requested
/// pieces with as few rolls as possible.
///
/// Requests longer than the roll bypass the pattern search: they are spliced
/// from consecutive rolls, so their demand is aggregated and ceiling-divided
/// instead. Everything else goes through pattern enumeration and an integer
/// program that minimizes the roll count, which for a single roll length is
/// the same as minimizing waste.
pub struct Planner {
    roll_length: f64,
    cuts: Vec<CutRequest>,
    max_items_per_pattern: Option<usize>,
}

enum SolveOutcome {
    Optimal(Vec<u64>),
    Infeasible,
    Failed(String),
}

impl Planner {
    pub fn new(
        roll_length: f64,
        cuts: Vec<CutRequest>,
        max_items_per_pattern: Option<usize>,
    ) -> Result<Self, InputError> {
        if !roll_length.is_finite() || roll_length <= 0.0 {
            return Err(InputError::RollLength(roll_length));
        }
        for cut in &cuts {
            if !cut.length.is_finite() || cut.length <= 0.0 {
                return Err(InputError::CutLength(cut.length));
            }
            if cut.qty == 0 {
                return Err(InputError::CutQuantity(cut.length));
            }
        }
        Ok(Self {
            roll_length,
            cuts: merge_requests(&cuts),
            max_items_per_pattern,
        })
    }

    /// Computes the full cutting plan for the request snapshot.
    pub fn plan(&self) -> CutPlan {
        let (small, large) = self.split_large();

        if small.is_empty() {
            let rolls = self.large_roll_plans(&large);
            return self.consolidate(PlanStatus::OptimalLargeOnly, large, rolls, 0.0);
        }

        let lengths: Vec<f64> = small.iter().map(|c| c.length).collect();
        let patterns = enumerate_patterns(&lengths, self.roll_length, self.max_items_per_pattern);
        if patterns.is_empty() {
            let rolls = self.large_roll_plans(&large);
            return self.consolidate(PlanStatus::NoFeasiblePatterns, large, rolls, 0.0);
        }

        match self.solve_usage(&small, &patterns) {
            SolveOutcome::Optimal(usage) => {
                let mut rolls = self.large_roll_plans(&large);
                let first_id = rolls.len() as u32 + 1;
                rolls.extend(self.materialize(&patterns, &usage, first_id));
                let covered_small: f64 = small.iter().map(CutRequest::total_length).sum();
                self.consolidate(PlanStatus::Optimal, large, rolls, covered_small)
            }
            SolveOutcome::Infeasible => {
                let rolls = self.large_roll_plans(&large);
                self.consolidate(PlanStatus::Infeasible, large, rolls, 0.0)
            }
            SolveOutcome::Failed(reason) => {
                let rolls = self.large_roll_plans(&large);
                self.consolidate(PlanStatus::SolverError(reason), large, rolls, 0.0)
            }
        }
    }

    /// Partitions the requests around the roll length and aggregates the
    /// oversized ones into a single continuous demand.
    fn split_large(&self) -> (Vec<CutRequest>, LargePieceGroup) {
        let mut small = Vec::new();
        let mut oversized = Vec::new();
        for cut in &self.cuts {
            if cut.length > self.roll_length + EPS {
                oversized.push(LargePieceRequest {
                    length: cut.length,
                    qty: cut.qty,
                });
            } else {
                small.push(*cut);
            }
        }

        let group = if oversized.is_empty() {
            LargePieceGroup::default()
        } else {
            let total_length: f64 = oversized.iter().map(|r| r.length * r.qty as f64).sum();
            let rolls_required = (total_length / self.roll_length - EPS).ceil() as u64;
            LargePieceGroup {
                requests: oversized,
                total_length,
                rolls_required,
                waste: rolls_required as f64 * self.roll_length - total_length,
            }
        };
        (small, group)
    }

    /// One integer variable per pattern counts the rolls cut with it; the
    /// objective minimizes their sum. Each distinct length gets a covering
    /// constraint (>=, so unavoidable overproduction is permitted and later
    /// counted as waste).
    fn solve_usage(&self, small: &[CutRequest], patterns: &[Pattern]) -> SolveOutcome {
        let mut vars = variables!();
        let usage: Vec<Variable> = patterns
            .iter()
            .map(|_| vars.add(variable().integer().min(0)))
            .collect();

        let total_rolls = usage
            .iter()
            .fold(Expression::from(0), |acc, &v| acc + Expression::from(v));
        let mut model = vars.minimise(total_rolls).using(default_solver);

        for cut in small {
            let mut produced = Expression::from(0);
            for (pattern, &var) in patterns.iter().zip(&usage) {
                let per_roll = pattern.count_of(cut.length);
                if per_roll > 0 {
                    produced += var * per_roll as f64;
                }
            }
            model = model.with(constraint!(produced >= f64::from(cut.qty)));
        }

        match model.solve() {
            Ok(solution) => SolveOutcome::Optimal(
                usage
                    .iter()
                    .map(|&v| solution.value(v).round().max(0.0) as u64)
                    .collect(),
            ),
            Err(ResolutionError::Infeasible) => SolveOutcome::Infeasible,
            Err(other) => SolveOutcome::Failed(other.to_string()),
        }
    }

    /// Expands solved usage counts into one record per physical roll.
    fn materialize(&self, patterns: &[Pattern], usage: &[u64], first_id: u32) -> Vec<RollPlan> {
        let mut rolls = Vec::new();
        let mut id = first_id;
        for (pattern, &count) in patterns.iter().zip(usage) {
            for _ in 0..count {
                let consumed = pattern.total_length();
                rolls.push(RollPlan {
                    id,
                    roll_length: self.roll_length,
                    contents: RollContents::Cuts(pattern.lengths().to_vec()),
                    consumed,
                    waste: self.roll_length - consumed,
                });
                id += 1;
            }
        }
        rolls
    }

    fn large_roll_plans(&self, group: &LargePieceGroup) -> Vec<RollPlan> {
        if group.is_empty() {
            return Vec::new();
        }
        vec![RollPlan {
            id: 1,
            roll_length: self.roll_length,
            contents: RollContents::LargePieces {
                total_length: group.total_length,
                piece_count: group.piece_count(),
                rolls_spanned: group.rolls_required,
            },
            consumed: group.total_length,
            waste: group.waste,
        }]
    }

    /// Total waste comes from the global material balance: rolls consumed
    /// minus length actually covered. The per-roll waste fields are detail
    /// only and are never summed into the total.
    fn consolidate(
        &self,
        status: PlanStatus,
        large: LargePieceGroup,
        rolls: Vec<RollPlan>,
        covered_small: f64,
    ) -> CutPlan {
        let pattern_rolls = rolls
            .iter()
            .filter(|r| matches!(r.contents, RollContents::Cuts(_)))
            .count() as u64;
        let total_rolls = large.rolls_required + pattern_rolls;
        let covered = large.total_length + covered_small;
        CutPlan {
            status,
            roll_length: self.roll_length,
            total_rolls,
            total_waste: total_rolls as f64 * self.roll_length - covered,
            rolls,
            large_pieces: large.requests,
        }
    }
}
