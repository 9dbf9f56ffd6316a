use serde::{Deserialize, Serialize};

/// Tolerance for accumulated floating-point error in length and wattage sums.
pub const EPS: f64 = 1e-9;

/// One requested cut: how many pieces of a given length are needed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutRequest {
    pub length: f64,
    pub qty: u32,
}

impl CutRequest {
    pub fn new(length: f64, qty: u32) -> Self {
        Self { length, qty }
    }

    pub fn total_length(&self) -> f64 {
        self.length * self.qty as f64
    }
}

/// Collapses duplicate lengths by summing their quantities, keeping the order
/// of first appearance.
pub(crate) fn merge_requests(cuts: &[CutRequest]) -> Vec<CutRequest> {
    let mut merged: Vec<CutRequest> = Vec::new();
    for cut in cuts {
        match merged
            .iter_mut()
            .find(|m| m.length.to_bits() == cut.length.to_bits())
        {
            Some(existing) => existing.qty += cut.qty,
            None => merged.push(*cut),
        }
    }
    merged
}

/// A multiset of cut lengths that fits on one roll, kept sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    lengths: Vec<f64>,
}

impl Pattern {
    pub fn new(mut lengths: Vec<f64>) -> Self {
        lengths.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self { lengths }
    }

    pub fn lengths(&self) -> &[f64] {
        &self.lengths
    }

    pub fn piece_count(&self) -> usize {
        self.lengths.len()
    }

    pub fn total_length(&self) -> f64 {
        self.lengths.iter().sum()
    }

    /// How many pieces of `length` one roll cut with this pattern yields.
    pub fn count_of(&self, length: f64) -> u32 {
        self.lengths
            .iter()
            .filter(|l| l.to_bits() == length.to_bits())
            .count() as u32
    }

    pub(crate) fn key(&self) -> Vec<u64> {
        self.lengths.iter().map(|l| l.to_bits()).collect()
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, length) in self.lengths.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{length:.2}")?;
        }
        Ok(())
    }
}

/// What a physical roll is cut into.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollContents {
    /// Individual pieces cut from this one roll.
    Cuts(Vec<f64>),
    /// Stand-in for the oversized requests spliced across several rolls.
    LargePieces {
        total_length: f64,
        piece_count: u32,
        rolls_spanned: u64,
    },
}

/// One roll record in the final plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollPlan {
    pub id: u32,
    pub roll_length: f64,
    pub contents: RollContents,
    pub consumed: f64,
    pub waste: f64,
}

/// A request whose length exceeds the roll, excluded from pattern search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LargePieceRequest {
    pub length: f64,
    pub qty: u32,
}

/// Aggregate of every request longer than the roll. Oversized pieces are
/// spliced from consecutive rolls, so their demand is summed as one
/// continuous length before the ceiling division.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LargePieceGroup {
    pub requests: Vec<LargePieceRequest>,
    pub total_length: f64,
    pub rolls_required: u64,
    pub waste: f64,
}

impl LargePieceGroup {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn piece_count(&self) -> u32 {
        self.requests.iter().map(|r| r.qty).sum()
    }
}

/// Terminal outcome of one planning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// The solver proved the pattern selection optimal.
    Optimal,
    /// Every request was longer than the roll; nothing to optimize.
    OptimalLargeOnly,
    /// No combination of patterns satisfies the requested quantities.
    Infeasible,
    /// The generator produced no pattern despite non-empty demand.
    NoFeasiblePatterns,
    /// Any other solver outcome, surfaced verbatim.
    SolverError(String),
}

impl PlanStatus {
    /// Whether the plan's roll records cover the full demand.
    pub fn is_usable(&self) -> bool {
        matches!(self, PlanStatus::Optimal | PlanStatus::OptimalLargeOnly)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Optimal => write!(f, "optimal"),
            PlanStatus::OptimalLargeOnly => write!(f, "optimal (oversized pieces only)"),
            PlanStatus::Infeasible => write!(f, "infeasible"),
            PlanStatus::NoFeasiblePatterns => write!(f, "no feasible patterns"),
            PlanStatus::SolverError(reason) => write!(f, "solver error: {reason}"),
        }
    }
}

/// Consolidated result of one planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutPlan {
    pub status: PlanStatus,
    pub roll_length: f64,
    pub total_rolls: u64,
    pub total_waste: f64,
    pub rolls: Vec<RollPlan>,
    /// Requests longer than the roll, excluded from pattern optimization.
    pub large_pieces: Vec<LargePieceRequest>,
}

/// Precondition violations rejected before any engine runs.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("roll length must be a positive number, got {0}")]
    RollLength(f64),
    #[error("cut length must be a positive number, got {0}")]
    CutLength(f64),
    #[error("cut quantity must be at least 1 for length {0}")]
    CutQuantity(f64),
    #[error("watts per meter must be a positive number, got {0}")]
    WattsPerMeter(f64),
    #[error("supply rating must be a positive number, got {0}")]
    SupplyRating(f64),
    #[error("safety factor must be at least 1, got {0}")]
    SafetyFactor(f64),
}
