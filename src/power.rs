use serde::{Deserialize, Serialize};

use crate::types::{CutRequest, EPS, InputError, merge_requests};

/// How supplies are matched to cut pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignMode {
    /// One rating decision per distinct cut length.
    Direct,
    /// Bin packing of every physical piece across shared supplies.
    Grouped,
}

/// The purchasable supply ratings plus the strip's electrical profile.
#[derive(Debug, Clone)]
pub struct SupplyCatalog {
    watts_per_meter: f64,
    /// Sorted ascending, deduplicated.
    ratings: Vec<f64>,
    safety_factor: f64,
}

/// One physical piece's power demand after the safety margin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PieceDraw {
    pub length: f64,
    pub adjusted: f64,
}

/// Direct-mode decision for one distinct cut length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectAssignment {
    pub length: f64,
    pub qty: u32,
    /// Real draw of one piece, watts.
    pub consumption: f64,
    /// Draw after the safety multiplier, used for selection.
    pub adjusted: f64,
    /// `None` only when no ratings are configured.
    pub rating: Option<f64>,
    /// Set when even the largest rating is below the adjusted draw.
    pub overflow: bool,
}

/// One opened supply in grouped mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyInstance {
    pub id: u32,
    pub rating: f64,
    pub pieces: Vec<PieceDraw>,
    /// Total adjusted consumption assigned to this supply.
    pub load: f64,
    pub overflow: bool,
}

impl SupplyInstance {
    /// Rated capacity not yet consumed; negative only on flagged overflow.
    pub fn residual(&self) -> f64 {
        self.rating - self.load
    }
}

/// How many units of each rating the caller needs to purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingTotal {
    pub rating: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectReport {
    pub assignments: Vec<DirectAssignment>,
    pub totals: Vec<RatingTotal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedReport {
    pub instances: Vec<SupplyInstance>,
    pub totals: Vec<RatingTotal>,
    /// Populated only when no ratings are configured.
    pub unassigned: Vec<PieceDraw>,
}

impl SupplyCatalog {
    pub fn new(
        watts_per_meter: f64,
        mut ratings: Vec<f64>,
        safety_factor: f64,
    ) -> Result<Self, InputError> {
        if !watts_per_meter.is_finite() || watts_per_meter <= 0.0 {
            return Err(InputError::WattsPerMeter(watts_per_meter));
        }
        for &rating in &ratings {
            if !rating.is_finite() || rating <= 0.0 {
                return Err(InputError::SupplyRating(rating));
            }
        }
        if !safety_factor.is_finite() || safety_factor < 1.0 {
            return Err(InputError::SafetyFactor(safety_factor));
        }
        ratings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        ratings.dedup();
        Ok(Self {
            watts_per_meter,
            ratings,
            safety_factor,
        })
    }

    /// One piece's draw after the safety multiplier.
    pub fn adjusted_draw(&self, length: f64) -> f64 {
        length * self.watts_per_meter * self.safety_factor
    }

    fn smallest_sufficient(&self, demand: f64) -> Option<f64> {
        self.ratings.iter().copied().find(|&r| r + EPS >= demand)
    }

    fn largest(&self) -> Option<f64> {
        self.ratings.last().copied()
    }

    /// Picks one supply per distinct cut length: the tightest sufficient
    /// rating, or the largest available with an overflow flag when none is
    /// sufficient. Decided once per length, then multiplied by quantity for
    /// the purchase totals.
    pub fn assign_direct(&self, cuts: &[CutRequest]) -> DirectReport {
        let mut assignments = Vec::new();
        let mut totals: Vec<RatingTotal> = Vec::new();

        for cut in merge_requests(cuts) {
            let consumption = cut.length * self.watts_per_meter;
            let adjusted = consumption * self.safety_factor;
            let (rating, overflow) = match self.smallest_sufficient(adjusted) {
                Some(rating) => (Some(rating), false),
                None => (self.largest(), self.largest().is_some()),
            };
            if let Some(rating) = rating {
                add_total(&mut totals, rating, cut.qty);
            }
            assignments.push(DirectAssignment {
                length: cut.length,
                qty: cut.qty,
                consumption,
                adjusted,
                rating,
                overflow,
            });
        }

        sort_totals(&mut totals);
        DirectReport {
            assignments,
            totals,
        }
    }

    /// First-fit-decreasing packing of every physical piece onto shared
    /// supplies. An opened instance accepts a further demand as long as the
    /// largest purchasable rating covers the combined load; its recorded
    /// rating is always the smallest rating covering the load so far. New
    /// instances open at the smallest rating covering the demand, or at the
    /// largest with an overflow flag when no rating can carry the piece
    /// alone.
    pub fn assign_grouped(&self, cuts: &[CutRequest]) -> GroupedReport {
        let mut demands: Vec<PieceDraw> = Vec::new();
        for cut in merge_requests(cuts) {
            let adjusted = self.adjusted_draw(cut.length);
            for _ in 0..cut.qty {
                demands.push(PieceDraw {
                    length: cut.length,
                    adjusted,
                });
            }
        }
        demands.sort_by(|a, b| {
            b.adjusted
                .partial_cmp(&a.adjusted)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let Some(largest) = self.largest() else {
            return GroupedReport {
                instances: Vec::new(),
                totals: Vec::new(),
                unassigned: demands,
            };
        };

        let mut instances: Vec<SupplyInstance> = Vec::new();
        for piece in demands {
            let opened = instances
                .iter_mut()
                .find(|i| !i.overflow && i.load + piece.adjusted <= largest + EPS);
            match opened {
                Some(instance) => {
                    instance.load += piece.adjusted;
                    instance.pieces.push(piece);
                    if instance.load > instance.rating + EPS {
                        instance.rating =
                            self.smallest_sufficient(instance.load).unwrap_or(largest);
                    }
                }
                None => {
                    let (rating, overflow) = match self.smallest_sufficient(piece.adjusted) {
                        Some(rating) => (rating, false),
                        None => (largest, true),
                    };
                    instances.push(SupplyInstance {
                        id: instances.len() as u32 + 1,
                        rating,
                        load: piece.adjusted,
                        pieces: vec![piece],
                        overflow,
                    });
                }
            }
        }

        let mut totals: Vec<RatingTotal> = Vec::new();
        for instance in &instances {
            add_total(&mut totals, instance.rating, 1);
        }
        sort_totals(&mut totals);

        GroupedReport {
            instances,
            totals,
            unassigned: Vec::new(),
        }
    }
}

fn add_total(totals: &mut Vec<RatingTotal>, rating: f64, count: u32) {
    match totals
        .iter_mut()
        .find(|t| t.rating.to_bits() == rating.to_bits())
    {
        Some(total) => total.count += count,
        None => totals.push(RatingTotal { rating, count }),
    }
}

fn sort_totals(totals: &mut [RatingTotal]) {
    totals.sort_by(|a, b| {
        a.rating
            .partial_cmp(&b.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(ratings: &[f64]) -> SupplyCatalog {
        SupplyCatalog::new(10.0, ratings.to_vec(), 1.2).unwrap()
    }

    #[test]
    fn test_direct_tightest_sufficient_fit() {
        let catalog = catalog(&[30.0, 60.0, 100.0]);
        // 2m at 10 W/m -> 20 W, adjusted 24 W -> 30 W supply
        let report = catalog.assign_direct(&[CutRequest::new(2.0, 1)]);
        let a = &report.assignments[0];
        assert_eq!(a.rating, Some(30.0));
        assert!(!a.overflow);
        assert!((a.consumption - 20.0).abs() < 1e-9);
        assert!((a.adjusted - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_direct_overflow_assigns_largest() {
        let catalog = catalog(&[30.0, 60.0, 100.0]);
        // 20m -> 200 W, adjusted 240 W: beyond every rating
        let report = catalog.assign_direct(&[CutRequest::new(20.0, 1)]);
        let a = &report.assignments[0];
        assert_eq!(a.rating, Some(100.0));
        assert!(a.overflow);
    }

    #[test]
    fn test_direct_no_ratings_configured() {
        let catalog = SupplyCatalog::new(10.0, vec![], 1.2).unwrap();
        let report = catalog.assign_direct(&[CutRequest::new(2.0, 1)]);
        let a = &report.assignments[0];
        assert_eq!(a.rating, None);
        assert!(!a.overflow);
        assert!(report.totals.is_empty());
    }

    #[test]
    fn test_direct_decides_once_per_length() {
        let catalog = catalog(&[30.0, 60.0]);
        // Duplicate lengths merge into one decision covering qty 3
        let report =
            catalog.assign_direct(&[CutRequest::new(2.0, 1), CutRequest::new(2.0, 2)]);
        assert_eq!(report.assignments.len(), 1);
        assert_eq!(report.assignments[0].qty, 3);
        assert_eq!(report.totals.len(), 1);
        assert_eq!(report.totals[0].count, 3);
    }

    #[test]
    fn test_direct_totals_sorted_by_rating() {
        let catalog = catalog(&[100.0, 30.0]);
        let report =
            catalog.assign_direct(&[CutRequest::new(7.0, 2), CutRequest::new(1.0, 4)]);
        assert_eq!(report.totals.len(), 2);
        assert!(report.totals[0].rating < report.totals[1].rating);
        assert_eq!(report.totals[0].count, 4);
        assert_eq!(report.totals[1].count, 2);
    }

    #[test]
    fn test_grouped_escalates_to_shared_supply() {
        // Adjusted demands 90, 40, 35 against ratings [100, 60]:
        // 40 + 35 = 75 overruns a 60 W supply, so the second instance
        // escalates to 100 W and no third one opens.
        let catalog = SupplyCatalog::new(1.0, vec![100.0, 60.0], 1.25).unwrap();
        let cuts = [
            CutRequest::new(72.0, 1),
            CutRequest::new(32.0, 1),
            CutRequest::new(28.0, 1),
        ];
        let report = catalog.assign_grouped(&cuts);

        assert_eq!(report.instances.len(), 2);
        let first = &report.instances[0];
        assert_eq!(first.rating, 100.0);
        assert_eq!(first.pieces.len(), 1);
        assert!((first.load - 90.0).abs() < 1e-9);
        assert!((first.residual() - 10.0).abs() < 1e-9);

        let second = &report.instances[1];
        assert_eq!(second.rating, 100.0);
        assert_eq!(second.pieces.len(), 2);
        assert!((second.load - 75.0).abs() < 1e-9);
        assert!(!second.overflow);

        assert_eq!(report.totals.len(), 1);
        assert_eq!(report.totals[0].count, 2);
    }

    #[test]
    fn test_grouped_first_fit_among_opened() {
        // Adjusted demands 60, 50, 40, 30 with a single 100 W rating:
        // classic first-fit-decreasing pairs them as {60, 40} and {50, 30}.
        let catalog = SupplyCatalog::new(1.0, vec![100.0], 1.25).unwrap();
        let cuts = [
            CutRequest::new(48.0, 1),
            CutRequest::new(40.0, 1),
            CutRequest::new(32.0, 1),
            CutRequest::new(24.0, 1),
        ];
        let report = catalog.assign_grouped(&cuts);

        assert_eq!(report.instances.len(), 2);
        assert!((report.instances[0].load - 100.0).abs() < 1e-9);
        assert!((report.instances[1].load - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_grouped_unrolls_quantities() {
        let catalog = SupplyCatalog::new(1.0, vec![100.0], 1.25).unwrap();
        let report = catalog.assign_grouped(&[CutRequest::new(56.0, 3)]);
        // 3 pieces of 70 W adjusted cannot share 100 W supplies
        assert_eq!(report.instances.len(), 3);
        for instance in &report.instances {
            assert_eq!(instance.pieces.len(), 1);
            assert!(!instance.overflow);
        }
    }

    #[test]
    fn test_grouped_overflow_never_refuses() {
        let catalog = SupplyCatalog::new(1.0, vec![100.0], 1.25).unwrap();
        let report = catalog.assign_grouped(&[
            CutRequest::new(400.0, 1),
            CutRequest::new(8.0, 1),
        ]);

        assert_eq!(report.instances.len(), 2);
        let flagged = &report.instances[0];
        assert!(flagged.overflow);
        assert_eq!(flagged.rating, 100.0);
        assert!(flagged.residual() < 0.0);
        // The overflowing instance takes nothing else
        let other = &report.instances[1];
        assert!(!other.overflow);
        assert_eq!(other.pieces.len(), 1);
    }

    #[test]
    fn test_grouped_no_ratings_leaves_unassigned() {
        let catalog = SupplyCatalog::new(10.0, vec![], 1.2).unwrap();
        let report = catalog.assign_grouped(&[CutRequest::new(2.0, 2)]);
        assert!(report.instances.is_empty());
        assert_eq!(report.unassigned.len(), 2);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(SupplyCatalog::new(0.0, vec![60.0], 1.2).is_err());
        assert!(SupplyCatalog::new(10.0, vec![-60.0], 1.2).is_err());
        assert!(SupplyCatalog::new(10.0, vec![60.0], 0.9).is_err());
        assert!(SupplyCatalog::new(f64::NAN, vec![60.0], 1.2).is_err());
    }
}
