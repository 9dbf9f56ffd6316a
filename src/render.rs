use crate::types::{RollContents, RollPlan};

const BAR_WIDTH: f64 = 72.0;

/// Renders one roll as a proportional ASCII bar with labeled segments and a
/// dotted waste tail.
pub fn render_roll(plan: &RollPlan) -> String {
    let scale = BAR_WIDTH / plan.roll_length;

    let mut cells: Vec<(usize, String)> = Vec::new();
    match &plan.contents {
        RollContents::Cuts(pieces) => {
            for &piece in pieces {
                let width = ((piece * scale).round() as usize).max(1);
                cells.push((width, format!("{piece:.2}")));
            }
            let waste_width = (plan.waste * scale).round() as usize;
            if waste_width > 0 {
                cells.push((waste_width, ".".repeat(waste_width)));
            }
        }
        RollContents::LargePieces {
            total_length,
            piece_count,
            rolls_spanned,
        } => {
            cells.push((
                BAR_WIDTH as usize,
                format!(
                    "{total_length:.1}m across {rolls_spanned} rolls ({piece_count} oversized pieces)"
                ),
            ));
        }
    }

    let mut border = String::from("+");
    let mut middle = String::from("|");
    for (width, label) in &cells {
        border.push_str(&"-".repeat(*width));
        border.push('+');
        middle.push_str(&centered(label, *width));
        middle.push('|');
    }

    format!("{border}\n{middle}\n{border}\n")
}

/// Centers `label` in a cell of `width` characters, blanking it when it does
/// not fit.
fn centered(label: &str, width: usize) -> String {
    if label.len() > width {
        return " ".repeat(width);
    }
    let pad = width - label.len();
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), label, " ".repeat(pad - left))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_cut_roll() {
        let plan = RollPlan {
            id: 1,
            roll_length: 5.0,
            contents: RollContents::Cuts(vec![2.0, 2.0]),
            consumed: 4.0,
            waste: 1.0,
        };
        let output = render_roll(&plan);
        assert!(output.contains('+'));
        assert!(output.contains("2.00"));
        // The waste tail renders as dots
        assert!(output.contains(".."));
    }

    #[test]
    fn test_render_exact_fit_has_no_waste_tail() {
        let plan = RollPlan {
            id: 1,
            roll_length: 5.0,
            contents: RollContents::Cuts(vec![5.0]),
            consumed: 5.0,
            waste: 0.0,
        };
        let output = render_roll(&plan);
        assert!(output.contains("5.00"));
        assert!(!output.contains(".."));
    }

    #[test]
    fn test_render_large_piece_aggregate() {
        let plan = RollPlan {
            id: 1,
            roll_length: 5.0,
            contents: RollContents::LargePieces {
                total_length: 12.0,
                piece_count: 1,
                rolls_spanned: 3,
            },
            consumed: 12.0,
            waste: 3.0,
        };
        let output = render_roll(&plan);
        assert!(output.contains("12.0m across 3 rolls"));
    }

    #[test]
    fn test_render_tiny_piece_still_visible() {
        let plan = RollPlan {
            id: 1,
            roll_length: 40.0,
            contents: RollContents::Cuts(vec![0.05]),
            consumed: 0.05,
            waste: 39.95,
        };
        let output = render_roll(&plan);
        // Sub-character pieces are widened to one cell
        assert!(output.lines().next().unwrap().matches('+').count() >= 3);
    }
}
