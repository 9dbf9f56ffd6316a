use clap::Parser;
use roll_optimizer::power::{AssignMode, RatingTotal, SupplyCatalog};
use roll_optimizer::render;
use roll_optimizer::solver::Planner;
use roll_optimizer::types::{CutRequest, RollContents};

#[derive(Parser)]
#[command(
    name = "roll_optimizer",
    about = "1D cutting stock optimizer for rolls of strip material"
)]
struct Cli {
    /// Stock roll length in meters (e.g. 5.0)
    #[arg(long)]
    roll: f64,

    /// Requested cuts as length:qty (e.g. 1.2:5 0.8:3)
    #[arg(long = "cuts", num_args = 1..)]
    cuts: Vec<String>,

    /// Maximum pieces per cutting pattern (bounds the pattern search)
    #[arg(long)]
    max_items: Option<usize>,

    /// Show an ASCII layout of each roll
    #[arg(long)]
    layout: bool,

    /// Strip draw in watts per meter; enables the power-supply report
    #[arg(long)]
    watts_per_meter: Option<f64>,

    /// Available supply ratings in watts, comma separated
    #[arg(long, default_value = "30,36,40,60,100,120,150,240,320,360")]
    ratings: String,

    /// Safety multiplier applied to real consumption before sizing
    #[arg(long, default_value_t = 1.2)]
    safety_factor: f64,

    /// Supply sizing mode: direct or grouped
    #[arg(long, default_value = "direct", value_parser = parse_mode)]
    power_mode: AssignMode,
}

fn parse_mode(s: &str) -> Result<AssignMode, String> {
    match s {
        "direct" => Ok(AssignMode::Direct),
        "grouped" => Ok(AssignMode::Grouped),
        _ => Err(format!(
            "invalid power mode '{}', expected: direct or grouped",
            s
        )),
    }
}

fn parse_cut(s: &str) -> Result<CutRequest, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err(format!("invalid cut '{}', expected length:qty", s));
    }
    let length = parts[0]
        .parse::<f64>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    let qty = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    if !length.is_finite() || length <= 0.0 {
        return Err(format!("length must be positive in '{}'", s));
    }
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    Ok(CutRequest::new(length, qty))
}

fn parse_ratings(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| format!("invalid rating '{}'", t))
        })
        .collect()
}

fn main() {
    let cli = Cli::parse();

    let cuts: Vec<CutRequest> = cli
        .cuts
        .iter()
        .map(|c| parse_cut(c))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let planner = Planner::new(cli.roll, cuts.clone(), cli.max_items).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let plan = planner.plan();

    for roll in &plan.rolls {
        match &roll.contents {
            RollContents::Cuts(pieces) => {
                let list = pieces
                    .iter()
                    .map(|p| format!("{p:.2}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "Roll {}: [{}] (used {:.2}m, waste {:.2}m)",
                    roll.id, list, roll.consumed, roll.waste
                );
            }
            RollContents::LargePieces {
                total_length,
                piece_count,
                rolls_spanned,
            } => {
                println!(
                    "Roll {}: {} oversized piece{} totalling {:.2}m across {} rolls (waste {:.2}m)",
                    roll.id,
                    piece_count,
                    if *piece_count == 1 { "" } else { "s" },
                    total_length,
                    rolls_spanned,
                    roll.waste
                );
            }
        }
        if cli.layout {
            print!("{}", render::render_roll(roll));
        }
    }

    if !plan.large_pieces.is_empty() {
        println!();
        println!(
            "Oversized requests (longer than the {:.1}m roll, spliced from several rolls):",
            plan.roll_length
        );
        for piece in &plan.large_pieces {
            println!("  {}x {:.2}m", piece.qty, piece.length);
        }
    }

    println!();
    println!(
        "Summary: {} ({} roll{} used, {:.2}m waste)",
        plan.status,
        plan.total_rolls,
        if plan.total_rolls == 1 { "" } else { "s" },
        plan.total_waste
    );

    if let Some(watts_per_meter) = cli.watts_per_meter {
        let ratings = parse_ratings(&cli.ratings).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });
        let catalog = SupplyCatalog::new(watts_per_meter, ratings, cli.safety_factor)
            .unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            });

        println!();
        match cli.power_mode {
            AssignMode::Direct => {
                let report = catalog.assign_direct(&cuts);
                println!("Power supplies (direct, one per piece):");
                for a in &report.assignments {
                    match a.rating {
                        Some(rating) => println!(
                            "  {:.2}m x{}: {:.2}W adjusted -> {:.0}W{}",
                            a.length,
                            a.qty,
                            a.adjusted,
                            rating,
                            if a.overflow { " [over capacity]" } else { "" }
                        ),
                        None => println!(
                            "  {:.2}m x{}: {:.2}W adjusted -> unassigned (no ratings configured)",
                            a.length, a.qty, a.adjusted
                        ),
                    }
                }
                print_totals(&report.totals);
            }
            AssignMode::Grouped => {
                let report = catalog.assign_grouped(&cuts);
                println!("Power supplies (grouped, shared across pieces):");
                for instance in &report.instances {
                    let list = instance
                        .pieces
                        .iter()
                        .map(|p| format!("{:.2}m", p.length))
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!(
                        "  Supply {} ({:.0}W): [{}] load {:.2}W, residual {:.2}W{}",
                        instance.id,
                        instance.rating,
                        list,
                        instance.load,
                        instance.residual(),
                        if instance.overflow { " [over capacity]" } else { "" }
                    );
                }
                if !report.unassigned.is_empty() {
                    println!(
                        "  Unassigned (no ratings configured): {} piece{}",
                        report.unassigned.len(),
                        if report.unassigned.len() == 1 { "" } else { "s" }
                    );
                }
                print_totals(&report.totals);
            }
        }
    }
}

fn print_totals(totals: &[RatingTotal]) {
    if totals.is_empty() {
        return;
    }
    println!("Supplies to purchase:");
    for total in totals {
        println!(
            "  {:.0}W: {} unit{}",
            total.rating,
            total.count,
            if total.count == 1 { "" } else { "s" }
        );
    }
}
