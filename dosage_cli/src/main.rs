use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use dosage_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medcheck")]
#[command(about = "Medication dosing tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a person may take a medicine now
    Check { person: String, medicine: String },

    /// Record that a person took a medicine
    Take {
        person: String,
        medicine: String,

        /// Show the decision without recording the dose
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the decision for every person for one medicine
    Overview { medicine: String },

    /// List known medicines and people
    List,

    /// Roll up the dose log into the CSV archive
    Rollup {
        /// Clean up processed dose logs after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> Result<()> {
    dosage_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    let store = Store::from_config(&config);

    match cli.command {
        Commands::Check { person, medicine } => cmd_check(&store, person.into(), medicine.into()),
        Commands::Take {
            person,
            medicine,
            dry_run,
        } => cmd_take(&store, person.into(), medicine.into(), dry_run),
        Commands::Overview { medicine } => cmd_overview(&store, medicine.into()),
        Commands::List => cmd_list(&store),
        Commands::Rollup { cleanup } => cmd_rollup(&store, cleanup),
    }
}

fn cmd_check(store: &Store, person: PersonName, medicine: MedicineName) -> Result<()> {
    let snapshot = store.load_snapshot()?;
    let decision = snapshot.can_take(&person, &medicine);
    display_decision(&person, &medicine, &decision);
    Ok(())
}

fn cmd_take(
    store: &Store,
    person: PersonName,
    medicine: MedicineName,
    dry_run: bool,
) -> Result<()> {
    let snapshot = store.load_snapshot()?;

    if !snapshot.has_medicine(&medicine) {
        return Err(PosologyError::MedicineNotFound.into());
    }
    if !snapshot.has_person(&person) {
        return Err(PosologyError::PersonNotFound.into());
    }

    let decision = snapshot.can_take(&person, &medicine);
    display_decision(&person, &medicine, &decision);

    if dry_run {
        println!("\n[Dry run - not recording dose]");
        return Ok(());
    }

    if !decision.allowed {
        // Over-recording is safer than losing track of a dose actually taken
        tracing::warn!(
            "Recording {} for {} despite denial: {}",
            medicine,
            person,
            decision.reason
        );
        println!("\n! Recording anyway: {}", decision.reason);
    }

    store.record_dose(person.clone(), medicine.clone(), Utc::now())?;
    println!("\n✓ Recorded {} for {}", medicine, person);
    Ok(())
}

fn cmd_overview(store: &Store, medicine: MedicineName) -> Result<()> {
    let snapshot = store.load_snapshot()?;

    if !snapshot.has_medicine(&medicine) {
        return Err(PosologyError::MedicineNotFound.into());
    }

    println!("{}", medicine);
    println!();
    for person in &snapshot.people {
        let decision = snapshot.can_take(&person.name, &medicine);
        let status = status_marker(&decision);
        print!("  {} {:<12} {}", status, person.name, decision.reason);
        if !decision.allowed && decision.wait_for > Duration::zero() {
            print!(" (wait {})", format_wait(decision.wait_for));
        }
        println!();
    }

    Ok(())
}

fn cmd_list(store: &Store) -> Result<()> {
    let snapshot = store.load_snapshot()?;

    println!("Medicines:");
    for name in snapshot.medicine_names() {
        let tiers = snapshot.medicines[name].posology.len();
        println!("  {} ({} tiers)", name, tiers);
    }

    println!("People:");
    for person in &snapshot.people {
        println!("  {} ({} kg)", person.name, person.weight_kg);
    }

    Ok(())
}

fn cmd_rollup(store: &Store, cleanup: bool) -> Result<()> {
    let log_path = store.dose_log_path();
    let csv_path = store.doses_path();

    if !log_path.exists() {
        println!("No dose log found - nothing to roll up.");
        return Ok(());
    }

    let count = dosage_core::csv_rollup::log_to_csv_and_archive(&log_path, &csv_path)?;

    println!("✓ Rolled up {} doses to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        if let Some(log_dir) = log_path.parent() {
            let cleaned = dosage_core::csv_rollup::cleanup_processed_logs(log_dir)?;
            if cleaned > 0 {
                println!("✓ Cleaned up {} processed dose logs", cleaned);
            }
        }
    }

    Ok(())
}

fn display_decision(person: &PersonName, medicine: &MedicineName, decision: &Decision) {
    if decision.allowed {
        println!("✓ {} may take {}: {}", person, medicine, decision.reason);
    } else {
        println!(
            "{} {} must NOT take {}: {}",
            status_marker(decision),
            person,
            medicine,
            decision.reason
        );
        if decision.wait_for > Duration::zero() {
            println!("  Do NOT take for another {}", format_wait(decision.wait_for));
        }
        if decision.nearly_allowed() {
            println!("  Almost time");
        }
    }

    if let Reason::Ineligible(_) = decision.reason {
        return;
    }

    let posology = &decision.posology;
    println!();
    println!(
        "  Dose: {} every {}",
        posology.quantity,
        format_wait(posology.dose_interval)
    );
    if posology.max_doses > 0 {
        println!(
            "  No more than {} doses every {}",
            posology.max_doses,
            format_wait(posology.max_doses_interval)
        );
    }
}

/// ✓ allowed, ~ almost allowed, ✗ denied
fn status_marker(decision: &Decision) -> &'static str {
    if decision.allowed {
        "✓"
    } else if decision.nearly_allowed() {
        "~"
    } else {
        "✗"
    }
}

fn format_wait(wait: Duration) -> String {
    let minutes = wait.num_minutes();
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
