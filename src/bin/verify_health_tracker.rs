//! End-to-end check of the health tracker page: seeds a client, selects it
//! in the UI, and verifies the measurement tabs render.
//!
//! Run with the portal dev server up:
//!   cargo run --bin verify_health_tracker

use clap::Parser;
use dotenvy::dotenv;
use serde_json::json;
use std::process::ExitCode;

use fitpro_verify::cli::CommonArgs;
use fitpro_verify::logging::{init_logging, LoggingConfig};
use fitpro_verify::{run, EvidencePaths, Scenario, SeedStep, Step};

#[derive(Parser)]
#[command(
    name = "verify_health_tracker",
    about = "Verify the health tracker page renders for a seeded client"
)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv();
    let args = Args::parse();

    let _guard = match init_logging(LoggingConfig {
        log_level: args.common.log_level.clone(),
        ..Default::default()
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cfg = match args.common.into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let scenario = Scenario {
        name: "health tracker".to_string(),
        // The page is still checkable if this client already exists from an
        // earlier run, so a rejection here is logged rather than fatal.
        seed: vec![SeedStep::post(
            "create client",
            "/api/clients",
            json!({
                "name": "Health Tracker Test Client",
                "email": "health@test.com",
                "phone": "1234567890",
                "age": 25,
                "weight": 80,
                "height": 180,
                "goal": "endurance",
                "fitnessLevel": "advanced",
                "notes": "Test notes"
            }),
        )],
        steps: vec![
            Step::navigate("/health"),
            Step::click_text("Select client..."),
            Step::click_text_nth("Health Tracker Test Client", 0),
            Step::assert_role("tab", "Body Measurements"),
        ],
        evidence: EvidencePaths::new(&cfg.artifact_dir, "health_tracker.png", "health_error.png"),
    };

    run(&cfg, &scenario).await.exit_code()
}
