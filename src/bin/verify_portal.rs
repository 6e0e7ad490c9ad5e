//! End-to-end check of the token-scoped client portal: seeds a client, a
//! resource, and a trainer profile, then verifies the "Resources & Info"
//! view renders all three.
//!
//! Run with the portal dev server up:
//!   cargo run --bin verify_portal

use clap::Parser;
use dotenvy::dotenv;
use serde_json::json;
use std::process::ExitCode;

use fitpro_verify::cli::CommonArgs;
use fitpro_verify::logging::{init_logging, LoggingConfig};
use fitpro_verify::{run, EvidencePaths, Scenario, SeedStep, Step};

#[derive(Parser)]
#[command(
    name = "verify_portal",
    about = "Verify the client portal renders seeded resources and trainer info"
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
        name: "portal resources".to_string(),
        seed: vec![
            // Nothing downstream is meaningful without the client's token.
            SeedStep::post(
                "create client",
                "/api/clients",
                json!({
                    "name": "Test Client",
                    "email": "test@example.com",
                    "phone": "1234567890",
                    "age": 30,
                    "weight": 70,
                    "height": 175,
                    "goal": "muscle_gain",
                    "fitnessLevel": "intermediate",
                    "notes": "Test notes"
                }),
            )
            .must_succeed()
            .save_as("client"),
            SeedStep::post(
                "create resource",
                "/api/clients/{client.id}/resources",
                json!({
                    "title": "Test Resource Video",
                    "type": "link",
                    "url": "https://example.com/video",
                    "description": "A sample video for testing",
                    "clientId": "{client.id}"
                }),
            ),
            SeedStep::post(
                "update profile",
                "/api/trainer/profile",
                json!({
                    "name": "Super Trainer",
                    "email": "trainer@fitpro.com",
                    "phone": "1234567890",
                    "bio": "I am the best trainer."
                }),
            ),
        ],
        steps: vec![
            Step::navigate("/portal/{client.token}"),
            Step::click_text("Resources & Info"),
            Step::assert_text("Super Trainer"),
            Step::assert_text("\"I am the best trainer.\""),
            Step::assert_text("Test Resource Video"),
        ],
        evidence: EvidencePaths::new(&cfg.artifact_dir, "portal_resources.png", "error.png"),
    };

    run(&cfg, &scenario).await.exit_code()
}
