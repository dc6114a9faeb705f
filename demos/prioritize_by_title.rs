//! Route pending tasks by the title of their data unit.
//!
//! Builds a small workflow in memory, registers one agent and runs it with the
//! usual command-line flags, e.g.
//!
//! ```text
//! cargo run --example prioritize_by_title -- --batch-size 2 --log-level debug
//! ```

use stagehand::deps::builtin::{AssetFile, asset_file};
use stagehand::platform::StageType;
use stagehand::{Args, LabelRow, MemoryPlatform, Param, Platform, Routing, Runner};
use std::process::ExitCode;
use std::rc::Rc;

fn build_workflow(platform: &MemoryPlatform) -> Result<uuid::Uuid, Box<dyn std::error::Error>> {
    let project = platform.add_project("traffic cameras");
    let triage = platform.add_stage(project, "Triage", StageType::Agent)?;
    let urgent = platform.add_stage(project, "Urgent review", StageType::Review)?;
    let backlog = platform.add_stage(project, "Annotate", StageType::Annotation)?;
    platform.add_pathway(project, triage, "urgent", Some(urgent))?;
    platform.add_pathway(project, triage, "backlog", Some(backlog))?;

    for title in ["night_crash_01.jpg", "day_02.jpg", "night_03.jpg", "day_04.jpg"] {
        let task = platform.add_task(project, triage, title)?;
        if let Some(data_id) = platform.data_id_of(project, task) {
            platform.set_asset(project, data_id, title.as_bytes().to_vec())?;
        }
    }
    Ok(project)
}

fn main() -> ExitCode {
    let platform = Rc::new(MemoryPlatform::new());
    let project = match build_workflow(&platform) {
        Ok(project) => project,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let shared: Rc<dyn Platform> = platform;
    let mut runner = match Runner::for_project(shared, &project.to_string()) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(err.exit_code() as u8);
        }
    };

    let registered = runner.stage(
        "Triage",
        vec![
            Param::of::<LabelRow>("label_row"),
            Param::value("keyword", "night"),
            Param::scoped("asset", &asset_file()),
        ],
        |args: &Args| {
            let row = args.get::<LabelRow>("label_row")?;
            let keyword = args.get::<&str>("keyword")?;
            let asset = args.get::<AssetFile>("asset")?;
            let bytes = std::fs::read(asset.path())?;
            tracing::info!(title = %row.data_title, bytes = bytes.len(), "triaging");

            if row.data_title.contains(*keyword) {
                Ok(Routing::to("urgent"))
            } else {
                Ok(Routing::to("backlog"))
            }
        },
    );
    if let Err(err) = registered {
        eprintln!("Error: {}", err);
        return ExitCode::from(err.exit_code() as u8);
    }

    runner.run()
}
