//! Ready-made providers for common stage-agent inputs.
//!
//! - [`asset_file`]: the media behind the current label row, downloaded to a
//!   temporary file that is deleted when the invocation ends
//! - [`twin_label_row`]: the label row with the same data title in another
//!   project, plus its pending task if it has one

use super::context::Context;
use super::provider::{Args, Param, Provider, Scoped, ScopedProvider};
use crate::platform::{AgentTask, LabelRow, Project, StageType};
use anyhow::{Context as _, anyhow};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Downloaded content of the current label row.
#[derive(Debug, Clone)]
pub struct AssetFile {
    path: PathBuf,
    data_title: String,
}

impl AssetFile {
    /// Location of the temporary file; valid until the invocation ends.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data_title(&self) -> &str {
        &self.data_title
    }
}

/// Scoped provider downloading the current label row's asset to a temporary file.
pub fn asset_file() -> ScopedProvider {
    ScopedProvider::new(
        "asset_file",
        vec![
            Param::of::<Context>("context"),
            Param::of::<Project>("project"),
            Param::of::<LabelRow>("label_row"),
        ],
        |args: &Args| {
            let context = args.get::<Context>("context")?;
            let project = args.get::<Project>("project")?;
            let row = args.get::<LabelRow>("label_row")?;

            let content = context.platform().download_asset(&project, &row)?;
            let mut file = tempfile::Builder::new()
                .prefix("stagehand-asset-")
                .tempfile()
                .context("failed to create temporary asset file")?;
            file.write_all(&content)
                .context("failed to write temporary asset file")?;

            let path = file.into_temp_path();
            let asset = AssetFile {
                path: path.to_path_buf(),
                data_title: row.data_title.clone(),
            };
            tracing::debug!(path = %asset.path.display(), bytes = content.len(), "downloaded asset");

            Ok(Scoped::new(asset).on_release(move || {
                path.close().context("failed to remove temporary asset file")
            }))
        },
    )
}

/// The counterpart of the current label row in a twin project.
#[derive(Debug, Clone)]
pub struct Twin {
    pub project: Project,
    pub label_row: LabelRow,
    /// Pending task of the twin row at one of the twin project's agent stages.
    pub task: Option<AgentTask>,
}

/// Provider resolving the [`Twin`] of the current label row in `twin_project`.
///
/// Rows are matched by data title. The twin row is returned initialised.
pub fn twin_label_row(twin_project: Uuid) -> Provider {
    Provider::new(
        "twin_label_row",
        vec![
            Param::of::<Context>("context"),
            Param::of::<LabelRow>("label_row"),
        ],
        move |args: &Args| {
            let context = args.get::<Context>("context")?;
            let row = args.get::<LabelRow>("label_row")?;
            let platform = context.platform();

            let project = platform.project(twin_project)?;
            let mut label_row = platform
                .label_rows_by_title(&project, &row.data_title)?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    anyhow!(
                        "no label row titled `{}` in twin project {}",
                        row.data_title,
                        twin_project
                    )
                })?;
            platform.initialise_labels(&project, std::slice::from_mut(&mut label_row))?;

            let mut task = None;
            for stage in platform.workflow_stages(&project)? {
                if stage.stage_type != StageType::Agent {
                    continue;
                }
                task = platform
                    .pending_tasks(&project, &stage)?
                    .into_iter()
                    .find(|t| t.data_id == label_row.data_id);
                if task.is_some() {
                    break;
                }
            }

            Ok(Twin {
                project,
                label_row,
                task,
            })
        },
    )
}
