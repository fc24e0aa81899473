//! The batch run: load → materialize folders → build lookups →
//! reconstruct in date order → write.
//!
//! Folder creation fans out and joins before anything else happens.
//! Reconstruction is strictly sequential but yields to the runtime between
//! batches, so background writes drain while later messages are rendered.
//! All writes are joined before the report is returned.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::config::{Config, ResolutionPolicy};
use crate::error::Result;
use crate::export::eml::render_eml;
use crate::export::manifest::{sha256_hex, Manifest, MANIFEST_FILE};
use crate::export::writer::EmlWriter;
use crate::folder::materialize_all;
use crate::lookup::LookupTables;
use crate::model::record::ExportSet;
use crate::reconstruct::{order_messages, ReconstructOptions, ReconstructOutcome, Reconstructor};
use crate::report::RunReport;
use crate::source::load_export;

/// Messages reconstructed between two yields to the runtime.
const YIELD_EVERY: usize = 256;

/// Everything a run needs besides the export itself.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_root: PathBuf,
    pub strip_host: bool,
    pub user_agent: String,
    pub policy: ResolutionPolicy,
    pub max_open_files: usize,
    pub manifest: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_root: config.output.root.clone(),
            strip_host: config.output.strip_host,
            user_agent: config.output.user_agent.clone(),
            policy: config.recovery.policy,
            max_open_files: config.recovery.max_open_files,
            manifest: false,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Load the export in `export_dir` and recover every message from it.
pub async fn run(
    export_dir: &Path,
    options: &RunOptions,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<RunReport> {
    let export = load_export(export_dir)?;
    recover(export, options, progress).await
}

/// Recover every salvageable message of an already loaded export.
///
/// The progress callback receives `(messages processed, messages total)`.
pub async fn recover(
    export: ExportSet,
    options: &RunOptions,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<RunReport> {
    let started = Instant::now();
    let root = options.output_root.as_path();

    let folders = materialize_all(&export.folders, root, options.strip_host).await?;
    let tables = LookupTables::build(&export, &folders, root);

    let ExportSet {
        messages,
        contents,
        unreadable_messages,
        ..
    } = export;
    let messages_read = messages.len() + unreadable_messages;
    let ordered = order_messages(messages);
    let total = ordered.messages.len() as u64;
    info!(
        messages = total,
        excluded = ordered.excluded,
        "Reconstructing messages"
    );

    let mut writer = EmlWriter::new(options.max_open_files);
    let mut manifest = options.manifest.then(Manifest::new);
    let mut reconstructor = Reconstructor::new(
        &tables,
        &contents,
        ReconstructOptions {
            user_agent: options.user_agent.clone(),
            policy: options.policy,
        },
    );

    let mut outcome = ReconstructOutcome::default();
    let mut failure = None;
    for chunk in ordered.messages.chunks(YIELD_EVERY) {
        let step = reconstructor
            .reconstruct_all(chunk, |message| {
                let bytes = render_eml(&message);
                let digest = manifest.as_ref().map(|_| sha256_hex(&bytes));
                let written = writer.submit(message.target.clone(), bytes);
                if let (Some(manifest), Some(digest)) = (manifest.as_mut(), digest) {
                    manifest.record(root, &written, &message.message_id, digest);
                }
                if let Some(progress) = progress {
                    progress(message.sequence + 1, total);
                }
                Ok(())
            })
            .and_then(|step| writer.reap().map(|()| step));
        match step {
            Ok(step) => outcome.absorb(step),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
        // Let queued writes run before rendering the next batch.
        tokio::task::yield_now().await;
    }
    let conversations = reconstructor.threads().conversations();

    if let Some(e) = failure {
        // Let in-flight writes settle before reporting the failure.
        let _ = writer.finish().await;
        return Err(e);
    }

    let summary = writer.finish().await?;
    let manifest_path = match manifest {
        Some(manifest) => {
            manifest.write(root)?;
            Some(root.join(MANIFEST_FILE))
        }
        None => None,
    };

    let report = RunReport {
        output_root: root.to_path_buf(),
        folders: folders.len(),
        messages_read,
        excluded: unreadable_messages + ordered.excluded + outcome.excluded,
        written: summary.files,
        skipped: outcome.skipped,
        replies: outcome.replies,
        conversations,
        renamed: summary.renamed,
        bytes_written: summary.bytes,
        elapsed_ms: started.elapsed().as_millis(),
        manifest: manifest_path,
    };
    info!(
        written = report.written,
        skipped = report.skipped.len(),
        excluded = report.excluded,
        "Done"
    );
    Ok(report)
}
