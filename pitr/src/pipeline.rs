use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use pitr_config::shared::{PipelineConfig, RecoverConfig, SchemaSourceConfig};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bail;
use crate::binlog::{BinlogFileMeta, RecordDecoder, scan_dir};
use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, create_shutdown};
use crate::error::{ErrorKind, PitrError, PitrResult};
use crate::filter::TableFilter;
use crate::matcher::Matcher;
use crate::merge::{KwayMerge, MergeSource, SpillOutput, Spiller};
use crate::pitr_error;
use crate::schema::{SchemaReplayer, load_base_schema, load_history_file};
use crate::sink::Sink;
use crate::types::{PipelineId, RawRecord, RecordKind, RunSummary, SchemaEvent, TimeWindow};

/// Phase of a recovery run.
///
/// Phases advance strictly forward; [`PipelinePhase::Failed`] is reachable
/// from any of them. Map completes fully before Reduce starts, so segment
/// files are never read while still being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelinePhase {
    Selecting,
    Mapping,
    Reducing,
    Closed,
    Failed,
}

/// Shared state of the map phase.
///
/// All map workers funnel through this one lock: 2PC matching must see
/// every file (a transaction's prepare and outcome may land on different
/// nodes) and spill flushes must be mutually exclusive.
#[derive(Debug)]
struct MapState {
    matcher: Matcher,
    spiller: Spiller,
    ddl_events: Vec<SchemaEvent>,
}

/// Coordinator of one point-in-time recovery run.
///
/// Owns the full Selecting, Mapping, Reducing lifecycle and guarantees that
/// the run-scoped temporary directory is cleaned up on every exit path,
/// including failure and cancellation.
#[derive(Debug)]
pub struct Pipeline<K> {
    config: Arc<RecoverConfig>,
    sink: K,
    shutdown_tx: ShutdownTx,
    phase: PipelinePhase,
}

impl<K> Pipeline<K>
where
    K: Sink + Clone + Send + Sync + 'static,
{
    /// Creates a pipeline for one recovery run.
    pub fn new(config: RecoverConfig, sink: K) -> Self {
        // The receiver side is not kept here; workers subscribe to the
        // transmitter when they are spawned.
        let (shutdown_tx, _) = create_shutdown();

        Self {
            config: Arc::new(config),
            sink,
            shutdown_tx,
            phase: PipelinePhase::Selecting,
        }
    }

    /// Identifier of this run.
    pub fn id(&self) -> PipelineId {
        self.config.pipeline.id
    }

    /// Handle for requesting cancellation from outside the run.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Executes the run to completion and returns its summary.
    ///
    /// On any outcome the temporary segment directory is removed, unless
    /// `retain_temp_dir` keeps it for diagnostics.
    pub async fn run(mut self) -> PitrResult<RunSummary> {
        self.config.validate().map_err(|err| {
            pitr_error!(
                ErrorKind::ConfigError,
                "invalid recovery configuration",
                source: err
            )
        })?;

        let temp_dir = reserve_temp_dir(&self.config.pipeline).await?;
        info!(
            pipeline_id = self.id(),
            temp_dir = %temp_dir.display(),
            "starting recovery run"
        );

        let result = self.execute(&temp_dir).await;

        if self.config.pipeline.retain_temp_dir {
            info!(temp_dir = %temp_dir.display(), "retaining temp directory");
        } else if let Err(err) = tokio::fs::remove_dir_all(&temp_dir).await {
            warn!(
                temp_dir = %temp_dir.display(),
                error = %err,
                "failed to remove temp directory"
            );
        }

        match result {
            Ok(summary) => {
                self.enter(PipelinePhase::Closed);
                info!(
                    pipeline_id = self.id(),
                    emitted = summary.emitted_changes,
                    filtered = summary.filtered_changes,
                    orphans = summary.orphan_commits,
                    unresolved = summary.unresolved_prepares,
                    segments = summary.segments_spilled,
                    ddls = summary.ddls_applied,
                    "recovery run completed"
                );
                Ok(summary)
            }
            Err(err) => {
                self.enter(PipelinePhase::Failed);
                error!(pipeline_id = self.id(), error = %err, "recovery run failed");
                Err(err)
            }
        }
    }

    async fn execute(&mut self, temp_dir: &Path) -> PitrResult<RunSummary> {
        let window = TimeWindow {
            start_ts: self.config.pipeline.start_tso,
            stop_ts: self.config.pipeline.stop_tso,
        };

        let selected = self.select_files(window).await?;
        let mut replayer = self.load_schema(window).await?;

        self.enter(PipelinePhase::Mapping);
        let (matcher, spill_output, ddl_events) =
            self.map_files(&selected, window, temp_dir).await?;

        let match_outcome = matcher.finish();
        let segments_spilled = spill_output.segments_spilled();

        if let Some(replayer) = replayer.as_mut() {
            for event in ddl_events {
                replayer.enqueue(event);
            }
        }

        self.enter(PipelinePhase::Reducing);
        let mut sources = Vec::with_capacity(spill_output.segments.len() + 1);
        for path in &spill_output.segments {
            sources.push(MergeSource::open_segment(path).await?);
        }
        sources.push(MergeSource::resident(spill_output.resident));

        let (emitted_changes, filtered_changes) =
            self.reduce(sources, replayer.as_mut()).await?;

        Ok(RunSummary {
            emitted_changes,
            filtered_changes,
            orphan_commits: match_outcome.orphan_commits,
            unresolved_prepares: match_outcome.unresolved_prepares,
            segments_spilled,
            ddls_applied: replayer.map(|r| r.applied_in_window()).unwrap_or(0),
        })
    }

    /// Selecting: keeps every file whose commit range overlaps the window.
    ///
    /// Overlapping files are kept whole; record-granularity filtering
    /// happens in Map. Files without a known range are always kept, since
    /// they may hold prepares whose commits live elsewhere.
    async fn select_files(&mut self, window: TimeWindow) -> PitrResult<Vec<BinlogFileMeta>> {
        self.enter(PipelinePhase::Selecting);

        let scan = scan_dir(&self.config.pipeline.data_dir).await?;
        if !scan.corrupt.is_empty() {
            let errors: Vec<PitrError> = scan.corrupt.into_iter().map(|(_, err)| err).collect();
            return Err(PitrError::from(errors));
        }

        let total = scan.files.len();
        let selected: Vec<BinlogFileMeta> = scan
            .files
            .into_iter()
            .filter(|meta| match meta.commit_range {
                Some((min, max)) => window.overlaps(min, max),
                None => true,
            })
            .collect();

        if selected.is_empty() {
            bail!(
                ErrorKind::NoInputFiles,
                "no binlog files overlap the recovery window",
                format!(
                    "{} files scanned in {}, window [{}, {}]",
                    total,
                    self.config.pipeline.data_dir.display(),
                    window.start_ts,
                    window.stop_ts
                )
            );
        }

        let bytes: u64 = selected.iter().map(|meta| meta.size).sum();
        info!(
            selected = selected.len(),
            skipped = total - selected.len(),
            bytes,
            "selected binlog files"
        );

        Ok(selected)
    }

    async fn load_schema(&self, window: TimeWindow) -> PitrResult<Option<SchemaReplayer>> {
        let events = match &self.config.schema {
            SchemaSourceConfig::None => return Ok(None),
            SchemaSourceConfig::BaseFile { path } => load_base_schema(path).await?,
            SchemaSourceConfig::HistoryFile { path } => load_history_file(path, window).await?,
        };

        SchemaReplayer::from_events(events, window).map(Some)
    }

    /// Mapping: decodes every selected file concurrently, resolving 2PC
    /// pairs and spilling sorted segments.
    async fn map_files(
        &self,
        selected: &[BinlogFileMeta],
        window: TimeWindow,
        temp_dir: &Path,
    ) -> PitrResult<(Matcher, SpillOutput, Vec<SchemaEvent>)> {
        let spiller = Spiller::new(
            temp_dir.to_path_buf(),
            self.config.pipeline.spill.memory_bytes,
            self.config.pipeline.spill.max_records,
        );
        let state = Arc::new(Mutex::new(MapState {
            matcher: Matcher::new(),
            spiller,
            ddl_events: Vec::new(),
        }));

        let mut workers = Vec::with_capacity(selected.len());
        for meta in selected {
            workers.push(tokio::spawn(map_file(
                meta.path.clone(),
                window,
                state.clone(),
                self.shutdown_tx.subscribe(),
            )));
        }

        let mut errors = Vec::new();
        for joined in join_all(workers).await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                Err(err) => errors.push(pitr_error!(
                    ErrorKind::Unknown,
                    "map worker panicked",
                    source: err
                )),
            }
        }
        if !errors.is_empty() {
            return Err(PitrError::from(errors));
        }

        let state = Arc::try_unwrap(state).map_err(|_| {
            pitr_error!(
                ErrorKind::InvalidState,
                "map state still shared after all workers finished"
            )
        })?;
        let MapState {
            matcher,
            spiller,
            ddl_events,
        } = state.into_inner();

        Ok((matcher, spiller.finish(), ddl_events))
    }

    /// Reducing: merges the sorted runs, replays schema and filters, and
    /// streams ordered batches to the sink.
    async fn reduce(
        &self,
        sources: Vec<MergeSource>,
        mut replayer: Option<&mut SchemaReplayer>,
    ) -> PitrResult<(u64, u64)> {
        let shutdown = self.shutdown_tx.subscribe();
        let batch_size = self.config.pipeline.batch.max_size;
        let filter = TableFilter::from_config(&self.config.filter);

        let mut merge = KwayMerge::new(sources).await?;
        let mut batch = Vec::with_capacity(batch_size);
        let mut emitted = 0u64;
        let mut filtered = 0u64;

        while let Some(change) = merge.try_next().await? {
            if shutdown.is_requested() {
                bail!(ErrorKind::InvalidState, "recovery cancelled during reduce");
            }

            // Schema first: the change must be interpreted under the schema
            // active at its commit timestamp, and filtering runs on the
            // resolved identity.
            if let Some(replayer) = replayer.as_deref_mut() {
                replayer.advance_to(change.commit_ts)?;
            }

            if !filter.allows(&change.database, &change.table) {
                filtered += 1;
                continue;
            }

            emitted += 1;
            batch.push(change);
            if batch.len() >= batch_size {
                self.sink.write_changes(std::mem::take(&mut batch)).await?;
                batch.reserve(batch_size);
            }
        }

        if !batch.is_empty() {
            self.sink.write_changes(batch).await?;
        }
        self.sink.shutdown().await?;

        Ok((emitted, filtered))
    }

    fn enter(&mut self, phase: PipelinePhase) {
        if self.phase != phase {
            info!(pipeline_id = self.id(), from = ?self.phase, to = ?phase, "pipeline phase change");
            self.phase = phase;
        }
    }
}

/// Map worker: decodes one file into the shared map state.
///
/// Outcome records outside the window still resolve their prepares, so a
/// transaction preparing before the window and committing inside it is
/// recovered; only the resulting change's own commit timestamp decides
/// whether it is buffered.
async fn map_file(
    path: PathBuf,
    window: TimeWindow,
    state: Arc<Mutex<MapState>>,
    shutdown: ShutdownRx,
) -> PitrResult<()> {
    let mut decoder = RecordDecoder::open(&path).await?;

    while let Some(record) = decoder.next_record().await? {
        if shutdown.is_requested() {
            bail!(
                ErrorKind::InvalidState,
                "recovery cancelled during map",
                path.display()
            );
        }

        match record.kind {
            RecordKind::Ddl => {
                if window.contains(record.commit_ts) {
                    let RawRecord {
                        commit_ts, payload, ..
                    } = record;
                    state.lock().await.ddl_events.push(SchemaEvent {
                        version: 0,
                        finished_ts: commit_ts,
                        ddl: payload,
                    });
                }
            }
            _ => {
                let mut state = state.lock().await;
                if let Some(change) = state.matcher.observe(record)? {
                    if window.contains(change.commit_ts) {
                        state.spiller.push(change).await?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Creates the run-scoped temporary directory for spilled segments.
///
/// Lives under the configured override or, by default, next to the input
/// data. The name embeds the pipeline id and a fresh UUID so concurrent
/// runs never collide.
async fn reserve_temp_dir(config: &PipelineConfig) -> PitrResult<PathBuf> {
    let base = config
        .temp_dir
        .clone()
        .unwrap_or_else(|| config.data_dir.clone());
    let path = base.join(format!("pitr-{}-{}", config.id, Uuid::new_v4()));

    tokio::fs::create_dir_all(&path).await.map_err(|err| {
        pitr_error!(
            ErrorKind::IoError,
            "failed to create temp directory",
            path.display(),
            source: err
        )
    })?;

    Ok(path)
}
