use std::io::{self, BufRead, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use fabric_topsis_core::{
    criterion_statistics, scoring_progress, weight_summary, Alternative, ComputationRun,
    Criterion, EngineConfig, Polarity, RunPhase, ScoreCell, ScoreMatrix, ScoringProgress,
    TopsisEngine, TopsisError, TopsisReport, TransitionError, WeightingMode,
};
use fabric_topsis_guide::{resource_text as guide_resource_text, resources as guide_resources};
use fabric_topsis_storage::{
    now_ms, AlternativePatch, CriterionPatch, NewAlternative, NewCriterion,
    PersistentDecisionStore, StorageBackend, StorageError, StoredRun,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::protocol::{
    JsonRpcRequest, JsonRpcResponse, INCOMPLETE_DATA, INVALID_DATA, INVALID_PARAMS,
    INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, STORAGE_FAILURE,
};

const DEFAULT_MCP_PROTOCOL_VERSION: &str = "2024-11-05";
/// Largest `Content-Length` body the stdio loop will buffer.
pub const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

pub struct DecisionServer {
    store: Arc<Mutex<Box<dyn StorageBackend>>>,
    config: ServerConfig,
    run_counter: AtomicU64,
}

impl DecisionServer {
    pub fn new() -> Result<Self, String> {
        let config = ServerConfig::from_env().map_err(|e| e.to_string())?;
        Self::with_config(config)
    }

    pub fn with_db_path(db_path: impl Into<std::path::PathBuf>) -> Result<Self, String> {
        Self::with_config(ServerConfig::with_db_path(db_path))
    }

    pub fn with_config(config: ServerConfig) -> Result<Self, String> {
        let store = PersistentDecisionStore::open(&config.db_path).map_err(|e| e.to_string())?;
        info!(
            db_path = %config.db_path.display(),
            weighting = config.weighting.as_str(),
            "decision server ready"
        );
        Ok(Self {
            store: Arc::new(Mutex::new(Box::new(store))),
            config,
            run_counter: AtomicU64::new(1),
        })
    }

    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "invalid jsonrpc version",
            ));
        }

        let is_notification = request.id.is_none();
        let id = request.id.clone().unwrap_or(Value::Null);

        if is_notification && request.method == "notifications/initialized" {
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => {
                let protocol_version = request
                    .params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_MCP_PROTOCOL_VERSION);
                JsonRpcResponse::success(
                    id,
                    json!({
                        "protocolVersion": protocol_version,
                        "serverInfo": {"name": "fabric-topsis-mcp", "version": env!("CARGO_PKG_VERSION")},
                        "capabilities": {
                            "tools": {
                                "listChanged": false
                            },
                            "resources": {
                                "subscribe": false,
                                "listChanged": false
                            }
                        }
                    }),
                )
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, tools_list_result()),
            "tools/call" => self.handle_tools_call(id, request.params),
            "resources/list" => JsonRpcResponse::success(id, resources_list_result()),
            "resources/read" => handle_resources_read(id, request.params),
            _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, "method not found"),
        };

        Some(response)
    }

    fn handle_tools_call(&self, id: Value, params: Value) -> JsonRpcResponse {
        let parsed: ToolsCallParams = match serde_json::from_value(params) {
            Ok(v) => v,
            Err(err) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("invalid params: {err}"));
            }
        };

        debug!(tool = parsed.name.as_str(), "tool call");
        let response = match parsed.name.as_str() {
            "criterion_add" => self.exec_criterion_add(id, parsed.arguments),
            "criterion_update" => self.exec_criterion_update(id, parsed.arguments),
            "criterion_remove" => self.exec_criterion_remove(id, parsed.arguments),
            "criterion_reorder" => self.exec_criterion_reorder(id, parsed.arguments),
            "criterion_list" => self.exec_criterion_list(id),
            "alternative_add" => self.exec_alternative_add(id, parsed.arguments),
            "alternative_update" => self.exec_alternative_update(id, parsed.arguments),
            "alternative_remove" => self.exec_alternative_remove(id, parsed.arguments),
            "alternative_reorder" => self.exec_alternative_reorder(id, parsed.arguments),
            "alternative_list" => self.exec_alternative_list(id),
            "score_set" => self.exec_score_set(id, parsed.arguments),
            "score_progress" => self.exec_score_progress(id),
            "topsis_compute" => self.exec_topsis_compute(id, parsed.arguments),
            "topsis_evaluate" => self.exec_topsis_evaluate(id, parsed.arguments),
            "topsis_results" => self.exec_topsis_results(id),
            _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, "unknown tool"),
        };
        if let Some(error) = &response.error {
            warn!(
                tool = parsed.name.as_str(),
                code = error.code,
                message = error.message.as_str(),
                "tool call failed"
            );
        }
        response
    }

    fn lock_store(
        &self,
        id: &Value,
    ) -> Result<std::sync::MutexGuard<'_, Box<dyn StorageBackend>>, JsonRpcResponse> {
        self.store
            .lock()
            .map_err(|_| JsonRpcResponse::error(id.clone(), STORAGE_FAILURE, "storage lock poisoned"))
    }

    fn exec_criterion_add(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: CriterionAddInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let polarity = match args.polarity.parse::<Polarity>() {
            Ok(v) => v,
            Err(err) => return topsis_error_response(id, &err),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        match locked.add_criterion(NewCriterion {
            name: args.name,
            weight: args.weight,
            polarity,
        }) {
            Ok(record) => tool_result(
                id,
                format!(
                    "added criterion {} ({}, weight {}, {})",
                    record.criterion.id,
                    record.criterion.name,
                    record.criterion.weight,
                    record.criterion.polarity
                ),
                json!(record),
            ),
            Err(err) => storage_error_response(id, &err),
        }
    }

    fn exec_criterion_update(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: CriterionUpdateInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let polarity = match args.polarity.as_deref().map(str::parse::<Polarity>).transpose() {
            Ok(v) => v,
            Err(err) => return topsis_error_response(id, &err),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        match locked.update_criterion(
            &args.id,
            CriterionPatch {
                name: args.name,
                weight: args.weight,
                polarity,
            },
        ) {
            Ok(record) => tool_result(
                id,
                format!("updated criterion {}", record.criterion.id),
                json!(record),
            ),
            Err(err) => storage_error_response(id, &err),
        }
    }

    fn exec_criterion_remove(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: IdInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        match locked.remove_criterion(&args.id) {
            Ok(removed) => tool_result(
                id,
                format!("criterion {} removed={removed}", args.id),
                json!({"id": args.id, "removed": removed}),
            ),
            Err(err) => storage_error_response(id, &err),
        }
    }

    fn exec_criterion_reorder(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: ReorderInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        if let Err(err) = locked.reorder_criteria(&args.ids) {
            return storage_error_response(id, &err);
        }
        let criteria = locked.criteria();
        tool_result(
            id,
            format!("reordered {} criteria", criteria.len()),
            json!({"criteria": criteria}),
        )
    }

    fn exec_criterion_list(&self, id: Value) -> JsonRpcResponse {
        let locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let criteria = locked.criteria();
        let plain: Vec<Criterion> = criteria.iter().map(|r| r.criterion.clone()).collect();
        let summary = weight_summary(&plain);

        tool_result(
            id,
            format!(
                "criteria={}, weight_total={:.2}, weight_average={:.2}",
                criteria.len(),
                summary.total,
                summary.average
            ),
            json!({
                "criteria": criteria,
                "weight_summary": summary
            }),
        )
    }

    fn exec_alternative_add(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: AlternativeAddInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        match locked.add_alternative(NewAlternative {
            name: args.name,
            description: args.description,
        }) {
            Ok(record) => tool_result(
                id,
                format!(
                    "added alternative {} ({})",
                    record.alternative.id, record.alternative.name
                ),
                json!(record),
            ),
            Err(err) => storage_error_response(id, &err),
        }
    }

    fn exec_alternative_update(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: AlternativeUpdateInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        match locked.update_alternative(
            &args.id,
            AlternativePatch {
                name: args.name,
                description: args.description,
            },
        ) {
            Ok(record) => tool_result(
                id,
                format!("updated alternative {}", record.alternative.id),
                json!(record),
            ),
            Err(err) => storage_error_response(id, &err),
        }
    }

    fn exec_alternative_remove(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: IdInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        match locked.remove_alternative(&args.id) {
            Ok(removed) => tool_result(
                id,
                format!("alternative {} removed={removed}", args.id),
                json!({"id": args.id, "removed": removed}),
            ),
            Err(err) => storage_error_response(id, &err),
        }
    }

    fn exec_alternative_reorder(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: ReorderInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        if let Err(err) = locked.reorder_alternatives(&args.ids) {
            return storage_error_response(id, &err);
        }
        let alternatives = locked.alternatives();
        tool_result(
            id,
            format!("reordered {} alternatives", alternatives.len()),
            json!({"alternatives": alternatives}),
        )
    }

    fn exec_alternative_list(&self, id: Value) -> JsonRpcResponse {
        let locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let alternatives = locked.alternatives();
        tool_result(
            id,
            format!("alternatives={}", alternatives.len()),
            json!({"alternatives": alternatives}),
        )
    }

    fn exec_score_set(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: ScoreSetInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let cells = match args.into_cells() {
            Ok(v) => v,
            Err(msg) => return JsonRpcResponse::error(id, INVALID_PARAMS, msg),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        if let Err(err) = locked.set_scores(&cells) {
            return storage_error_response(id, &err);
        }
        let snapshot = locked.snapshot();
        let progress = scoring_progress(&snapshot.criteria, &snapshot.alternatives, &snapshot.scores);

        tool_result(
            id,
            format!(
                "stored {} score(s); {}/{} filled ({}%)",
                cells.len(),
                progress.filled,
                progress.required,
                progress.percent
            ),
            json!({
                "written": cells.len(),
                "progress": progress_json(&progress)
            }),
        )
    }

    fn exec_score_progress(&self, id: Value) -> JsonRpcResponse {
        let locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let snapshot = locked.snapshot();
        let progress = scoring_progress(&snapshot.criteria, &snapshot.alternatives, &snapshot.scores);
        let statistics =
            criterion_statistics(&snapshot.criteria, &snapshot.alternatives, &snapshot.scores);

        tool_result(
            id,
            format!(
                "{}/{} scores filled ({}%), missing={}",
                progress.filled,
                progress.required,
                progress.percent,
                progress.missing()
            ),
            json!({
                "progress": progress_json(&progress),
                "statistics": statistics,
                "store": locked.stats()
            }),
        )
    }

    fn exec_topsis_compute(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: WeightingInput = match parse_args_optional(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let weighting = match self.resolve_weighting(args.weighting.as_deref()) {
            Ok(v) => v,
            Err(err) => return topsis_error_response(id, &err),
        };
        let mut locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        let mut run = ComputationRun::new(self.next_run_id());
        let outcome = compute_and_persist(&mut run, locked.as_mut(), weighting);
        let (report, stored) = match outcome {
            Ok(v) => v,
            Err(failure) => {
                run.fail(failure.to_string());
                return failure.into_response(id);
            }
        };

        let summary = report.summary();
        let best = summary.as_ref().map_or_else(
            || "-".to_string(),
            |s| format!("{} ({:.4})", s.best_alternative_id, s.best_score),
        );
        tool_result(
            id,
            format!(
                "run={}, weighting={}, best={best}, alternatives={}",
                run.run_id(),
                report.weighting,
                report.outcomes.len()
            ),
            json!({
                "run_id": run.run_id(),
                "phases": run.history(),
                "stored": stored,
                "summary": summary,
                "report": report
            }),
        )
    }

    fn exec_topsis_evaluate(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: TopsisEvaluateInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let weighting = match self.resolve_weighting(args.weighting.as_deref()) {
            Ok(v) => v,
            Err(err) => return topsis_error_response(id, &err),
        };
        let scores: ScoreMatrix = args.scores.into_iter().collect();

        let engine = TopsisEngine::new(EngineConfig::with_weighting(weighting));
        match engine.evaluate(&args.criteria, &args.alternatives, &scores) {
            Ok(report) => {
                let summary = report.summary();
                tool_result(
                    id,
                    format!(
                        "weighting={}, ranking={}",
                        report.weighting,
                        report
                            .ranking()
                            .iter()
                            .map(|o| o.alternative_id.as_str())
                            .collect::<Vec<_>>()
                            .join(" > ")
                    ),
                    json!({
                        "summary": summary,
                        "report": report
                    }),
                )
            }
            Err(err) => topsis_error_response(id, &err),
        }
    }

    fn exec_topsis_results(&self, id: Value) -> JsonRpcResponse {
        let locked = match self.lock_store(&id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let Some(run) = locked.results() else {
            return tool_result(
                id,
                "no stored results; run topsis_compute first".to_string(),
                json!({"available": false, "run": Value::Null, "stale": false}),
            );
        };

        let stale = run.input_revision != locked.revision();
        let best = run.results.first();
        let runner_up = run.results.get(1);
        let summary = best.map(|b| {
            json!({
                "best_alternative_id": b.alternative_id,
                "best_alternative_name": b.alternative_name,
                "best_score": b.preference_score,
                "runner_up_margin": runner_up.map_or(0.0, |r| b.preference_score - r.preference_score),
                "alternative_count": run.results.len()
            })
        });

        tool_result(
            id,
            format!(
                "run={}, weighting={}, results={}, stale={stale}",
                run.run_id,
                run.weighting,
                run.results.len()
            ),
            json!({
                "available": true,
                "stale": stale,
                "summary": summary,
                "run": run
            }),
        )
    }

    fn resolve_weighting(&self, requested: Option<&str>) -> Result<WeightingMode, TopsisError> {
        match requested.map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse(),
            None => Ok(self.config.weighting),
        }
    }

    fn next_run_id(&self) -> String {
        let seq = self.run_counter.fetch_add(1, Ordering::Relaxed);
        format!("run-{}-{seq}", now_ms())
    }

    pub fn serve_stdio(&self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut reader = io::BufReader::new(stdin.lock());
        let mut stdout = io::stdout();
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }

            let trimmed = line.trim_end_matches(['\r', '\n']).trim_start();
            if trimmed.is_empty() {
                continue;
            }

            let (payload, frame) = if is_stdio_header_line(trimmed) {
                let content_length = match read_stdio_content_length(&mut reader, trimmed) {
                    Ok(v) => v,
                    Err(err) => {
                        let response = JsonRpcResponse::error(
                            Value::Null,
                            PARSE_ERROR,
                            format!("invalid stdio frame: {err}"),
                        );
                        write_stdio_response(&mut stdout, &response, StdioFrame::LineDelimited)?;
                        continue;
                    }
                };

                if content_length > MAX_FRAME_BYTES {
                    // Body left unread; the next header line starts a new frame.
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!(
                            "stdio frame of {content_length} bytes exceeds the {MAX_FRAME_BYTES} byte limit"
                        ),
                    );
                    warn!(content_length, "rejected oversized stdio frame");
                    write_stdio_response(&mut stdout, &response, StdioFrame::ContentLength)?;
                    continue;
                }

                let mut body = vec![0_u8; content_length];
                if let Err(err) = reader.read_exact(&mut body) {
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("invalid stdio frame body: {err}"),
                    );
                    write_stdio_response(&mut stdout, &response, StdioFrame::ContentLength)?;
                    continue;
                }
                (body, StdioFrame::ContentLength)
            } else {
                (trimmed.as_bytes().to_vec(), StdioFrame::LineDelimited)
            };

            let request: JsonRpcRequest = match serde_json::from_slice(&payload) {
                Ok(v) => v,
                Err(err) => {
                    let response =
                        JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("parse error: {err}"));
                    write_stdio_response(&mut stdout, &response, frame)?;
                    continue;
                }
            };

            if let Some(response) = self.handle_request(request) {
                write_stdio_response(&mut stdout, &response, frame)?;
            }
        }

        Ok(())
    }
}

/// Drives one run through its phases. The store lock is held by the caller for
/// the whole run, so the snapshot and the stored results describe the same inputs.
fn compute_and_persist(
    run: &mut ComputationRun,
    store: &mut dyn StorageBackend,
    weighting: WeightingMode,
) -> Result<(TopsisReport, StoredRun), RunFailure> {
    run.advance(RunPhase::Validating)?;
    let snapshot = store.snapshot();
    let progress = scoring_progress(&snapshot.criteria, &snapshot.alternatives, &snapshot.scores);
    debug!(
        run_id = run.run_id(),
        required = progress.required,
        filled = progress.filled,
        "validating run inputs"
    );

    run.advance(RunPhase::Computing)?;
    let engine = TopsisEngine::new(EngineConfig::with_weighting(weighting));
    let report = engine.evaluate(&snapshot.criteria, &snapshot.alternatives, &snapshot.scores)?;

    run.advance(RunPhase::Persisting)?;
    let stored = StoredRun::from_report(run.run_id(), snapshot.revision, &report);
    store.replace_results(stored.clone())?;

    run.advance(RunPhase::Done)?;
    Ok((report, stored))
}

#[derive(Debug, Error)]
enum RunFailure {
    #[error(transparent)]
    Topsis(#[from] TopsisError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl RunFailure {
    fn into_response(self, id: Value) -> JsonRpcResponse {
        match self {
            Self::Topsis(err) => topsis_error_response(id, &err),
            Self::Storage(err) => storage_error_response(id, &err),
            Self::Transition(err) => JsonRpcResponse::error(id, STORAGE_FAILURE, err.to_string()),
        }
    }
}

fn topsis_error_response(id: Value, err: &TopsisError) -> JsonRpcResponse {
    if err.is_incomplete_data() {
        let data = match err {
            TopsisError::IncompleteData { required, present } => json!({
                "required": required,
                "present": present,
                "missing": err.missing()
            }),
            _ => json!({"required": 0, "present": 0, "missing": 0}),
        };
        return JsonRpcResponse::error_with_data(id, INCOMPLETE_DATA, err.to_string(), Some(data));
    }
    match err {
        TopsisError::UnknownWeighting(_) | TopsisError::UnknownPolarity(_) => {
            JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string())
        }
        _ => JsonRpcResponse::error(id, INVALID_DATA, err.to_string()),
    }
}

fn storage_error_response(id: Value, err: &StorageError) -> JsonRpcResponse {
    match err {
        StorageError::InvalidInput(_) | StorageError::NotFound { .. } => {
            JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string())
        }
        StorageError::Io(_) | StorageError::Serde(_) => {
            JsonRpcResponse::error(id, STORAGE_FAILURE, err.to_string())
        }
    }
}

fn tool_result(id: Value, text: String, structured: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "content": [
                {
                    "type": "text",
                    "text": text
                }
            ],
            "structuredContent": structured
        }),
    )
}

fn progress_json(progress: &ScoringProgress) -> Value {
    json!({
        "required": progress.required,
        "filled": progress.filled,
        "percent": progress.percent,
        "missing": progress.missing(),
        "complete": progress.is_complete()
    })
}

fn tools_list_result() -> Value {
    let polarity = json!({"type": "string", "enum": ["Benefit", "Cost"]});
    let weighting = json!({"type": "string", "enum": ["raw", "share"]});
    json!({
        "tools": [
            {
                "name": "criterion_add",
                "description": "Add an evaluation criterion with a weight and a polarity (Benefit: higher is better, Cost: lower is better).",
                "inputSchema": {
                    "type": "object",
                    "required": ["name", "weight", "polarity"],
                    "properties": {
                        "name": {"type": "string"},
                        "weight": {"type": "number", "minimum": 0},
                        "polarity": polarity
                    }
                }
            },
            {
                "name": "criterion_update",
                "description": "Change the name, weight or polarity of a criterion.",
                "inputSchema": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {
                        "id": {"type": "string"},
                        "name": {"type": "string"},
                        "weight": {"type": "number", "minimum": 0},
                        "polarity": polarity
                    }
                }
            },
            {
                "name": "criterion_remove",
                "description": "Remove a criterion and every score recorded for it.",
                "inputSchema": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {"id": {"type": "string"}}
                }
            },
            {
                "name": "criterion_reorder",
                "description": "Set the display and computation order of all criteria.",
                "inputSchema": {
                    "type": "object",
                    "required": ["ids"],
                    "properties": {"ids": {"type": "array", "items": {"type": "string"}}}
                }
            },
            {
                "name": "criterion_list",
                "description": "List criteria in order with the weight total, average and per-criterion share.",
                "inputSchema": {"type": "object", "properties": {}}
            },
            {
                "name": "alternative_add",
                "description": "Add a candidate fabric.",
                "inputSchema": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": {"type": "string"},
                        "description": {"type": "string"}
                    }
                }
            },
            {
                "name": "alternative_update",
                "description": "Change the name or description of a candidate fabric.",
                "inputSchema": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {
                        "id": {"type": "string"},
                        "name": {"type": "string"},
                        "description": {"type": "string"}
                    }
                }
            },
            {
                "name": "alternative_remove",
                "description": "Remove a candidate fabric and its scores.",
                "inputSchema": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {"id": {"type": "string"}}
                }
            },
            {
                "name": "alternative_reorder",
                "description": "Set the display order of all candidate fabrics. Exact score ties rank in this order.",
                "inputSchema": {
                    "type": "object",
                    "required": ["ids"],
                    "properties": {"ids": {"type": "array", "items": {"type": "string"}}}
                }
            },
            {
                "name": "alternative_list",
                "description": "List candidate fabrics in order.",
                "inputSchema": {"type": "object", "properties": {}}
            },
            {
                "name": "score_set",
                "description": "Record one score, or a batch of scores written all-or-nothing.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "alternative_id": {"type": "string"},
                        "criterion_id": {"type": "string"},
                        "value": {"type": "number", "minimum": 0},
                        "scores": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["alternative_id", "criterion_id", "value"],
                                "properties": {
                                    "alternative_id": {"type": "string"},
                                    "criterion_id": {"type": "string"},
                                    "value": {"type": "number", "minimum": 0}
                                }
                            }
                        }
                    }
                }
            },
            {
                "name": "score_progress",
                "description": "Score matrix completion and per-criterion mean, min and max.",
                "inputSchema": {"type": "object", "properties": {}}
            },
            {
                "name": "topsis_compute",
                "description": "Rank the stored fabrics with TOPSIS and replace the stored results.",
                "inputSchema": {
                    "type": "object",
                    "properties": {"weighting": weighting}
                }
            },
            {
                "name": "topsis_evaluate",
                "description": "Rank an inline decision problem without touching the store.",
                "inputSchema": {
                    "type": "object",
                    "required": ["criteria", "alternatives", "scores"],
                    "properties": {
                        "criteria": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["id", "name", "weight", "polarity"],
                                "properties": {
                                    "id": {"type": "string"},
                                    "name": {"type": "string"},
                                    "weight": {"type": "number"},
                                    "polarity": polarity
                                }
                            }
                        },
                        "alternatives": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["id", "name"],
                                "properties": {
                                    "id": {"type": "string"},
                                    "name": {"type": "string"},
                                    "description": {"type": "string"}
                                }
                            }
                        },
                        "scores": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["alternative_id", "criterion_id", "value"],
                                "properties": {
                                    "alternative_id": {"type": "string"},
                                    "criterion_id": {"type": "string"},
                                    "value": {"type": "number"}
                                }
                            }
                        },
                        "weighting": weighting
                    }
                }
            },
            {
                "name": "topsis_results",
                "description": "Last stored ranking, its summary, and whether inputs changed since it was computed.",
                "inputSchema": {"type": "object", "properties": {}}
            }
        ]
    })
}

fn resources_list_result() -> Value {
    let resources = guide_resources()
        .iter()
        .map(|resource| {
            json!({
                "uri": resource.uri,
                "name": resource.name,
                "description": resource.description,
                "mimeType": resource.mime_type
            })
        })
        .collect::<Vec<_>>();
    json!({
        "resources": resources
    })
}

fn handle_resources_read(id: Value, params: Value) -> JsonRpcResponse {
    let parsed: ResourceReadParams = match serde_json::from_value(params) {
        Ok(v) => v,
        Err(err) => {
            return JsonRpcResponse::error(id, INVALID_PARAMS, format!("invalid params: {err}"));
        }
    };
    let Some(text) = guide_resource_text(&parsed.uri) else {
        return JsonRpcResponse::error(id, INVALID_PARAMS, "unknown resource uri");
    };

    JsonRpcResponse::success(
        id,
        json!({
            "contents": [{
                "uri": parsed.uri,
                "mimeType": "text/markdown",
                "text": text
            }]
        }),
    )
}

fn with_id(mut response: JsonRpcResponse, id: Value) -> JsonRpcResponse {
    response.id = id;
    response
}

#[derive(Clone, Copy)]
enum StdioFrame {
    LineDelimited,
    ContentLength,
}

fn write_stdio_response(
    stdout: &mut io::Stdout,
    response: &JsonRpcResponse,
    frame: StdioFrame,
) -> io::Result<()> {
    match frame {
        StdioFrame::LineDelimited => {
            let serialized = serde_json::to_string(response)?;
            writeln!(stdout, "{serialized}")?;
        }
        StdioFrame::ContentLength => {
            let serialized = serde_json::to_vec(response)?;
            write!(stdout, "Content-Length: {}\r\n\r\n", serialized.len())?;
            stdout.write_all(&serialized)?;
        }
    }
    stdout.flush()
}

fn is_stdio_header_line(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("content-length:") || lower.starts_with("content-type:")
}

fn read_stdio_content_length<R: BufRead>(reader: &mut R, first_line: &str) -> io::Result<usize> {
    let mut content_length = parse_content_length(first_line);
    let mut header_line = String::new();
    loop {
        header_line.clear();
        if reader.read_line(&mut header_line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "unexpected eof while reading frame headers",
            ));
        }
        let trimmed = header_line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some(v) = parse_content_length(trimmed) {
            content_length = Some(v);
        }
    }
    content_length
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing content-length header"))
}

fn parse_content_length(line: &str) -> Option<usize> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse::<usize>().ok()
}

fn parse_args<T: for<'de> Deserialize<'de>>(
    arguments: Option<Value>,
) -> Result<T, JsonRpcResponse> {
    let Some(args) = arguments else {
        return Err(JsonRpcResponse::error(
            Value::Null,
            INVALID_PARAMS,
            "missing tool arguments",
        ));
    };

    serde_json::from_value(args).map_err(|err| {
        JsonRpcResponse::error(
            Value::Null,
            INVALID_PARAMS,
            format!("invalid tool arguments: {err}"),
        )
    })
}

fn parse_args_optional<T: for<'de> Deserialize<'de> + Default>(
    arguments: Option<Value>,
) -> Result<T, JsonRpcResponse> {
    match arguments {
        Some(Value::Null) | None => Ok(T::default()),
        Some(v) => serde_json::from_value(v).map_err(|err| {
            JsonRpcResponse::error(
                Value::Null,
                INVALID_PARAMS,
                format!("invalid tool arguments: {err}"),
            )
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ToolsCallParams {
    name: String,
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResourceReadParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct IdInput {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ReorderInput {
    ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CriterionAddInput {
    name: String,
    weight: f64,
    polarity: String,
}

#[derive(Debug, Deserialize)]
struct CriterionUpdateInput {
    id: String,
    name: Option<String>,
    weight: Option<f64>,
    polarity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlternativeAddInput {
    name: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlternativeUpdateInput {
    id: String,
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScoreSetInput {
    alternative_id: Option<String>,
    criterion_id: Option<String>,
    value: Option<f64>,
    scores: Option<Vec<ScoreCell>>,
}

impl ScoreSetInput {
    fn into_cells(self) -> Result<Vec<ScoreCell>, String> {
        let mut cells = self.scores.unwrap_or_default();
        match (self.alternative_id, self.criterion_id, self.value) {
            (Some(alternative_id), Some(criterion_id), Some(value)) => cells.push(ScoreCell {
                alternative_id,
                criterion_id,
                value,
            }),
            (None, None, None) => {}
            _ => {
                return Err(
                    "a single score needs alternative_id, criterion_id and value".to_string(),
                )
            }
        }
        if cells.is_empty() {
            return Err("no scores given".to_string());
        }
        Ok(cells)
    }
}

#[derive(Debug, Default, Deserialize)]
struct WeightingInput {
    weighting: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopsisEvaluateInput {
    criteria: Vec<Criterion>,
    alternatives: Vec<Alternative>,
    scores: Vec<ScoreCell>,
    weighting: Option<String>,
}
