//! Dependency resolution for template trees.
//!
//! The [`DependencyResolver`] turns a tree of tiered templates into a
//! [`NodeGraph`]. It discovers templates on demand: parsing starts at the
//! configured start points, and every include of a not-yet-seen structural id
//! registers a node and launches another parse.
//!
//! # Run states
//!
//! ```text
//! Scanning ──► Resolving ──► Quiescent ──► Done
//!    │                           │
//!    └──────────► Failed ◄───────┘ (strict integrity errors)
//! ```
//!
//! - **Scanning**: the three tier directories are walked concurrently to build
//!   the [`PathResolver`]. A walk failure aborts the run.
//! - **Resolving**: parses run as independent tokio tasks and stream
//!   [`ParseEvent`]s over one channel to this orchestrator, which is the only
//!   writer of the graph. Events of one template arrive in source order;
//!   events of different templates interleave freely.
//! - **Quiescent**: no parse is outstanding and none was started while
//!   checking (see [`quiescence`]).
//!
//! # Deduplication
//!
//! A node id is parsed at most once per run. An include of a known id only
//! adds a relation, which bounds the run to the set of unique ids reachable
//! from the start points and makes include cycles terminate.
//!
//! # Failure containment
//!
//! A template that cannot be read or lexed, or that includes an id with no
//! template file, fails only its own node. The failure is recorded in the
//! [`Resolution`] and sibling parses carry on. Only configuration errors,
//! scan errors, and graph integrity errors fail the run as a whole.
//!
//! # Example
//!
//! ```rust,no_run
//! use tiergraph::config::ResolverConfig;
//! use tiergraph::resolver::DependencyResolver;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ResolverConfig::new("templates").with_start_file("templates/home.tmpl");
//! let resolution = DependencyResolver::new(config).resolve().await?;
//!
//! for failure in resolution.failures() {
//!     eprintln!("{}: {}", failure.node, failure.error);
//! }
//! println!("{} node(s)", resolution.graph().len());
//! # Ok(())
//! # }
//! ```

pub mod path_resolver;
pub mod quiescence;
pub mod source;


pub use path_resolver::{PathResolver, Tier};
pub use quiescence::{Generation, WorkGuard, WorkTracker};
pub use source::{FsSource, TemplateSource};

use futures::FutureExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::{ResolverConfig, StartPoint};
use crate::constants::HIDDEN_PREFIX;
use crate::core::TierGraphError;
use crate::graph::{IdentityPolicy, NodeGraph, NodeStatus, Relation};
use crate::template::{AnnotationBlock, EventSink, ParseError, ParseEvent, parse_template};
use path_resolver::{normalize_extension, template_name};

/// Lifecycle state of a resolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Scanning,
    Resolving,
    Quiescent,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scanning => "scanning",
            Self::Resolving => "resolving",
            Self::Quiescent => "quiescent",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A failure attributed to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub node: String,
    pub error: TierGraphError,
}

/// Aggregate result of a run: the graph plus everything that went wrong per node.
#[derive(Debug, Clone)]
pub struct Resolution {
    graph: NodeGraph,
    failures: Vec<NodeFailure>,
    warnings: Vec<String>,
    start_nodes: Vec<String>,
    transitions: Vec<RunState>,
    generation: Option<Generation>,
}

impl Resolution {
    #[must_use]
    pub const fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    #[must_use]
    pub fn into_graph(self) -> NodeGraph {
        self.graph
    }

    /// Per-node failures in the order they were detected.
    #[must_use]
    pub fn failures(&self) -> &[NodeFailure] {
        &self.failures
    }

    pub fn failures_for<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a NodeFailure> + 'a {
        self.failures.iter().filter(move |f| f.node == node)
    }

    /// Ignored annotations, prefixed with the node they appeared in.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Ids of the start nodes, in start order.
    #[must_use]
    pub fn start_nodes(&self) -> &[String] {
        &self.start_nodes
    }

    /// Every state the run passed through, in order.
    #[must_use]
    pub fn transitions(&self) -> &[RunState] {
        &self.transitions
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.transitions.last().copied().unwrap_or(RunState::Scanning)
    }

    /// Work-tracker generation at which the run became quiescent.
    #[must_use]
    pub const fn quiescent_at(&self) -> Option<Generation> {
        self.generation
    }

    /// True when no node failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// `sha256:` digest of the graph's JSON form.
    ///
    /// Two runs over an unchanged tree produce the same fingerprint.
    ///
    /// # Errors
    ///
    /// Fails only if the graph cannot be serialized.
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        let canonical = serde_json::to_vec(&self.graph)?;
        Ok(format!("sha256:{}", hex::encode(Sha256::digest(&canonical))))
    }
}

/// Drives one resolution run per [`resolve`](Self::resolve) call.
#[derive(Debug)]
pub struct DependencyResolver<S: TemplateSource = FsSource> {
    config: ResolverConfig,
    source: Arc<S>,
}

impl DependencyResolver<FsSource> {
    /// Resolver reading templates from the filesystem.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_source(config, FsSource)
    }
}

impl<S: TemplateSource> DependencyResolver<S> {
    /// Resolver reading template text through `source`.
    ///
    /// Directory scanning always uses the filesystem; only template reads go
    /// through the source.
    #[must_use]
    pub fn with_source(config: ResolverConfig, source: S) -> Self {
        Self {
            config,
            source: Arc::new(source),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Run a full resolution.
    ///
    /// # Errors
    ///
    /// - [`TierGraphError::ConfigurationError`] if no start point is configured
    /// - [`TierGraphError::ScanError`] if a tier or start directory cannot be listed
    /// - [`TierGraphError::IntegrityError`] if graph invariants were violated
    ///   (duplicate nodes or fields under the strict policy)
    ///
    /// Per-node failures are not errors; they are returned in the [`Resolution`].
    pub async fn resolve(&self) -> Result<Resolution, TierGraphError> {
        let start = self.config.start_point()?;
        let extension = normalize_extension(&self.config.extension).to_string();

        let mut transitions = vec![RunState::Scanning];
        tracing::info!("Scanning templates under {}", self.config.root.display());
        let paths =
            match PathResolver::scan(&self.config.root, &self.config.tiers, &extension).await {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::error!("Run failed while scanning: {}", e);
                    return Err(e);
                }
            };
        let start_files = list_start_files(&start, &extension).await?;
        tracing::debug!("{} template(s) mapped, {} start file(s)", paths.len(), start_files.len());

        transitions.push(RunState::Resolving);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut run = Run {
            source: Arc::clone(&self.source),
            paths,
            extension,
            root_name: self.config.root_name.clone(),
            graph: NodeGraph::new(self.config.policy),
            tracker: WorkTracker::new(),
            in_flight: HashMap::new(),
            tasks: JoinSet::new(),
            tx,
            failures: Vec::new(),
            warnings: Vec::new(),
            integrity: Vec::new(),
            broken: HashSet::new(),
            start_nodes: Vec::new(),
        };

        let single = matches!(start, StartPoint::File(_));
        for path in start_files {
            run.start(&path, single).await?;
        }
        if run.start_nodes.is_empty() {
            tracing::warn!("No start templates found; the graph will be empty");
        }

        let tracker = run.tracker.clone();
        let quiesced = tracker.quiesced();
        tokio::pin!(quiesced);

        let generation = loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => run.apply(event),
                Some(joined) = run.tasks.join_next() => {
                    if let Err(e) = joined {
                        tracing::error!("Parse task ended abnormally: {}", e);
                    }
                }
                generation = &mut quiesced => break generation,
            }
        };
        transitions.push(RunState::Quiescent);
        tracing::debug!("Resolution quiescent with {} node(s)", run.graph.len());

        if !run.integrity.is_empty() {
            transitions.push(RunState::Failed);
            tracing::error!("Run failed with {} integrity error(s)", run.integrity.len());
            return Err(TierGraphError::IntegrityError {
                errors: run.integrity,
            });
        }

        transitions.push(RunState::Done);
        tracing::info!(
            "Resolved {} node(s) with {} failure(s)",
            run.graph.len(),
            run.failures.len()
        );

        Ok(Resolution {
            graph: run.graph,
            failures: run.failures,
            warnings: run.warnings,
            start_nodes: run.start_nodes,
            transitions,
            generation,
        })
    }
}

/// A parse event tagged with the node whose template produced it.
#[derive(Debug)]
struct NodeEvent {
    node: String,
    event: ParseEvent,
}

/// Forwards one parse's events to the orchestrator.
struct ChannelSink {
    node: String,
    tx: mpsc::UnboundedSender<NodeEvent>,
    terminated: bool,
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: ParseEvent) {
        self.terminated |= event.is_terminal();
        let event = NodeEvent {
            node: self.node.clone(),
            event,
        };
        if self.tx.send(event).is_err() {
            tracing::debug!("Dropping event for '{}': run no longer listening", self.node);
        }
    }
}

/// Mutable state of one run, owned by the orchestrator loop.
struct Run<S: TemplateSource> {
    source: Arc<S>,
    paths: PathResolver,
    extension: String,
    root_name: Option<String>,
    graph: NodeGraph,
    tracker: WorkTracker,
    /// One guard per node whose terminal event has not been processed yet
    in_flight: HashMap<String, WorkGuard>,
    tasks: JoinSet<()>,
    tx: mpsc::UnboundedSender<NodeEvent>,
    failures: Vec<NodeFailure>,
    warnings: Vec<String>,
    integrity: Vec<TierGraphError>,
    /// Nodes with at least one unresolved include
    broken: HashSet<String>,
    start_nodes: Vec<String>,
}

impl<S: TemplateSource> Run<S> {
    /// Register a start node and launch its parse.
    async fn start(&mut self, path: &Path, single: bool) -> Result<(), TierGraphError> {
        let canonical = tokio::fs::canonicalize(path).await.ok();
        let id = match canonical.as_deref().and_then(|c| self.paths.identify(c)) {
            Some(id) => id.to_string(),
            None => self.fallback_id(path, single)?,
        };

        if self.graph.has_node(&id) && self.graph.policy() == IdentityPolicy::Lenient {
            tracing::warn!("Start template {} maps to already-registered node '{}'", path.display(), id);
            self.warnings.push(format!(
                "{id}: start template {} maps to an already-registered node",
                path.display()
            ));
            return Ok(());
        }
        if let Err(e) = self.graph.add_node(&id) {
            self.record(e);
            return Ok(());
        }

        tracing::debug!("Start node '{}' from {}", id, path.display());
        let path = canonical.unwrap_or_else(|| path.to_path_buf());
        let result = self.graph.set_path(&id, path.clone());
        self.record_result(result);
        self.start_nodes.push(id.clone());
        self.launch(&id, path);
        Ok(())
    }

    fn fallback_id(&self, path: &Path, single: bool) -> Result<String, TierGraphError> {
        if single && let Some(name) = &self.root_name {
            return Ok(name.clone());
        }
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        template_name(file_name, &self.extension)
            .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TierGraphError::ConfigurationError {
                message: format!("cannot derive a node id from start template {}", path.display()),
            })
    }

    /// Spawn the parse of `id` as one unit of outstanding work.
    fn launch(&mut self, id: &str, path: PathBuf) {
        self.in_flight.insert(id.to_string(), self.tracker.begin());
        let source = Arc::clone(&self.source);
        let mut sink = ChannelSink {
            node: id.to_string(),
            tx: self.tx.clone(),
            terminated: false,
        };
        tracing::debug!("Parsing '{}' from {}", id, path.display());

        self.tasks.spawn(async move {
            let parse = AssertUnwindSafe(parse_template(source.as_ref(), &path, &mut sink));
            let panicked = parse.catch_unwind().await.is_err();
            // Every parse must end with exactly one terminal event
            if panicked && !sink.terminated {
                sink.emit(ParseEvent::Failed(ParseError::Interrupted {
                    path: path.display().to_string(),
                }));
            }
        });
    }

    fn apply(&mut self, NodeEvent { node, event }: NodeEvent) {
        match event {
            ParseEvent::Field(field) => {
                tracing::trace!("'{}' field '{}'", node, field.name);
                let result = self.graph.add_field(&node, field);
                self.record_result(result);
            }
            ParseEvent::Include { target, annotation } => self.include(&node, target, annotation),
            ParseEvent::NodeInfo(meta) => {
                let result = self.graph.add_meta(&node, &meta);
                self.record_result(result);
            }
            ParseEvent::Warning(message) => {
                tracing::warn!("In '{}': {}", node, message);
                self.warnings.push(format!("{node}: {message}"));
            }
            ParseEvent::Done => {
                let status = if self.broken.contains(&node) {
                    NodeStatus::Failed
                } else {
                    NodeStatus::Parsed
                };
                self.finish(&node, status);
            }
            ParseEvent::Failed(error) => {
                tracing::warn!("Failed to parse '{}': {}", node, error);
                self.failures.push(NodeFailure {
                    node: node.clone(),
                    error: TierGraphError::ParseFailure {
                        node: node.clone(),
                        reason: error.to_string(),
                    },
                });
                self.finish(&node, NodeStatus::Failed);
            }
        }
    }

    fn include(&mut self, node: &str, target: String, annotation: AnnotationBlock) {
        if !self.graph.has_node(&target) {
            self.discover(&target);
        }

        let resolved = self
            .graph
            .get_node(&target)
            .is_some_and(|n| n.status != NodeStatus::Unresolved);
        tracing::trace!("'{}' includes '{}' (resolved: {})", node, target, resolved);

        let relation = Relation {
            target: target.clone(),
            annotation,
            resolved,
        };
        let result = self.graph.add_relation(node, relation);
        self.record_result(result);

        if !resolved {
            tracing::warn!("'{}' includes unknown template '{}'", node, target);
            self.broken.insert(node.to_string());
            self.failures.push(NodeFailure {
                node: node.to_string(),
                error: TierGraphError::UnresolvedReference {
                    node: node.to_string(),
                    target,
                },
            });
        }
    }

    /// First sighting of an id: register it and parse it if it has a template.
    fn discover(&mut self, id: &str) {
        if let Err(e) = self.graph.add_node(id) {
            self.record(e);
            return;
        }
        match self.paths.resolve(id).map(Path::to_path_buf) {
            Some(path) => {
                let result = self.graph.set_path(id, path.clone());
                self.record_result(result);
                self.launch(id, path);
            }
            None => {
                let result = self.graph.set_status(id, NodeStatus::Unresolved);
                self.record_result(result);
            }
        }
    }

    fn finish(&mut self, node: &str, status: NodeStatus) {
        let result = self.graph.set_status(node, status);
        self.record_result(result);
        if self.in_flight.remove(node).is_none() {
            tracing::warn!("Terminal event for '{}' with no parse in flight", node);
        }
    }

    fn record_result(&mut self, result: Result<(), TierGraphError>) {
        if let Err(e) = result {
            self.record(e);
        }
    }

    fn record(&mut self, error: TierGraphError) {
        tracing::error!("Graph integrity: {}", error);
        self.integrity.push(error);
    }
}

/// Resolve a start point into the template files to start from.
async fn list_start_files(start: &StartPoint, extension: &str) -> Result<Vec<PathBuf>, TierGraphError> {
    let dir = match start {
        StartPoint::File(path) => return Ok(vec![path.clone()]),
        StartPoint::Directory(dir) => dir,
    };

    let scan_error = |e: std::io::Error| TierGraphError::ScanError {
        tier: "start".to_string(),
        path: dir.display().to_string(),
        reason: e.to_string(),
    };

    let mut reader = tokio::fs::read_dir(dir).await.map_err(scan_error)?;
    let mut files = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(scan_error)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(HIDDEN_PREFIX) {
            continue;
        }
        let is_template = template_name(name, extension).is_some();
        if is_template && tokio::fs::metadata(entry.path()).await.map_err(scan_error)?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
