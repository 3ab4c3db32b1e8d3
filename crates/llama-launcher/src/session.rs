//! One interactive launch session.
//!
//! Strictly sequential: binary pre-check, memory probe, model selection,
//! context negotiation, the remaining server parameters, port negotiation.
//! Every retry is driven by the user; nothing is retried automatically.

use crate::advisor::{ContextCostModel, ContextFitAdvisor, PortConflictResolver, PortProbe};
use crate::config::LauncherConfig;
use crate::config_store::{ConfigStore, PersistedConfig, MODEL_DIR_KEY};
use crate::error::{LaunchError, Result};
use crate::launcher::find_binary;
use crate::memory::{AvailabilityEstimator, MemoryProbe, MemorySnapshot, SafeLimit};
use crate::models::{model_size, ModelCatalog, MODEL_EXTENSION};
use crate::plan::LaunchPlan;
use crate::prompt::{prompt_number, Prompter};
use crate::utils::{expand_home, TextUtils};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const RULE: &str = "========================================";

/// Fraction of total RAM above which a model gets a soft warning.
const MODEL_RAM_WARNING_RATIO: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Every parameter is validated; `config` carries the model directory.
    Ready {
        plan: LaunchPlan,
        config: PersistedConfig,
    },
    /// The user chose to stop before a plan was complete.
    Cancelled,
}

/// Memory facts gathered once at session start.
#[derive(Debug, Clone, Copy)]
struct MemoryView {
    snapshot: Option<MemorySnapshot>,
    safe_limit: Option<SafeLimit>,
}

pub struct Session<'a, P: ?Sized, M: ?Sized, Q: ?Sized> {
    cfg: &'a LauncherConfig,
    store: ConfigStore,
    prompter: &'a mut P,
    memory: &'a M,
    ports: &'a Q,
}

impl<'a, P, M, Q> Session<'a, P, M, Q>
where
    P: Prompter + ?Sized,
    M: MemoryProbe + ?Sized,
    Q: PortProbe + ?Sized,
{
    pub fn new(cfg: &'a LauncherConfig, prompter: &'a mut P, memory: &'a M, ports: &'a Q) -> Self {
        Self {
            cfg,
            store: ConfigStore::new(cfg.config_path.clone()),
            prompter,
            memory,
            ports,
        }
    }

    pub fn run(&mut self) -> Result<SessionOutcome> {
        self.prompter.say(RULE);
        self.prompter.say("Llama Command Builder");
        self.prompter.say(RULE);

        if !self.check_binary()? {
            return Ok(SessionOutcome::Cancelled);
        }

        let memory = self.probe_memory();

        let (model, config) = self.select_model()?;
        let model_bytes = match self.inspect_model(&model, &memory)? {
            ModelCheck::Proceed(size) => size,
            ModelCheck::Rejected => return Ok(SessionOutcome::Cancelled),
        };

        let d = self.cfg.defaults.clone();

        let alias_default = alias_for(&model);
        let alias = self.prompter.input(
            "Alias (--alias)",
            Some(&alias_default),
            Some("A recognizable name for ease of use with agents."),
        )?;
        let alias = if alias.is_empty() { alias_default } else { alias };

        let advisor = ContextFitAdvisor::new(
            memory.safe_limit,
            model_bytes,
            ContextCostModel::from_mib_per_token(self.cfg.mib_per_token),
        );
        let ctx_default = advisor.suggest_default(d.ctx_size);
        if ctx_default != d.ctx_size {
            self.prompter.say(&format!(
                "Suggested context size for available memory: {}",
                ctx_default
            ));
        }
        let raw_ctx = self.prompter.input(
            "Context Size (-c)",
            Some(&ctx_default.to_string()),
            Some("Size of the prompt context (tokens). Higher values use more memory."),
        )?;
        let ctx_size = advisor.negotiate(&mut *self.prompter, raw_ctx)?;

        let n_predict = prompt_number(
            &mut *self.prompter,
            "Predict Length (-n)",
            d.n_predict,
            Some("Maximum number of tokens to predict/generate."),
            "predict length",
        )?;
        let gpu_layers = prompt_number(
            &mut *self.prompter,
            "GPU Layers (-ngl)",
            d.gpu_layers,
            Some("Number of layers to offload to GPU. 99 usually means all layers."),
            "layer count",
        )?;
        let batch_size = prompt_number(
            &mut *self.prompter,
            "Batch Size (-b)",
            d.batch_size,
            Some("Logical batch size for prompt processing."),
            "batch size",
        )?;
        let ubatch_size = prompt_number(
            &mut *self.prompter,
            "UBatch Size (-ub)",
            d.ubatch_size,
            Some("Physical batch size."),
            "micro-batch size",
        )?;

        let proposed_port = prompt_number(
            &mut *self.prompter,
            "Port (--port)",
            d.port,
            Some("Port listener for the server."),
            "port",
        )?;
        let port = PortConflictResolver::new(self.ports).resolve(&mut *self.prompter, proposed_port)?;

        let parallel_slots = prompt_number(
            &mut *self.prompter,
            "Parallel Slots (-np)",
            d.parallel_slots,
            Some("Number of simultaneous requests to process."),
            "slot count",
        )?;
        let flash_attn = self.prompter.confirm(
            "Flash Attention (-fa)",
            d.flash_attn,
            Some("Enable Flash Attention (optimizes speed/memory, recommended for Apple Silicon)."),
        )?;
        let jinja = self.prompter.confirm(
            "Enable Jinja Templates (--jinja)",
            d.jinja,
            Some("Enable jinja2 template support for chat templates."),
        )?;

        let plan = LaunchPlan {
            model,
            alias,
            ctx_size,
            n_predict,
            gpu_layers,
            batch_size,
            ubatch_size,
            port,
            parallel_slots,
            flash_attn,
            jinja,
        };
        info!("Launch plan complete: {}", plan.command_line(&self.cfg.binary));
        Ok(SessionOutcome::Ready { plan, config })
    }

    pub fn preview(&mut self, plan: &LaunchPlan) {
        self.prompter.say("\nGenerated Command:");
        self.prompter.say("----------------------------------------");
        self.prompter.say(&plan.command_line(&self.cfg.binary));
        self.prompter.say("----------------------------------------");
    }

    /// Print the command and ask whether to run it now.
    pub fn confirm_launch(&mut self, plan: &LaunchPlan) -> Result<bool> {
        self.preview(plan);
        self.prompter.confirm(
            "Run this command now?",
            true,
            Some("Execute the server command immediately."),
        )
    }

    fn check_binary(&mut self) -> Result<bool> {
        if find_binary(&self.cfg.binary).is_some() {
            return Ok(true);
        }
        self.prompter.warn(&format!(
            "[WARNING] '{}' binary not found in PATH.",
            self.cfg.binary
        ));
        self.prompter.say("You may need to install it or ensure it's in your PATH.");
        self.prompter.confirm("Continue anyway?", true, None)
    }

    fn probe_memory(&mut self) -> MemoryView {
        let snapshot = self.memory.probe();
        let estimator = AvailabilityEstimator::new(self.cfg.overhead_margin_bytes);
        let safe_limit = estimator.compute_safe_limit(snapshot.as_ref());

        match (snapshot, safe_limit) {
            (Some(s), Some(limit)) => {
                debug!("Memory snapshot: {:?}", s);
                self.prompter.say(&format!(
                    "System RAM detected: {}",
                    TextUtils::format_bytes(s.total_bytes)
                ));
                self.prompter.say(&format!(
                    "Safe usable memory: {} (after {} wired, {} compressed, {} reserved)",
                    TextUtils::format_bytes(limit.bytes()),
                    TextUtils::format_bytes(s.wired_bytes),
                    TextUtils::format_bytes(s.compressed_bytes),
                    TextUtils::format_bytes(estimator.overhead_margin_bytes()),
                ));
            }
            _ => info!("No memory statistics; context advisories disabled"),
        }

        MemoryView {
            snapshot,
            safe_limit,
        }
    }

    fn select_model(&mut self) -> Result<(String, PersistedConfig)> {
        let mut config = self.store.load();
        let mut catalog = scan_models(&config);

        if catalog.is_empty() {
            if let Some(updated) = self.first_run_setup()? {
                config = updated;
                catalog = scan_models(&config);
            }
        }

        if catalog.is_empty() {
            let model = self.require_text("Model Path (-m)", Some("Path to the GGUF model file"))?;
            return Ok((model, config));
        }

        self.prompter.say(&format!("\n{}", RULE));
        self.prompter.say("Available Models:");
        for (i, candidate) in catalog.candidates().iter().enumerate() {
            self.prompter.say(&format!(
                "{}) {} ({})",
                i + 1,
                candidate.file_name(),
                TextUtils::format_bytes(candidate.size_bytes)
            ));
        }
        self.prompter.say(RULE);

        let mut description = Some("Select a model by number, or enter a custom path.");
        loop {
            let answer = self.prompter.input("Model Path (-m)", None, description)?;
            description = None;

            if answer.is_empty() {
                self.prompter.say("Please select a model.");
                continue;
            }
            if answer.chars().all(|c| c.is_ascii_digit()) {
                match answer.parse::<usize>().ok().and_then(|n| catalog.by_number(n)) {
                    Some(candidate) => {
                        return Ok((candidate.path.display().to_string(), config));
                    }
                    None => {
                        self.prompter.say("Invalid selection number.");
                        continue;
                    }
                }
            }
            return Ok((answer, config));
        }
    }

    /// Ask for the model directory when none yields models. `None` when the
    /// user declines to create a missing directory or creation fails.
    fn first_run_setup(&mut self) -> Result<Option<PersistedConfig>> {
        self.prompter.say(&format!("\n{}", RULE));
        self.prompter.say(&format!("No {} models found.", MODEL_EXTENSION.to_uppercase()));
        self.prompter.say(
            "It looks like this is your first time running this tool (or no models were found).",
        );
        self.prompter.say(RULE);

        let raw = loop {
            let raw = self.prompter.input(
                &format!("Enter the path to your .{} models directory", MODEL_EXTENSION),
                None,
                None,
            )?;
            if !raw.is_empty() {
                break raw;
            }
            self.prompter.say("Path cannot be empty. Please enter a valid path.");
        };

        let expanded = expand_home(&raw);
        if !expanded.is_dir() {
            self.prompter.warn(&format!(
                "Warning: '{}' does not exist or is not a directory.",
                expanded.display()
            ));
            if !self.prompter.confirm("Create it?", false, None)? {
                return Ok(None);
            }
            if let Err(e) = fs::create_dir_all(&expanded) {
                self.prompter.warn(&format!("Error creating directory: {}", e));
                return Ok(None);
            }
            self.prompter.say(&format!("Created {}", expanded.display()));
        }

        match self.store.save_model_dir(&raw) {
            Ok(config) => {
                self.prompter.say(&format!(
                    "Configuration saved to {}",
                    self.store.path().display()
                ));
                Ok(Some(config))
            }
            Err(e) => {
                warn!("Failed to persist model_dir: {}", e);
                self.prompter.warn(&format!(
                    "Could not save configuration to {}: {}",
                    self.store.path().display(),
                    e
                ));
                let mut config = self.store.load();
                config.set(MODEL_DIR_KEY, &raw);
                Ok(Some(config))
            }
        }
    }

    fn require_text(&mut self, label: &str, description: Option<&str>) -> Result<String> {
        let mut description = description;
        loop {
            let answer = self.prompter.input(label, None, description)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.prompter.say("A value is required.");
            description = None;
        }
    }

    /// Footprint checks against total RAM. Only runs with memory statistics;
    /// a vanished model file disables the context advisory instead of failing.
    fn inspect_model(&mut self, model: &str, memory: &MemoryView) -> Result<ModelCheck> {
        let Some(snapshot) = memory.snapshot else {
            return Ok(ModelCheck::Proceed(None));
        };

        let path = expand_home(model);
        let size = match model_size(&path) {
            Ok(size) => size,
            Err(LaunchError::ModelNotFound(p)) => {
                self.prompter.warn(&format!(
                    "[WARNING] Model file not found: {}. Memory checks skipped.",
                    p.display()
                ));
                return Ok(ModelCheck::Proceed(None));
            }
            Err(e) => {
                warn!("Could not inspect {}: {}", path.display(), e);
                return Ok(ModelCheck::Proceed(None));
            }
        };

        let total = snapshot.total_bytes;
        if size > total {
            self.prompter.warn(&format!(
                "[CRITICAL] Model size ({}) exceeds total system RAM ({})!",
                TextUtils::format_bytes(size),
                TextUtils::format_bytes(total)
            ));
            self.prompter.say("This will likely crash or swap heavily.");
            if !self.prompter.confirm("Are you sure you want to use this model?", false, None)? {
                return Ok(ModelCheck::Rejected);
            }
        } else if size as f64 > total as f64 * MODEL_RAM_WARNING_RATIO {
            self.prompter.warn(&format!(
                "[WARNING] Model size ({}) is close to system RAM limit.",
                TextUtils::format_bytes(size)
            ));
        }

        Ok(ModelCheck::Proceed(Some(size)))
    }
}

enum ModelCheck {
    Proceed(Option<u64>),
    Rejected,
}

fn scan_models(config: &PersistedConfig) -> ModelCatalog {
    let Some(dir) = config.resolved_model_dir() else {
        return ModelCatalog::default();
    };
    ModelCatalog::scan(&dir).unwrap_or_else(|e| {
        warn!("Could not list {}: {}", dir.display(), e);
        ModelCatalog::default()
    })
}

/// File stem of the model path, e.g. `qwen2.5-7b` for `/m/qwen2.5-7b.gguf`.
fn alias_for(model: &str) -> String {
    Path::new(model)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| model.to_string())
}
