//! Krakatau-backed disassembler.
//!
//! Every invocation stages the target class (plus the loaded context classes)
//! into a temp jar, runs `disassemble.py` against it with a temp output zip,
//! and pulls `<class>.j` back out of that zip. Both temp files are removed
//! when the invocation ends, whatever the outcome.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::{Builder, TempPath};
use tracing::{debug, info, warn};

use crate::config::KrakatauConfig;
use crate::model::{
    DisassemblyError, DisassemblyFailure, DisassemblyResult, ExitState, InvocationRequest, Stage,
    CLASS_SUFFIX,
};
use crate::services::bundle;
use crate::services::classes::ClassSource;
use crate::services::disassembler::Disassembler;
use crate::services::process::{ProcessLauncher, SystemLauncher, ToolCommand};
use crate::settings::TransformerSettings;

pub const ID: &str = "krakatau-disassembler";
pub const NAME: &str = "Krakatau Disassembler";

/// The single setting Krakatau exposes.
pub struct KrakatauSettings;

impl KrakatauSettings {
    pub const ROUNDTRIP: &'static str = "roundtrip";
    pub const ROUNDTRIP_PARAM: &'static str = "roundtrip";
    pub const ROUNDTRIP_LABEL: &'static str = "Disassemble for roundtrip assembly";
}

const INPUT_PREFIX: &str = "kdisin";
const INPUT_SUFFIX: &str = ".jar";
const OUTPUT_PREFIX: &str = "kdisout";
const OUTPUT_SUFFIX: &str = ".zip";

pub struct KrakatauDisassembler {
    config: KrakatauConfig,
    launcher: Arc<dyn ProcessLauncher>,
    settings: TransformerSettings,
}

impl KrakatauDisassembler {
    pub fn new(config: KrakatauConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        let mut settings = TransformerSettings::new();
        settings.register(
            KrakatauSettings::ROUNDTRIP,
            KrakatauSettings::ROUNDTRIP_PARAM,
            KrakatauSettings::ROUNDTRIP_LABEL,
            false,
        );
        Self { config, launcher, settings }
    }

    /// Disassembler that runs real processes, time-boxed by `config.timeout_secs`.
    pub fn with_system_launcher(config: KrakatauConfig) -> Self {
        let launcher = SystemLauncher::new(config.timeout());
        Self::new(config, Arc::new(launcher))
    }

    pub fn config(&self) -> &KrakatauConfig {
        &self.config
    }

    pub fn roundtrip(&self) -> bool {
        self.settings.is_enabled(KrakatauSettings::ROUNDTRIP)
    }

    pub fn set_roundtrip(&mut self, enabled: bool) {
        // Registered in `new`, so this cannot miss.
        let _ = self.settings.set_enabled(KrakatauSettings::ROUNDTRIP, enabled);
    }

    /// Disassemble `class_name` with the classes from `source` as context,
    /// using the current roundtrip setting.
    pub fn disassemble_class(
        &self,
        class_name: &str,
        class_bytes: &[u8],
        source: &dyn ClassSource,
    ) -> DisassemblyResult {
        let request = InvocationRequest::new(class_name, class_bytes)
            .with_auxiliary_classes(source.loaded_classes())
            .with_roundtrip(self.roundtrip());
        self.disassemble(&request)
    }

    /// Command line for one run:
    /// `<python> [-O] <script> -path <in> -out <out> <class>.class [-roundtrip]`.
    pub fn build_command(
        &self,
        python: &Path,
        request: &InvocationRequest,
        input: &Path,
        output: &Path,
    ) -> ToolCommand {
        let mut command = ToolCommand::new(python, &self.config.install_dir);
        if self.config.optimize {
            command = command.arg("-O");
        }
        command = command
            .arg(&self.config.script)
            .arg("-path")
            .arg(absolute(input))
            .arg("-out")
            .arg(absolute(output))
            .arg(request.target_entry());
        if request.roundtrip {
            command = command.arg(format!("-{}", KrakatauSettings::ROUNDTRIP_PARAM));
        }
        command
    }

    fn temp_dir(&self) -> PathBuf {
        self.config.temp_dir.clone().unwrap_or_else(env::temp_dir)
    }

    fn create_bundles(&self) -> Result<(TempPath, TempPath), DisassemblyError> {
        let dir = self.temp_dir();
        let create = |prefix: &str, suffix: &str| {
            Builder::new()
                .prefix(prefix)
                .suffix(suffix)
                .tempfile_in(&dir)
                .map(|file| file.into_temp_path())
                .map_err(|e| {
                    DisassemblyError::Staging(format!(
                        "failed to create temp file in {}: {e}",
                        dir.display()
                    ))
                })
        };
        let input = create(INPUT_PREFIX, INPUT_SUFFIX)?;
        // `input` is dropped (and deleted) if the second one fails.
        let output = create(OUTPUT_PREFIX, OUTPUT_SUFFIX)?;
        Ok((input, output))
    }

    fn run_staged(
        &self,
        python: &Path,
        request: &InvocationRequest,
        input: &Path,
        output: &Path,
    ) -> DisassemblyResult {
        let fail = |error, stage| DisassemblyFailure::new(error, stage);

        if request.class_name.is_empty() {
            return Err(fail(
                DisassemblyError::Staging("class name is empty".into()),
                Stage::BundlesCreated,
            ));
        }

        let staged = request.staged_classes();
        bundle::write_class_bundle(input, &staged).map_err(|e| {
            fail(
                DisassemblyError::Staging(format!("failed to write {}: {e}", input.display())),
                Stage::BundlesCreated,
            )
        })?;
        debug!(bundle = %input.display(), classes = staged.len(), "staged input bundle");

        let command = self.build_command(python, request, input, output);
        debug!(command = %command.display(), cwd = %command.working_dir.display(), "launching disassembler");

        let outcome = self.launcher.run(&command).map_err(|e| {
            fail(DisassemblyError::Process(e.to_string()), Stage::ProcessLaunched)
                .with_log(Some(String::new()))
        })?;
        let log = Some(outcome.log);

        match outcome.exit {
            ExitState::TimedOut(_) | ExitState::Signaled => {
                return Err(fail(
                    DisassemblyError::Process(format!("{} {}", self.config.script, outcome.exit)),
                    Stage::ProcessCompleted,
                )
                .with_log(log));
            }
            ExitState::Exited(code) if code != 0 => {
                warn!(class = %request.class_name, code, "disassembler exited with non-zero status");
            }
            ExitState::Exited(_) => {}
        }

        let entry_name = request.output_entry();
        let bytes = match bundle::read_entry(output, &entry_name) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Err(fail(
                    DisassemblyError::Extraction(format!(
                        "no entry named {entry_name} in output bundle ({})",
                        outcome.exit
                    )),
                    Stage::ProcessCompleted,
                )
                .with_log(log));
            }
            Err(e) => {
                return Err(fail(
                    DisassemblyError::Extraction(format!(
                        "failed to read output bundle {}: {e} ({})",
                        output.display(),
                        outcome.exit
                    )),
                    Stage::ProcessCompleted,
                )
                .with_log(log));
            }
        };

        String::from_utf8(bytes).map_err(|e| {
            fail(DisassemblyError::Decode(format!("{entry_name}: {e}")), Stage::ResultExtracted)
                .with_log(log)
        })
    }
}

impl Disassembler for KrakatauDisassembler {
    fn id(&self) -> &'static str {
        ID
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn settings(&self) -> &TransformerSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut TransformerSettings {
        &mut self.settings
    }

    fn is_applicable(&self, resource: &str) -> bool {
        resource.ends_with(CLASS_SUFFIX)
    }

    fn disassemble(&self, request: &InvocationRequest) -> DisassemblyResult {
        let python = self
            .config
            .resolve_interpreter()
            .map_err(|e| DisassemblyFailure::new(e, Stage::NotStarted))?;
        debug!(class = %request.class_name, stage = %Stage::ConfigChecked, python = %python.display());

        let (input, output) = self
            .create_bundles()
            .map_err(|e| DisassemblyFailure::new(e, Stage::ConfigChecked))?;

        let result = self.run_staged(&python, request, &input, &output);

        for path in [input, output] {
            let shown = path.display().to_string();
            if let Err(e) = path.close() {
                debug!(path = %shown, error = %e, "failed to remove temp bundle");
            }
        }

        match &result {
            Ok(text) => info!(
                class = %request.class_name,
                stage = %Stage::CleanedUp,
                bytes = text.len(),
                "disassembled class"
            ),
            Err(failure) => warn!(
                class = %request.class_name,
                stage = %failure.stage,
                error = %failure.error,
                "disassembly failed"
            ),
        }
        result
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
}
