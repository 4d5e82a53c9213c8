//! Version-compatibility gate for the optional native module.
//!
//! At startup the host's API version is compared with the version this
//! crate targets:
//!
//! - On a match, the persisted decision is cleared and the module is loaded.
//! - On a mismatch, the user is asked once whether to force-enable the
//!   module. The answer is persisted and reused on later startups until the
//!   versions match again or the host moves to another mismatching version.
//!
//! Loading runs the three [`LoadStage`]s of a [`NativeModule`] and succeeds
//! only if all of them do. Any failure degrades to "module disabled".

mod module;
mod version;
#[cfg(feature = "vlc")]
mod vlc;

pub use module::{LoadStage, NativeModule, NativeModuleConfig, NoopModule, native_module};
pub use version::ApiVersion;
#[cfg(feature = "vlc")]
pub use vlc::VlcModule;

#[cfg(test)]
pub use module::MockNativeModule;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Current schema of [`CompatibilityDecision`].
pub const DECISION_SCHEMA_VERSION: u32 = 1;

/// Persisted outcome of the last version mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityDecision {
    /// Schema version of this record.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// The mismatch warning was already shown to the user.
    #[serde(default)]
    pub warning_shown: bool,
    /// The user's answer: load the module despite the mismatch.
    #[serde(default)]
    pub force_decision: bool,
    /// Host version the decision was made for.
    #[serde(default)]
    pub host_version: Option<ApiVersion>,
}

const fn default_schema_version() -> u32 {
    DECISION_SCHEMA_VERSION
}

impl Default for CompatibilityDecision {
    fn default() -> Self {
        Self {
            schema_version: DECISION_SCHEMA_VERSION,
            warning_shown: false,
            force_decision: false,
            host_version: None,
        }
    }
}

impl CompatibilityDecision {
    /// Clear the record.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether this record already answers a mismatch with `host`.
    ///
    /// Records without a host version predate version tracking and are
    /// taken to cover any host.
    #[must_use]
    pub fn covers(&self, host: ApiVersion) -> bool {
        self.warning_shown && self.host_version.is_none_or(|v| v == host)
    }
}

/// Durable storage for the compatibility decision.
pub trait DecisionStore {
    /// Read the stored decision.
    fn load_decision(&self) -> CompatibilityDecision;

    /// Persist a new decision.
    fn store_decision(&mut self, decision: CompatibilityDecision) -> Result<()>;
}

/// Yes/no question asked on a new version mismatch.
#[cfg_attr(test, mockall::automock)]
pub trait CompatibilityPrompt {
    /// Ask whether to load the module anyway. `Some(true)` means force-enable.
    ///
    /// `None` means no answer was given, for example because shutdown was
    /// requested while waiting. The question is asked again next time.
    fn confirm_force_enable(&self, host: ApiVersion, expected: ApiVersion) -> Option<bool>;
}

/// Result of the version check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateOutcome {
    /// Not checked yet.
    #[default]
    Unchecked,
    /// Versions match.
    Compatible,
    /// Versions differ and the user declined loading.
    IncompatibleDeclined,
    /// Versions differ and the user forced loading.
    IncompatibleForced,
}

impl GateOutcome {
    /// Whether the module should be loaded.
    #[must_use]
    pub const fn should_load(self) -> bool {
        matches!(self, Self::Compatible | Self::IncompatibleForced)
    }
}

/// Lifecycle of the module handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleState {
    /// Nothing loaded.
    #[default]
    Unloaded,
    /// A load stage is running.
    Loading(LoadStage),
    /// All stages completed.
    Loaded,
    /// The given stage failed; nothing is held.
    Failed(LoadStage),
}

/// Owns the native module and decides whether it may be loaded.
pub struct CompatibilityGate {
    expected: ApiVersion,
    module: Box<dyn NativeModule>,
    state: ModuleState,
    outcome: GateOutcome,
}

impl std::fmt::Debug for CompatibilityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatibilityGate")
            .field("expected", &self.expected)
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl CompatibilityGate {
    /// Create a gate for a module built against `expected`.
    #[must_use]
    pub fn new(expected: ApiVersion, module: Box<dyn NativeModule>) -> Self {
        Self {
            expected,
            module,
            state: ModuleState::Unloaded,
            outcome: GateOutcome::Unchecked,
        }
    }

    /// Version this gate expects from the host.
    #[must_use]
    pub const fn expected(&self) -> ApiVersion {
        self.expected
    }

    /// Current module state.
    #[must_use]
    pub const fn state(&self) -> ModuleState {
        self.state
    }

    /// Outcome of the last check.
    #[must_use]
    pub const fn outcome(&self) -> GateOutcome {
        self.outcome
    }

    /// Whether the module is loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self.state, ModuleState::Loaded)
    }

    /// Compare `host` with the expected version and resolve the decision.
    ///
    /// Prompts at most once per mismatch episode and persists the answer.
    /// Nothing is persisted when no answer was obtained: the module is not
    /// available, or the prompt was abandoned. A failure to persist is
    /// logged; the resolved outcome still applies.
    pub fn check<S, P>(&mut self, host: ApiVersion, store: &mut S, prompt: &P) -> GateOutcome
    where
        S: DecisionStore + ?Sized,
        P: CompatibilityPrompt + ?Sized,
    {
        let mut decision = store.load_decision();

        if host == self.expected {
            decision.reset();
            self.outcome = GateOutcome::Compatible;
        } else {
            warn!(
                "Host API version {} is invalid. Expected {} for native module support",
                host, self.expected
            );

            let answer = if decision.covers(host) {
                Some(decision.force_decision)
            } else if self.module.is_available() {
                prompt.confirm_force_enable(host, self.expected)
            } else {
                info!("Native module is not available, not asking to force enable it");
                None
            };

            let Some(force) = answer else {
                self.outcome = GateOutcome::IncompatibleDeclined;
                return self.outcome;
            };

            if force {
                warn!("User force enabled native module support");
            }
            decision = CompatibilityDecision {
                schema_version: DECISION_SCHEMA_VERSION,
                warning_shown: true,
                force_decision: force,
                host_version: Some(host),
            };
            self.outcome = if force {
                GateOutcome::IncompatibleForced
            } else {
                GateOutcome::IncompatibleDeclined
            };
        }

        if let Err(e) = store.store_decision(decision) {
            warn!("Couldn't persist compatibility decision: {}", e);
        }

        self.outcome
    }

    /// Run the three load stages.
    ///
    /// Returns `true` if the module is loaded afterwards. On failure whatever
    /// the completed stages acquired is released again.
    pub fn load(&mut self) -> bool {
        if self.is_loaded() {
            return true;
        }

        for stage in LoadStage::ALL {
            self.state = ModuleState::Loading(stage);
            let result = match stage {
                LoadStage::LoadLibrary => self.module.load_library(),
                LoadStage::ResolveFunctions => self.module.resolve_functions(),
                LoadStage::Initialize => self.module.initialize(),
            };

            if let Err(e) = result {
                warn!("Couldn't load native module, support disabled: {}", e);
                self.module.unload();
                self.state = ModuleState::Failed(stage);
                return false;
            }
        }

        info!("Loaded native module. Native source support enabled");
        self.state = ModuleState::Loaded;
        true
    }

    /// Check the version and, if allowed, load the module.
    pub fn startup<S, P>(&mut self, host: ApiVersion, store: &mut S, prompt: &P) -> bool
    where
        S: DecisionStore + ?Sized,
        P: CompatibilityPrompt + ?Sized,
    {
        if self.check(host, store, prompt).should_load() {
            self.load()
        } else {
            false
        }
    }

    /// Release the module. Safe to call in any state and more than once.
    pub fn unload(&mut self) {
        if self.is_loaded() {
            self.module.unload();
            info!("Unloaded native module");
        }
        self.state = ModuleState::Unloaded;
    }
}

impl Drop for CompatibilityGate {
    fn drop(&mut self) {
        self.unload();
    }
}
