//! Tile-source capability registry.
//!
//! A capability is a named bundle of URI protocols plus a constructor that
//! opens a [`TileSource`] for a URI. The registry starts from the default
//! capability names and any names requested with `--require`; names missing
//! from the catalog are recorded as skipped instead of aborting the run.

use std::collections::HashMap;
use std::fmt;

use crate::process::ProcessRunner;
use crate::source::{protocol_of, CommandSource, SourceError, TileSource};

/// Opens a tile source for a full URI.
pub type SourceConstructor = fn(&str, ProcessRunner) -> Result<Box<dyn TileSource>, SourceError>;

/// Capabilities loaded when nothing else is asked for.
pub const DEFAULT_CAPABILITIES: &[&str] = &["command"];

/// A registrable tile-source implementation.
#[derive(Clone)]
pub struct Capability {
    pub name: String,
    pub protocols: Vec<String>,
    pub open: SourceConstructor,
}

impl Capability {
    pub fn new(name: &str, protocols: &[&str], open: SourceConstructor) -> Self {
        Self {
            name: name.to_string(),
            protocols: protocols.iter().map(|p| p.to_string()).collect(),
            open,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("protocols", &self.protocols)
            .finish()
    }
}

/// Why a requested capability did not load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not part of this build's catalog.
    NotFound,
    /// Every protocol it provides is already taken by an earlier capability.
    ProtocolsTaken(Vec<String>),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "not available in this build"),
            SkipReason::ProtocolsTaken(p) => write!(f, "protocols already registered: {}", p.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCapability {
    pub name: String,
    pub reason: SkipReason,
}

/// Built-in capabilities shipped with this crate.
pub fn builtin_catalog() -> Vec<Capability> {
    vec![Capability::new("command", &[CommandSource::PROTOCOL], open_command)]
}

fn open_command(uri: &str, runner: ProcessRunner) -> Result<Box<dyn TileSource>, SourceError> {
    Ok(Box::new(CommandSource::from_uri(uri, runner)?))
}

pub struct SourceRegistry {
    catalog: Vec<Capability>,
    protocols: HashMap<String, SourceConstructor>,
    loaded: Vec<String>,
    skipped: Vec<SkippedCapability>,
    runner: ProcessRunner,
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("protocols", &self.protocols())
            .field("loaded", &self.loaded)
            .field("skipped", &self.skipped)
            .finish()
    }
}

impl SourceRegistry {
    /// Empty registry that can load capabilities from `catalog`.
    pub fn new(catalog: Vec<Capability>, runner: ProcessRunner) -> Self {
        Self {
            catalog,
            protocols: HashMap::new(),
            loaded: Vec::new(),
            skipped: Vec::new(),
            runner,
        }
    }

    /// Registry with the default capabilities plus `requires`, in that order.
    pub fn load(catalog: Vec<Capability>, requires: &[String], runner: ProcessRunner) -> Self {
        let mut registry = Self::new(catalog, runner);
        let names = DEFAULT_CAPABILITIES
            .iter()
            .map(|s| s.to_string())
            .chain(requires.iter().cloned());
        for name in names {
            registry.require(&name);
        }
        registry
    }

    /// Register the capability called `name`. Returns false if it was skipped.
    pub fn require(&mut self, name: &str) -> bool {
        if self.loaded.iter().any(|n| n == name) {
            return true;
        }
        let Some(capability) = self.catalog.iter().find(|c| c.name == name) else {
            log::warn!("Skipping tile source module '{}': not available in this build", name);
            self.skip(name, SkipReason::NotFound);
            return false;
        };

        let (fresh, taken): (Vec<&String>, Vec<&String>) = capability
            .protocols
            .iter()
            .partition(|p| !self.protocols.contains_key(p.as_str()));
        if fresh.is_empty() {
            let taken: Vec<String> = taken.into_iter().cloned().collect();
            log::warn!(
                "Skipping tile source module '{}': protocols already registered ({})",
                name,
                taken.join(", ")
            );
            self.skip(name, SkipReason::ProtocolsTaken(taken));
            return false;
        }

        let open = capability.open;
        let fresh: Vec<String> = fresh.into_iter().cloned().collect();
        for protocol in &fresh {
            self.protocols.insert(protocol.clone(), open);
        }
        log::debug!("Registered '{}' for {}", name, fresh.join(", "));
        self.loaded.push(name.to_string());
        true
    }

    fn skip(&mut self, name: &str, reason: SkipReason) {
        self.skipped.push(SkippedCapability {
            name: name.to_string(),
            reason,
        });
    }

    /// Open the tile source responsible for `uri`'s protocol.
    pub fn open(&self, uri: &str) -> Result<Box<dyn TileSource>, SourceError> {
        let (protocol, _) = protocol_of(uri)?;
        let open = self
            .protocols
            .get(protocol)
            .ok_or_else(|| SourceError::UnknownProtocol(protocol.to_string()))?;
        open(uri, self.runner)
    }

    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    pub fn skipped(&self) -> &[SkippedCapability] {
        &self.skipped
    }

    /// Registered protocols, sorted.
    pub fn protocols(&self) -> Vec<&str> {
        let mut protocols: Vec<&str> = self.protocols.keys().map(String::as_str).collect();
        protocols.sort_unstable();
        protocols
    }
}
