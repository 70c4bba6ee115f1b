// Copyright (c) 2024 The Botho Foundation

//! JSON persistence of the runtime between invocations.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use bth_distributor_core::{Address, Runtime, WorldState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    /// The distributor the commands operate on
    distributor: Option<Address>,
    /// Its controller, when one was deployed
    controller: Option<Address>,
    world: WorldState,
}

/// A loaded runtime together with the deployment it manages.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    pub runtime: Runtime,
    pub distributor: Option<Address>,
    pub controller: Option<Address>,
}

impl Session {
    /// Start with an empty runtime. Refuses to clobber existing state
    /// unless `force` is set.
    pub fn create(path: &Path, force: bool) -> Result<Self> {
        if path.exists() && !force {
            anyhow::bail!(
                "State already exists at {}. Use --force to overwrite.",
                path.display()
            );
        }
        Ok(Self {
            path: path.to_path_buf(),
            runtime: Runtime::new(),
            distributor: None,
            controller: None,
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "No state found at {}. Run 'bth-distributor init' first.",
                path.display()
            )
        })?;
        let file: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state at {}", path.display()))?;
        debug!("Loaded state from {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            runtime: Runtime::from_state(file.world),
            distributor: file.distributor,
            controller: file.controller,
        })
    }

    /// The managed distributor.
    pub fn distributor(&self) -> Result<Address> {
        self.distributor
            .context("No distributor deployed. Run 'bth-distributor init' first.")
    }

    /// The managed controller.
    pub fn controller(&self) -> Result<Address> {
        self.controller
            .context("No controller deployed. Run 'bth-distributor init --with-controller'.")
    }

    /// Write the state atomically: serialize to a sibling temp file, then
    /// rename over the target.
    pub fn save(self) -> Result<()> {
        let file = StateFile {
            distributor: self.distributor,
            controller: self.controller,
            world: self.runtime.into_state(),
        };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialize state")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}
