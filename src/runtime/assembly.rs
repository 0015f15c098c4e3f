//! Satellite assembly tracker
//!
//! Accepts discrete `place(part)` events from a drag-and-drop surface and
//! tracks completion over the fixed five-part catalog. Naming unlocks once all
//! parts are placed; finalizing seals the satellite.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use super::error::{AssemblyError, AssemblyResult};

/// A placeable satellite part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartId {
    /// Satellite body (bus)
    Body,
    /// Solar panels
    Solar,
    /// Antenna
    Antenna,
    /// Camera
    Camera,
    /// Power supply
    Power,
}

impl PartId {
    /// The full catalog, in the order the parts bin lists them
    pub const CATALOG: [PartId; 5] = [
        PartId::Body,
        PartId::Solar,
        PartId::Antenna,
        PartId::Camera,
        PartId::Power,
    ];

    /// Identifier used by the drag-and-drop surface
    pub fn as_str(&self) -> &'static str {
        match self {
            PartId::Body => "body",
            PartId::Solar => "solar",
            PartId::Antenna => "antenna",
            PartId::Camera => "camera",
            PartId::Power => "power",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            PartId::Body => "Satellite Body",
            PartId::Solar => "Solar Panels",
            PartId::Antenna => "Antenna",
            PartId::Camera => "Camera",
            PartId::Power => "Power Supply",
        }
    }

    /// Artwork path
    pub fn image(&self) -> &'static str {
        match self {
            PartId::Body => "/assets/satellite-body.svg",
            PartId::Solar => "/assets/solar-panel.svg",
            PartId::Antenna => "/assets/antenna.svg",
            PartId::Camera => "/assets/camera.svg",
            PartId::Power => "/assets/power-supply.svg",
        }
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartId {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PartId::CATALOG
            .into_iter()
            .find(|part| part.as_str() == wanted)
            .ok_or_else(|| AssemblyError::UnknownPart(s.to_string()))
    }
}

/// What a placement did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Part added; this many remain
    Placed {
        /// Parts still missing
        remaining: usize,
    },
    /// Part was already on the satellite
    AlreadyPlaced,
    /// This placement completed the satellite
    Completed,
}

/// The finished, named satellite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteIdentity {
    /// Name given by the learner, trimmed
    pub name: String,
    /// Parts in placement order
    pub parts: Vec<PartId>,
}

/// Tracks placed parts and the satellite name
#[derive(Debug, Clone, Default)]
pub struct AssemblyTracker {
    placed: BTreeSet<PartId>,
    order: Vec<PartId>,
    name: Option<String>,
    finalized: Option<SatelliteIdentity>,
}

impl AssemblyTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a part; duplicates are a no-op
    pub fn place(&mut self, part: PartId) -> AssemblyResult<Placement> {
        if self.finalized.is_some() {
            return Err(AssemblyError::Sealed(part));
        }
        if !self.placed.insert(part) {
            debug!(%part, "Duplicate placement ignored");
            return Ok(Placement::AlreadyPlaced);
        }
        self.order.push(part);

        let remaining = self.remaining().len();
        debug!(%part, remaining, "Part placed");
        if remaining == 0 {
            info!("All satellite parts placed");
            Ok(Placement::Completed)
        } else {
            Ok(Placement::Placed { remaining })
        }
    }

    /// Whether `part` has been placed
    pub fn is_placed(&self, part: PartId) -> bool {
        self.placed.contains(&part)
    }

    /// Parts in placement order
    pub fn placed(&self) -> &[PartId] {
        &self.order
    }

    /// Catalog parts not yet placed
    pub fn remaining(&self) -> Vec<PartId> {
        PartId::CATALOG
            .into_iter()
            .filter(|part| !self.placed.contains(part))
            .collect()
    }

    /// All catalog parts placed
    pub fn is_complete(&self) -> bool {
        self.placed.len() == PartId::CATALOG.len()
    }

    /// Current name, if one has been accepted
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Finalized identity, if any
    pub fn identity(&self) -> Option<&SatelliteIdentity> {
        self.finalized.as_ref()
    }

    /// Whether `finalize` may succeed right now
    pub fn can_finalize(&self) -> bool {
        self.finalized.is_none() && self.is_complete() && self.name.is_some()
    }

    fn ensure_complete(&self) -> AssemblyResult<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(AssemblyError::Incomplete {
                missing: PartId::CATALOG.len() - self.placed.len(),
            })
        }
    }

    /// Name the satellite; requires completion and a non-blank name
    pub fn set_name(&mut self, name: &str) -> AssemblyResult<()> {
        if let Some(identity) = &self.finalized {
            return Err(AssemblyError::AlreadyFinalized(identity.name.clone()));
        }
        self.ensure_complete()?;
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AssemblyError::EmptyName);
        }
        debug!(name = trimmed, "Satellite named");
        self.name = Some(trimmed.to_string());
        Ok(())
    }

    /// Seal the satellite and return its identity
    pub fn finalize(&mut self) -> AssemblyResult<SatelliteIdentity> {
        if let Some(identity) = &self.finalized {
            return Err(AssemblyError::AlreadyFinalized(identity.name.clone()));
        }
        self.ensure_complete()?;
        let name = self.name.clone().ok_or(AssemblyError::EmptyName)?;

        let identity = SatelliteIdentity {
            name,
            parts: self.order.clone(),
        };
        info!(name = %identity.name, "Satellite finalized");
        self.finalized = Some(identity.clone());
        Ok(identity)
    }

    /// Clear all parts, the name, and the finalized identity
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed() -> AssemblyTracker {
        let mut tracker = AssemblyTracker::new();
        for part in PartId::CATALOG {
            tracker.place(part).unwrap();
        }
        tracker
    }

    #[test]
    fn test_duplicate_placement_is_noop() {
        let mut tracker = AssemblyTracker::new();
        assert_eq!(
            tracker.place(PartId::Body).unwrap(),
            Placement::Placed { remaining: 4 }
        );
        assert_eq!(tracker.place(PartId::Body).unwrap(), Placement::AlreadyPlaced);
        assert_eq!(tracker.placed(), &[PartId::Body]);
    }

    #[test]
    fn test_last_part_completes() {
        let mut tracker = AssemblyTracker::new();
        for part in &PartId::CATALOG[..4] {
            tracker.place(*part).unwrap();
        }
        assert!(!tracker.is_complete());
        assert_eq!(tracker.place(PartId::Power).unwrap(), Placement::Completed);
        assert!(tracker.is_complete());
        assert!(tracker.remaining().is_empty());
    }

    #[test]
    fn test_name_requires_completion() {
        let mut tracker = AssemblyTracker::new();
        tracker.place(PartId::Solar).unwrap();
        assert_eq!(
            tracker.set_name("Sputnik"),
            Err(AssemblyError::Incomplete { missing: 4 })
        );
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut tracker = completed();
        assert_eq!(tracker.set_name("   "), Err(AssemblyError::EmptyName));
        assert_eq!(tracker.finalize(), Err(AssemblyError::EmptyName));
    }

    #[test]
    fn test_finalize_is_write_once() {
        let mut tracker = completed();
        tracker.set_name("  Explorer-7 ").unwrap();
        let identity = tracker.finalize().unwrap();
        assert_eq!(identity.name, "Explorer-7");
        assert_eq!(identity.parts, PartId::CATALOG.to_vec());

        assert_eq!(
            tracker.set_name("Other"),
            Err(AssemblyError::AlreadyFinalized("Explorer-7".to_string()))
        );
        assert!(tracker.finalize().is_err());
        assert_eq!(tracker.identity().unwrap().name, "Explorer-7");
        assert_eq!(tracker.place(PartId::Body), Err(AssemblyError::Sealed(PartId::Body)));
    }

    #[test]
    fn test_part_parse() {
        assert_eq!(" Antenna ".parse::<PartId>(), Ok(PartId::Antenna));
        assert_eq!(
            "thruster".parse::<PartId>(),
            Err(AssemblyError::UnknownPart("thruster".to_string()))
        );
    }
}
