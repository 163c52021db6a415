//! Stable id assignment for features that arrive without one.
//!
//! A generated id is keyed by a SHA-256 fingerprint of the feature's position
//! and properties plus its occurrence ordinal among identical features, so an
//! unchanged feature keeps its id when the collection is re-supplied.

use std::collections::{HashMap, HashSet};

use fruitfall_core::{DropReason, DroppedRecord, Feature, FeatureId, FeatureInput, Properties};
use sha2::{Digest, Sha256};

type Fingerprint = [u8; 32];

fn fingerprint(input: &FeatureInput) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(input.position.lng.to_bits().to_le_bytes());
    hasher.update(input.position.lat.to_bits().to_le_bytes());
    // `serde_json::Map` is key-ordered, so equal mappings serialize equally.
    hasher.update(canonical_properties(&input.properties).as_bytes());
    hasher.finalize().into()
}

fn canonical_properties(properties: &Properties) -> String {
    serde_json::to_string(properties).unwrap_or_default()
}

/// Result of assigning ids to one snapshot.
#[derive(Debug, Default)]
pub(crate) struct Assignment {
    pub features: Vec<Feature>,
    pub dropped: Vec<DroppedRecord>,
    pub generated: usize,
}

#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    assigned: HashMap<Fingerprint, Vec<FeatureId>>,
    next: u64,
}

impl IdAllocator {
    /// Validate `inputs` and give every survivor a unique id.
    ///
    /// Non-finite or out-of-range positions and repeated supplied ids are
    /// dropped. Supplied ids always win over generated ones; a previously
    /// generated id that now collides with a supplied id is replaced.
    pub(crate) fn assign(&mut self, inputs: Vec<FeatureInput>) -> Assignment {
        let mut used: HashSet<FeatureId> = HashSet::new();
        let mut keep = vec![false; inputs.len()];
        let mut dropped = Vec::new();

        for (index, input) in inputs.iter().enumerate() {
            if !input.position.is_finite() {
                dropped.push(DroppedRecord {
                    index,
                    reason: DropReason::NonFiniteCoordinates {
                        lng: input.position.lng,
                        lat: input.position.lat,
                    },
                });
                continue;
            }
            if !input.position.is_in_range() {
                dropped.push(DroppedRecord {
                    index,
                    reason: DropReason::OutOfRange {
                        lng: input.position.lng,
                        lat: input.position.lat,
                    },
                });
                continue;
            }
            if let Some(id) = input.id {
                if !used.insert(id) {
                    dropped.push(DroppedRecord {
                        index,
                        reason: DropReason::DuplicateId(id),
                    });
                    continue;
                }
            }
            keep[index] = true;
        }

        let mut fresh: HashMap<Fingerprint, Vec<FeatureId>> = HashMap::new();
        let mut features = Vec::with_capacity(inputs.len() - dropped.len());
        let mut generated = 0;

        for (input, keep) in inputs.into_iter().zip(keep) {
            if !keep {
                continue;
            }
            let id = match input.id {
                Some(id) => id,
                None => {
                    generated += 1;
                    let fp = fingerprint(&input);
                    let ordinal = fresh.get(&fp).map_or(0, Vec::len);
                    let previous = self
                        .assigned
                        .get(&fp)
                        .and_then(|ids| ids.get(ordinal))
                        .copied()
                        .filter(|id| !used.contains(id));
                    let id = previous.unwrap_or_else(|| self.allocate(&used));
                    used.insert(id);
                    fresh.entry(fp).or_default().push(id);
                    id
                }
            };
            features.push(Feature {
                id,
                position: input.position,
                properties: input.properties,
            });
        }

        self.assigned = fresh;
        dropped.sort_by_key(|d| d.index);
        Assignment {
            features,
            dropped,
            generated,
        }
    }

    fn allocate(&mut self, used: &HashSet<FeatureId>) -> FeatureId {
        loop {
            let candidate = FeatureId(self.next);
            self.next += 1;
            if !used.contains(&candidate) {
                return candidate;
            }
        }
    }
}
