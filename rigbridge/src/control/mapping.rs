//! Resolves a [`MappingFile`] into a typed table once, at load time. The
//! dispatcher only ever sees [`ActionDescriptor`]s.

use std::path::Path;

use indexmap::IndexMap;

use super::config::{self, MappingFile, RawMappingEntry};
use crate::core::prelude::*;
use crate::timeline::Modus;

const REMOVE_KEYS_PREFIX: &str = "RemoveKeys";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamedAction {
    TimeKnob,
    TimeKnobSlow,
    TimeKnobFast,
    SaveSequence,
    FrameForward,
    FrameBackward,
    PlayPause,
    KeyframeAllZero,
    RemoveKeys { target: String },
}

impl NamedAction {
    /// Returns `None` for names that aren't built-in actions.
    pub fn parse(name: &str) -> Option<Result<Self, String>> {
        let action = match name {
            "TimeKnob" => Self::TimeKnob,
            "TimeKnobSlow" => Self::TimeKnobSlow,
            "TimeKnobFast" => Self::TimeKnobFast,
            "SaveSequence" => Self::SaveSequence,
            "FrameForward" => Self::FrameForward,
            "FrameBackward" => Self::FrameBackward,
            "PlayPause" => Self::PlayPause,
            "KeyframeAllZero" => Self::KeyframeAllZero,
            _ => {
                let target = name.strip_prefix(REMOVE_KEYS_PREFIX)?;
                if target.is_empty() {
                    return Some(Err(format!(
                        "`{}` needs a target control name",
                        REMOVE_KEYS_PREFIX
                    )));
                }
                Self::RemoveKeys {
                    target: target.to_string(),
                }
            }
        };
        Some(Ok(action))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub modus: Modus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionDescriptor {
    Named(NamedAction),
    Target(Target),
    /// Re-emits the cached value of each referenced control id through that
    /// id's own [`Target`].
    Composite { refs: Vec<String> },
}

impl ActionDescriptor {
    pub fn is_time_knob(&self) -> bool {
        matches!(self, Self::Named(NamedAction::TimeKnob))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingTable {
    actions: IndexMap<String, ActionDescriptor>,
}

impl MappingTable {
    /// Resolves every entry. Entries that can't be resolved are left out of
    /// the table, logged, and returned alongside it.
    pub fn resolve(file: &MappingFile) -> (Self, Vec<ConfigError>) {
        let mut actions = IndexMap::new();
        let mut errors = vec![];
        let mut composites = vec![];

        for (control_id, entry) in file {
            match resolve_entry(control_id, entry) {
                Ok(ActionDescriptor::Composite { refs }) => {
                    composites.push((control_id, refs));
                }
                Ok(descriptor) => {
                    actions.insert(control_id.clone(), descriptor);
                }
                Err(e) => errors.push(e),
            }
        }

        // Composites can only point at direct targets, so they're checked
        // once every other entry is known.
        for (control_id, refs) in composites {
            let bad_ref = refs.iter().find(|r| {
                !matches!(
                    actions.get(r.as_str()),
                    Some(ActionDescriptor::Target(_))
                )
            });

            match bad_ref {
                Some(reference) => errors.push(ConfigError::UnknownReference {
                    control_id: control_id.clone(),
                    reference: reference.clone(),
                }),
                None => {
                    actions.insert(
                        control_id.clone(),
                        ActionDescriptor::Composite { refs },
                    );
                }
            }
        }

        // Keep declaration order regardless of the second pass above.
        let mut ordered = IndexMap::with_capacity(actions.len());
        for control_id in file.keys() {
            if let Some(descriptor) = actions.swap_remove(control_id) {
                ordered.insert(control_id.clone(), descriptor);
            }
        }

        for error in &errors {
            warn!("Skipping mapping entry: {}", error);
        }

        (Self { actions: ordered }, errors)
    }

    pub fn from_path(
        path: &Path,
    ) -> Result<(Self, Vec<ConfigError>), ConfigError> {
        let file = config::load(path)?;
        let (table, errors) = Self::resolve(&file);
        info!(
            "Loaded {} control mappings from {} ({} skipped)",
            table.len(),
            path.display(),
            errors.len()
        );
        Ok((table, errors))
    }

    pub fn get(&self, control_id: &str) -> Option<&ActionDescriptor> {
        self.actions.get(control_id)
    }

    pub fn target(&self, control_id: &str) -> Option<&Target> {
        match self.get(control_id) {
            Some(ActionDescriptor::Target(target)) => Some(target),
            _ => None,
        }
    }

    pub fn contains(&self, control_id: &str) -> bool {
        self.actions.contains_key(control_id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ActionDescriptor)> {
        self.actions.iter()
    }
}

fn resolve_entry(
    control_id: &str,
    entry: &RawMappingEntry,
) -> Result<ActionDescriptor, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEntry {
        control_id: control_id.to_string(),
        reason,
    };

    match entry {
        RawMappingEntry::Name(name) if name.is_empty() => {
            Err(invalid("empty action name".to_string()))
        }
        RawMappingEntry::Name(name) => match NamedAction::parse(name) {
            Some(Ok(action)) => Ok(ActionDescriptor::Named(action)),
            Some(Err(reason)) => Err(invalid(reason)),
            None => Ok(ActionDescriptor::Target(Target {
                name: name.clone(),
                modus: Modus::Float,
            })),
        },
        RawMappingEntry::Pair(name, _) if name.is_empty() => {
            Err(invalid("empty control name".to_string()))
        }
        RawMappingEntry::Pair(name, modus) => {
            let modus = modus.parse::<Modus>().map_err(|_| {
                ConfigError::UnsupportedModus {
                    control_id: control_id.to_string(),
                    modus: modus.clone(),
                }
            })?;
            Ok(ActionDescriptor::Target(Target {
                name: name.clone(),
                modus,
            }))
        }
        RawMappingEntry::Composite { set_prev } => {
            Ok(ActionDescriptor::Composite {
                refs: set_prev.clone(),
            })
        }
        RawMappingEntry::Other(value) => Err(invalid(format!(
            "expected an action name, a [name, modus] pair or a set_prev \
             object, got {:?}",
            value
        ))),
    }
}
