//! Scripted placement scenarios replayed against an analytic scene.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use buildgrid_core::{CellCoord, Command, Event, ObjectKind, PlaceableId, Ray, SurfaceTag};
use buildgrid_system_placement::{PlacementInput, PlacementSession, SessionState};
use buildgrid_world::{self as world, query, World};
use glam::Vec3;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::{
    config::CliConfig,
    scene::{Scene, Surface},
};

const SUPPORTED_SCENARIO_VERSION: u32 = 1;

const DEMO_SCENARIO: &str = include_str!("../scenarios/demo.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    version: u32,
    #[serde(default)]
    surfaces: Vec<SurfaceEntry>,
    #[serde(default)]
    objects: Vec<ObjectEntry>,
    #[serde(default)]
    sessions: Vec<SessionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SurfaceEntry {
    origin: [f32; 3],
    normal: [f32; 3],
    tag: SurfaceTag,
    #[serde(default)]
    layer: u32,
    half_size: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObjectEntry {
    name: String,
    kind: ObjectKind,
    position: [f32; 3],
    #[serde(default = "default_extent")]
    extent: f32,
    #[serde(default)]
    registered: bool,
}

fn default_extent() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionEntry {
    object: String,
    #[serde(default)]
    frames: Vec<Frame>,
}

/// One tick of scripted pointer input.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Frame {
    origin: [f32; 3],
    target: [f32; 3],
    #[serde(default)]
    begin: bool,
    #[serde(default)]
    confirm: bool,
    #[serde(default)]
    cancel: bool,
    #[serde(default)]
    rotate: f32,
}

impl Frame {
    fn input(&self) -> PlacementInput {
        let origin = Vec3::from_array(self.origin);
        let target = Vec3::from_array(self.target);
        PlacementInput {
            aim: Ray::new(origin, target - origin),
            begin: self.begin,
            confirm: self.confirm,
            cancel: self.cancel,
            rotate_delta: self.rotate,
        }
    }
}

#[derive(Debug)]
struct ObjectPlan {
    name: String,
    kind: ObjectKind,
    position: Vec3,
    extent: f32,
    registered: bool,
}

#[derive(Debug)]
struct SessionPlan {
    object: usize,
    frames: Vec<Frame>,
}

/// Validated scenario ready to be replayed.
#[derive(Debug)]
pub(crate) struct Scenario {
    scene: Scene,
    objects: Vec<ObjectPlan>,
    sessions: Vec<SessionPlan>,
}

/// Outcome of one scripted placement session.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SessionReport {
    /// Name of the object that was placed.
    pub(crate) object: String,
    /// State the session ended in.
    pub(crate) state: SessionState,
    /// Object position after the last frame.
    pub(crate) position: Vec3,
    /// Accumulated yaw after the last frame.
    pub(crate) rotation_degrees: f32,
    /// Cell the object occupies, if registered.
    pub(crate) cell: Option<CellCoord>,
    /// Number of commands the world rejected during the session.
    pub(crate) rejections: usize,
}

/// Summary of a complete scenario replay.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RunReport {
    /// Per-session outcomes in script order.
    pub(crate) sessions: Vec<SessionReport>,
    /// Number of occupied cells left in the grid.
    pub(crate) occupied_cells: usize,
}

impl Scenario {
    /// Built-in demonstration scenario.
    pub(crate) fn demo() -> Result<Self> {
        Self::parse(DEMO_SCENARIO).context("built-in demo scenario is invalid")
    }

    /// Reads and validates a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid scenario in {}", path.display()))
    }

    /// Parses and validates scenario TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let file: ScenarioFile =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        if file.version != SUPPORTED_SCENARIO_VERSION {
            bail!(
                "unsupported scenario version {}; expected {}",
                file.version,
                SUPPORTED_SCENARIO_VERSION
            );
        }

        let mut surfaces = Vec::with_capacity(file.surfaces.len());
        for (index, entry) in file.surfaces.into_iter().enumerate() {
            let normal = Vec3::from_array(entry.normal).normalize_or_zero();
            if normal == Vec3::ZERO {
                bail!("surface {index} has a degenerate normal");
            }
            if let Some(half_size) = entry.half_size {
                if !(half_size.is_finite() && half_size > 0.0) {
                    bail!("surface {index} has non-positive half size {half_size}");
                }
            }
            surfaces.push(Surface {
                origin: Vec3::from_array(entry.origin),
                normal,
                tag: entry.tag,
                layer: entry.layer,
                half_size: entry.half_size,
            });
        }

        let mut indices = HashMap::with_capacity(file.objects.len());
        let mut objects = Vec::with_capacity(file.objects.len());
        for entry in file.objects {
            if !(entry.extent.is_finite() && entry.extent > 0.0) {
                bail!("object `{}` has non-positive extent {}", entry.name, entry.extent);
            }
            if indices.insert(entry.name.clone(), objects.len()).is_some() {
                bail!("scenario contains duplicate object `{}`", entry.name);
            }
            objects.push(ObjectPlan {
                name: entry.name,
                kind: entry.kind,
                position: Vec3::from_array(entry.position),
                extent: entry.extent,
                registered: entry.registered,
            });
        }

        let mut sessions = Vec::with_capacity(file.sessions.len());
        for entry in file.sessions {
            let Some(&object) = indices.get(&entry.object) else {
                bail!("session names unknown object `{}`", entry.object);
            };
            sessions.push(SessionPlan {
                object,
                frames: entry.frames,
            });
        }

        Ok(Self {
            scene: Scene::new(surfaces),
            objects,
            sessions,
        })
    }

    /// Builds a fresh world and replays every session in order.
    pub(crate) fn run(&self, config: &CliConfig) -> Result<RunReport> {
        let mut world = World::new(config.grid).context("failed to construct the grid")?;
        let grid = query::config(&world);
        info!(
            "grid: cell size {}, up to {} stacked levels",
            grid.cell_size, grid.max_stack_height
        );
        let ids = self.populate(&mut world)?;

        let mut reports = Vec::with_capacity(self.sessions.len());
        for plan in &self.sessions {
            let object = &self.objects[plan.object];
            let placeable = ids[plan.object];
            let mut session = PlacementSession::new(placeable, config.session);
            let mut rejections = 0;
            debug!("session for `{}` drives {:?}", object.name, session.placeable());

            for (tick, frame) in plan.frames.iter().enumerate() {
                let mut commands = Vec::new();
                let preview = session.handle(
                    &world,
                    frame.input(),
                    |ray, max_distance, layers| self.scene.hit(ray, max_distance, layers),
                    &mut commands,
                );
                if let Some(preview) = preview {
                    info!(
                        "{} tick {tick}: {:?} at {} tint {:?}",
                        object.name,
                        preview.validity,
                        preview.position,
                        config.palette.tint(preview.validity)
                    );
                }
                rejections += pump(&mut world, commands);
            }

            let snapshot = query::placeable(&world, placeable)
                .with_context(|| format!("object `{}` vanished", object.name))?;
            reports.push(SessionReport {
                object: object.name.clone(),
                state: session.state(),
                position: snapshot.position,
                rotation_degrees: snapshot.rotation_degrees,
                cell: snapshot.cell,
                rejections,
            });
        }

        Ok(RunReport {
            sessions: reports,
            occupied_cells: query::occupancy_view(&world).len(),
        })
    }

    fn populate(&self, world: &mut World) -> Result<Vec<PlaceableId>> {
        let mut ids = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            let mut events = Vec::new();
            world::apply(
                world,
                Command::SpawnPlaceable {
                    kind: object.kind,
                    position: object.position,
                    extent: object.extent,
                },
                &mut events,
            );
            let Some(Event::PlaceableSpawned { placeable, .. }) = events.pop() else {
                bail!("world refused to spawn `{}`", object.name);
            };

            if object.registered {
                world::apply(world, Command::RegisterPlaceable { placeable }, &mut events);
                if let Some(Event::PlacementRejected { reason, .. }) = events.pop() {
                    bail!(
                        "object `{}` cannot be registered at {}: {reason:?}",
                        object.name,
                        object.position
                    );
                }
            }
            debug!("spawned `{}` as {placeable:?}", object.name);
            ids.push(placeable);
        }
        Ok(ids)
    }
}

/// Applies commands to the world, returning how many were rejected.
fn pump(world: &mut World, commands: Vec<Command>) -> usize {
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }

    let mut rejections = 0;
    for event in events {
        match event {
            Event::PlacementRejected { placeable, reason } => {
                warn!("{placeable:?} rejected: {reason:?}");
                rejections += 1;
            }
            Event::PlacementCommitted {
                placeable,
                cell,
                position,
            } => info!("{placeable:?} committed to {cell:?} at {position}"),
            Event::PlacementCancelled {
                placeable,
                position,
            } => info!("{placeable:?} cancelled, back at {position}"),
            other => debug!("{other:?}"),
        }
    }
    rejections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scenario_places_and_cancels() {
        let report = Scenario::demo()
            .expect("demo parses")
            .run(&CliConfig::default())
            .expect("demo runs");

        assert_eq!(
            report.sessions,
            vec![
                SessionReport {
                    object: "crate".to_owned(),
                    state: SessionState::Committed,
                    position: Vec3::new(0.0, 1.0, 0.0),
                    rotation_degrees: 45.0,
                    cell: Some(CellCoord::new(0, 0, 0)),
                    rejections: 0,
                },
                SessionReport {
                    object: "lamp".to_owned(),
                    state: SessionState::Committed,
                    position: Vec3::new(1.0, 2.0, 5.0),
                    rotation_degrees: -45.0,
                    cell: Some(CellCoord::new(1, 2, 5)),
                    rejections: 0,
                },
                SessionReport {
                    object: "barrel".to_owned(),
                    state: SessionState::Cancelled,
                    position: Vec3::new(2.0, 0.0, 0.0),
                    rotation_degrees: 0.0,
                    cell: None,
                    rejections: 0,
                },
            ]
        );
        assert_eq!(report.occupied_cells, 2);
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        let error = Scenario::parse("version = 2").expect_err("version 2 is unknown");
        assert!(
            error.to_string().contains("unsupported scenario version 2"),
            "unexpected error: {error:#}"
        );
    }

    #[test]
    fn sessions_must_name_known_objects() {
        let error = Scenario::parse(
            r#"
            version = 1

            [[sessions]]
            object = "ghost"
            "#,
        )
        .expect_err("ghost is not declared");
        assert!(format!("{error:#}").contains("ghost"));
    }

    #[test]
    fn duplicate_object_names_are_rejected() {
        let error = Scenario::parse(
            r#"
            version = 1

            [[objects]]
            name = "box"
            kind = "GroundAnchored"
            position = [0.0, 0.0, 0.0]

            [[objects]]
            name = "box"
            kind = "WallAnchored"
            position = [1.0, 0.0, 0.0]
            "#,
        )
        .expect_err("duplicate names");
        assert!(format!("{error:#}").contains("duplicate object `box`"));
    }

    #[test]
    fn overlapping_preplaced_walls_fail_to_populate() {
        let scenario = Scenario::parse(
            r#"
            version = 1

            [[objects]]
            name = "first"
            kind = "WallAnchored"
            position = [0.0, 1.0, 0.0]
            registered = true

            [[objects]]
            name = "second"
            kind = "WallAnchored"
            position = [0.2, 0.9, 0.1]
            registered = true
            "#,
        )
        .expect("scenario parses");

        let error = scenario
            .run(&CliConfig::default())
            .expect_err("second wall overlaps the first");
        assert!(format!("{error:#}").contains("`second` cannot be registered"));
    }

    #[test]
    fn invalid_grid_configuration_is_reported() {
        let scenario = Scenario::parse("version = 1").expect("empty scenario parses");
        let mut config = CliConfig::default();
        config.grid.cell_size = -1.0;

        let error = scenario.run(&config).expect_err("negative cell size");
        assert!(format!("{error:#}").contains("failed to construct the grid"));
    }
}
