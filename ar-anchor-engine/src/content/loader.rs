use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
use constants::content::EXPERIENCE_EXTENSION;

use super::demo::demo_experience;
use super::experience::Experience;
use super::resolver::{
    ContentError, ContentSource, NodeKind, ResolvedExperience, experience_asset_path,
    experience_slug, resolve_experience,
};
use crate::engine::anchors::anchor_systems::spawn_anchor;
use crate::engine::core::settings::ArSettings;

/// URL fragment naming the experience to load.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperienceFragment(pub Option<String>);

impl ExperienceFragment {
    /// Read `window.location.hash`. Always empty off the web.
    pub fn from_location() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            let hash = web_sys::window().and_then(|window| window.location().hash().ok());
            Self(hash)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            Self(None)
        }
    }
}

#[derive(Resource, Default)]
pub struct ExperienceLoader {
    handle: Option<Handle<Experience>>,
    path: Option<String>,
    finished: bool,
}

impl ExperienceLoader {
    pub fn is_pending(&self) -> bool {
        !self.finished
    }
}

/// The experience currently anchored in the scene.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ActiveExperience {
    pub experience: ResolvedExperience,
    pub is_demo: bool,
}

/// Content is placed and the tracker knows which targets to load.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ExperienceReady {
    pub name: String,
    pub target_url: String,
    pub anchor_count: usize,
}

/// A remote experience was unusable and the demo replaced it.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ContentConfigError {
    pub message: String,
}

/// One scene-graph node placed under its anchor.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct ContentNode {
    pub id: u64,
    pub kind: NodeKind,
}

pub struct ContentPlugin;

impl Plugin for ContentPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<ExperienceFragment>() {
            app.insert_resource(ExperienceFragment::from_location());
        }

        app.add_plugins(JsonAssetPlugin::<Experience>::new(&[EXPERIENCE_EXTENSION]))
            .init_resource::<ExperienceLoader>()
            .add_event::<ExperienceReady>()
            .add_event::<ContentConfigError>()
            .add_systems(Startup, start_experience_load)
            .add_systems(
                Update,
                poll_experience_load.run_if(|loader: Res<ExperienceLoader>| loader.is_pending()),
            );
    }
}

fn api_base(settings: Option<&ArSettings>) -> String {
    settings
        .map(|settings| settings.api_base.clone())
        .unwrap_or_else(|| ArSettings::default().api_base)
}

pub fn start_experience_load(
    mut commands: Commands,
    fragment: Res<ExperienceFragment>,
    settings: Option<Res<ArSettings>>,
    asset_server: Res<AssetServer>,
    mut loader: ResMut<ExperienceLoader>,
    mut ready: EventWriter<ExperienceReady>,
) {
    let Some(slug) = fragment.0.as_deref().and_then(experience_slug) else {
        info!("No experience in URL fragment, using the demo experience");
        loader.finished = true;
        activate_demo(&mut commands, &mut ready);
        return;
    };

    let path = experience_asset_path(&api_base(settings.as_deref()), slug);
    info!("Loading experience from {}", path);
    loader.handle = Some(asset_server.load(path.clone()));
    loader.path = Some(path);
}

pub fn poll_experience_load(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    experiences: Res<Assets<Experience>>,
    settings: Option<Res<ArSettings>>,
    mut loader: ResMut<ExperienceLoader>,
    mut ready: EventWriter<ExperienceReady>,
    mut config_errors: EventWriter<ContentConfigError>,
) {
    let Some(handle) = loader.handle.clone() else {
        return;
    };
    let path = loader.path.clone().unwrap_or_default();

    if let Some(experience) = experiences.get(&handle) {
        loader.finished = true;
        let source = ContentSource::Remote {
            api_base: api_base(settings.as_deref()),
        };
        match resolve_experience(experience, &source) {
            Ok(resolved) => activate(&mut commands, &mut ready, resolved, false),
            Err(error) => {
                error!("Experience {} is misconfigured: {}", path, error);
                config_errors.write(ContentConfigError {
                    message: error.to_string(),
                });
                activate_demo(&mut commands, &mut ready);
            }
        }
        return;
    }

    if let Some(LoadState::Failed(reason)) = asset_server.get_load_state(&handle) {
        loader.finished = true;
        let error = ContentError::Fetch {
            path,
            reason: reason.to_string(),
        };
        warn!("{}, falling back to the demo experience", error);
        activate_demo(&mut commands, &mut ready);
    }
}

fn activate_demo(commands: &mut Commands, ready: &mut EventWriter<ExperienceReady>) {
    match resolve_experience(&demo_experience(), &ContentSource::Demo) {
        Ok(resolved) => activate(commands, ready, resolved, true),
        Err(error) => error!("Bundled demo experience is invalid: {}", error),
    }
}

fn activate(
    commands: &mut Commands,
    ready: &mut EventWriter<ExperienceReady>,
    experience: ResolvedExperience,
    is_demo: bool,
) {
    for scene in &experience.scenes {
        let anchor = spawn_anchor(commands, scene.target_index);
        for node in &scene.nodes {
            commands.spawn((
                ContentNode {
                    id: node.id,
                    kind: node.kind.clone(),
                },
                node.transform.to_transform(),
                Visibility::Inherited,
                Name::new(format!("{} / node {}", scene.name, node.id)),
                ChildOf(anchor),
            ));
        }
    }

    info!(
        "Experience \"{}\" ready with {} anchored scene(s)",
        experience.name,
        experience.scenes.len()
    );
    ready.write(ExperienceReady {
        name: experience.name.clone(),
        target_url: experience.target_url.clone(),
        anchor_count: experience.scenes.len(),
    });
    commands.insert_resource(ActiveExperience {
        experience,
        is_demo,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::experience::{
        ArScene, ContentConfig, ContentFile, ImageTarget, SceneGraphNode,
    };
    use crate::engine::anchors::reconciler::TrackedAnchor;
    use constants::tracking::DEFAULT_TARGET_URL;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .insert_resource(ExperienceFragment(None))
            .add_plugins(ContentPlugin);
        app
    }

    fn ready_events(app: &mut App) -> Vec<ExperienceReady> {
        app.world_mut()
            .resource_mut::<Events<ExperienceReady>>()
            .drain()
            .collect()
    }

    fn remote_experience(transform: &str) -> Experience {
        Experience {
            id: 9,
            name: "Remote".into(),
            url: None,
            file_name: "remote.mind".into(),
            scenes: vec![ArScene {
                id: 1,
                name: "Scene".into(),
                graph: vec![SceneGraphNode::Content(ContentConfig {
                    id: 4,
                    transform: transform.into(),
                })],
                target: ImageTarget {
                    id: 1,
                    name: "Poster".into(),
                    file_name: "poster.jpg".into(),
                },
                contents: vec![ContentFile {
                    id: 4,
                    name: "Clip".into(),
                    file_name: "clip.mp4".into(),
                }],
            }],
        }
    }

    /// Pretend the fetch already completed with `experience`.
    fn preload(app: &mut App, experience: Experience) {
        let handle = app
            .world_mut()
            .resource_mut::<Assets<Experience>>()
            .add(experience);
        let mut loader = app.world_mut().resource_mut::<ExperienceLoader>();
        loader.handle = Some(handle);
        loader.path = Some("api/experiences/remote.experience.json".into());
    }

    #[test]
    fn missing_fragment_uses_demo() {
        let mut app = app();
        app.update();

        let active = app.world().resource::<ActiveExperience>();
        assert!(active.is_demo);
        assert_eq!(active.experience.target_url, DEFAULT_TARGET_URL);

        let ready = ready_events(&mut app);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].anchor_count, 1);

        let anchors = app
            .world_mut()
            .query::<&TrackedAnchor>()
            .iter(app.world())
            .count();
        assert_eq!(anchors, 1);
        let nodes = app
            .world_mut()
            .query::<&ContentNode>()
            .iter(app.world())
            .count();
        assert_eq!(nodes, 1);
    }

    #[test]
    fn loaded_experience_is_anchored_by_scene_index() {
        let mut app = app();
        app.update();
        ready_events(&mut app);
        app.world_mut().remove_resource::<ActiveExperience>();

        app.world_mut().resource_mut::<ExperienceLoader>().finished = false;
        preload(&mut app, remote_experience("0 0.1 0 0 0 0 2 2 2"));
        app.update();

        let active = app.world().resource::<ActiveExperience>();
        assert!(!active.is_demo);
        assert_eq!(active.experience.target_url, "api/uploads/remote.mind");

        let ready = ready_events(&mut app);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].target_url, "api/uploads/remote.mind");

        let node = app
            .world_mut()
            .query::<(&ContentNode, &Transform)>()
            .iter(app.world())
            .find(|(node, _)| node.id == 4)
            .map(|(node, transform)| (node.clone(), *transform))
            .unwrap();
        assert_eq!(node.1.scale, Vec3::splat(2.0));
        assert!(matches!(node.0.kind, NodeKind::Content { ref url, .. } if url == "api/uploads/clip.mp4"));
    }

    #[test]
    fn misconfigured_experience_reports_and_falls_back() {
        let mut app = app();
        app.update();
        ready_events(&mut app);
        app.world_mut().remove_resource::<ActiveExperience>();

        app.world_mut().resource_mut::<ExperienceLoader>().finished = false;
        preload(&mut app, remote_experience("0 0 0"));
        app.update();

        let errors: Vec<_> = app
            .world_mut()
            .resource_mut::<Events<ContentConfigError>>()
            .drain()
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected 9 fields"));
        assert!(app.world().resource::<ActiveExperience>().is_demo);
    }
}
