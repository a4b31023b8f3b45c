use std::collections::HashMap;

use constants::content::{EXPERIENCE_EXTENSION, UPLOADS_DIR};
use thiserror::Error;

use super::experience::{Experience, SceneGraphNode};
use super::transform::{NodeTransform, TransformParseError, parse_transform};
use crate::engine::tracking::matrix::TargetIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Video,
    Model,
    Youtube,
    Unknown,
}

impl ContentKind {
    pub fn from_file_name(file_name: &str) -> Self {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "mp4" => Self::Video,
            "glb" => Self::Model,
            "yt" => Self::Youtube,
            _ => Self::Unknown,
        }
    }
}

/// Where content file names are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Remote { api_base: String },
    /// Bundled files, used as-is.
    Demo,
}

impl ContentSource {
    /// URL of an uploaded file. YouTube ids are never rewritten.
    pub fn content_url(&self, file_name: &str) -> String {
        if ContentKind::from_file_name(file_name) == ContentKind::Youtube {
            return file_name.to_string();
        }
        match self {
            Self::Remote { api_base } => upload_url(api_base, file_name),
            Self::Demo => file_name.to_string(),
        }
    }

    pub fn target_url(&self, file_name: &str) -> String {
        match self {
            Self::Remote { api_base } => upload_url(api_base, file_name),
            Self::Demo => file_name.to_string(),
        }
    }
}

fn upload_url(api_base: &str, file_name: &str) -> String {
    format!("{}/{}/{}", api_base.trim_end_matches('/'), UPLOADS_DIR, file_name)
}

/// Experience slug from a URL fragment such as `#spring-launch`.
pub fn experience_slug(fragment: &str) -> Option<&str> {
    let slug = fragment.trim().trim_start_matches('#').trim();
    (!slug.is_empty()).then_some(slug)
}

pub fn experience_asset_path(api_base: &str, slug: &str) -> String {
    format!(
        "{}/experiences/{}.{}",
        api_base.trim_end_matches('/'),
        slug,
        EXPERIENCE_EXTENSION
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Content {
        kind: ContentKind,
        name: String,
        url: String,
    },
    Label {
        text: String,
    },
    Button {
        action: String,
    },
    Iframe {
        link: String,
        size: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNode {
    pub id: u64,
    pub kind: NodeKind,
    pub transform: NodeTransform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScene {
    pub name: String,
    pub target_index: TargetIndex,
    pub target_name: String,
    pub nodes: Vec<ResolvedNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExperience {
    pub name: String,
    pub target_url: String,
    pub scenes: Vec<ResolvedScene>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentError {
    #[error("experience {0:?} has no scenes")]
    NoScenes(String),
    #[error("scene {scene:?} places unknown content {id}")]
    UnknownContent { scene: String, id: u64 },
    #[error("scene {scene:?}, node {id}: {source}")]
    Transform {
        scene: String,
        id: u64,
        #[source]
        source: TransformParseError,
    },
    #[error("failed to load experience from {path}: {reason}")]
    Fetch { path: String, reason: String },
}

/// Resolve URLs and transforms of every scene. Scene `i` is anchored to
/// target `i` of the experience's target file.
pub fn resolve_experience(
    experience: &Experience,
    source: &ContentSource,
) -> Result<ResolvedExperience, ContentError> {
    if experience.scenes.is_empty() {
        return Err(ContentError::NoScenes(experience.name.clone()));
    }

    let mut scenes = Vec::with_capacity(experience.scenes.len());
    for (target_index, scene) in experience.scenes.iter().enumerate() {
        let contents: HashMap<u64, _> = scene
            .contents
            .iter()
            .map(|content| (content.id, content))
            .collect();

        let mut nodes = Vec::with_capacity(scene.graph.len());
        for node in &scene.graph {
            let transform =
                parse_transform(node.transform()).map_err(|source| ContentError::Transform {
                    scene: scene.name.clone(),
                    id: node.id(),
                    source,
                })?;

            let kind = match node {
                SceneGraphNode::Content(config) => {
                    let content =
                        contents
                            .get(&config.id)
                            .ok_or_else(|| ContentError::UnknownContent {
                                scene: scene.name.clone(),
                                id: config.id,
                            })?;
                    NodeKind::Content {
                        kind: ContentKind::from_file_name(&content.file_name),
                        name: content.name.clone(),
                        url: source.content_url(&content.file_name),
                    }
                }
                SceneGraphNode::Label(config) => NodeKind::Label {
                    text: config.text.clone(),
                },
                SceneGraphNode::Button(config) => NodeKind::Button {
                    action: config.action.clone(),
                },
                SceneGraphNode::Iframe(config) => NodeKind::Iframe {
                    link: config.link.clone(),
                    size: config.size.clone(),
                },
            };

            nodes.push(ResolvedNode {
                id: node.id(),
                kind,
                transform,
            });
        }

        scenes.push(ResolvedScene {
            name: scene.name.clone(),
            target_index,
            target_name: scene.target.name.clone(),
            nodes,
        });
    }

    Ok(ResolvedExperience {
        name: experience.name.clone(),
        target_url: source.target_url(&experience.file_name),
        scenes,
    })
}
