use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// An experience as served by the content API: one compiled target file
/// and one scene per target in it.
#[derive(Asset, TypePath, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Compiled target descriptors for every scene, in scene order.
    pub file_name: String,
    pub scenes: Vec<ArScene>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArScene {
    pub id: u64,
    pub name: String,
    pub graph: Vec<SceneGraphNode>,
    pub target: ImageTarget,
    #[serde(default)]
    pub contents: Vec<ContentFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTarget {
    pub id: u64,
    pub name: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFile {
    pub id: u64,
    pub name: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "lowercase")]
pub enum SceneGraphNode {
    /// Places one of the scene's content files; `id` refers to
    /// [`ContentFile::id`].
    Content(ContentConfig),
    Label(LabelConfig),
    Button(ButtonConfig),
    Iframe(IframeConfig),
}

impl SceneGraphNode {
    pub fn id(&self) -> u64 {
        match self {
            Self::Content(config) => config.id,
            Self::Label(config) => config.id,
            Self::Button(config) => config.id,
            Self::Iframe(config) => config.id,
        }
    }

    pub fn transform(&self) -> &str {
        match self {
            Self::Content(config) => &config.transform,
            Self::Label(config) => &config.transform,
            Self::Button(config) => &config.transform,
            Self::Iframe(config) => &config.transform,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentConfig {
    pub id: u64,
    pub transform: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    pub id: u64,
    pub transform: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    pub id: u64,
    pub transform: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IframeConfig {
    pub id: u64,
    pub transform: String,
    pub link: String,
    pub size: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_api_response() {
        let json = r#"{
            "id": 7,
            "name": "Gallery",
            "url": "gallery",
            "fileName": "targets-7.mind",
            "createdAt": "2024-03-01T10:00:00Z",
            "scenes": [{
                "id": 1,
                "name": "Poster",
                "graph": [
                    {"type": "content", "config": {"id": 3, "transform": "0 0 0 0 0 0 1 1 1"}},
                    {"type": "label", "config": {"id": 4, "transform": "0 1 0 0 0 0 1 1 1", "text": "Hello"}},
                    {"type": "iframe", "config": {"id": 5, "transform": "0 0 0 0 0 0 1 1 1", "link": "https://example.com", "size": "560x315"}}
                ],
                "target": {"id": 2, "name": "Poster", "fileName": "poster.jpg"},
                "contents": [{"id": 3, "name": "Clip", "fileName": "clip.mp4"}]
            }]
        }"#;

        let experience: Experience = serde_json::from_str(json).unwrap();
        assert_eq!(experience.file_name, "targets-7.mind");
        let scene = &experience.scenes[0];
        assert_eq!(scene.graph.len(), 3);
        assert_eq!(scene.graph[1].id(), 4);
        assert!(matches!(&scene.graph[1], SceneGraphNode::Label(label) if label.text == "Hello"));
        assert_eq!(scene.graph[2].transform(), "0 0 0 0 0 0 1 1 1");
        assert_eq!(scene.contents[0].file_name, "clip.mp4");
    }

    #[test]
    fn rejects_unknown_node_type() {
        let json = r#"{"type": "hologram", "config": {"id": 1, "transform": ""}}"#;
        assert!(serde_json::from_str::<SceneGraphNode>(json).is_err());
    }
}
