use constants::content::{
    DEMO_EXPERIENCE_NAME, DEMO_MODEL_FILE, DEMO_MODEL_NAME, DEMO_MODEL_TRANSFORM, DEMO_SCENE_NAME,
    DEMO_TARGET_IMAGE, DEMO_TARGET_NAME,
};
use constants::tracking::DEFAULT_TARGET_URL;

use super::experience::{ArScene, ContentConfig, ContentFile, Experience, ImageTarget, SceneGraphNode};

/// The bundled car experience, served from the app's own files.
pub fn demo_experience() -> Experience {
    Experience {
        id: 1,
        name: DEMO_EXPERIENCE_NAME.to_string(),
        url: None,
        file_name: DEFAULT_TARGET_URL.to_string(),
        scenes: vec![ArScene {
            id: 1,
            name: DEMO_SCENE_NAME.to_string(),
            graph: vec![SceneGraphNode::Content(ContentConfig {
                id: 1,
                transform: DEMO_MODEL_TRANSFORM.to_string(),
            })],
            target: ImageTarget {
                id: 1,
                name: DEMO_TARGET_NAME.to_string(),
                file_name: DEMO_TARGET_IMAGE.to_string(),
            },
            contents: vec![ContentFile {
                id: 1,
                name: DEMO_MODEL_NAME.to_string(),
                file_name: DEMO_MODEL_FILE.to_string(),
            }],
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::resolver::{ContentKind, ContentSource, NodeKind, resolve_experience};

    #[test]
    fn demo_resolves_to_bundled_files() {
        let resolved = resolve_experience(&demo_experience(), &ContentSource::Demo).unwrap();
        assert_eq!(resolved.target_url, DEFAULT_TARGET_URL);
        assert_eq!(resolved.scenes.len(), 1);

        let node = &resolved.scenes[0].nodes[0];
        assert_eq!(
            node.kind,
            NodeKind::Content {
                kind: ContentKind::Model,
                name: DEMO_MODEL_NAME.into(),
                url: DEMO_MODEL_FILE.into(),
            }
        );
        assert!((node.transform.rotation.y + 1.570).abs() < 1e-6);
    }
}
