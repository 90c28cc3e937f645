//! Scene graph payloads as returned by the analysis service.
//!
//! [`AnalysisResponse`] mirrors the JSON on the wire. [`AnalysisResult`] is
//! the validated, decoded form the rest of the workspace works with.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::diagram::Relationship;
use crate::error::{SceneGraphError, SceneGraphResult};

/// An object detected in the analyzed image, in image-space pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Unique id within the scene graph, e.g. `person_1`.
    pub id: String,
    /// Left edge of the bounding box.
    pub x: f64,
    /// Top edge of the bounding box.
    pub y: f64,
    /// Bounding box width.
    pub width: f64,
    /// Bounding box height.
    pub height: f64,
}

impl DetectedObject {
    /// Create a detected object.
    pub fn new(id: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
        }
    }

    fn validate_geometry(&self) -> SceneGraphResult<()> {
        let fields = [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(SceneGraphError::invalid_geometry(
                    &self.id,
                    format!("{} is not finite", name),
                ));
            }
            if value < 0.0 {
                return Err(SceneGraphError::invalid_geometry(
                    &self.id,
                    format!("{} is negative ({})", name, value),
                ));
            }
        }
        Ok(())
    }
}

/// Objects plus "subject predicate object" relationship strings.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneGraph {
    /// Detected objects. Order carries no meaning.
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
    /// Relationships such as `"person_1 on horse_1"`.
    #[serde(default)]
    pub relationships: Vec<String>,
}

impl SceneGraph {
    /// Creates an empty scene graph.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the number of detected objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Returns the number of relationship strings.
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Look up an object by id.
    pub fn object(&self, id: &str) -> Option<&DetectedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Parse every relationship, keeping its ordinal position.
    ///
    /// Entries with fewer than two tokens yield `None`.
    pub fn parsed_relationships(&self) -> impl Iterator<Item = (usize, Option<Relationship<'_>>)> {
        self.relationships
            .iter()
            .enumerate()
            .map(|(index, text)| (index, Relationship::parse(text)))
    }

    /// Check the invariants the diagram depends on.
    ///
    /// Object ids must be present and unique, geometry finite and
    /// non-negative. Relationship problems are not errors here; the diagram
    /// reports them as issues instead.
    pub fn validate(&self) -> SceneGraphResult<()> {
        let mut seen = HashSet::with_capacity(self.objects.len());
        for (index, object) in self.objects.iter().enumerate() {
            if object.id.trim().is_empty() {
                return Err(SceneGraphError::EmptyObjectId { index });
            }
            if !seen.insert(object.id.as_str()) {
                return Err(SceneGraphError::DuplicateObjectId {
                    id: object.id.clone(),
                });
            }
            object.validate_geometry()?;
        }
        Ok(())
    }
}

/// Analysis payload exactly as the service sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Base64-encoded image with the detections drawn on it.
    pub processed_image: String,
    /// Natural language summary of the scene.
    #[serde(default)]
    pub description: String,
    /// Structured detections and relationships.
    pub scene_graph: SceneGraph,
}

impl AnalysisResponse {
    /// Parse a response from JSON text.
    pub fn from_json(json: &str) -> SceneGraphResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A validated analysis. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    processed_image: Vec<u8>,
    description: String,
    scene_graph: SceneGraph,
}

impl AnalysisResult {
    /// Build a result from already decoded parts, validating the scene graph.
    pub fn new(
        processed_image: Vec<u8>,
        description: impl Into<String>,
        scene_graph: SceneGraph,
    ) -> SceneGraphResult<Self> {
        scene_graph.validate()?;
        Ok(Self {
            processed_image,
            description: description.into(),
            scene_graph,
        })
    }

    /// Raw bytes of the processed image.
    pub fn processed_image(&self) -> &[u8] {
        &self.processed_image
    }

    /// Scene description text.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The scene graph.
    pub fn scene_graph(&self) -> &SceneGraph {
        &self.scene_graph
    }

    /// Convert back into the wire representation.
    pub fn to_response(&self) -> AnalysisResponse {
        AnalysisResponse {
            processed_image: BASE64.encode(&self.processed_image),
            description: self.description.clone(),
            scene_graph: self.scene_graph.clone(),
        }
    }
}

impl TryFrom<AnalysisResponse> for AnalysisResult {
    type Error = SceneGraphError;

    fn try_from(response: AnalysisResponse) -> SceneGraphResult<Self> {
        let processed_image = BASE64.decode(response.processed_image.trim())?;
        Self::new(processed_image, response.description, response.scene_graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_objects() -> SceneGraph {
        SceneGraph {
            objects: vec![
                DetectedObject::new("A", 0.0, 0.0, 10.0, 10.0),
                DetectedObject::new("B", 20.0, 0.0, 10.0, 10.0),
            ],
            relationships: vec!["A holds B".into()],
        }
    }

    #[test]
    fn response_decodes_into_result() {
        let json = r#"{
            "processed_image": "aGVsbG8=",
            "description": "A holds B.",
            "scene_graph": {
                "objects": [
                    {"id": "A", "x": 0, "y": 0, "width": 10, "height": 10},
                    {"id": "B", "x": 20, "y": 0, "width": 10, "height": 10}
                ],
                "relationships": ["A holds B"]
            }
        }"#;

        let response = AnalysisResponse::from_json(json).unwrap();
        let result = AnalysisResult::try_from(response).unwrap();

        assert_eq!(result.processed_image(), b"hello");
        assert_eq!(result.description(), "A holds B.");
        assert_eq!(result.scene_graph(), &two_objects());
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let response = AnalysisResponse {
            processed_image: "not base64!".into(),
            description: String::new(),
            scene_graph: two_objects(),
        };
        let err = AnalysisResult::try_from(response).unwrap_err();
        assert!(matches!(err, SceneGraphError::ImageDecode(_)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut graph = two_objects();
        graph.objects[1].id = "A".into();
        let err = graph.validate().unwrap_err();
        assert!(matches!(err, SceneGraphError::DuplicateObjectId { id } if id == "A"));
    }

    #[test]
    fn negative_and_nan_geometry_are_rejected() {
        let mut graph = two_objects();
        graph.objects[0].width = -1.0;
        assert!(matches!(
            graph.validate(),
            Err(SceneGraphError::InvalidGeometry { .. })
        ));

        let mut graph = two_objects();
        graph.objects[1].y = f64::NAN;
        assert!(matches!(
            graph.validate(),
            Err(SceneGraphError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn empty_id_is_rejected() {
        let mut graph = two_objects();
        graph.objects[1].id = "  ".into();
        assert!(matches!(
            graph.validate(),
            Err(SceneGraphError::EmptyObjectId { index: 1 })
        ));
    }

    #[test]
    fn malformed_relationships_do_not_fail_validation() {
        let mut graph = two_objects();
        graph.relationships.push("lonely".into());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn to_response_round_trips_image_bytes() {
        let result = AnalysisResult::new(vec![1, 2, 3], "desc", two_objects()).unwrap();
        let back = AnalysisResult::try_from(result.to_response()).unwrap();
        assert_eq!(back, result);
    }
}
