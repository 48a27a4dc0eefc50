use crate::geometry::{Model, Point, Shape};
use crate::rotation::Rotation;
use plane_traits::Orientation;

/// A component after rotation, in the display frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PosedComponent {
    pub name: &'static str,
    pub vertices: Vec<Point>,
    pub faces: Vec<Vec<usize>>,
    pub shape: Shape,
    pub color: &'static str,
    pub opacity: f32,
}

impl PosedComponent {
    /// Each face as its rotated corner points.
    pub fn polygons(&self) -> Vec<Vec<Point>> {
        self.faces
            .iter()
            .map(|face| face.iter().map(|&i| self.vertices[i]).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PosedModel {
    pub orientation: Orientation,
    pub components: Vec<PosedComponent>,
}

impl PosedModel {
    pub fn component(&self, name: &str) -> Option<&PosedComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Last point of the nose line, the easiest thing to read as heading.
    pub fn nose_tip(&self) -> Option<Point> {
        self.component("nose").and_then(|c| c.vertices.last().copied())
    }
}

/// Poses a fixed model; each call starts from the body-frame vertices.
#[derive(Debug, Clone)]
pub struct Scene {
    model: Model,
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new(Model::aircraft())
    }
}

impl Scene {
    pub fn new(model: Model) -> Self {
        Scene { model }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn pose(&self, orientation: &Orientation) -> PosedModel {
        let rotation = Rotation::from_orientation(orientation);
        let components = self
            .model
            .components()
            .iter()
            .map(|c| PosedComponent {
                name: c.name,
                vertices: rotation.apply_all(&c.placed_vertices()),
                faces: c.faces.clone(),
                shape: c.shape,
                color: c.color,
                opacity: c.opacity,
            })
            .collect();

        PosedModel {
            orientation: *orientation,
            components,
        }
    }
}
