use nalgebra::Vector3;

pub type Point = Vector3<f64>;

/// How a component's vertices are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `faces` index into `vertices`, one polygon per face.
    Polygons,
    /// `vertices` form a single polyline.
    Line,
}

/// One rigid part of the model, defined in the body frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: &'static str,
    pub vertices: Vec<Point>,
    /// Added to every vertex before rotation.
    pub offset: Point,
    pub faces: Vec<Vec<usize>>,
    pub shape: Shape,
    pub color: &'static str,
    pub opacity: f32,
}

impl Component {
    /// Vertices with the body-frame offset applied.
    pub fn placed_vertices(&self) -> Vec<Point> {
        self.vertices.iter().map(|v| v + self.offset).collect()
    }
}

/// Immutable set of components.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    components: Vec<Component>,
}

fn points(raw: &[[f64; 3]]) -> Vec<Point> {
    raw.iter().map(|p| Point::new(p[0], p[1], p[2])).collect()
}

impl Model {
    pub fn new(components: Vec<Component>) -> Self {
        Model { components }
    }

    /// Box fuselage along +x, flat wings, tail plane, fin and a nose line.
    pub fn aircraft() -> Self {
        let fuselage = Component {
            name: "fuselage",
            vertices: points(&[
                [-1.0, -0.1, -0.1],
                [1.0, -0.1, -0.1],
                [1.0, 0.1, -0.1],
                [-1.0, 0.1, -0.1],
                [-1.0, -0.1, 0.1],
                [1.0, -0.1, 0.1],
                [1.0, 0.1, 0.1],
                [-1.0, 0.1, 0.1],
            ]),
            offset: Point::zeros(),
            faces: vec![
                vec![0, 1, 2, 3], // bottom
                vec![4, 5, 6, 7], // top
                vec![0, 1, 5, 4],
                vec![2, 3, 7, 6],
                vec![1, 2, 6, 5],
                vec![0, 3, 7, 4],
            ],
            shape: Shape::Polygons,
            color: "#2c3e50",
            opacity: 0.9,
        };

        let wings = Component {
            name: "wings",
            vertices: points(&[
                [-0.8, -1.2, 0.0],
                [0.8, -1.2, 0.0],
                [0.8, 1.2, 0.0],
                [-0.8, 1.2, 0.0],
            ]),
            offset: Point::zeros(),
            faces: vec![vec![0, 1, 2, 3]],
            shape: Shape::Polygons,
            color: "#3498db",
            opacity: 0.8,
        };

        let tail = Component {
            name: "tail",
            vertices: points(&[
                [-0.3, -0.4, 0.0],
                [0.3, -0.4, 0.0],
                [0.3, 0.4, 0.0],
                [-0.3, 0.4, 0.0],
            ]),
            offset: Point::new(0.7, 0.0, 0.0),
            faces: vec![vec![0, 1, 2, 3]],
            shape: Shape::Polygons,
            color: "#e74c3c",
            opacity: 0.8,
        };

        let stabilizer = Component {
            name: "stabilizer",
            vertices: points(&[
                [-0.1, 0.0, -0.1],
                [0.1, 0.0, -0.1],
                [0.1, 0.0, 0.5],
                [-0.1, 0.0, 0.5],
            ]),
            offset: Point::new(0.7, 0.0, 0.0),
            faces: vec![vec![0, 1, 2, 3]],
            shape: Shape::Polygons,
            color: "#f39c12",
            opacity: 0.8,
        };

        let nose = Component {
            name: "nose",
            vertices: points(&[[1.0, 0.0, 0.0], [1.3, 0.0, 0.0]]),
            offset: Point::zeros(),
            faces: Vec::new(),
            shape: Shape::Line,
            color: "#ecf0f1",
            opacity: 1.0,
        };

        Model::new(vec![fuselage, wings, tail, stabilizer, nose])
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }
}
