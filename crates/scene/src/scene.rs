use std::collections::BTreeMap;

use crate::grid::{AttributeBuffer, GridBuffers};

/// Attribute name bound to vertex buffer slot 0.
pub const POSITION_ATTRIBUTE: &str = "position";
/// Attribute name bound to vertex buffer slot 1.
pub const COORDINATES_ATTRIBUTE: &str = "coordinates";
/// Scalar uniform shared by every point in a draw call.
pub const PROGRESS_UNIFORM: &str = "progress";
/// Side length of the grid the mesh was built from, for normalizing `coordinates`.
pub const GRID_SIDE_UNIFORM: &str = "grid_side";

/// Identifier of a drawable inside a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Which faces a material renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    Front,
    Back,
    #[default]
    Double,
}

/// Value of a named uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
}

/// Vertex and fragment shader sources, passed through to the GPU unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

/// Material made of two external shader stages plus named uniforms.
#[derive(Debug, Clone)]
pub struct ShaderMaterial {
    pub shaders: ShaderSources,
    pub uniforms: BTreeMap<String, UniformValue>,
    pub side: Side,
}

impl ShaderMaterial {
    pub fn new(shaders: ShaderSources) -> Self {
        Self {
            shaders,
            uniforms: BTreeMap::new(),
            side: Side::Double,
        }
    }

    pub fn with_uniform(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.uniforms.insert(name.into(), value);
        self
    }

    /// Scalar uniform lookup; `None` if absent.
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.uniforms.get(name)? {
            UniformValue::Float(v) => Some(*v),
        }
    }
}

/// Named per-vertex attributes sharing one vertex count.
#[derive(Debug, Clone, Default)]
pub struct BufferGeometry {
    attributes: BTreeMap<String, AttributeBuffer>,
}

impl BufferGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, buffer: AttributeBuffer) {
        self.attributes.insert(name.into(), buffer);
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeBuffer> {
        self.attributes.get(name)
    }

    /// Vertex count, taken from the `position` attribute.
    pub fn vertex_count(&self) -> usize {
        self.attribute(POSITION_ATTRIBUTE)
            .map(AttributeBuffer::count)
            .unwrap_or(0)
    }
}

impl From<GridBuffers> for BufferGeometry {
    fn from(grid: GridBuffers) -> Self {
        let mut geometry = BufferGeometry::new();
        geometry.set_attribute(POSITION_ATTRIBUTE, grid.positions);
        geometry.set_attribute(COORDINATES_ATTRIBUTE, grid.coordinates);
        geometry
    }
}

/// A drawable rendered as a point list, one point per vertex.
#[derive(Debug, Clone)]
pub struct Points {
    pub geometry: BufferGeometry,
    pub material: ShaderMaterial,
}

impl Points {
    pub fn new(geometry: BufferGeometry, material: ShaderMaterial) -> Self {
        Self { geometry, material }
    }

    pub fn point_count(&self) -> usize {
        self.geometry.vertex_count()
    }
}

/// Root container holding every drawable of a render pass.
#[derive(Debug, Default)]
pub struct Scene {
    children: Vec<(MeshId, Points)>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, points: Points) -> MeshId {
        let id = MeshId(self.next_id);
        self.next_id += 1;
        tracing::debug!(mesh = id.0, points = points.point_count(), "mesh added to scene");
        self.children.push((id, points));
        id
    }

    pub fn get(&self, id: MeshId) -> Option<&Points> {
        self.children.iter().find(|(m, _)| *m == id).map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, id: MeshId) -> Option<&mut Points> {
        self.children
            .iter_mut()
            .find(|(m, _)| *m == id)
            .map(|(_, p)| p)
    }

    pub fn children(&self) -> impl Iterator<Item = (MeshId, &Points)> {
        self.children.iter().map(|(id, p)| (*id, p))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
