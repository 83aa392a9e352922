use pointgrid_common::{SketchError, SketchResult};

/// Side length of the default point grid.
pub const DEFAULT_GRID_SIDE: u32 = 512;

/// Largest grid side accepted by [`build_grid`] (16.7M points).
pub const MAX_GRID_SIDE: u32 = 4096;

/// World-space distance between neighbouring grid points.
pub const GRID_SPACING: f32 = 2.0;

/// Flat per-vertex attribute array with a fixed number of components per item.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBuffer {
    data: Vec<f32>,
    item_size: usize,
}

impl AttributeBuffer {
    /// Zero-filled buffer holding `count` items of `item_size` floats.
    pub fn zeroed(count: usize, item_size: usize) -> Self {
        assert!(item_size > 0, "item_size must be positive");
        Self {
            data: vec![0.0; count * item_size],
            item_size,
        }
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of items (vertices) stored.
    pub fn count(&self) -> usize {
        self.data.len() / self.item_size
    }

    /// Raw length of the underlying float array.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn set_xyz(&mut self, index: usize, x: f32, y: f32, z: f32) {
        let at = index * self.item_size;
        self.data[at] = x;
        self.data[at + 1] = y;
        self.data[at + 2] = z;
    }

    pub fn get_xyz(&self, index: usize) -> [f32; 3] {
        let at = index * self.item_size;
        [self.data[at], self.data[at + 1], self.data[at + 2]]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// The two parallel attribute buffers describing a square point grid.
///
/// Vertex `k` is grid point `(k / side, k % side)`: the GPU consumes the
/// buffers as a point list, so traversal order is the vertex index.
#[derive(Debug, Clone)]
pub struct GridBuffers {
    pub side: u32,
    pub positions: AttributeBuffer,
    pub coordinates: AttributeBuffer,
}

impl GridBuffers {
    pub fn point_count(&self) -> usize {
        self.positions.count()
    }

    /// Grid indices `(i, j)` of vertex `k`.
    pub fn grid_index(&self, k: usize) -> (u32, u32) {
        let side = self.side as usize;
        ((k / side) as u32, (k % side) as u32)
    }
}

/// Fill position and coordinate buffers for a `side` x `side` grid.
///
/// Positions are centred on the origin with [`GRID_SPACING`] between points:
/// `((i - side/2) * 2, (j - side/2) * 2, 0)`. Coordinates carry the raw
/// indices `(i, j, 0)`.
pub fn build_grid(side: u32) -> SketchResult<GridBuffers> {
    if side == 0 {
        return Err(SketchError::configuration("grid side must be positive"));
    }
    if side > MAX_GRID_SIDE {
        return Err(SketchError::configuration(format!(
            "grid side {side} exceeds the maximum of {MAX_GRID_SIDE}"
        )));
    }

    let _span = tracing::debug_span!("build_grid", side).entered();
    let count = side as usize * side as usize;
    let half = (side / 2) as i64;

    let mut positions = AttributeBuffer::zeroed(count, 3);
    let mut coordinates = AttributeBuffer::zeroed(count, 3);

    let mut index = 0;
    for i in 0..side {
        let x = (i as i64 - half) as f32 * GRID_SPACING;
        for j in 0..side {
            let y = (j as i64 - half) as f32 * GRID_SPACING;
            positions.set_xyz(index, x, y, 0.0);
            coordinates.set_xyz(index, i as f32, j as f32, 0.0);
            index += 1;
        }
    }

    tracing::debug!(points = count, "grid buffers filled");

    Ok(GridBuffers {
        side,
        positions,
        coordinates,
    })
}
