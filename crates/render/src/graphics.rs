use glam::{Mat4, Vec3};

/// Errors raised by the host graphics state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphicsError {
    #[error("transform stack underflow")]
    StackUnderflow,
    #[error("geometry buffer already building")]
    AlreadyBuilding,
    #[error("geometry buffer not building")]
    NotBuilding,
}

/// Hierarchical transform stack. Every render call must leave it balanced.
pub trait TransformStack {
    /// Duplicate the top transform.
    fn push(&mut self);
    /// Discard the top transform.
    fn pop(&mut self) -> Result<(), GraphicsError>;
    /// Number of entries on the stack.
    fn depth(&self) -> usize;
}

/// Reusable buffer accumulating vertex data between `begin` and `end_build`.
pub trait GeometryBuffer {
    fn begin(&mut self) -> Result<(), GraphicsError>;
    fn vertex(&mut self, position: Vec3) -> Result<(), GraphicsError>;
    fn is_building(&self) -> bool;
    /// Finish the build in progress, returning how many vertices it held.
    fn end_build(&mut self) -> Result<usize, GraphicsError>;
}

/// Matrix stack with an identity base entry that can never be popped.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    stack: Vec<Mat4>,
}

impl MatrixStack {
    pub fn new() -> Self {
        Self {
            stack: vec![Mat4::IDENTITY],
        }
    }

    /// The current transform.
    pub fn top(&self) -> Mat4 {
        self.stack.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.apply(Mat4::from_translation(offset));
    }

    pub fn scale(&mut self, factor: Vec3) {
        self.apply(Mat4::from_scale(factor));
    }

    fn apply(&mut self, m: Mat4) {
        if let Some(top) = self.stack.last_mut() {
            *top *= m;
        }
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack for MatrixStack {
    fn push(&mut self) {
        let top = self.top();
        self.stack.push(top);
    }

    fn pop(&mut self) -> Result<(), GraphicsError> {
        if self.stack.len() <= 1 {
            return Err(GraphicsError::StackUnderflow);
        }
        self.stack.pop();
        Ok(())
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// In-memory streaming vertex buffer.
#[derive(Debug, Default)]
pub struct VertexBuffer {
    vertices: Vec<Vec3>,
    building: bool,
    finished_builds: usize,
}

impl VertexBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of builds ended so far.
    pub fn finished_builds(&self) -> usize {
        self.finished_builds
    }
}

impl GeometryBuffer for VertexBuffer {
    fn begin(&mut self) -> Result<(), GraphicsError> {
        if self.building {
            return Err(GraphicsError::AlreadyBuilding);
        }
        self.vertices.clear();
        self.building = true;
        Ok(())
    }

    fn vertex(&mut self, position: Vec3) -> Result<(), GraphicsError> {
        if !self.building {
            return Err(GraphicsError::NotBuilding);
        }
        self.vertices.push(position);
        Ok(())
    }

    fn is_building(&self) -> bool {
        self.building
    }

    fn end_build(&mut self) -> Result<usize, GraphicsError> {
        if !self.building {
            return Err(GraphicsError::NotBuilding);
        }
        self.building = false;
        let count = self.vertices.len();
        self.finished_builds += 1;
        self.vertices.clear();
        Ok(count)
    }
}

/// The host's primary transform stack and geometry buffer, handed to every draw.
pub struct GraphicsContext {
    transforms: Box<dyn TransformStack>,
    buffer: Box<dyn GeometryBuffer>,
}

impl GraphicsContext {
    pub fn new(transforms: Box<dyn TransformStack>, buffer: Box<dyn GeometryBuffer>) -> Self {
        Self { transforms, buffer }
    }

    pub fn transforms(&self) -> &dyn TransformStack {
        self.transforms.as_ref()
    }

    pub fn transforms_mut(&mut self) -> &mut dyn TransformStack {
        self.transforms.as_mut()
    }

    pub fn buffer(&self) -> &dyn GeometryBuffer {
        self.buffer.as_ref()
    }

    pub fn buffer_mut(&mut self) -> &mut dyn GeometryBuffer {
        self.buffer.as_mut()
    }
}

impl Default for GraphicsContext {
    fn default() -> Self {
        Self::new(Box::new(MatrixStack::new()), Box::new(VertexBuffer::new()))
    }
}

impl std::fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("depth", &self.transforms.depth())
            .field("building", &self.buffer.is_building())
            .finish()
    }
}
