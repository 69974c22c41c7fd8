//! In-memory mesh source driven by closures
//!
//! Handy for tests and for callers that already hold their animation in
//! memory. Records the frames it was stepped to and whether the bake hooks
//! ran.

use crate::error::{BakeError, Result};
use crate::sampler::{MeshSource, SampledMesh, WorldTransform};

type MeshFn = Box<dyn FnMut(i32) -> Result<SampledMesh>>;
type TransformFn = Box<dyn FnMut(i32) -> WorldTransform>;

struct MemoryObject {
    name: String,
    mesh: MeshFn,
    transform: TransformFn,
}

#[derive(Default)]
pub struct MemorySource {
    objects: Vec<MemoryObject>,
    /// Every `step_to` call, in order
    pub stepped: Vec<i32>,
    pub begun: bool,
    pub ended: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object with identity transform
    pub fn with_object(
        self,
        name: &str,
        mesh: impl FnMut(i32) -> SampledMesh + 'static,
    ) -> Self {
        self.with_rigid_object(name, mesh, |_| WorldTransform::IDENTITY)
    }

    pub fn with_rigid_object(
        mut self,
        name: &str,
        mut mesh: impl FnMut(i32) -> SampledMesh + 'static,
        transform: impl FnMut(i32) -> WorldTransform + 'static,
    ) -> Self {
        self.objects.push(MemoryObject {
            name: name.to_string(),
            mesh: Box::new(move |frame| Ok(mesh(frame))),
            transform: Box::new(transform),
        });
        self
    }

    /// Add an object whose sampling may fail
    pub fn with_fallible_object(
        mut self,
        name: &str,
        mesh: impl FnMut(i32) -> Result<SampledMesh> + 'static,
    ) -> Self {
        self.objects.push(MemoryObject {
            name: name.to_string(),
            mesh: Box::new(mesh),
            transform: Box::new(|_| WorldTransform::IDENTITY),
        });
        self
    }

    fn object(&mut self, object: usize, frame: i32) -> Result<&mut MemoryObject> {
        self.objects
            .get_mut(object)
            .ok_or_else(|| BakeError::source(object, frame, "no such object"))
    }
}

impl MeshSource for MemorySource {
    fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn object_name(&self, object: usize) -> String {
        self.objects
            .get(object)
            .map(|o| o.name.clone())
            .unwrap_or_else(|| format!("Object{}", object))
    }

    fn sample(&mut self, object: usize, frame: i32) -> Result<SampledMesh> {
        (self.object(object, frame)?.mesh)(frame)
    }

    fn world_transform(&mut self, object: usize, frame: i32) -> Result<WorldTransform> {
        Ok((self.object(object, frame)?.transform)(frame))
    }

    fn step_to(&mut self, frame: i32) -> Result<()> {
        self.stepped.push(frame);
        Ok(())
    }

    fn begin_bake(&mut self) -> Result<()> {
        self.begun = true;
        Ok(())
    }

    fn end_bake(&mut self) {
        self.ended = true;
    }
}
