use crate::backend::{FrameContext, MeshDraw, RenderBackend, TextureDraw};
use crate::HandleId;
use glamx::UVec2;
use parking_lot::Mutex;
use std::sync::Arc;
use tessel_asset::{Image, MeshData};

/// One call a [`RecordingBackend`] received.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateTexture(HandleId),
    DestroyTexture(HandleId),
    LoadTexture { id: HandleId, size: UVec2 },
    ResizeTexture { id: HandleId, size: UVec2 },
    CreateMesh(HandleId),
    DestroyMesh(HandleId),
    LoadMesh { id: HandleId, vertex_count: u32 },
    BeginFrame(u64),
    RenderTexture(TextureDraw),
    RenderMesh(MeshDraw),
    EndFrame(u64),
    Release,
}

impl BackendCall {
    pub fn is_create(&self) -> bool {
        matches!(self, BackendCall::CreateTexture(_) | BackendCall::CreateMesh(_))
    }

    pub fn is_destroy(&self) -> bool {
        matches!(self, BackendCall::DestroyTexture(_) | BackendCall::DestroyMesh(_))
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, BackendCall::RenderTexture(_) | BackendCall::RenderMesh(_))
    }
}

/// Shared view of the calls a [`RecordingBackend`] received. Stays readable after the backend
/// itself moved to another thread or was dropped.
#[derive(Debug, Default, Clone)]
pub struct CallLog(Arc<Mutex<Vec<BackendCall>>>);

impl CallLog {
    pub fn snapshot(&self) -> Vec<BackendCall> {
        self.0.lock().clone()
    }

    /// Returns everything recorded so far and starts over with an empty log.
    pub fn take(&self) -> Vec<BackendCall> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn count(&self, filter: impl Fn(&BackendCall) -> bool) -> usize {
        self.0.lock().iter().filter(|call| filter(call)).count()
    }

    fn push(&self, call: BackendCall) {
        self.0.lock().push(call);
    }
}

/// Headless backend that records every call it receives.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: CallLog,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl RenderBackend for RecordingBackend {
    fn create_texture(&mut self, id: HandleId) {
        self.log.push(BackendCall::CreateTexture(id));
    }

    fn destroy_texture(&mut self, id: HandleId) {
        self.log.push(BackendCall::DestroyTexture(id));
    }

    fn load_texture(&mut self, id: HandleId, image: &Image) {
        self.log.push(BackendCall::LoadTexture {
            id,
            size: image.size(),
        });
    }

    fn resize_texture(&mut self, id: HandleId, size: UVec2) {
        self.log.push(BackendCall::ResizeTexture { id, size });
    }

    fn create_mesh(&mut self, id: HandleId) {
        self.log.push(BackendCall::CreateMesh(id));
    }

    fn destroy_mesh(&mut self, id: HandleId) {
        self.log.push(BackendCall::DestroyMesh(id));
    }

    fn load_mesh(&mut self, id: HandleId, mesh: &MeshData) {
        self.log.push(BackendCall::LoadMesh {
            id,
            vertex_count: mesh.vertex_count(),
        });
    }

    fn begin_frame(&mut self, frame: &FrameContext) {
        self.log.push(BackendCall::BeginFrame(frame.frame));
    }

    fn render_texture(&mut self, _frame: &FrameContext, draw: &TextureDraw) {
        self.log.push(BackendCall::RenderTexture(draw.clone()));
    }

    fn render_mesh(&mut self, _frame: &FrameContext, draw: &MeshDraw) {
        self.log.push(BackendCall::RenderMesh(draw.clone()));
    }

    fn end_frame(&mut self, frame: &FrameContext) {
        self.log.push(BackendCall::EndFrame(frame.frame));
    }

    fn release(&mut self) {
        self.log.push(BackendCall::Release);
    }
}
