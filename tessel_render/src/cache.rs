//! Per-frame mark-and-sweep cache of backend resources.
//!
//! Every frame the cache walks the scene snapshot and collects the assets it references. Assets
//! seen for the first time get a fresh [`HandleId`], a backend `create_*` call and a load
//! request. Entries whose asset is no longer referenced are destroyed and their id is freed in
//! the same frame, before any new id is minted. An asset shared by several drawables occupies
//! exactly one entry.
//!
//! Loads are never waited on. A drawable is only drawn once every asset it uses has been
//! uploaded, and a failed load is retried the next frame the asset is still visited.

use crate::backend::{FrameContext, MeshDraw, RenderBackend, TextureDraw};
use crate::id_allocator::{HandleId, IdAllocator};
use crate::scene::{Drawable, DrawableId, SceneSnapshot};
use glamx::UVec2;
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;
use tessel_asset::{AssetId, Image, ImageAsset, LazyResource, MeshData, ResourceFuture};
use tessel_utils::debug_panic;
use tracing::{debug, error, instrument, trace};

/// Asset data the cache knows how to put behind a backend id.
pub trait BackendResource: Send + Sync + Sized + 'static {
    /// What the cache remembers about the uploaded data.
    type Meta: Copy + Debug;

    const KIND: &'static str;

    fn create(backend: &mut dyn RenderBackend, id: HandleId);
    fn destroy(backend: &mut dyn RenderBackend, id: HandleId);
    fn upload(&self, backend: &mut dyn RenderBackend, id: HandleId) -> Self::Meta;
}

impl BackendResource for Image {
    type Meta = UVec2;

    const KIND: &'static str = "texture";

    fn create(backend: &mut dyn RenderBackend, id: HandleId) {
        backend.create_texture(id);
    }

    fn destroy(backend: &mut dyn RenderBackend, id: HandleId) {
        backend.destroy_texture(id);
    }

    fn upload(&self, backend: &mut dyn RenderBackend, id: HandleId) -> UVec2 {
        backend.resize_texture(id, self.size());
        backend.load_texture(id, self);
        self.size()
    }
}

impl BackendResource for MeshData {
    type Meta = u32;

    const KIND: &'static str = "mesh";

    fn create(backend: &mut dyn RenderBackend, id: HandleId) {
        backend.create_mesh(id);
    }

    fn destroy(backend: &mut dyn RenderBackend, id: HandleId) {
        backend.destroy_mesh(id);
    }

    fn upload(&self, backend: &mut dyn RenderBackend, id: HandleId) -> u32 {
        backend.load_mesh(id, self);
        self.vertex_count()
    }
}

/// Load state of a cache entry as seen from outside the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Ready,
    Failed,
}

enum EntryState<T: BackendResource> {
    Pending(ResourceFuture<T>),
    Ready(T::Meta),
    Failed,
}

struct CacheEntry<T: BackendResource> {
    id: HandleId,
    asset: Arc<LazyResource<T>>,
    state: EntryState<T>,
}

/// What one [`ResourceCache::update_cache`] call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub created: usize,
    pub destroyed: usize,
    pub uploaded: usize,
    pub failed_loads: usize,
    pub allocation_failures: usize,
    pub drawn: usize,
    pub skipped: usize,
}

struct ResourceTable<T: BackendResource> {
    ids: IdAllocator,
    entries: HashMap<AssetId, CacheEntry<T>>,
}

impl<T: BackendResource> ResourceTable<T> {
    fn new(slots: Option<u32>) -> Self {
        Self {
            ids: slots.map_or_else(IdAllocator::new, IdAllocator::with_limit),
            entries: HashMap::new(),
        }
    }

    fn visit(
        &mut self,
        asset: &Arc<LazyResource<T>>,
        backend: &mut dyn RenderBackend,
        stats: &mut FrameStats,
    ) {
        if let Some(entry) = self.entries.get_mut(&asset.id()) {
            if let EntryState::Failed = entry.state {
                entry.state = EntryState::Pending(asset.get());
            }
            return;
        }

        let id = match self.ids.next() {
            Ok(id) => id,
            Err(e) => {
                error!("Couldn't allocate a {} for asset {}: {e}", T::KIND, asset.id());
                stats.allocation_failures += 1;
                return;
            }
        };

        trace!("Creating {} {id} for asset {}", T::KIND, asset.id());
        T::create(backend, id);
        stats.created += 1;

        let request = asset.get();
        self.entries.insert(
            asset.id(),
            CacheEntry {
                id,
                asset: asset.clone(),
                state: EntryState::Pending(request),
            },
        );
    }

    fn sweep(
        &mut self,
        visited: &HashSet<AssetId>,
        backend: &mut dyn RenderBackend,
        stats: &mut FrameStats,
    ) {
        let ids = &mut self.ids;
        self.entries.retain(|asset, entry| {
            if visited.contains(asset) {
                return true;
            }

            trace!("Destroying {} {} of asset {asset}", T::KIND, entry.id);
            T::destroy(backend, entry.id);
            stats.destroyed += 1;

            if let Err(e) = ids.free(entry.id) {
                debug_panic!("Cache entry of asset {asset} held an unusable id: {e}");
            }
            false
        });
    }

    fn resolve(&mut self, backend: &mut dyn RenderBackend, stats: &mut FrameStats) {
        for entry in self.entries.values_mut() {
            let EntryState::Pending(request) = &mut entry.state else {
                continue;
            };
            let Some(result) = request.try_resolve() else {
                continue;
            };

            entry.state = match result {
                Ok(value) => {
                    let meta = value.upload(backend, entry.id);
                    stats.uploaded += 1;
                    EntryState::Ready(meta)
                }
                Err(e) => {
                    debug!(
                        "Skipping {} {} ({}) until its load succeeds: {e}",
                        T::KIND,
                        entry.id,
                        entry.asset.label()
                    );
                    stats.failed_loads += 1;
                    EntryState::Failed
                }
            };
        }
    }

    fn ready(&self, asset: AssetId) -> Option<(HandleId, T::Meta)> {
        let entry = self.entries.get(&asset)?;
        match entry.state {
            EntryState::Ready(meta) => Some((entry.id, meta)),
            _ => None,
        }
    }

    fn status(&self, asset: AssetId) -> Option<EntryStatus> {
        self.entries.get(&asset).map(|entry| match entry.state {
            EntryState::Pending(_) => EntryStatus::Pending,
            EntryState::Ready(_) => EntryStatus::Ready,
            EntryState::Failed => EntryStatus::Failed,
        })
    }

    fn handle(&self, asset: AssetId) -> Option<HandleId> {
        self.entries.get(&asset).map(|entry| entry.id)
    }

    fn clear(&mut self, backend: &mut dyn RenderBackend) -> usize {
        let count = self.entries.len();
        for (asset, entry) in self.entries.drain() {
            T::destroy(backend, entry.id);
            if let Err(e) = self.ids.free(entry.id) {
                debug_panic!("Cache entry of asset {asset} held an unusable id: {e}");
            }
        }
        count
    }
}

/// Backend resources derived from the scene, owned by the render thread.
pub struct ResourceCache {
    textures: ResourceTable<Image>,
    meshes: ResourceTable<MeshData>,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::with_slots(None, None)
    }

    /// Creates a cache for a backend with a fixed number of texture or mesh slots.
    pub fn with_slots(texture_slots: Option<u32>, mesh_slots: Option<u32>) -> Self {
        Self {
            textures: ResourceTable::new(texture_slots),
            meshes: ResourceTable::new(mesh_slots),
        }
    }

    /// Brings the backend in line with `scene` and draws every drawable whose assets are ready.
    #[instrument(skip_all, fields(frame = frame.frame))]
    #[profiling::function]
    pub fn update_cache(
        &mut self,
        scene: &SceneSnapshot,
        backend: &mut dyn RenderBackend,
        frame: &FrameContext,
    ) -> FrameStats {
        let mut stats = FrameStats::default();

        let images = scene
            .iter()
            .flat_map(|(_, drawable)| drawable.images())
            .unique_by(|asset| asset.id())
            .collect_vec();
        let meshes = scene
            .iter()
            .filter_map(|(_, drawable)| drawable.mesh())
            .unique_by(|asset| asset.id())
            .collect_vec();

        // ids of dropped assets are freed before new ones are minted
        {
            profiling::scope!("sweep");
            let visited: HashSet<AssetId> = images.iter().map(|asset| asset.id()).collect();
            self.textures.sweep(&visited, backend, &mut stats);
            let visited: HashSet<AssetId> = meshes.iter().map(|asset| asset.id()).collect();
            self.meshes.sweep(&visited, backend, &mut stats);
        }

        {
            profiling::scope!("create");
            for image in &images {
                self.textures.visit(image, backend, &mut stats);
            }
            for mesh in &meshes {
                self.meshes.visit(mesh, backend, &mut stats);
            }
        }

        self.textures.resolve(backend, &mut stats);
        self.meshes.resolve(backend, &mut stats);

        {
            profiling::scope!("draw");
            for (id, drawable) in scene.iter() {
                match self.draw(id, drawable, backend, frame) {
                    Some(()) => stats.drawn += 1,
                    None => stats.skipped += 1,
                }
            }
        }

        if stats.created != 0 || stats.destroyed != 0 {
            trace!(
                "Cache created {} and destroyed {} resources",
                stats.created, stats.destroyed
            );
        }

        stats
    }

    fn draw(
        &self,
        drawable_id: DrawableId,
        drawable: &Drawable,
        backend: &mut dyn RenderBackend,
        frame: &FrameContext,
    ) -> Option<()> {
        match drawable {
            Drawable::Sprite { image, position } => {
                let (texture, size) = self.textures.ready(image.id())?;
                backend.render_texture(
                    frame,
                    &TextureDraw {
                        drawable: drawable_id,
                        texture,
                        size,
                        position: *position,
                        text: None,
                    },
                );
            }
            Drawable::Text {
                atlas,
                text,
                position,
            } => {
                let (texture, size) = self.textures.ready(atlas.id())?;
                backend.render_texture(
                    frame,
                    &TextureDraw {
                        drawable: drawable_id,
                        texture,
                        size,
                        position: *position,
                        text: Some(text.clone()),
                    },
                );
            }
            Drawable::Model {
                mesh,
                diffuse,
                normal,
                transform,
            } => {
                let (mesh, vertex_count) = self.meshes.ready(mesh.id())?;
                let diffuse = self.optional_texture(diffuse.as_ref())?;
                let normal = self.optional_texture(normal.as_ref())?;
                backend.render_mesh(
                    frame,
                    &MeshDraw {
                        drawable: drawable_id,
                        mesh,
                        vertex_count,
                        diffuse,
                        normal,
                        transform: *transform,
                    },
                );
            }
        }

        Some(())
    }

    /// `Some(None)` when there is no map to wait for, `None` when the map isn't uploaded yet.
    fn optional_texture(&self, image: Option<&ImageAsset>) -> Option<Option<HandleId>> {
        match image {
            None => Some(None),
            Some(image) => self.textures.ready(image.id()).map(|(id, _)| Some(id)),
        }
    }

    /// Destroys every resource and frees every id. Returns how many resources were destroyed.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) -> usize {
        let destroyed = self.textures.clear(backend) + self.meshes.clear(backend);
        debug!("Cleared {destroyed} cached resources");
        destroyed
    }

    pub fn texture_handle(&self, asset: AssetId) -> Option<HandleId> {
        self.textures.handle(asset)
    }

    pub fn mesh_handle(&self, asset: AssetId) -> Option<HandleId> {
        self.meshes.handle(asset)
    }

    pub fn texture_status(&self, asset: AssetId) -> Option<EntryStatus> {
        self.textures.status(asset)
    }

    pub fn mesh_status(&self, asset: AssetId) -> Option<EntryStatus> {
        self.meshes.status(asset)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.entries.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texture_count() == 0 && self.mesh_count() == 0
    }
}
