use crate::queue::DEFAULT_SYNC_TIMEOUT;
use bon::Builder;
use tessel_asset::LoadPolicy;
use tessel_render::ResourceCache;
use tessel_utils::EngineArgs;
use web_time::Duration;

/// Where the render role of a canvas runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ThreadingMode {
    /// A dedicated render thread drains a command queue.
    #[default]
    Threaded,
    /// Commands run on the submitting thread as soon as they are submitted.
    Immediate,
}

#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct CanvasConfig {
    #[builder(default)]
    pub threading: ThreadingMode,
    #[builder(default = DEFAULT_SYNC_TIMEOUT)]
    pub sync_timeout: Duration,
    /// Policy for resources created through [`Engine::resource`](crate::Engine::resource).
    #[builder(default)]
    pub load_policy: LoadPolicy,
    pub texture_slots: Option<u32>,
    pub mesh_slots: Option<u32>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        CanvasConfig::builder().build()
    }
}

impl CanvasConfig {
    pub fn from_args(args: &EngineArgs) -> Self {
        CanvasConfig::builder()
            .threading(if args.single_threaded {
                ThreadingMode::Immediate
            } else {
                ThreadingMode::Threaded
            })
            .sync_timeout(args.sync_timeout_ms.unwrap_or(DEFAULT_SYNC_TIMEOUT))
            .load_policy(if args.detached_loads {
                LoadPolicy::Detached
            } else {
                LoadPolicy::Inline
            })
            .maybe_texture_slots(args.texture_slots)
            .maybe_mesh_slots(args.mesh_slots)
            .build()
    }

    pub(crate) fn resource_cache(&self) -> ResourceCache {
        ResourceCache::with_slots(self.texture_slots, self.mesh_slots)
    }
}
