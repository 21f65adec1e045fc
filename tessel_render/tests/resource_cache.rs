use glamx::{Affine3A, UVec2, Vec2};
use more_asserts::assert_le;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tessel_asset::{Image, ImageAsset, LazyResource, LoadPolicy, MeshAsset, MeshData};
use tessel_render::{
    BackendCall, CallLog, Drawable, EntryStatus, FrameContext, FrameStats, RecordingBackend,
    ResourceCache, Scene,
};
use web_time::Duration;

struct Harness {
    cache: ResourceCache,
    backend: RecordingBackend,
    log: CallLog,
    frame: u64,
}

impl Harness {
    fn new(cache: ResourceCache) -> Self {
        let backend = RecordingBackend::new();
        let log = backend.log();
        Self {
            cache,
            backend,
            log,
            frame: 0,
        }
    }

    fn frame(&mut self, scene: &Scene) -> FrameStats {
        let ctx = FrameContext::new(self.frame, Duration::from_millis(16));
        self.frame += 1;
        self.cache
            .update_cache(&scene.snapshot(), &mut self.backend, &ctx)
    }
}

fn image(size: u32) -> ImageAsset {
    LazyResource::new(move || {
        Ok::<_, io::Error>(Image::new(
            UVec2::splat(size),
            vec![0; (size * size * 4) as usize],
        ))
    })
}

fn mesh(vertex_count: u32) -> MeshAsset {
    LazyResource::new(move || {
        Ok::<_, io::Error>(MeshData::new(
            vertex_count,
            vec![0; vertex_count as usize * 12],
            (0..vertex_count).collect(),
        ))
    })
}

#[test]
fn unchanged_scene_creates_nothing_twice() {
    let mut harness = Harness::new(ResourceCache::new());
    let mut scene = Scene::new();
    scene.add(Drawable::sprite(image(4), Vec2::ZERO));
    scene.add(Drawable::text(image(16), "hello", Vec2::new(10.0, 0.0)));
    scene.add(Drawable::model(mesh(3), Affine3A::IDENTITY).with_diffuse(image(8)));

    let first = harness.frame(&scene);
    assert_eq!(first.created, 4);
    assert_eq!(first.uploaded, 4);
    assert_eq!(first.drawn, 3);

    harness.log.take();
    let second = harness.frame(&scene);

    assert_eq!(second.created, 0);
    assert_eq!(second.destroyed, 0);
    assert_eq!(second.uploaded, 0);
    assert_eq!(second.drawn, 3);

    let calls = harness.log.take();
    assert!(!calls.iter().any(|call| call.is_create() || call.is_destroy()));
    assert_eq!(calls.iter().filter(|call| call.is_draw()).count(), 3);
}

#[test]
fn shared_asset_lives_as_long_as_any_user() {
    let mut harness = Harness::new(ResourceCache::new());
    let shared = image(4);

    let mut scene = Scene::new();
    let d1 = scene.add(Drawable::sprite(shared.clone(), Vec2::ZERO));
    let d2 = scene.add(Drawable::sprite(shared.clone(), Vec2::ONE));

    let stats = harness.frame(&scene);
    assert_eq!(stats.created, 1);
    assert_eq!(stats.drawn, 2);
    assert_eq!(harness.cache.texture_count(), 1);
    assert_eq!(shared.load_count(), 1);

    let handle = harness.cache.texture_handle(shared.id()).unwrap();

    scene.remove(d1);
    let stats = harness.frame(&scene);
    assert_eq!(stats.destroyed, 0);
    assert_eq!(harness.cache.texture_handle(shared.id()), Some(handle));

    scene.remove(d2);
    let stats = harness.frame(&scene);
    assert_eq!(stats.destroyed, 1);
    assert!(harness.cache.is_empty());

    harness.frame(&scene);
    assert_eq!(
        harness
            .log
            .count(|call| *call == BackendCall::DestroyTexture(handle)),
        1
    );
}

#[test]
fn returning_asset_gets_a_new_entry() {
    let mut harness = Harness::new(ResourceCache::new());
    let returning = image(2);

    let mut scene = Scene::new();
    let sprite = scene.add(Drawable::sprite(returning.clone(), Vec2::ZERO));
    harness.frame(&scene);

    scene.remove(sprite);
    let stats = harness.frame(&scene);
    assert_eq!(stats.destroyed, 1);
    assert_eq!(harness.cache.texture_handle(returning.id()), None);

    scene.add(Drawable::sprite(returning.clone(), Vec2::ZERO));
    let stats = harness.frame(&scene);
    assert_eq!(stats.created, 1);
    assert_eq!(stats.uploaded, 1);

    // nothing kept the decoded image alive in between, so it was loaded again
    assert_eq!(returning.load_count(), 2);
}

#[test]
fn draw_calls_reference_loaded_handles_only() {
    let mut harness = Harness::new(ResourceCache::new());
    let mut scene = Scene::new();
    scene.add(
        Drawable::model(mesh(6), Affine3A::IDENTITY)
            .with_diffuse(image(4))
            .with_normal(image(4)),
    );
    scene.add(Drawable::sprite(image(1), Vec2::ZERO));

    harness.frame(&scene);

    let calls = harness.log.snapshot();
    for (position, call) in calls.iter().enumerate() {
        let referenced = match call {
            BackendCall::RenderTexture(draw) => vec![draw.texture],
            BackendCall::RenderMesh(draw) => {
                assert_eq!(draw.vertex_count, 6);
                let mut ids = vec![draw.mesh];
                ids.extend(draw.diffuse);
                ids.extend(draw.normal);
                ids
            }
            _ => continue,
        };

        for id in referenced {
            let loaded = calls[..position].iter().position(|call| {
                matches!(call, BackendCall::LoadTexture { id: loaded, .. } | BackendCall::LoadMesh { id: loaded, .. } if *loaded == id)
            });
            assert!(loaded.is_some(), "handle {id} drawn before it was loaded");
        }
    }
}

#[test]
fn failed_load_is_skipped_and_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let flaky: ImageAsset = {
        let attempts = attempts.clone();
        LazyResource::new(move || {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(io::Error::other("disk hiccup"));
            }
            Ok(Image::new(UVec2::ONE, vec![0; 4]))
        })
    };
    let healthy = image(2);

    let mut harness = Harness::new(ResourceCache::new());
    let mut scene = Scene::new();
    scene.add(Drawable::sprite(flaky.clone(), Vec2::ZERO));
    scene.add(Drawable::sprite(healthy, Vec2::ONE));

    let stats = harness.frame(&scene);
    assert_eq!(stats.created, 2);
    assert_eq!(stats.failed_loads, 1);
    assert_eq!(stats.drawn, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(
        harness.cache.texture_status(flaky.id()),
        Some(EntryStatus::Failed)
    );

    let stats = harness.frame(&scene);
    assert_eq!(stats.created, 0);
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.drawn, 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn pending_load_does_not_block_the_frame() {
    let release = Arc::new(Barrier::new(2));
    let slow: MeshAsset = {
        let release = release.clone();
        LazyResource::with_policy(LoadPolicy::Detached, move || {
            release.wait();
            Ok::<_, io::Error>(MeshData::new(3, vec![0; 36], vec![0, 1, 2]))
        })
    };

    let mut harness = Harness::new(ResourceCache::new());
    let mut scene = Scene::new();
    scene.add(Drawable::model(slow.clone(), Affine3A::IDENTITY));

    let stats = harness.frame(&scene);
    assert_eq!(stats.created, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(
        harness.cache.mesh_status(slow.id()),
        Some(EntryStatus::Pending)
    );

    release.wait();

    let mut frames = 0;
    loop {
        frames += 1;
        let stats = harness.frame(&scene);
        assert_eq!(stats.created, 0);
        if stats.drawn == 1 {
            break;
        }
        assert_le!(frames, 500, "detached load never finished");
        thread::sleep(Duration::from_millis(2));
    }

    assert_eq!(slow.load_count(), 1);
}

#[test]
fn limited_slots_report_allocation_failures() {
    let mut harness = Harness::new(ResourceCache::with_slots(Some(1), None));
    let first = image(1);
    let second = image(1);

    let mut scene = Scene::new();
    let first_sprite = scene.add(Drawable::sprite(first.clone(), Vec2::ZERO));
    scene.add(Drawable::sprite(second.clone(), Vec2::ONE));

    let stats = harness.frame(&scene);
    assert_eq!(stats.created, 1);
    assert_eq!(stats.allocation_failures, 1);
    assert_eq!(stats.drawn, 1);
    assert_eq!(stats.skipped, 1);

    let handle = harness.cache.texture_handle(first.id()).unwrap();

    // the freed slot is reused within the same frame
    scene.remove(first_sprite);
    let stats = harness.frame(&scene);
    assert_eq!(stats.destroyed, 1);
    assert_eq!(stats.created, 1);
    assert_eq!(stats.allocation_failures, 0);
    assert_eq!(harness.cache.texture_handle(second.id()), Some(handle));
}

#[test]
fn clear_leaves_no_live_resources() {
    let mut harness = Harness::new(ResourceCache::new());
    let mut scene = Scene::new();
    scene.add(Drawable::model(mesh(3), Affine3A::IDENTITY).with_diffuse(image(2)));
    scene.add(Drawable::sprite(image(2), Vec2::ZERO));
    harness.frame(&scene);

    assert_eq!(harness.cache.clear(&mut harness.backend), 3);

    let calls = harness.log.snapshot();
    let created = calls.iter().filter(|call| call.is_create()).count();
    let destroyed = calls.iter().filter(|call| call.is_destroy()).count();
    assert_eq!(created, destroyed);
}
