use glamx::{Affine3A, Vec2};
use slotmap::{SlotMap, new_key_type};
use std::sync::Arc;
use tessel_asset::{ImageAsset, MeshAsset};

new_key_type! {
    /// Identifies a drawable within its scene.
    pub struct DrawableId;
}

/// Something the render thread draws, together with the assets it needs for that.
#[derive(Debug, Clone)]
pub enum Drawable {
    Sprite {
        image: ImageAsset,
        position: Vec2,
    },
    Text {
        atlas: ImageAsset,
        text: Arc<str>,
        position: Vec2,
    },
    Model {
        mesh: MeshAsset,
        diffuse: Option<ImageAsset>,
        normal: Option<ImageAsset>,
        transform: Affine3A,
    },
}

impl Drawable {
    pub fn sprite(image: ImageAsset, position: Vec2) -> Self {
        Drawable::Sprite { image, position }
    }

    pub fn text(atlas: ImageAsset, text: impl Into<Arc<str>>, position: Vec2) -> Self {
        Drawable::Text {
            atlas,
            text: text.into(),
            position,
        }
    }

    pub fn model(mesh: MeshAsset, transform: Affine3A) -> Self {
        Drawable::Model {
            mesh,
            diffuse: None,
            normal: None,
            transform,
        }
    }

    /// Sets the diffuse map of a model. Does nothing for other drawables.
    pub fn with_diffuse(mut self, map: ImageAsset) -> Self {
        if let Drawable::Model { diffuse, .. } = &mut self {
            *diffuse = Some(map);
        }
        self
    }

    /// Sets the normal map of a model. Does nothing for other drawables.
    pub fn with_normal(mut self, map: ImageAsset) -> Self {
        if let Drawable::Model { normal, .. } = &mut self {
            *normal = Some(map);
        }
        self
    }

    /// Every image this drawable samples from.
    pub fn images(&self) -> impl Iterator<Item = &ImageAsset> {
        let (primary, maps) = match self {
            Drawable::Sprite { image, .. } => (Some(image), [None, None]),
            Drawable::Text { atlas, .. } => (Some(atlas), [None, None]),
            Drawable::Model {
                diffuse, normal, ..
            } => (None, [diffuse.as_ref(), normal.as_ref()]),
        };

        primary.into_iter().chain(maps.into_iter().flatten())
    }

    pub fn mesh(&self) -> Option<&MeshAsset> {
        match self {
            Drawable::Model { mesh, .. } => Some(mesh),
            _ => None,
        }
    }
}

/// The logic thread's view of what should be on screen.
#[derive(Debug, Default)]
pub struct Scene {
    drawables: SlotMap<DrawableId, Drawable>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, drawable: Drawable) -> DrawableId {
        self.drawables.insert(drawable)
    }

    pub fn remove(&mut self, id: DrawableId) -> Option<Drawable> {
        self.drawables.remove(id)
    }

    pub fn get(&self, id: DrawableId) -> Option<&Drawable> {
        self.drawables.get(id)
    }

    pub fn get_mut(&mut self, id: DrawableId) -> Option<&mut Drawable> {
        self.drawables.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DrawableId, &Drawable)> {
        self.drawables.iter()
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    pub fn clear(&mut self) {
        self.drawables.clear();
    }

    /// Captures the scene so it can be handed to the render thread. Only the asset handles are
    /// cloned, never the asset data.
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            drawables: self
                .drawables
                .iter()
                .map(|(id, drawable)| (id, drawable.clone()))
                .collect(),
        }
    }
}

/// Immutable copy of a [`Scene`] at the time a frame was requested.
#[derive(Debug, Default, Clone)]
pub struct SceneSnapshot {
    drawables: Vec<(DrawableId, Drawable)>,
}

impl SceneSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = (DrawableId, &Drawable)> {
        self.drawables.iter().map(|(id, drawable)| (*id, drawable))
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}

impl From<&Scene> for SceneSnapshot {
    fn from(scene: &Scene) -> Self {
        scene.snapshot()
    }
}
