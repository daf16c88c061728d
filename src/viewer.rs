//! Lifecycle manager
//!
//! [`Viewer`] owns one mount's worth of state (renderer, scene, camera rig, orbit controller,
//! frame scheduler, resize coordinator, loading manager) and tears it down in a fixed order.
//!
//! Loaders run on the caller's executor and report through a channel. Each completion carries
//! the [`MountToken`] of the mount that spawned it; [`Viewer::pump_completions`] applies only
//! completions of the live mount and drops the rest, so a load that finishes after
//! [`Viewer::unmount`] never touches released state.

use std::{cell::RefCell, rc::Rc};

use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::{LocalSpawn, LocalSpawnExt},
};

use crate::{
    config::ViewerConfig,
    error::{RenderResult, ResourceError},
    gfx::{
        camera::{CameraRig, InputEvent, OrbitController},
        rendering::{
            backend::RenderBackend,
            frame_scheduler::FrameScheduler,
            resize::{ResizeCoordinator, ViewportSize},
        },
        scene::{EnvironmentMap, MaterialSlot, ModelRoot, ModelStats, SceneGraph, TextureMapping},
    },
    loading::{
        load_environment, load_geometry, load_texture, AssetSource, Completion,
        CompletionSender, EnvironmentImage, LoadEvent, LoadingManager, MountToken, ResourceKind,
        ResourceStatus, TextureImage,
    },
};

type SharedListener = Rc<RefCell<Box<dyn FnMut(u8)>>>;

/// Everything allocated by one mount
struct Session<B: RenderBackend> {
    token: MountToken,
    renderer: B,
    scene: SceneGraph,
    rig: CameraRig,
    controller: OrbitController,
    scheduler: FrameScheduler,
    resize: ResizeCoordinator,
    loading: LoadingManager,
    stats: ModelStats,
    viewport: ViewportSize,
}

pub struct Viewer<B: RenderBackend> {
    config: ViewerConfig,
    source: Rc<dyn AssetSource>,
    spawner: Box<dyn LocalSpawn>,
    generation: MountToken,
    session: Option<Session<B>>,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    progress_listener: Option<SharedListener>,
}

impl<B: RenderBackend> Viewer<B> {
    /// Creates an unmounted viewer. Loaders will fetch from `source` and run on `spawner`.
    pub fn new(
        config: ViewerConfig,
        source: Rc<dyn AssetSource>,
        spawner: Box<dyn LocalSpawn>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded();
        Self {
            config,
            source,
            spawner,
            generation: MountToken(0),
            session: None,
            completions_tx,
            completions_rx,
            progress_listener: None,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Registers the callback receiving the aggregate loading percentage.
    ///
    /// Applies to the current mount and every later one.
    pub fn set_progress_listener(&mut self, listener: impl FnMut(u8) + 'static) {
        let listener: SharedListener = Rc::new(RefCell::new(Box::new(listener)));
        if let Some(session) = self.session.as_mut() {
            session.loading.set_listener(forward_to(&listener));
        }
        self.progress_listener = Some(listener);
    }

    /// Binds a renderer to `surface` and starts everything: scheduler, resize handling and
    /// the three loaders. Mounting while mounted unmounts first.
    pub fn mount(&mut self, surface: B::Surface, viewport: ViewportSize) -> RenderResult<MountToken> {
        if self.session.is_some() {
            log::debug!("Already mounted, unmounting previous session first");
            self.unmount();
        }

        let (initial_width, initial_height) = self.config.initial_size;
        let viewport = if viewport.is_empty() {
            ViewportSize::new(
                initial_width as f64,
                initial_height as f64,
                viewport.pixel_density.max(1.0),
            )
        } else {
            viewport
        };

        let renderer = B::create(surface, viewport.physical(), &self.config.renderer)?;
        let scene = SceneGraph::new(&self.config.lighting, &self.config.material);
        let mut rig = CameraRig::new(&self.config.camera, viewport.aspect());
        let mut controller = OrbitController::new(&self.config.controls, &rig);
        controller.update(&mut rig);

        let mut scheduler = FrameScheduler::new();
        scheduler.start();
        let mut resize = ResizeCoordinator::new();
        resize.register();

        let mut loading = LoadingManager::new();
        if let Some(listener) = &self.progress_listener {
            loading.set_listener(forward_to(listener));
        }

        self.generation = self.generation.next();
        let token = self.generation;

        self.session = Some(Session {
            token,
            renderer,
            scene,
            rig,
            controller,
            scheduler,
            resize,
            loading,
            stats: ModelStats::pending(&self.config.assets.model_name),
            viewport,
        });
        self.spawn_loaders(token);

        log::info!(
            "Viewer mounted (generation {}, {}x{} @{}x)",
            token.0,
            viewport.width,
            viewport.height,
            viewport.pixel_density
        );
        Ok(token)
    }

    fn spawn_loaders(&mut self, token: MountToken) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let assets = &self.config.assets;
        let events = CompletionSender::new(token, self.completions_tx.clone());

        let jobs = [
            (
                ResourceKind::Environment,
                assets.track_environment_progress,
                assets.environment.clone(),
            ),
            (ResourceKind::Texture, true, assets.texture.clone()),
            (ResourceKind::Geometry, true, assets.geometry.clone()),
        ];

        for (kind, tracked, uri) in jobs {
            session.loading.item_start(kind, tracked);

            let source = Rc::clone(&self.source);
            let events = events.clone();
            let spawned = match kind {
                ResourceKind::Geometry => self
                    .spawner
                    .spawn_local(load_geometry(source, uri.clone(), events)),
                ResourceKind::Texture => self
                    .spawner
                    .spawn_local(load_texture(source, uri.clone(), events)),
                ResourceKind::Environment => self
                    .spawner
                    .spawn_local(load_environment(source, uri.clone(), events)),
            };

            if let Err(e) = spawned {
                session.loading.item_error(
                    kind,
                    ResourceError::Spawn {
                        uri,
                        reason: e.to_string(),
                    },
                );
            }
        }
    }

    /// Stops the loop and releases everything in order: scheduler, resize listener,
    /// controller input, scene GPU resources and finally the renderer.
    ///
    /// Safe to call any number of times.
    pub fn unmount(&mut self) {
        let Some(mut session) = self.session.take() else {
            log::debug!("Unmount ignored, viewer is not mounted");
            return;
        };

        session.scheduler.cancel();
        session.resize.unregister();
        session.controller.dispose();
        session.scene.release_gpu(&mut session.renderer);
        session.renderer.dispose();

        log::info!(
            "Viewer unmounted (generation {}, {} frames)",
            session.token.0,
            session.scheduler.ticks()
        );
    }

    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    /// Token of the live mount
    pub fn token(&self) -> Option<MountToken> {
        self.session.as_ref().map(|s| s.token)
    }

    /// Applies every queued load completion. Completions from an earlier mount, or arriving
    /// while unmounted, are dropped.
    ///
    /// Returns how many were applied.
    pub fn pump_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(Some(completion)) = self.completions_rx.try_next() {
            match self.session.as_mut() {
                Some(session) if session.token == completion.token => {
                    session.apply(completion.event, &self.config);
                    applied += 1;
                }
                _ => log::debug!(
                    "Dropping stale {:?} completion from generation {}",
                    completion.event.kind(),
                    completion.token.0
                ),
            }
        }
        applied
    }

    /// Runs one tick if a frame is scheduled: controller update, projection refresh,
    /// composite, reschedule. Render failures skip the frame but keep the loop alive.
    ///
    /// Returns whether a tick ran.
    pub fn frame(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.scheduler.begin_frame() {
            return false;
        }

        session.controller.update(&mut session.rig);
        session.rig.update_projection_matrix();
        if let Err(e) = session.renderer.render(&session.scene, &session.rig) {
            log::warn!("Frame skipped: {}", e);
        }
        session.scheduler.reschedule();
        true
    }

    /// Whether the host should request another redraw
    pub fn wants_frame(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.scheduler.wants_frame())
            .unwrap_or(false)
    }

    /// Applies a viewport size change; returns whether it was applied
    pub fn resize(&mut self, viewport: ViewportSize) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let applied = session
            .resize
            .handle(viewport, &mut session.rig, &mut session.renderer);
        if applied {
            session.viewport = viewport;
        }
        applied
    }

    /// Routes pointer or wheel input to the orbit controller
    pub fn handle_input(&mut self, event: InputEvent) {
        if let Some(session) = self.session.as_mut() {
            session
                .controller
                .handle_input(&event, session.viewport.height as f32);
        }
    }

    /// Aggregate loading percentage of the live mount (0 when unmounted)
    pub fn loading_progress(&self) -> u8 {
        self.session
            .as_ref()
            .map(|s| s.loading.percentage())
            .unwrap_or(0)
    }

    pub fn model_stats(&self) -> ModelStats {
        self.session
            .as_ref()
            .map(|s| s.stats.clone())
            .unwrap_or_else(|| ModelStats::pending(&self.config.assets.model_name))
    }

    pub fn resource_status(&self, kind: ResourceKind) -> ResourceStatus {
        self.session
            .as_ref()
            .map(|s| s.loading.status(kind))
            .unwrap_or(ResourceStatus::Pending)
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.session.as_ref().map(|s| &s.scene)
    }

    pub fn camera(&self) -> Option<&CameraRig> {
        self.session.as_ref().map(|s| &s.rig)
    }

    pub fn controller(&self) -> Option<&OrbitController> {
        self.session.as_ref().map(|s| &s.controller)
    }

    pub fn renderer(&self) -> Option<&B> {
        self.session.as_ref().map(|s| &s.renderer)
    }
}

impl<B: RenderBackend> Drop for Viewer<B> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn forward_to(listener: &SharedListener) -> Box<dyn FnMut(u8)> {
    let listener = Rc::clone(listener);
    Box::new(move |percentage| (listener.borrow_mut())(percentage))
}

impl<B: RenderBackend> Session<B> {
    fn apply(&mut self, event: LoadEvent, config: &ViewerConfig) {
        match event {
            LoadEvent::Progress { kind, loaded, total } => {
                if kind == ResourceKind::Geometry && total > 0 {
                    log::info!("{}% loaded", loaded as f64 / total as f64 * 100.0);
                }
            }
            LoadEvent::GeometryLoaded(model) => self.on_geometry(model, config),
            LoadEvent::TextureLoaded(image) => self.on_texture(image),
            LoadEvent::EnvironmentLoaded { uri, image } => self.on_environment(uri, image),
            LoadEvent::Failed { kind, error } => {
                if kind == ResourceKind::Environment {
                    log::warn!("Environment map unavailable, keeping flat background");
                }
                self.loading.item_error(kind, error);
            }
        }
    }

    fn on_geometry(&mut self, mut model: ModelRoot, config: &ViewerConfig) {
        for node in model.nodes.iter_mut() {
            node.material = MaterialSlot::Shared;
            node.cast_shadow = true;
            node.receive_shadow = true;
        }
        self.stats = ModelStats::from_model(&config.assets.model_name, &model);

        model.position.y = config.placement.y_offset;
        model.yaw = config.placement.yaw;
        self.scene.set_model(model, &mut self.renderer);
        let bounds = self.scene.model().and_then(|model| model.bounds());

        if let Some(bounds) = bounds {
            let size = bounds.size();
            self.controller
                .set_max_distance(size * config.framing.max_distance_factor);
            self.controller.set_target(bounds.center());
            self.controller
                .set_distance(size * config.framing.distance_factor);
            self.controller.update(&mut self.rig);
        }

        self.loading.item_end(ResourceKind::Geometry);
        log::info!(
            "Model '{}' loaded: {} vertices, {} faces",
            self.stats.name,
            self.stats.vertices,
            self.stats.faces
        );
    }

    fn on_texture(&mut self, image: TextureImage) {
        let anisotropy = self.renderer.max_anisotropy();
        let map = self.renderer.create_texture(&image, anisotropy);
        self.scene
            .set_material_map(map, anisotropy, &mut self.renderer);
        self.loading.item_end(ResourceKind::Texture);
        log::info!(
            "Texture {}x{} loaded (anisotropy {})",
            image.width,
            image.height,
            anisotropy
        );
    }

    fn on_environment(&mut self, uri: String, image: EnvironmentImage) {
        let gpu = self.renderer.create_environment(&image);
        self.scene.set_environment(
            EnvironmentMap {
                uri,
                width: image.width,
                height: image.height,
                mapping: TextureMapping::EquirectangularReflection,
                gpu,
            },
            &mut self.renderer,
        );
        self.loading.item_end(ResourceKind::Environment);
        log::info!("Environment map {}x{} loaded", image.width, image.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AssetConfig,
        gfx::rendering::headless::{HeadlessBackend, HeadlessCall, HeadlessSurface},
        loading::{FetchProgress, FetchResult, MemorySource},
    };
    use futures::{
        channel::oneshot,
        executor::LocalPool,
        future::{FutureExt, LocalBoxFuture},
    };
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::{collections::HashMap, io::Cursor};

    /// Source whose fetches complete only when the test opens their gate
    #[derive(Default)]
    struct GatedSource {
        gates: RefCell<HashMap<String, oneshot::Receiver<FetchResult>>>,
    }

    impl GatedSource {
        fn gate(&self, uri: &str) -> oneshot::Sender<FetchResult> {
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().insert(uri.to_string(), rx);
            tx
        }
    }

    impl AssetSource for GatedSource {
        fn fetch(&self, uri: &str, _: FetchProgress) -> LocalBoxFuture<'static, FetchResult> {
            let uri = uri.to_string();
            match self.gates.borrow_mut().remove(&uri) {
                Some(rx) => async move {
                    rx.await
                        .unwrap_or_else(|_| Err(ResourceError::fetch(&uri, "gate dropped")))
                }
                .boxed_local(),
                None => futures::future::ready(Err(ResourceError::fetch(&uri, "no gate")))
                    .boxed_local(),
            }
        }
    }

    /// 1000 vertices on a helix, 500 triangles covering every vertex
    fn cat_obj() -> Vec<u8> {
        let mut obj = String::from("o Cat\n");
        for i in 0..1000 {
            let t = i as f32 * 0.05;
            obj.push_str(&format!("v {} {} {}\n", t.cos(), t * 0.02, t.sin()));
        }
        for i in 0..500 {
            let a = 2 * i + 1;
            let b = 2 * i + 2;
            let c = (2 * i + 2) % 1000 + 1;
            obj.push_str(&format!("f {} {} {}\n", a, b, c));
        }
        obj.into_bytes()
    }

    fn texture_png() -> Vec<u8> {
        let image = ImageBuffer::from_pixel(2, 2, Rgba([200u8, 150, 100, 255]));
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png).unwrap();
        png.into_inner()
    }

    fn environment_hdr() -> Vec<u8> {
        let mut bytes = b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 2\n".to_vec();
        bytes.extend_from_slice(&[128, 128, 128, 129, 128, 128, 128, 129]);
        bytes
    }

    fn full_source() -> MemorySource {
        MemorySource::new()
            .with_asset("model.obj", cat_obj())
            .with_asset("texture.jpg", texture_png())
            .with_asset("environment.hdr", environment_hdr())
    }

    fn viewer_with(
        config: ViewerConfig,
        source: Rc<dyn AssetSource>,
    ) -> (Viewer<HeadlessBackend>, LocalPool) {
        let _ = env_logger::builder().is_test(true).try_init();
        let pool = LocalPool::new();
        let viewer = Viewer::new(config, source, Box::new(pool.spawner()));
        (viewer, pool)
    }

    fn viewport() -> ViewportSize {
        ViewportSize::new(800.0, 600.0, 1.0)
    }

    fn settle(viewer: &mut Viewer<HeadlessBackend>, pool: &mut LocalPool) {
        pool.run_until_stalled();
        viewer.pump_completions();
    }

    #[test]
    fn test_renders_while_assets_load() {
        let source = Rc::new(GatedSource::default());
        let _geometry = source.gate("model.obj");
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), source.clone());
        let surface = HeadlessSurface::new(16);

        viewer.mount(surface.clone(), viewport()).unwrap();
        settle(&mut viewer, &mut pool);

        for _ in 0..3 {
            assert!(viewer.wants_frame());
            assert!(viewer.frame());
        }

        let journal = surface.journal();
        assert_eq!(journal.frame_count(), 3);
        assert_eq!(journal.last_frame().unwrap().mesh_count, 0);
        assert!(!viewer.model_stats().loaded);
    }

    #[test]
    fn test_cat_model_scenario() {
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), Rc::new(full_source()));
        let surface = HeadlessSurface::new(16);

        viewer.mount(surface.clone(), viewport()).unwrap();
        settle(&mut viewer, &mut pool);

        assert_eq!(
            viewer.model_stats(),
            ModelStats {
                name: "Cat Model".to_string(),
                vertices: 1000,
                faces: 500,
                materials: 1,
                loaded: true,
            }
        );
        assert_eq!(viewer.loading_progress(), 100);
        for kind in ResourceKind::ALL {
            assert_eq!(viewer.resource_status(kind), ResourceStatus::Loaded);
        }

        let model = viewer.scene().unwrap().model().unwrap();
        assert_eq!(model.position.y, -0.5);
        assert_eq!(model.yaw, std::f32::consts::PI);
        assert!(model
            .nodes
            .iter()
            .all(|n| n.material == MaterialSlot::Shared && n.cast_shadow && n.receive_shadow));
    }

    #[test]
    fn test_source_materials_collapse_to_shared_material() {
        let obj = "\
mtllib cat.mtl
o Body
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
usemtl fur
f 1 2 3
usemtl skin
f 2 4 3
o Eyes
v 0 0 1
v 1 0 1
v 0 1 1
usemtl glass
f 5 6 7
";
        let source = full_source().with_asset("model.obj", obj);
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), Rc::new(source));

        viewer.mount(HeadlessSurface::new(16), viewport()).unwrap();
        settle(&mut viewer, &mut pool);

        let stats = viewer.model_stats();
        assert!(stats.loaded);
        assert_eq!(stats.materials, 1);

        let scene = viewer.scene().unwrap();
        let model = scene.model().unwrap();
        assert_eq!(model.source_material_count, 3);
        assert_eq!(model.nodes.len(), 3);
        assert_eq!(scene.shared_material_nodes(), model.nodes.len());
    }

    #[test]
    fn test_geometry_frames_camera() {
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), Rc::new(full_source()));
        viewer.mount(HeadlessSurface::new(16), viewport()).unwrap();
        settle(&mut viewer, &mut pool);

        let bounds = viewer.scene().unwrap().model().unwrap().bounds().unwrap();
        let size = bounds.size();
        let controller = viewer.controller().unwrap();

        assert_eq!(controller.target(), bounds.center());
        assert_eq!(controller.constraints().max_distance, (size * 3.0).max(20.0));
        assert!((controller.distance() - size * 1.5).abs() < 1e-4);
        assert_eq!(viewer.camera().unwrap().target(), bounds.center());
    }

    #[test]
    fn test_texture_uses_max_anisotropy() {
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), Rc::new(full_source()));
        let surface = HeadlessSurface::new(8);
        viewer.mount(surface.clone(), viewport()).unwrap();
        settle(&mut viewer, &mut pool);
        viewer.frame();

        let journal = surface.journal();
        let created = journal.calls().iter().find_map(|call| match call {
            HeadlessCall::CreateTexture { handle, anisotropy } => Some((*handle, *anisotropy)),
            _ => None,
        });
        let (handle, anisotropy) = created.unwrap();
        assert_eq!(anisotropy, 8);
        assert_eq!(journal.last_frame().unwrap().material_map, Some(handle));
        assert!(journal.last_frame().unwrap().environment_background);
    }

    #[test]
    fn test_geometry_fetch_failure() {
        let source = MemorySource::new()
            .with_asset("texture.jpg", texture_png())
            .with_asset("environment.hdr", environment_hdr());
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), Rc::new(source));
        let surface = HeadlessSurface::new(16);

        viewer.mount(surface.clone(), viewport()).unwrap();
        settle(&mut viewer, &mut pool);

        assert!(!viewer.model_stats().loaded);
        assert_eq!(viewer.loading_progress(), 50);
        assert!(matches!(
            viewer.resource_status(ResourceKind::Geometry),
            ResourceStatus::Failed(ResourceError::Fetch { .. })
        ));

        for _ in 0..5 {
            settle(&mut viewer, &mut pool);
            assert!(viewer.frame());
        }
        assert!(!viewer.model_stats().loaded);
        assert_eq!(viewer.loading_progress(), 50);
        assert_eq!(surface.journal().frame_count(), 5);
    }

    #[test]
    fn test_environment_failure_keeps_flat_background() {
        let source = MemorySource::new()
            .with_asset("model.obj", cat_obj())
            .with_asset("texture.jpg", texture_png())
            .with_asset("environment.hdr", b"not hdr".to_vec());
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), Rc::new(source));
        let surface = HeadlessSurface::new(16);

        viewer.mount(surface.clone(), viewport()).unwrap();
        settle(&mut viewer, &mut pool);
        viewer.frame();

        assert!(matches!(
            viewer.resource_status(ResourceKind::Environment),
            ResourceStatus::Failed(ResourceError::Decode { .. })
        ));
        assert_eq!(viewer.loading_progress(), 100);
        assert!(viewer.model_stats().loaded);
        assert!(!surface.journal().last_frame().unwrap().environment_background);
    }

    #[test]
    fn test_tracked_environment_counts_towards_progress() {
        let config = ViewerConfig::default()
            .with_assets(AssetConfig::default().with_environment_progress(true));
        let source = MemorySource::new().with_asset("environment.hdr", environment_hdr());
        let (mut viewer, mut pool) = viewer_with(config, Rc::new(source));

        viewer.mount(HeadlessSurface::new(1), viewport()).unwrap();
        settle(&mut viewer, &mut pool);

        // 1 of 3 loaded, the other two failed
        assert_eq!(viewer.loading_progress(), 33);
    }

    #[test]
    fn test_progress_listener() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), Rc::new(full_source()));
        viewer.set_progress_listener(move |pct| sink.borrow_mut().push(pct));

        viewer.mount(HeadlessSurface::new(16), viewport()).unwrap();
        settle(&mut viewer, &mut pool);

        assert_eq!(*seen.borrow(), vec![50, 100]);
    }

    #[test]
    fn test_completion_after_unmount_is_ignored() {
        let source = Rc::new(GatedSource::default());
        let geometry = source.gate("model.obj");
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), source.clone());
        let surface = HeadlessSurface::new(16);

        viewer.mount(surface.clone(), viewport()).unwrap();
        settle(&mut viewer, &mut pool);
        viewer.unmount();
        let calls_at_unmount = surface.journal().calls().len();

        geometry.send(Ok(cat_obj())).unwrap();
        pool.run_until_stalled();
        assert_eq!(viewer.pump_completions(), 0);

        let journal = surface.journal();
        assert_eq!(journal.calls().len(), calls_at_unmount);
        assert!(journal.use_after_dispose().is_empty());
        assert!(!viewer.model_stats().loaded);
    }

    #[test]
    fn test_stale_completion_does_not_reach_new_mount() {
        let source = Rc::new(GatedSource::default());
        let first_gate = source.gate("model.obj");
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), source.clone());

        let first = viewer.mount(HeadlessSurface::new(16), viewport()).unwrap();
        settle(&mut viewer, &mut pool);
        viewer.unmount();

        let second_gate = source.gate("model.obj");
        let second_surface = HeadlessSurface::new(16);
        let second = viewer.mount(second_surface.clone(), viewport()).unwrap();
        assert!(second > first);

        first_gate.send(Ok(cat_obj())).unwrap();
        settle(&mut viewer, &mut pool);
        assert!(!viewer.model_stats().loaded);
        assert_eq!(second_surface.journal().live_meshes(), 0);

        second_gate.send(Ok(cat_obj())).unwrap();
        settle(&mut viewer, &mut pool);
        assert!(viewer.model_stats().loaded);
        assert_eq!(second_surface.journal().live_meshes(), 1);
    }

    #[test]
    fn test_resize_reaches_next_frame() {
        let (mut viewer, _pool) = viewer_with(ViewerConfig::default(), Rc::new(MemorySource::new()));
        let surface = HeadlessSurface::new(16);
        viewer.mount(surface.clone(), viewport()).unwrap();

        assert!(viewer.resize(ViewportSize::new(1024.0, 768.0, 2.0)));
        viewer.frame();

        let journal = surface.journal();
        let frame = journal.last_frame().unwrap();
        assert_eq!(frame.aspect, (1024.0f64 / 768.0) as f32);
        assert_eq!(frame.surface_size, (2048, 1536));
        assert!(!frame.stale_projection);
        assert_eq!(journal.resizes(), vec![(2048, 1536)]);
    }

    #[test]
    fn test_unmount_order_and_idempotency() {
        let (mut viewer, mut pool) = viewer_with(ViewerConfig::default(), Rc::new(full_source()));
        let surface = HeadlessSurface::new(16);

        viewer.unmount();
        viewer.mount(surface.clone(), viewport()).unwrap();
        settle(&mut viewer, &mut pool);
        viewer.frame();

        viewer.unmount();
        viewer.unmount();

        let journal = surface.journal();
        assert_eq!(journal.calls().last(), Some(&HeadlessCall::Dispose));
        assert_eq!(journal.live_meshes(), 0);
        assert_eq!(journal.live_textures(), 0);
        assert!(journal.use_after_dispose().is_empty());

        let dispose_at = journal.calls().len() - 1;
        let last_release = journal
            .calls()
            .iter()
            .rposition(|c| matches!(c, HeadlessCall::ReleaseMesh(_) | HeadlessCall::ReleaseTexture(_)))
            .unwrap();
        assert!(last_release < dispose_at);

        assert!(!viewer.wants_frame());
        assert!(!viewer.frame());
        assert!(!viewer.resize(viewport()));
    }

    #[test]
    fn test_mount_while_mounted_disposes_previous() {
        let (mut viewer, _pool) = viewer_with(ViewerConfig::default(), Rc::new(MemorySource::new()));
        let first = HeadlessSurface::new(16);
        let second = HeadlessSurface::new(16);

        viewer.mount(first.clone(), viewport()).unwrap();
        viewer.mount(second.clone(), viewport()).unwrap();

        assert!(first.journal().is_disposed());
        assert!(!second.journal().is_disposed());
    }

    #[test]
    fn test_render_errors_do_not_stop_loop() {
        let (mut viewer, _pool) = viewer_with(ViewerConfig::default(), Rc::new(MemorySource::new()));
        let surface = HeadlessSurface::new(16);
        viewer.mount(surface.clone(), viewport()).unwrap();

        surface.fail_next_frames(2);
        for _ in 0..3 {
            assert!(viewer.frame());
        }
        assert!(viewer.wants_frame());
        assert_eq!(surface.journal().frame_count(), 1);
    }

    #[test]
    fn test_wheel_input_zooms() {
        let (mut viewer, _pool) = viewer_with(ViewerConfig::default(), Rc::new(MemorySource::new()));
        viewer.mount(HeadlessSurface::new(16), viewport()).unwrap();

        viewer.handle_input(InputEvent::Wheel { delta_y: -1.0 });
        for _ in 0..500 {
            viewer.frame();
        }
        assert!((viewer.controller().unwrap().distance() - 5.0 * 0.95).abs() < 1e-3);
    }
}
