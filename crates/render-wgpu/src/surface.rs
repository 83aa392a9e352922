use pointgrid_common::{SketchError, SketchResult, Viewport};
use pointgrid_runtime::{RenderSurface, SurfaceOptions};
use pointgrid_scene::{MeshId, PerspectiveCamera, Points, Scene};

use crate::gpu::{PointsRenderer, sample_count, supported_sample_count};

struct GpuContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: PointsRenderer,
}

/// Window-backed rendering surface.
///
/// Owns the wgpu device, queue and swapchain for one window. Releasing it
/// drops every GPU object; afterwards rendering is a no-op.
pub struct WgpuSurface {
    gpu: Option<GpuContext>,
    backend: String,
}

impl WgpuSurface {
    /// Create a device and swapchain for `target`, sized to `options.viewport`.
    ///
    /// Antialiasing falls back to single sampling when the adapter cannot
    /// multisample the chosen formats.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        options: SurfaceOptions,
    ) -> SketchResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| SketchError::resource(format!("cannot create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| SketchError::resource("no GPU adapter can present to this window"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("pointgrid_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| SketchError::resource(format!("cannot create device: {e}")))?;

        let size = options.viewport.clamped();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| SketchError::resource("surface reports no texture formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let samples = supported_sample_count(&adapter, format, sample_count(options.antialias));
        let renderer = PointsRenderer::new(&device, format, size.width, size.height, samples);
        let backend = adapter.get_info().backend.to_str().to_string();

        tracing::info!(
            backend = %backend,
            ?format,
            samples = renderer.sample_count(),
            "GPU surface initialized"
        );

        Ok(Self {
            gpu: Some(GpuContext {
                surface,
                device,
                queue,
                config,
                renderer,
            }),
            backend,
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }
}

impl RenderSurface for WgpuSurface {
    fn upload(&mut self, id: MeshId, points: &Points) -> SketchResult<()> {
        let gpu = self
            .gpu
            .as_mut()
            .ok_or_else(|| SketchError::resource("surface already released"))?;
        gpu.renderer.upload(&gpu.device, id, points)
    }

    fn set_size(&mut self, viewport: Viewport) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let size = viewport.clamped();
        gpu.config.width = size.width;
        gpu.config.height = size.height;
        gpu.surface.configure(&gpu.device, &gpu.config);
        gpu.renderer.resize(&gpu.device, size.width, size.height);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> SketchResult<()> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(wgpu::SurfaceError::Lost) => return Err(SketchError::SurfaceLost),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(SketchError::resource("GPU out of memory"));
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return Ok(());
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        gpu.renderer
            .render(&gpu.device, &gpu.queue, &view, scene, camera);
        output.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.gpu.take().is_some() {
            tracing::debug!("GPU surface released");
        }
    }
}
