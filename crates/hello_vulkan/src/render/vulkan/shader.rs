//! Shader loading and graphics pipeline creation
//!
//! The pipeline draws a triangle whose vertices come from the vertex
//! shader itself, so there is no vertex input and no descriptor layout.
//! Shader modules only live for the duration of pipeline creation.

use ash::vk;
use std::ffi::CStr;
use std::io::Cursor;

use super::backend::GraphicsBackend;
use super::context::{VulkanError, VulkanResult};
use crate::config::ShaderConfig;

/// Pipeline stages that take a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

impl ShaderStage {
    fn flags(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }
}

/// Provider of pre-compiled SPIR-V
pub trait ShaderSource {
    /// Raw SPIR-V bytes for `stage`
    fn bytecode(&self, stage: ShaderStage) -> std::io::Result<Vec<u8>>;
}

impl ShaderSource for ShaderConfig {
    fn bytecode(&self, stage: ShaderStage) -> std::io::Result<Vec<u8>> {
        let path = match stage {
            ShaderStage::Vertex => &self.vertex_shader_path,
            ShaderStage::Fragment => &self.fragment_shader_path,
        };
        log::debug!("Loading {:?} shader from {}", stage, path);
        std::fs::read(path)
    }
}

/// Fetch `stage` from `source` as SPIR-V words
fn load_words<S: ShaderSource + ?Sized>(source: &S, stage: ShaderStage) -> VulkanResult<Vec<u32>> {
    let bytes = source
        .bytecode(stage)
        .map_err(|e| VulkanError::PipelineCreationFailed(format!("Failed to read {stage:?} shader: {e}")))?;

    ash::util::read_spv(&mut Cursor::new(&bytes))
        .map_err(|e| VulkanError::PipelineCreationFailed(format!("Invalid {stage:?} SPIR-V: {e}")))
}

// SAFETY: the literal is NUL terminated with no interior NUL.
const ENTRY_POINT: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Graphics pipeline and its layout
pub struct GraphicsPipeline {
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Create the triangle pipeline for `render_pass`
    ///
    /// Viewport and scissor are baked in at `extent`. Shader modules are
    /// destroyed before returning, whether creation succeeded or not.
    pub fn new<B, S>(backend: &B, render_pass: vk::RenderPass, extent: vk::Extent2D, shaders: &S) -> VulkanResult<Self>
    where
        B: GraphicsBackend,
        S: ShaderSource + ?Sized,
    {
        let vertex_words = load_words(shaders, ShaderStage::Vertex)?;
        let fragment_words = load_words(shaders, ShaderStage::Fragment)?;

        let vertex_module = Self::create_module(backend, &vertex_words)?;
        let fragment_module = match Self::create_module(backend, &fragment_words) {
            Ok(module) => module,
            Err(e) => {
                backend.destroy_shader_module(vertex_module);
                return Err(e);
            }
        };

        let result = Self::build(backend, render_pass, extent, vertex_module, fragment_module);

        backend.destroy_shader_module(fragment_module);
        backend.destroy_shader_module(vertex_module);

        result
    }

    fn create_module<B: GraphicsBackend>(backend: &B, words: &[u32]) -> VulkanResult<vk::ShaderModule> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(words);
        backend
            .create_shader_module(&create_info)
            .map_err(|e| VulkanError::PipelineCreationFailed(format!("Shader module creation failed: {e:?}")))
    }

    fn build<B: GraphicsBackend>(
        backend: &B,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
        vertex_module: vk::ShaderModule,
        fragment_module: vk::ShaderModule,
    ) -> VulkanResult<Self> {
        let shader_stages = [
            (ShaderStage::Vertex, vertex_module),
            (ShaderStage::Fragment, fragment_module),
        ]
        .map(|(stage, module)| {
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(stage.flags())
                .module(module)
                .name(ENTRY_POINT)
                .build()
        });

        // Vertices are generated in the shader
        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport = vk::Viewport::builder()
            .x(0.0)
            .y(0.0)
            .width(extent.width as f32)
            .height(extent.height as f32)
            .min_depth(0.0)
            .max_depth(1.0)
            .build();

        let scissor = vk::Rect2D::builder()
            .offset(vk::Offset2D { x: 0, y: 0 })
            .extent(extent)
            .build();

        let viewports = [viewport];
        let scissors = [scissor];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build();

        let color_blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let layout_info = vk::PipelineLayoutCreateInfo::builder();
        let layout = backend
            .create_pipeline_layout(&layout_info)
            .map_err(|e| VulkanError::PipelineCreationFailed(format!("Pipeline layout creation failed: {e:?}")))?;

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipeline = match backend.create_graphics_pipeline(&pipeline_info) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                backend.destroy_pipeline_layout(layout);
                return Err(VulkanError::PipelineCreationFailed(format!("{e:?}")));
            }
        };

        log::debug!("Graphics pipeline created");
        Ok(Self { pipeline, layout })
    }

    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Destroy the pipeline, then its layout
    pub fn destroy<B: GraphicsBackend>(&mut self, backend: &B) {
        if self.pipeline != vk::Pipeline::null() {
            log::debug!("Destroying graphics pipeline");
            backend.destroy_pipeline(self.pipeline);
            self.pipeline = vk::Pipeline::null();
        }
        if self.layout != vk::PipelineLayout::null() {
            log::debug!("Destroying pipeline layout");
            backend.destroy_pipeline_layout(self.layout);
            self.layout = vk::PipelineLayout::null();
        }
    }
}
