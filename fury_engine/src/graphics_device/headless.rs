/// Headless graphics device (no GPU required)
///
/// Creates placeholder resources, records commands instead of submitting
/// them and supports failure injection. Used by the test suites and by
/// tools that only need pipeline/pool bookkeeping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use rustc_hash::FxHashSet;
use crate::error::{Error, Result};
use crate::pipeline::DrawItem;
use crate::scene::EntityKey;
use super::buffer::{Buffer, BufferDesc};
use super::command_list::{BlendMode, ClearPolicy, CommandList, GpuResource, PassBeginDesc, Viewport};
use super::graphics_device::GraphicsDevice;
use super::program::Program;
use super::texture::{Texture, TextureDesc, TextureFormat, TextureInfo};

// ============================================================================
// Headless Texture / Buffer
// ============================================================================

pub struct HeadlessTexture {
    info: TextureInfo,
    id: u64,
    live: Arc<AtomicUsize>,
}

impl Texture for HeadlessTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for HeadlessTexture {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct HeadlessBuffer {
    size: u64,
    id: u64,
    live: Arc<AtomicUsize>,
}

impl Buffer for HeadlessBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for HeadlessBuffer {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Headless Device
// ============================================================================

/// Device that tracks created resources without a GPU
pub struct HeadlessDevice {
    next_id: u64,
    live: Arc<AtomicUsize>,
    allocation_count: usize,
    failing_formats: FxHashSet<TextureFormat>,
    fail_next: usize,
    created_labels: Vec<String>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            live: Arc::new(AtomicUsize::new(0)),
            allocation_count: 0,
            failing_formats: FxHashSet::default(),
            fail_next: 0,
            created_labels: Vec::new(),
        }
    }

    /// Every texture creation with `format` fails with `OutOfMemory`
    pub fn fail_format(&mut self, format: TextureFormat) {
        self.failing_formats.insert(format);
    }

    pub fn clear_failures(&mut self) {
        self.failing_formats.clear();
        self.fail_next = 0;
    }

    /// The next `count` allocations fail with `OutOfMemory`
    pub fn fail_next_allocations(&mut self, count: usize) {
        self.fail_next = count;
    }

    /// Successful allocations since creation
    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }

    /// Resources currently alive (created and not yet dropped)
    pub fn live_allocations(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Labels of every successful allocation, in order
    pub fn created_labels(&self) -> &[String] {
        &self.created_labels
    }

    fn check_injected_failure(&mut self) -> Result<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(Error::OutOfMemory);
        }
        Ok(())
    }

    fn register(&mut self, label: &str) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.allocation_count += 1;
        self.live.fetch_add(1, Ordering::SeqCst);
        self.created_labels.push(label.to_string());
        id
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 || desc.depth_or_layers == 0 {
            return Err(Error::InvalidShape(format!(
                "texture '{}' has a zero extent ({}x{}x{})",
                desc.label, desc.width, desc.height, desc.depth_or_layers
            )));
        }
        self.check_injected_failure()?;
        if self.failing_formats.contains(&desc.format) {
            return Err(Error::OutOfMemory);
        }

        let id = self.register(&desc.label);
        Ok(Arc::new(HeadlessTexture {
            info: TextureInfo::from_desc(desc),
            id,
            live: self.live.clone(),
        }))
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            return Err(Error::InvalidShape(format!("buffer '{}' has zero size", desc.label)));
        }
        self.check_injected_failure()?;

        let id = self.register(&desc.label);
        Ok(Arc::new(HeadlessBuffer {
            size: desc.size,
            id,
            live: self.live.clone(),
        }))
    }
}

// ============================================================================
// Headless Program
// ============================================================================

#[derive(Debug)]
pub struct HeadlessProgram {
    name: String,
}

impl HeadlessProgram {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }

    pub fn shared(name: &str) -> Arc<dyn Program> {
        Arc::new(Self::new(name))
    }
}

impl Program for HeadlessProgram {
    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Headless CommandList
// ============================================================================

/// A recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginPass { name: String, targets: Vec<u64>, clear: ClearPolicy },
    EndPass,
    SetViewport(Viewport),
    BindProgram { name: String, blend: BlendMode },
    /// `resource` is `None` when the input was unavailable
    BindInput { slot: u32, resource: Option<u64> },
    PushConstants { offset: u32, data: Vec<u8> },
    Draw { entity: EntityKey, sort_key: u64 },
    DrawFullscreen,
}

/// Command list that records into a Vec
#[derive(Debug, Default)]
pub struct HeadlessCommandList {
    commands: Vec<Command>,
    failing_passes: FxHashSet<String>,
}

impl HeadlessCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// `begin_pass` for `name` returns a backend error
    pub fn fail_pass(&mut self, name: &str) {
        self.failing_passes.insert(name.to_string());
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Draw { .. } | Command::DrawFullscreen))
            .count()
    }

    /// Names of begun passes, in recording order
    pub fn pass_names(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::BeginPass { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Commands recorded between `BeginPass(name)` and the following `EndPass`
    pub fn pass_commands(&self, name: &str) -> Vec<&Command> {
        let mut inside = false;
        let mut out = Vec::new();
        for command in &self.commands {
            match command {
                Command::BeginPass { name: n, .. } => inside = n == name,
                Command::EndPass => inside = false,
                other if inside => out.push(other),
                _ => {}
            }
        }
        out
    }
}

impl CommandList for HeadlessCommandList {
    fn begin_pass(&mut self, desc: &PassBeginDesc) -> Result<()> {
        if self.failing_passes.contains(desc.name) {
            return Err(Error::BackendError(format!("injected failure in pass '{}'", desc.name)));
        }
        self.commands.push(Command::BeginPass {
            name: desc.name.to_string(),
            targets: desc.targets.iter().map(GpuResource::id).collect(),
            clear: desc.clear,
        });
        Ok(())
    }

    fn end_pass(&mut self) -> Result<()> {
        self.commands.push(Command::EndPass);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.commands.push(Command::SetViewport(viewport));
        Ok(())
    }

    fn bind_program(&mut self, program: &Arc<dyn Program>, blend: BlendMode) -> Result<()> {
        self.commands.push(Command::BindProgram { name: program.name().to_string(), blend });
        Ok(())
    }

    fn bind_input(&mut self, slot: u32, resource: Option<&GpuResource>) -> Result<()> {
        self.commands.push(Command::BindInput { slot, resource: resource.map(GpuResource::id) });
        Ok(())
    }

    fn push_constants(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.commands.push(Command::PushConstants { offset, data: data.to_vec() });
        Ok(())
    }

    fn draw(&mut self, item: &DrawItem) -> Result<()> {
        self.commands.push(Command::Draw { entity: item.entity, sort_key: item.sort_key });
        Ok(())
    }

    fn draw_fullscreen(&mut self) -> Result<()> {
        self.commands.push(Command::DrawFullscreen);
        Ok(())
    }
}

#[cfg(test)]
#[path = "headless_tests.rs"]
mod tests;
