/// Render pipeline execution engine.
///
/// Loads a `PipelineDesc`, validates it and runs its passes in declaration
/// order every frame:
///
/// `Bind Inputs → Resolve Outputs → Query Visible Set → Draw → Release`
///
/// Transient outputs are acquired from the pool when their pass runs and
/// released after their last consumer (or at frame end when nothing
/// consumes them). Resource failures skip the failing pass and leave its
/// outputs unavailable; later passes bind an "unavailable" input and run
/// degraded. Configuration problems are reported by `load` before any
/// frame executes.

use std::path::Path;
use std::sync::Arc;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::graphics_device::{
    CommandList, GpuResource, PassBeginDesc, Program, ProgramRegistry, Viewport,
};
use crate::pool::{PooledHandle, ResourceKind, ShapeKey, TransientPool};
use crate::scene::{Scene, SceneIndex};
use crate::{engine_debug, engine_info, engine_warn};
use super::descriptor::{BindingSource, OutputTarget, PassDesc, PassKind, PipelineDesc};
use super::draw_item::DrawItem;
use super::frame_report::{BindingRecord, FrameReport, PassRecord, PassStatus};
use super::pass_action::{PassAction, PassActionTable, PassContext};

const SOURCE: &str = "fury::RenderPipeline";

/// Per-frame collaborators of `RenderPipeline::execute`
pub struct FrameContext<'a> {
    pub pool: &'a mut TransientPool,
    pub programs: &'a dyn ProgramRegistry,
    pub commands: &'a mut dyn CommandList,
    pub scene: &'a Scene,
    pub camera: &'a Camera,
}

// ===== COMPILED FORM =====

/// Output `output` of pass `pass`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct OutputRef {
    pass: usize,
    output: usize,
}

enum ResolvedInput {
    Resource(String),
    Output(OutputRef),
}

struct CompiledPass {
    inputs: Vec<ResolvedInput>,
    /// Transient outputs whose lifetime ends with this pass
    release_after: Vec<OutputRef>,
}

/// A resource bound to a pass output for the current frame
enum Produced {
    Transient(PooledHandle),
    Declared { resource: GpuResource, shape: ShapeKey },
}

impl Produced {
    fn resource(&self) -> &GpuResource {
        match self {
            Produced::Transient(handle) => handle.resource(),
            Produced::Declared { resource, .. } => resource,
        }
    }

    fn shape(&self) -> ShapeKey {
        match self {
            Produced::Transient(handle) => *handle.shape(),
            Produced::Declared { shape, .. } => *shape,
        }
    }
}

// ===== RENDER PIPELINE =====

pub struct RenderPipeline {
    desc: PipelineDesc,
    compiled: Vec<CompiledPass>,
    frame_end_releases: Vec<OutputRef>,
    actions: PassActionTable,
}

impl RenderPipeline {
    /// Validate `desc` and declare its resources in `pool`.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError` for duplicate pass, output, input or resource
    ///   names, or a resource declaration with an invalid shape
    /// - `UnresolvedName` when an input references neither an earlier
    ///   pass output nor a declared resource (the name is reported as
    ///   `pass.output` or as the resource name)
    pub fn load(desc: PipelineDesc, pool: &mut TransientPool) -> Result<Self> {
        let (compiled, frame_end_releases) = Self::compile(&desc, pool)?;

        for decl in &desc.resources {
            pool.declare_with(&decl.name, &decl.shape, &decl.params).map_err(|err| {
                Error::ConfigurationError(format!("resource '{}': {}", decl.name, err))
            })?;
        }

        engine_info!(SOURCE, "Loaded pipeline '{}' ({} passes, {} resources)",
            desc.name, desc.passes.len(), desc.resources.len());

        Ok(Self { desc, compiled, frame_end_releases, actions: PassActionTable::default() })
    }

    /// Load a pipeline from a RON file
    pub fn load_from_file<P: AsRef<Path>>(path: P, pool: &mut TransientPool) -> Result<Self> {
        Self::load(PipelineDesc::load_from_file(path)?, pool)
    }

    /// Replace the descriptor, keeping registered actions.
    ///
    /// On error the current pipeline is left unchanged.
    pub fn reload(&mut self, desc: PipelineDesc, pool: &mut TransientPool) -> Result<()> {
        let reloaded = Self::load(desc, pool)?;
        self.desc = reloaded.desc;
        self.compiled = reloaded.compiled;
        self.frame_end_releases = reloaded.frame_end_releases;
        Ok(())
    }

    fn compile(desc: &PipelineDesc, pool: &TransientPool) -> Result<(Vec<CompiledPass>, Vec<OutputRef>)> {
        let mut resource_names: FxHashSet<&str> = FxHashSet::default();
        for decl in &desc.resources {
            if !resource_names.insert(decl.name.as_str()) {
                return Err(Error::ConfigurationError(format!("resource '{}' declared twice", decl.name)));
            }
            // Every declaration is checked before the pool sees any of them
            decl.shape.normalized().validate().map_err(|err| {
                Error::ConfigurationError(format!("resource '{}': {}", decl.name, err))
            })?;
        }
        let is_known = |name: &str| resource_names.contains(name) || pool.is_declared(name);

        let mut pass_index: FxHashMap<&str, usize> = FxHashMap::default();
        let mut last_use: FxHashMap<OutputRef, usize> = FxHashMap::default();
        let mut compiled = Vec::with_capacity(desc.passes.len());

        for (i, pass) in desc.passes.iter().enumerate() {
            if pass.name.is_empty() {
                return Err(Error::ConfigurationError(format!("pass #{} has no name", i)));
            }
            if pass_index.contains_key(pass.name.as_str()) {
                return Err(Error::ConfigurationError(format!("pass '{}' declared twice", pass.name)));
            }

            let mut output_names = FxHashSet::default();
            for output in &pass.outputs {
                if !output_names.insert(output.name.as_str()) {
                    return Err(Error::ConfigurationError(format!(
                        "pass '{}' declares output '{}' twice", pass.name, output.name
                    )));
                }
                if let OutputTarget::Resource(name) = &output.target {
                    if !is_known(name) {
                        return Err(Error::UnresolvedName { pass: pass.name.clone(), name: name.clone() });
                    }
                }
            }

            let mut input_names = FxHashSet::default();
            let mut inputs = Vec::with_capacity(pass.inputs.len());
            for input in &pass.inputs {
                if !input_names.insert(input.name.as_str()) {
                    return Err(Error::ConfigurationError(format!(
                        "pass '{}' declares input '{}' twice", pass.name, input.name
                    )));
                }
                let unresolved = || Error::UnresolvedName {
                    pass: pass.name.clone(),
                    name: input.source.display_name(),
                };
                let resolved = match &input.source {
                    BindingSource::Resource(name) => {
                        if !is_known(name) {
                            return Err(unresolved());
                        }
                        ResolvedInput::Resource(name.clone())
                    }
                    BindingSource::Pass { pass: producer, output } => {
                        let output_ref = pass_index
                            .get(producer.as_str())
                            .and_then(|&p| {
                                desc.passes[p].output_index(output).map(|o| OutputRef { pass: p, output: o })
                            })
                            .ok_or_else(unresolved)?;
                        last_use.insert(output_ref, i);
                        ResolvedInput::Output(output_ref)
                    }
                };
                inputs.push(resolved);
            }

            pass_index.insert(pass.name.as_str(), i);
            compiled.push(CompiledPass { inputs, release_after: Vec::new() });
        }

        let mut frame_end_releases = Vec::new();
        for (p, pass) in desc.passes.iter().enumerate() {
            for (o, output) in pass.outputs.iter().enumerate() {
                if !matches!(output.target, OutputTarget::Transient { .. }) {
                    continue;
                }
                let output_ref = OutputRef { pass: p, output: o };
                match last_use.get(&output_ref) {
                    Some(&consumer) => compiled[consumer].release_after.push(output_ref),
                    None => frame_end_releases.push(output_ref),
                }
            }
        }

        Ok((compiled, frame_end_releases))
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn descriptor(&self) -> &PipelineDesc {
        &self.desc
    }

    /// Descriptor as loaded; loading it again yields an equivalent pipeline
    pub fn save(&self) -> PipelineDesc {
        self.desc.clone()
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.desc.save_to_file(path)
    }

    pub fn pass_count(&self) -> usize {
        self.desc.passes.len()
    }

    /// Override the action used for `kind`
    pub fn with_action(mut self, kind: PassKind, action: Arc<dyn PassAction>) -> Self {
        self.actions.register(kind, action);
        self
    }

    pub fn actions_mut(&mut self) -> &mut PassActionTable {
        &mut self.actions
    }

    /// Pass after which a transient output is released, `None` when it
    /// lives until frame end (or does not exist)
    pub fn release_point(&self, pass: &str, output: &str) -> Option<&str> {
        let p = self.desc.passes.iter().position(|d| d.name == pass)?;
        let o = self.desc.passes[p].output_index(output)?;
        let target = OutputRef { pass: p, output: o };
        self.compiled
            .iter()
            .position(|c| c.release_after.contains(&target))
            .map(|consumer| self.desc.passes[consumer].name.as_str())
    }

    // ===== EXECUTION =====

    /// Run every pass in declaration order.
    ///
    /// Never fails as a whole; per-pass outcomes are in the report.
    pub fn execute(&self, ctx: &mut FrameContext, index: &dyn SceneIndex) -> FrameReport {
        let viewport = *ctx.camera.viewport();
        let mut produced: Vec<Vec<Option<Produced>>> = self
            .desc
            .passes
            .iter()
            .map(|p| p.outputs.iter().map(|_| None).collect())
            .collect();
        let mut report = FrameReport { passes: Vec::with_capacity(self.desc.passes.len()) };

        for (i, (pass, compiled)) in self.desc.passes.iter().zip(&self.compiled).enumerate() {
            let record = self.execute_pass(ctx, index, &viewport, pass, compiled, i, &mut produced);
            report.passes.push(record);

            for &output_ref in &compiled.release_after {
                Self::release_output(ctx.pool, &mut produced, output_ref);
            }
        }

        for &output_ref in &self.frame_end_releases {
            Self::release_output(ctx.pool, &mut produced, output_ref);
        }

        engine_debug!(SOURCE, "Frame '{}': {} passes, {} skipped, {} draws",
            self.desc.name, report.passes.len(), report.skipped_count(), report.total_draw_count());
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_pass(
        &self,
        ctx: &mut FrameContext,
        index: &dyn SceneIndex,
        viewport: &Viewport,
        pass: &PassDesc,
        compiled: &CompiledPass,
        pass_idx: usize,
        produced: &mut [Vec<Option<Produced>>],
    ) -> PassRecord {
        let mut record = PassRecord {
            name: pass.name.clone(),
            kind: pass.kind,
            status: PassStatus::Executed,
            inputs: Vec::with_capacity(pass.inputs.len()),
            outputs: Vec::new(),
            draw_count: 0,
        };

        // Bind inputs
        let mut inputs: Vec<Option<GpuResource>> = Vec::with_capacity(pass.inputs.len());
        for (binding, resolved) in pass.inputs.iter().zip(&compiled.inputs) {
            let bound = match resolved {
                ResolvedInput::Output(r) => produced[r.pass][r.output]
                    .as_ref()
                    .map(|p| (p.resource().clone(), p.shape())),
                ResolvedInput::Resource(name) => match Self::materialize(ctx.pool, name) {
                    Ok(bound) => Some(bound),
                    Err(err) => {
                        engine_warn!(SOURCE, "Pass '{}': resource '{}' unavailable: {}", pass.name, name, err);
                        None
                    }
                },
            };
            if bound.is_none() {
                engine_warn!(SOURCE, "Pass '{}': input '{}' ({}) is unavailable",
                    pass.name, binding.name, binding.source.display_name());
            }
            record.inputs.push(BindingRecord {
                name: binding.name.clone(),
                shape: bound.as_ref().map(|(_, shape)| *shape),
                resource_id: bound.as_ref().map(|(resource, _)| resource.id()),
            });
            inputs.push(bound.map(|(resource, _)| resource));
        }

        let Some(program) = ctx.programs.program(&pass.program) else {
            return Self::skip(record, pass, Error::MissingProgram(pass.program.clone()));
        };
        let Some(action) = self.actions.get(pass.kind) else {
            let err = Error::BackendError(format!("no action registered for {:?}", pass.kind));
            return Self::skip(record, pass, err);
        };

        // Resolve outputs
        let mut outputs: Vec<Produced> = Vec::with_capacity(pass.outputs.len());
        for output in &pass.outputs {
            match Self::resolve_output(ctx.pool, &output.target, viewport) {
                Ok(p) => outputs.push(p),
                Err(err) => {
                    Self::give_back(ctx.pool, outputs);
                    return Self::skip(record, pass, err);
                }
            }
        }

        let targets: Vec<GpuResource> = outputs.iter().map(|p| p.resource().clone()).collect();
        let layer_capacity = outputs
            .first()
            .map_or(1, |p| u32::try_from(p.shape().layer_count()).unwrap_or(u32::MAX));
        let pass_viewport = outputs
            .first()
            .map(Produced::shape)
            .filter(|shape| shape.kind != ResourceKind::Buffer)
            .map_or(*viewport, |shape| Viewport::from_size(shape.width, shape.height));

        // Query visible set and draw
        let pass_ctx = PassContext {
            desc: pass,
            scene: ctx.scene,
            camera: ctx.camera,
            index,
            inputs: &inputs,
            layer_capacity,
        };
        let items = action.collect(&pass_ctx);
        let recorded = Self::record_commands(
            &mut *ctx.commands, action.as_ref(), &pass_ctx, &items, &program, &targets, pass_viewport,
        );

        let draw_count = match recorded {
            Ok(count) => count,
            Err(err) => {
                Self::give_back(ctx.pool, outputs);
                return Self::skip(record, pass, err);
            }
        };

        if pass_ctx.is_degraded() {
            engine_warn!(SOURCE, "Pass '{}' ran degraded", pass.name);
            record.status = PassStatus::Degraded;
        }
        record.draw_count = draw_count;
        record.outputs = pass
            .outputs
            .iter()
            .zip(&outputs)
            .map(|(binding, p)| BindingRecord {
                name: binding.name.clone(),
                shape: Some(p.shape()),
                resource_id: Some(p.resource().id()),
            })
            .collect();

        for (slot, p) in produced[pass_idx].iter_mut().zip(outputs) {
            *slot = Some(p);
        }
        record
    }

    fn record_commands(
        cmd: &mut dyn CommandList,
        action: &dyn PassAction,
        pass_ctx: &PassContext,
        items: &[DrawItem],
        program: &Arc<dyn Program>,
        targets: &[GpuResource],
        viewport: Viewport,
    ) -> Result<usize> {
        let pass = pass_ctx.desc;
        cmd.begin_pass(&PassBeginDesc { name: &pass.name, targets, clear: pass.clear, viewport })?;

        let recorded = Self::record_body(cmd, action, pass_ctx, items, program, viewport);
        let ended = cmd.end_pass();
        let count = recorded?;
        ended?;
        Ok(count)
    }

    fn record_body(
        cmd: &mut dyn CommandList,
        action: &dyn PassAction,
        pass_ctx: &PassContext,
        items: &[DrawItem],
        program: &Arc<dyn Program>,
        viewport: Viewport,
    ) -> Result<usize> {
        cmd.set_viewport(viewport)?;
        cmd.bind_program(program, pass_ctx.desc.blend)?;
        for (slot, input) in pass_ctx.inputs.iter().enumerate() {
            cmd.bind_input(slot as u32, input.as_ref())?;
        }
        action.record(pass_ctx, items, cmd)
    }

    // ===== RESOURCES =====

    fn materialize(pool: &mut TransientPool, name: &str) -> Result<(GpuResource, ShapeKey)> {
        let key = pool
            .declared(name)
            .ok_or_else(|| Error::InvalidResource(format!("'{}' is not declared", name)))?;
        let resource = pool.materialize(key)?;
        let shape = pool
            .declared_shape(key)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("'{}' has no shape", name)))?;
        Ok((resource, shape))
    }

    fn resolve_output(pool: &mut TransientPool, target: &OutputTarget, viewport: &Viewport) -> Result<Produced> {
        match target {
            OutputTarget::Resource(name) => {
                let (resource, shape) = Self::materialize(pool, name)?;
                Ok(Produced::Declared { resource, shape })
            }
            OutputTarget::Transient { .. } => {
                let shape = target
                    .transient_shape(viewport)
                    .ok_or_else(|| Error::InvalidShape("output has no transient shape".to_string()))?;
                Ok(Produced::Transient(pool.acquire(&shape)?))
            }
        }
    }

    /// Return the outputs of a failed pass to the pool
    fn give_back(pool: &mut TransientPool, outputs: Vec<Produced>) {
        for p in outputs {
            if let Produced::Transient(handle) = p {
                if let Err(err) = pool.release(handle) {
                    engine_warn!(SOURCE, "Failed to return output to the pool: {}", err);
                }
            }
        }
    }

    /// End the lifetime of an output: the binding is cleared and a
    /// transient resource goes back to the pool
    fn release_output(pool: &mut TransientPool, produced: &mut [Vec<Option<Produced>>], output_ref: OutputRef) {
        if let Some(Produced::Transient(handle)) = produced[output_ref.pass][output_ref.output].take() {
            if let Err(err) = pool.release(handle) {
                engine_warn!(SOURCE, "Failed to release transient output: {}", err);
            }
        }
    }

    fn skip(mut record: PassRecord, pass: &PassDesc, err: Error) -> PassRecord {
        engine_warn!(SOURCE, "Pass '{}' skipped: {}", pass.name, err);
        record.outputs = pass
            .outputs
            .iter()
            .map(|o| BindingRecord { name: o.name.clone(), shape: None, resource_id: None })
            .collect();
        record.status = PassStatus::Skipped(err);
        record
    }
}

#[cfg(test)]
#[path = "render_pipeline_tests.rs"]
mod tests;
